//! Seed commit-reveal.
//!
//! The committer publishes `SHA-256(domain || seed)` before betting opens
//! and the preimage after the round ends; the match proves the seed was
//! fixed before any bet existed. Commitment and reveal are stored as
//! separate fields on the round so "exists" is never conflated with
//! "verified".

use sha2::{Digest, Sha256};

/// Domain separator, versioned so a future scheme change cannot collide.
const COMMIT_DOMAIN: &[u8] = b"CRASHD_SEED_V1";

pub type Seed = [u8; 32];
pub type SeedHash = [u8; 32];

/// Compute the commitment hash for a seed.
pub fn hash_seed(seed: &Seed) -> SeedHash {
    let mut hasher = Sha256::new();
    hasher.update(COMMIT_DOMAIN);
    hasher.update(seed);
    hasher.finalize().into()
}

/// Check a revealed preimage against a stored commitment.
pub fn verify_reveal(commitment: &SeedHash, seed: &Seed) -> bool {
    hash_seed(seed) == *commitment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_matches_commitment() {
        let seed = [7u8; 32];
        let commitment = hash_seed(&seed);
        assert!(verify_reveal(&commitment, &seed));
    }

    #[test]
    fn test_wrong_seed_is_rejected() {
        let commitment = hash_seed(&[7u8; 32]);
        assert!(!verify_reveal(&commitment, &[8u8; 32]));
    }

    #[test]
    fn test_commitment_is_not_the_bare_hash() {
        // Domain separation: committing must differ from plain SHA-256.
        let seed = [7u8; 32];
        let bare: SeedHash = Sha256::digest(seed).into();
        assert_ne!(hash_seed(&seed), bare);
    }
}
