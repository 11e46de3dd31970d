//! Token movement seam.
//!
//! The engine only specifies which logical account pays which; the actual
//! token mechanism lives behind [`TokenBank`]. In the original deployment
//! this seam was the ERC-20 transfer layer; here an in-memory ledger backs
//! the daemon and the tests.

use dashmap::DashMap;
use thiserror::Error;

/// Terminal, non-recoverable destination for forfeited stakes.
pub const BURN_SINK: &str = "0x000000000000000000000000000000000000dEaD";

/// Logical account holding all live stakes for the current round.
pub const ESCROW_ACCOUNT: &str = "crashd:escrow";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("account {account} has {available} but needs {needed}")]
    InsufficientFunds {
        account: String,
        needed: u64,
        available: u64,
    },
}

/// Moves token units between logical accounts. Implementations must be
/// atomic per call: a failed transfer leaves both balances untouched.
pub trait TokenBank: Send + Sync {
    fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<(), BankError>;
    fn balance(&self, account: &str) -> u64;
}

/// Concurrent in-memory balances.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    balances: DashMap<String, u64>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints units into an account. Stand-in for the token faucet the
    /// original test deployment used.
    pub fn deposit(&self, account: &str, amount: u64) {
        *self.balances.entry(account.to_string()).or_insert(0) += amount;
    }
}

impl TokenBank for InMemoryBank {
    fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<(), BankError> {
        if amount == 0 {
            return Ok(());
        }

        // Debit first, fully releasing the shard guard before crediting so
        // two accounts in the same shard cannot deadlock.
        {
            let mut source = self.balances.entry(from.to_string()).or_insert(0);
            if *source < amount {
                return Err(BankError::InsufficientFunds {
                    account: from.to_string(),
                    needed: amount,
                    available: *source,
                });
            }
            *source -= amount;
        }

        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }

    fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).map(|b| *b).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_funds() {
        let bank = InMemoryBank::new();
        bank.deposit("alice", 1_000);

        bank.transfer("alice", "bob", 300).unwrap();

        assert_eq!(bank.balance("alice"), 700);
        assert_eq!(bank.balance("bob"), 300);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances_untouched() {
        let bank = InMemoryBank::new();
        bank.deposit("alice", 100);

        let err = bank.transfer("alice", "bob", 200).unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientFunds {
                account: "alice".to_string(),
                needed: 200,
                available: 100,
            }
        );
        assert_eq!(bank.balance("alice"), 100);
        assert_eq!(bank.balance("bob"), 0);
    }

    #[test]
    fn test_zero_transfer_is_noop() {
        let bank = InMemoryBank::new();
        bank.transfer("alice", "bob", 0).unwrap();
        assert_eq!(bank.balance("bob"), 0);
    }
}
