//! Round history persistence in RocksDB.
//!
//! Settled and refunded rounds are immutable history; persisting them (plus
//! the id/burn cursors) lets the recent-crashes read model and provably-fair
//! re-verification survive restarts.

use crate::engine::round::Round;
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const ROUND_PREFIX: &[u8] = b"round:";
const NEXT_ROUND_ID_KEY: &[u8] = b"meta:next_round_id";
const TOTAL_BURNED_KEY: &[u8] = b"meta:total_burned";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rocksdb::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

fn round_key(round_id: u64) -> Vec<u8> {
    // Big-endian id keeps lexicographic key order == numeric round order.
    let mut key = Vec::with_capacity(ROUND_PREFIX.len() + 8);
    key.extend_from_slice(ROUND_PREFIX);
    key.extend_from_slice(&round_id.to_be_bytes());
    key
}

fn parse_u64_le(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(arr))
}

/// Append-only store for finished rounds and engine cursors.
#[derive(Clone)]
pub struct RoundStore {
    db: Arc<DB>,
}

impl RoundStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn put_round(&self, round: &Round) -> Result<(), StoreError> {
        let bytes = bincode::serialize(round)?;
        self.db.put(round_key(round.id), bytes)?;
        Ok(())
    }

    pub fn get_round(&self, round_id: u64) -> Result<Option<Round>, StoreError> {
        match self.db.get(round_key(round_id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Finished rounds, newest first.
    pub fn recent_rounds(&self, limit: usize) -> Result<Vec<Round>, StoreError> {
        let upper = round_key(u64::MAX);
        let iter = self
            .db
            .iterator(IteratorMode::From(&upper, Direction::Reverse));

        let mut rounds = Vec::with_capacity(limit);
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(ROUND_PREFIX) {
                break;
            }
            rounds.push(bincode::deserialize(&value)?);
            if rounds.len() >= limit {
                break;
            }
        }
        Ok(rounds)
    }

    /// Id the next committed round will take. Starts at 1 on a fresh store.
    pub fn next_round_id(&self) -> Result<u64, StoreError> {
        Ok(self
            .db
            .get(NEXT_ROUND_ID_KEY)?
            .and_then(|b| parse_u64_le(&b))
            .unwrap_or(1))
    }

    pub fn set_next_round_id(&self, next: u64) -> Result<(), StoreError> {
        self.db.put(NEXT_ROUND_ID_KEY, next.to_le_bytes())?;
        Ok(())
    }

    /// Process-wide burned total across all settled rounds.
    pub fn total_burned(&self) -> Result<u64, StoreError> {
        Ok(self
            .db
            .get(TOTAL_BURNED_KEY)?
            .and_then(|b| parse_u64_le(&b))
            .unwrap_or(0))
    }

    pub fn set_total_burned(&self, total: u64) -> Result<(), StoreError> {
        self.db.put(TOTAL_BURNED_KEY, total.to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::round::RoundPhase;
    use tempfile::TempDir;

    fn open_store() -> (RoundStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RoundStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_round_roundtrip() {
        let (store, _dir) = open_store();
        let mut round = Round::commit(5, [1u8; 32], 30);
        round.phase = RoundPhase::Settled;
        round.crash_multiplier = 250;

        store.put_round(&round).unwrap();
        let loaded = store.get_round(5).unwrap().unwrap();
        assert_eq!(loaded.id, 5);
        assert_eq!(loaded.crash_multiplier, 250);
        assert!(store.get_round(6).unwrap().is_none());
    }

    #[test]
    fn test_cursors_default_and_persist() {
        let (store, _dir) = open_store();
        assert_eq!(store.next_round_id().unwrap(), 1);
        assert_eq!(store.total_burned().unwrap(), 0);

        store.set_next_round_id(12).unwrap();
        store.set_total_burned(9_999).unwrap();
        assert_eq!(store.next_round_id().unwrap(), 12);
        assert_eq!(store.total_burned().unwrap(), 9_999);
    }

    #[test]
    fn test_recent_rounds_newest_first() {
        let (store, _dir) = open_store();
        for id in 1..=5 {
            store.put_round(&Round::commit(id, [0u8; 32], 10)).unwrap();
        }

        let recent = store.recent_rounds(3).unwrap();
        let ids: Vec<u64> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }
}
