use crate::{CardSet, KvError, Progress, RepoError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

pub mod kv;
pub mod memory;

pub use kv::{KvCardSetRepo, KvProgressRepo};
pub use memory::{MemoryCardSetRepo, MemoryKvStore, MemoryProgressRepo};

pub const PROGRESS_KEY_PREFIX: &str = "@convodeck/progress:";
pub const CARD_SET_KEY_PREFIX: &str = "@convodeck/cardset:";

/// Generic string key-value storage, the shape of a device's persistent
/// store. Backends report native failures as [`KvError`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    async fn remove(&self, key: &str) -> Result<(), KvError>;
    async fn get_all_keys(&self) -> Result<Vec<String>, KvError>;
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get_progress(&self, set_id: &str) -> Result<Option<Progress>, RepoError>;
    async fn save_progress(&self, set_id: &str, progress: &Progress) -> Result<(), RepoError>;
    /// Deletes the record. Absent records are not an error.
    async fn reset_progress(&self, set_id: &str) -> Result<(), RepoError>;
    async fn get_all_progress(&self) -> Result<HashMap<String, Progress>, RepoError>;
}

/// Card-set storage keyed by normalized package name. `save_card_set` is an
/// upsert; preventing duplicates is the importer's job.
#[async_trait]
pub trait CardSetRepository: Send + Sync {
    async fn get_all_card_sets(&self) -> Result<Vec<CardSet>, RepoError>;
    async fn get_card_set(&self, package_name: &str) -> Result<Option<CardSet>, RepoError>;
    async fn save_card_set(&self, set: &CardSet) -> Result<(), RepoError>;
    async fn delete_card_set(&self, package_name: &str) -> Result<(), RepoError>;
}

/// Checks run before any progress write, shared by every implementation.
pub fn validate_progress(set_id: &str, progress: &Progress) -> Result<(), RepoError> {
    if set_id.trim().is_empty() {
        return Err(RepoError::invalid_data("set id must not be empty"));
    }
    let mut seen = HashSet::with_capacity(progress.seen_cards.len());
    for id in &progress.seen_cards {
        if id.is_empty() {
            return Err(RepoError::invalid_data("seenCards must not contain empty ids"));
        }
        if !seen.insert(id.as_str()) {
            return Err(RepoError::invalid_data(format!("seenCards contains \"{id}\" twice")));
        }
    }
    Ok(())
}

pub(crate) fn validate_card_set(set: &CardSet) -> Result<(), RepoError> {
    if set.key().is_empty() {
        return Err(RepoError::invalid_data("packageName must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_and_empty_card_ids() {
        let mut p = Progress::default();
        p.seen_cards = vec!["a".into(), "a".into()];
        assert!(matches!(validate_progress("s", &p), Err(RepoError::InvalidData { .. })));

        p.seen_cards = vec!["".into()];
        assert!(matches!(validate_progress("s", &p), Err(RepoError::InvalidData { .. })));

        p.seen_cards = vec!["a".into(), "b".into()];
        assert!(validate_progress("s", &p).is_ok());
        assert!(validate_progress("  ", &p).is_err());
    }
}
