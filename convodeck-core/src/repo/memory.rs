use crate::repo::{validate_card_set, validate_progress, CardSetRepository, KeyValueStore, ProgressRepository};
use crate::{normalize_package_name, CardSet, KvError, Progress, RepoError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
pub struct MemoryProgressRepo {
    records: RwLock<HashMap<String, Progress>>,
}

impl MemoryProgressRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for MemoryProgressRepo {
    async fn get_progress(&self, set_id: &str) -> Result<Option<Progress>, RepoError> {
        Ok(self.records.read().get(set_id).cloned())
    }

    async fn save_progress(&self, set_id: &str, progress: &Progress) -> Result<(), RepoError> {
        validate_progress(set_id, progress)?;
        self.records.write().insert(set_id.to_string(), progress.clone());
        Ok(())
    }

    async fn reset_progress(&self, set_id: &str) -> Result<(), RepoError> {
        self.records.write().remove(set_id);
        Ok(())
    }

    async fn get_all_progress(&self) -> Result<HashMap<String, Progress>, RepoError> {
        Ok(self.records.read().clone())
    }
}

#[derive(Default)]
pub struct MemoryCardSetRepo {
    sets: RwLock<BTreeMap<String, CardSet>>,
}

impl MemoryCardSetRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardSetRepository for MemoryCardSetRepo {
    async fn get_all_card_sets(&self) -> Result<Vec<CardSet>, RepoError> {
        Ok(self.sets.read().values().cloned().collect())
    }

    async fn get_card_set(&self, package_name: &str) -> Result<Option<CardSet>, RepoError> {
        Ok(self.sets.read().get(&normalize_package_name(package_name)).cloned())
    }

    async fn save_card_set(&self, set: &CardSet) -> Result<(), RepoError> {
        validate_card_set(set)?;
        self.sets.write().insert(set.key(), set.clone());
        Ok(())
    }

    async fn delete_card_set(&self, package_name: &str) -> Result<(), RepoError> {
        self.sets.write().remove(&normalize_package_name(package_name));
        Ok(())
    }
}

/// In-process [`KeyValueStore`]; nothing survives the process.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        let m = self.entries.read();
        Ok(keys.iter().map(|k| (k.clone(), m.get(k).cloned())).collect())
    }
}
