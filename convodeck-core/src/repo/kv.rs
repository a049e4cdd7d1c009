use crate::repo::{
    validate_card_set, validate_progress, CardSetRepository, KeyValueStore, ProgressRepository,
    CARD_SET_KEY_PREFIX, PROGRESS_KEY_PREFIX,
};
use crate::{normalize_package_name, CardSet, Progress, RepoError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Progress records stored as JSON strings under `PROGRESS_KEY_PREFIX + set_id`.
pub struct KvProgressRepo {
    store: Arc<dyn KeyValueStore>,
}

impl KvProgressRepo {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

pub fn progress_key(set_id: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{set_id}")
}

pub fn set_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PROGRESS_KEY_PREFIX)
}

/// Records written by other clients may repeat an id; those are collapsed
/// here so the next save passes `validate_progress`.
fn decode_progress(key: &str, raw: &str) -> Result<Progress, RepoError> {
    let mut progress: Progress = serde_json::from_str(raw)
        .map_err(|e| RepoError::invalid_data(format!("malformed progress record at {key}: {e}")))?;
    progress.dedup_seen();
    Ok(progress)
}

#[async_trait]
impl ProgressRepository for KvProgressRepo {
    async fn get_progress(&self, set_id: &str) -> Result<Option<Progress>, RepoError> {
        let key = progress_key(set_id);
        let raw = self.store.get(&key).await?;
        debug!(set_id, found = raw.is_some(), "loaded progress");
        raw.map(|r| decode_progress(&key, &r)).transpose()
    }

    async fn save_progress(&self, set_id: &str, progress: &Progress) -> Result<(), RepoError> {
        validate_progress(set_id, progress)?;
        let raw = serde_json::to_string(progress)
            .map_err(|e| RepoError::invalid_data(format!("cannot encode progress: {e}")))?;
        self.store.set(&progress_key(set_id), &raw).await?;
        debug!(set_id, seen = progress.seen_cards.len(), "saved progress");
        Ok(())
    }

    async fn reset_progress(&self, set_id: &str) -> Result<(), RepoError> {
        self.store.remove(&progress_key(set_id)).await?;
        Ok(())
    }

    async fn get_all_progress(&self) -> Result<HashMap<String, Progress>, RepoError> {
        let keys: Vec<String> = self
            .store
            .get_all_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(PROGRESS_KEY_PREFIX))
            .collect();
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut out = HashMap::with_capacity(keys.len());
        for (key, raw) in self.store.multi_get(&keys).await? {
            let (Some(set_id), Some(raw)) = (set_id_from_key(&key), raw) else {
                continue;
            };
            match decode_progress(&key, &raw) {
                Ok(p) => {
                    out.insert(set_id.to_string(), p);
                }
                Err(e) => warn!(key = %key, error = %e, "skipping corrupt progress record"),
            }
        }
        Ok(out)
    }
}

/// Card sets stored as JSON strings under `CARD_SET_KEY_PREFIX + normalized name`.
pub struct KvCardSetRepo {
    store: Arc<dyn KeyValueStore>,
}

impl KvCardSetRepo {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

pub fn card_set_key(package_name: &str) -> String {
    format!("{CARD_SET_KEY_PREFIX}{}", normalize_package_name(package_name))
}

fn decode_card_set(key: &str, raw: &str) -> Result<CardSet, RepoError> {
    serde_json::from_str(raw)
        .map_err(|e| RepoError::invalid_data(format!("malformed card set at {key}: {e}")))
}

#[async_trait]
impl CardSetRepository for KvCardSetRepo {
    async fn get_all_card_sets(&self) -> Result<Vec<CardSet>, RepoError> {
        let keys: Vec<String> = self
            .store
            .get_all_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(CARD_SET_KEY_PREFIX))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut sets = Vec::with_capacity(keys.len());
        for (key, raw) in self.store.multi_get(&keys).await? {
            let Some(raw) = raw else { continue };
            match decode_card_set(&key, &raw) {
                Ok(set) => sets.push(set),
                Err(e) => warn!(key = %key, error = %e, "skipping corrupt card set"),
            }
        }
        sets.sort_by_key(|s| s.key());
        Ok(sets)
    }

    async fn get_card_set(&self, package_name: &str) -> Result<Option<CardSet>, RepoError> {
        let key = card_set_key(package_name);
        self.store
            .get(&key)
            .await?
            .map(|raw| decode_card_set(&key, &raw))
            .transpose()
    }

    async fn save_card_set(&self, set: &CardSet) -> Result<(), RepoError> {
        validate_card_set(set)?;
        let raw = serde_json::to_string(set)
            .map_err(|e| RepoError::invalid_data(format!("cannot encode card set: {e}")))?;
        self.store.set(&card_set_key(&set.package_name), &raw).await?;
        debug!(package = %set.package_name, cards = set.cards.len(), "saved card set");
        Ok(())
    }

    async fn delete_card_set(&self, package_name: &str) -> Result<(), RepoError> {
        self.store.remove(&card_set_key(package_name)).await?;
        Ok(())
    }
}
