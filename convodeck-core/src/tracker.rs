use crate::repo::ProgressRepository;
use crate::{completion_percentage, Clock, Progress, ProgressSummary, RepoError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns card views into persisted progress and derives summaries from it.
///
/// Holds no state besides its collaborators. Load-then-save sequences are not
/// atomic: one caller per set at a time is assumed. Storage errors are
/// returned unchanged and never retried.
#[derive(Clone)]
pub struct ProgressTracker {
    repo: Arc<dyn ProgressRepository>,
    clock: Arc<dyn Clock>,
}

impl ProgressTracker {
    pub fn new(repo: Arc<dyn ProgressRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Adds `card_id` to the set's seen cards (no-op if already there) and
    /// stamps `last_viewed_at`. Unknown sets get a fresh record.
    pub async fn track_card_view(&self, set_id: &str, card_id: &str) -> Result<Progress, RepoError> {
        let mut progress = self.repo.get_progress(set_id).await?.unwrap_or_default();
        let added = progress.record_view(card_id, self.clock.now());
        self.repo.save_progress(set_id, &progress).await?;
        debug!(set_id, card_id, added, seen = progress.seen_cards.len(), "tracked card view");
        Ok(progress)
    }

    /// Summary for one set. The first call that observes 100% stamps and
    /// persists `completed_at`; later calls leave it untouched.
    pub async fn get_set_progress(&self, set_id: &str, total_cards: usize) -> Result<ProgressSummary, RepoError> {
        let mut progress = self.repo.get_progress(set_id).await?.unwrap_or_default();
        let complete = completion_percentage(progress.seen_cards.len(), total_cards) >= 100;
        if complete && progress.completed_at.is_none() {
            let now = self.clock.now();
            progress.completed_at = Some(now);
            self.repo.save_progress(set_id, &progress).await?;
            info!(set_id, completed_at = %now, "card set completed");
        }
        Ok(ProgressSummary::from_progress(progress, total_cards))
    }

    /// Deletes the set's record outright.
    pub async fn reset_progress(&self, set_id: &str) -> Result<(), RepoError> {
        self.repo.reset_progress(set_id).await?;
        info!(set_id, "progress reset");
        Ok(())
    }

    /// Summaries for every persisted record. Sets missing from `sizes` count
    /// as empty (0%). Pure read: completion is not stamped here.
    pub async fn get_all_progress(
        &self,
        sizes: &HashMap<String, usize>,
    ) -> Result<HashMap<String, ProgressSummary>, RepoError> {
        let all = self.repo.get_all_progress().await?;
        Ok(all
            .into_iter()
            .map(|(set_id, progress)| {
                let total = sizes.get(&set_id).copied().unwrap_or(0);
                (set_id, ProgressSummary::from_progress(progress, total))
            })
            .collect())
    }
}
