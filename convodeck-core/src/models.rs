use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CardId = String;

/// Lowercased, trimmed form of a package name. Repositories key card sets by
/// this and duplicate detection compares it.
pub fn normalize_package_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Persisted progress for one card set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub seen_cards: Vec<CardId>,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn has_seen(&self, card_id: &str) -> bool {
        self.seen_cards.iter().any(|c| c == card_id)
    }

    /// Records a view. Returns `true` when the card was not seen before.
    pub fn record_view(&mut self, card_id: &str, at: DateTime<Utc>) -> bool {
        self.last_viewed_at = Some(at);
        if self.has_seen(card_id) {
            return false;
        }
        self.seen_cards.push(card_id.to_string());
        true
    }

    /// Drops repeated ids, keeping the first occurrence of each.
    pub fn dedup_seen(&mut self) {
        let mut kept = std::collections::HashSet::with_capacity(self.seen_cards.len());
        self.seen_cards.retain(|id| kept.insert(id.clone()));
    }
}

/// Progress combined with a caller-supplied card count. Never stored.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub seen_cards: Vec<CardId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub percentage: u8,
}

impl ProgressSummary {
    pub fn from_progress(progress: Progress, total_cards: usize) -> Self {
        let percentage = completion_percentage(progress.seen_cards.len(), total_cards);
        Self {
            seen_cards: progress.seen_cards,
            completed_at: progress.completed_at,
            last_viewed_at: progress.last_viewed_at,
            percentage,
        }
    }
}

/// `floor(100 * seen / total)`, 0 for an empty set, capped at 100.
pub fn completion_percentage(seen: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (seen as u128 * 100) / total as u128;
    pct.min(100) as u8
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_level(&self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.as_level()
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Difficulty::from_level(level as u64).ok_or_else(|| format!("difficulty must be 1, 2 or 3, got {level}"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub question: String,
    pub category: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// A named, importable collection of conversation prompts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub package_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub cards: Vec<Card>,
}

impl CardSet {
    pub fn key(&self) -> String {
        normalize_package_name(&self.package_name)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_floors() {
        assert_eq!(completion_percentage(5, 20), 25);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 66);
        assert_eq!(completion_percentage(3, 3), 100);
        assert_eq!(completion_percentage(4, 0), 0);
        assert_eq!(completion_percentage(7, 3), 100);
    }

    #[test]
    fn difficulty_is_a_bare_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&Difficulty::Medium).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Difficulty>("3").unwrap(), Difficulty::Hard);
        assert!(serde_json::from_str::<Difficulty>("4").is_err());
    }

    #[test]
    fn progress_uses_camel_case_and_nulls() {
        let json = serde_json::to_value(Progress::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "seenCards": [], "lastViewedAt": null, "completedAt": null })
        );
    }

    #[test]
    fn record_view_is_idempotent_on_the_set() {
        let mut p = Progress::default();
        let t1 = Utc::now();
        assert!(p.record_view("a", t1));
        let t2 = t1 + chrono::Duration::seconds(5);
        assert!(!p.record_view("a", t2));
        assert_eq!(p.seen_cards, vec!["a".to_string()]);
        assert_eq!(p.last_viewed_at, Some(t2));
    }

    #[test]
    fn dedup_seen_keeps_first_occurrence() {
        let mut p = Progress { seen_cards: vec!["b".into(), "a".into(), "b".into()], ..Default::default() };
        p.dedup_seen();
        assert_eq!(p.seen_cards, vec!["b".to_string(), "a".to_string()]);
    }
}
