//! Schema checks for untrusted card-set documents.
//!
//! Validation walks the raw `serde_json::Value` rather than deserializing into
//! [`CardSet`] so that every violation in a document is reported, not just the
//! first one serde trips over.

use crate::{normalize_package_name, Card, CardSet, Difficulty, ImportError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// A card that passed validation but has not had defaults applied yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedCard {
    pub id: Option<String>,
    pub question: String,
    pub category: String,
    pub follow_ups: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedCardSet {
    pub package_name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub cards: Vec<ValidatedCard>,
}

pub struct CardSetValidator;

impl CardSetValidator {
    /// Checks `doc` against the card-set schema, then checks its package name
    /// against `existing_names` (compared normalized).
    pub fn validate<S: AsRef<str>>(doc: &Value, existing_names: &[S]) -> Result<ValidatedCardSet, ImportError> {
        let set = Self::check_schema(doc).map_err(|violations| ImportError::InvalidSchema { violations })?;

        let wanted = normalize_package_name(&set.package_name);
        if existing_names
            .iter()
            .any(|n| normalize_package_name(n.as_ref()) == wanted)
        {
            return Err(ImportError::Duplicate { package_name: set.package_name });
        }
        Ok(set)
    }

    /// Schema rules only. Returns every violation found, in document order.
    pub fn check_schema(doc: &Value) -> Result<ValidatedCardSet, Vec<String>> {
        let Some(obj) = doc.as_object() else {
            return Err(vec!["document: must be a JSON object".to_string()]);
        };
        let mut errors = Vec::new();

        let package_name = match obj.get("packageName") {
            None | Some(Value::Null) => {
                errors.push("packageName: is required".to_string());
                None
            }
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) => {
                errors.push("packageName: must not be empty".to_string());
                None
            }
            Some(_) => {
                errors.push("packageName: must be a string".to_string());
                None
            }
        };
        let description = optional_string(obj, "description", &mut errors);
        let image = optional_string(obj, "image", &mut errors);

        let cards = match obj.get("cards") {
            None | Some(Value::Null) => {
                errors.push("cards: is required".to_string());
                Vec::new()
            }
            Some(Value::Array(items)) if items.is_empty() => {
                errors.push("cards: must contain at least one card".to_string());
                Vec::new()
            }
            Some(Value::Array(items)) => check_cards(items, &mut errors),
            Some(_) => {
                errors.push("cards: must be an array".to_string());
                Vec::new()
            }
        };

        match package_name {
            Some(package_name) if errors.is_empty() => Ok(ValidatedCardSet {
                package_name,
                description,
                image,
                cards,
            }),
            _ => Err(errors),
        }
    }

    /// Applies defaults and assigns ids to cards that came without one.
    pub fn sanitize(set: ValidatedCardSet) -> CardSet {
        let package_name = set.package_name.trim().to_string();
        let key = normalize_package_name(&package_name);
        let cards = set
            .cards
            .into_iter()
            .enumerate()
            .map(|(index, c)| Card {
                id: c.id.unwrap_or_else(|| generated_card_id(&key, index)),
                question: c.question.trim().to_string(),
                category: c.category.trim().to_string(),
                follow_ups: c.follow_ups.unwrap_or_default(),
                difficulty: c.difficulty.unwrap_or_default(),
            })
            .collect();
        CardSet {
            package_name,
            description: set.description.unwrap_or_default(),
            image: set.image.unwrap_or_default(),
            cards,
        }
    }
}

/// Stable id for the `index`-th card of a set, so re-importing the same
/// document yields the same ids and stored progress still lines up.
pub fn generated_card_id(normalized_name: &str, index: usize) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{normalized_name}/{index}").as_bytes()).to_string()
}

fn optional_string(obj: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(format!("{field}: must be a string"));
            None
        }
    }
}

fn required_text(obj: &Map<String, Value>, field: &str, path: &str, errors: &mut Vec<String>) -> String {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            errors.push(format!("{path}: must not be empty"));
            String::new()
        }
        None | Some(Value::Null) => {
            errors.push(format!("{path}: is required"));
            String::new()
        }
        Some(_) => {
            errors.push(format!("{path}: must be a string"));
            String::new()
        }
    }
}

fn check_cards(items: &[Value], errors: &mut Vec<String>) -> Vec<ValidatedCard> {
    let mut ids = HashSet::new();
    let mut cards = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let at = format!("cards[{i}]");
        let Some(card) = item.as_object() else {
            errors.push(format!("{at}: must be an object"));
            continue;
        };

        let question = required_text(card, "question", &format!("{at}.question"), errors);
        let category = required_text(card, "category", &format!("{at}.category"), errors);

        let id = match card.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if !s.trim().is_empty() => {
                if !ids.insert(s.clone()) {
                    errors.push(format!("{at}.id: duplicates an earlier card id \"{s}\""));
                }
                Some(s.clone())
            }
            Some(Value::String(_)) => {
                errors.push(format!("{at}.id: must not be empty"));
                None
            }
            Some(_) => {
                errors.push(format!("{at}.id: must be a string"));
                None
            }
        };

        let follow_ups = match card.get("followUps") {
            None | Some(Value::Null) => None,
            Some(Value::Array(list)) => {
                let mut out = Vec::with_capacity(list.len());
                for (j, f) in list.iter().enumerate() {
                    match f.as_str() {
                        Some(s) => out.push(s.to_string()),
                        None => errors.push(format!("{at}.followUps[{j}]: must be a string")),
                    }
                }
                Some(out)
            }
            Some(_) => {
                errors.push(format!("{at}.followUps: must be an array of strings"));
                None
            }
        };

        let difficulty = match card.get("difficulty") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64().and_then(Difficulty::from_level) {
                Some(d) => Some(d),
                None => {
                    errors.push(format!("{at}.difficulty: must be 1, 2 or 3"));
                    None
                }
            },
        };

        cards.push(ValidatedCard {
            id,
            question,
            category,
            follow_ups,
            difficulty,
        });
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NONE: [&str; 0] = [];

    #[test]
    fn reports_every_violation() {
        let doc = json!({
            "packageName": "",
            "image": 7,
            "cards": [
                { "question": "", "category": "" },
                { "question": "ok", "category": "ok", "difficulty": 4, "followUps": ["a", 2] },
                "nope"
            ]
        });
        let errs = CardSetValidator::check_schema(&doc).unwrap_err();
        assert_eq!(
            errs,
            vec![
                "packageName: must not be empty",
                "image: must be a string",
                "cards[0].question: must not be empty",
                "cards[0].category: must not be empty",
                "cards[1].followUps[1]: must be a string",
                "cards[1].difficulty: must be 1, 2 or 3",
                "cards[2]: must be an object",
            ]
        );
    }

    #[test]
    fn missing_and_empty_cards_are_schema_errors() {
        let errs = CardSetValidator::check_schema(&json!({ "packageName": "x" })).unwrap_err();
        assert_eq!(errs, vec!["cards: is required"]);

        let errs = CardSetValidator::check_schema(&json!({ "packageName": "x", "cards": [] })).unwrap_err();
        assert_eq!(errs, vec!["cards: must contain at least one card"]);
    }

    #[test]
    fn non_object_document() {
        let errs = CardSetValidator::check_schema(&json!([1, 2])).unwrap_err();
        assert_eq!(errs, vec!["document: must be a JSON object"]);
    }

    #[test]
    fn fractional_difficulty_is_rejected() {
        let doc = json!({ "packageName": "x", "cards": [{ "question": "q", "category": "c", "difficulty": 1.5 }] });
        assert!(CardSetValidator::check_schema(&doc).is_err());
    }

    #[test]
    fn duplicate_card_ids_are_rejected() {
        let doc = json!({ "packageName": "x", "cards": [
            { "id": "a", "question": "q", "category": "c" },
            { "id": "a", "question": "q2", "category": "c" }
        ]});
        let errs = CardSetValidator::check_schema(&doc).unwrap_err();
        assert_eq!(errs, vec!["cards[1].id: duplicates an earlier card id \"a\""]);
    }

    #[test]
    fn duplicate_name_is_case_insensitive() {
        let doc = json!({ "packageName": "Date Night", "cards": [{ "question": "q", "category": "c" }] });
        let err = CardSetValidator::validate(&doc, &["date night"]).unwrap_err();
        assert_eq!(err, ImportError::Duplicate { package_name: "Date Night".into() });
        assert!(CardSetValidator::validate(&doc, &NONE).is_ok());
    }

    #[test]
    fn sanitize_applies_defaults() {
        let doc = json!({ "packageName": " Road Trip ", "cards": [
            { "question": "Where to?", "category": "travel" },
            { "id": "keep-me", "question": "Why?", "category": "travel", "difficulty": 3, "followUps": ["and?"] }
        ]});
        let set = CardSetValidator::sanitize(CardSetValidator::check_schema(&doc).unwrap());
        assert_eq!(set.package_name, "Road Trip");
        assert_eq!(set.description, "");
        assert_eq!(set.image, "");
        assert_eq!(set.cards[0].difficulty, Difficulty::Easy);
        assert!(set.cards[0].follow_ups.is_empty());
        assert_eq!(set.cards[0].id, generated_card_id("road trip", 0));
        assert_eq!(set.cards[1].id, "keep-me");
        assert_eq!(set.cards[1].difficulty, Difficulty::Hard);
        assert_eq!(set.cards[1].follow_ups, vec!["and?".to_string()]);
    }

    #[test]
    fn generated_ids_are_stable() {
        assert_eq!(generated_card_id("a", 1), generated_card_id("a", 1));
        assert_ne!(generated_card_id("a", 1), generated_card_id("a", 2));
    }
}
