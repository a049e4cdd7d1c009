use crate::repo::CardSetRepository;
use crate::validator::CardSetValidator;
use crate::{CardSet, ImportError, ImportErrorCode};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Parse, validate, duplicate-check and persist one card-set document.
#[derive(Clone)]
pub struct CardSetImporter {
    repo: Arc<dyn CardSetRepository>,
}

impl CardSetImporter {
    pub fn new(repo: Arc<dyn CardSetRepository>) -> Self {
        Self { repo }
    }

    /// Never writes unless every check passed; every failure comes back as an
    /// [`ImportError`] value.
    pub async fn import_from_json(&self, text: &str) -> Result<CardSet, ImportError> {
        let result = self.run(text).await;
        match &result {
            Ok(set) => info!(package = %set.package_name, cards = set.cards.len(), "imported card set"),
            Err(e) => warn!(code = %e.code(), error = %e, "card set import rejected"),
        }
        result
    }

    pub async fn import_from_path(&self, path: impl AsRef<Path>) -> Result<CardSet, ImportError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| ImportError::File {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        self.import_from_json(&text).await
    }

    async fn run(&self, text: &str) -> Result<CardSet, ImportError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| ImportError::InvalidJson { message: e.to_string() })?;

        let existing: Vec<String> = self
            .repo
            .get_all_card_sets()
            .await?
            .into_iter()
            .map(|s| s.package_name)
            .collect();

        let validated = CardSetValidator::validate(&doc, &existing)?;
        // Bulk listing skips unreadable records; a direct lookup does not.
        if self.repo.get_card_set(&validated.package_name).await?.is_some() {
            return Err(ImportError::Duplicate { package_name: validated.package_name });
        }
        let set = CardSetValidator::sanitize(validated);
        self.repo.save_card_set(&set).await?;
        Ok(set)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ImportFailure {
    pub code: ImportErrorCode,
    pub message: String,
}

/// Wire form of an import outcome:
/// `{ "success": true, "data": .. }` or `{ "success": false, "error": { "code", "message" } }`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CardSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ImportFailure>,
}

impl From<Result<CardSet, ImportError>> for ImportReport {
    fn from(result: Result<CardSet, ImportError>) -> Self {
        match result {
            Ok(set) => Self { success: true, data: Some(set), error: None },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(ImportFailure { code: e.code(), message: e.message() }),
            },
        }
    }
}
