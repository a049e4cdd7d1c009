use async_trait::async_trait;
use convodeck_core::{
    CardSetImporter, CardSetRepository, Difficulty, ImportError, ImportErrorCode, ImportReport, KeyValueStore,
    KvCardSetRepo, KvError, MemoryCardSetRepo, MemoryKvStore,
};
use serde_json::json;
use std::sync::Arc;

const DATE_NIGHT: &str = r#"{
  "packageName": "Date Night",
  "description": "Questions for a slow dinner",
  "cards": [
    { "question": "What made you laugh this week?", "category": "fun" },
    { "question": "What is a dream you have not told me?", "category": "deep", "difficulty": 3,
      "followUps": ["What stops you?", "How can I help?"] }
  ]
}"#;

fn importer() -> (CardSetImporter, Arc<MemoryCardSetRepo>) {
    let repo = Arc::new(MemoryCardSetRepo::new());
    (CardSetImporter::new(repo.clone()), repo)
}

#[tokio::test]
async fn well_formed_import_succeeds_with_defaults() {
    let (importer, repo) = importer();
    let set = importer.import_from_json(DATE_NIGHT).await.unwrap();

    assert_eq!(set.package_name, "Date Night");
    assert_eq!(set.image, "");
    assert_eq!(set.cards.len(), 2);
    assert_eq!(set.cards[0].difficulty, Difficulty::Easy);
    assert!(!set.cards[0].id.is_empty());
    assert_eq!(set.cards[1].follow_ups.len(), 2);

    let stored = repo.get_card_set("date night").await.unwrap().unwrap();
    assert_eq!(stored, set);
}

#[tokio::test]
async fn duplicate_name_is_rejected_without_writes() {
    let (importer, repo) = importer();
    let original = importer.import_from_json(DATE_NIGHT).await.unwrap();

    let clash = json!({
        "packageName": "DATE NIGHT",
        "cards": [{ "question": "Replacement?", "category": "x" }]
    })
    .to_string();
    let err = importer.import_from_json(&clash).await.unwrap_err();

    assert_eq!(err.code(), ImportErrorCode::Duplicate);
    let all = repo.get_all_card_sets().await.unwrap();
    assert_eq!(all, vec![original]);
}

#[tokio::test]
async fn not_json_is_invalid_json() {
    let (importer, repo) = importer();
    let err = importer.import_from_json("not json").await.unwrap_err();
    assert_eq!(err.code(), ImportErrorCode::InvalidJson);
    assert!(repo.get_all_card_sets().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_or_empty_cards_is_invalid_schema() {
    let (importer, _) = importer();

    let err = importer.import_from_json(r#"{ "packageName": "x" }"#).await.unwrap_err();
    assert_eq!(err.code(), ImportErrorCode::InvalidSchema);

    let err = importer
        .import_from_json(r#"{ "packageName": "x", "cards": [] }"#)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ImportErrorCode::InvalidSchema);
}

#[tokio::test]
async fn schema_message_lists_all_violations() {
    let (importer, repo) = importer();
    let doc = json!({
        "packageName": "Broken",
        "cards": [
            { "question": "", "category": "ok" },
            { "question": "ok", "category": "" }
        ]
    })
    .to_string();

    let err = importer.import_from_json(&doc).await.unwrap_err();
    let message = err.message();
    assert_eq!(err.code(), ImportErrorCode::InvalidSchema);
    assert!(message.contains("cards[0].question"), "{message}");
    assert!(message.contains("cards[1].category"), "{message}");
    assert!(repo.get_all_card_sets().await.unwrap().is_empty());
}

#[tokio::test]
async fn report_has_discriminated_shape() {
    let (importer, _) = importer();

    let ok = ImportReport::from(importer.import_from_json(DATE_NIGHT).await);
    let v = serde_json::to_value(&ok).unwrap();
    assert_eq!(v["success"], json!(true));
    assert_eq!(v["data"]["packageName"], json!("Date Night"));
    assert_eq!(v["data"]["cards"][0]["difficulty"], json!(1));
    assert!(v.get("error").is_none());

    let bad = ImportReport::from(importer.import_from_json("{").await);
    let v = serde_json::to_value(&bad).unwrap();
    assert_eq!(v["success"], json!(false));
    assert_eq!(v["error"]["code"], json!("INVALID_JSON"));
    assert!(v.get("data").is_none());
}

#[tokio::test]
async fn reimport_after_delete_keeps_card_ids() {
    let (importer, repo) = importer();
    let first = importer.import_from_json(DATE_NIGHT).await.unwrap();
    repo.delete_card_set("Date Night").await.unwrap();
    let second = importer.import_from_json(DATE_NIGHT).await.unwrap();
    assert_eq!(first.cards, second.cards);
}

#[tokio::test]
async fn import_from_missing_file_is_file_error() {
    let (importer, _) = importer();
    let err = importer
        .import_from_path("/definitely/not/here/cards.json")
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::File { .. }));
}

/// Store whose writes always fail.
struct ReadOnlyKv(MemoryKvStore);

#[async_trait]
impl KeyValueStore for ReadOnlyKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.0.get(key).await
    }
    async fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::Backend("device storage is full".into()))
    }
    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.0.remove(key).await
    }
    async fn get_all_keys(&self) -> Result<Vec<String>, KvError> {
        self.0.get_all_keys().await
    }
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        self.0.multi_get(keys).await
    }
}

#[tokio::test]
async fn persistence_failure_is_file_error() {
    let repo = Arc::new(KvCardSetRepo::new(Arc::new(ReadOnlyKv(MemoryKvStore::new()))));
    let importer = CardSetImporter::new(repo.clone());

    let err = importer.import_from_json(DATE_NIGHT).await.unwrap_err();
    assert_eq!(err.code(), ImportErrorCode::FileError);
    assert!(err.message().contains("STORAGE_ERROR"), "{}", err.message());
    assert!(repo.get_all_card_sets().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_stored_set_blocks_import_of_same_name() {
    let kv = Arc::new(MemoryKvStore::new());
    let legacy = r#"{"cards":"legacy"}"#;
    kv.set("@convodeck/cardset:late night", legacy).await.unwrap();
    let importer = CardSetImporter::new(Arc::new(KvCardSetRepo::new(kv.clone())));

    let doc = r#"{ "packageName": "LATE NIGHT", "cards": [{ "question": "Still awake?", "category": "fun" }] }"#;
    let err = importer.import_from_json(doc).await.unwrap_err();
    assert_eq!(err.code(), ImportErrorCode::FileError);
    assert!(err.message().contains("INVALID_DATA"), "{}", err.message());
    assert_eq!(kv.get("@convodeck/cardset:late night").await.unwrap().as_deref(), Some(legacy));
}
