use deeptutor::{
    ConfigType, Selection, SelectionStore,
    config::AppConfig,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn read(store: &SelectionStore) -> Value {
    serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
}

#[test]
fn test_document_shape_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let store = SelectionStore::from_config(&config);

    assert!(store.set(ConfigType::Llm, "openai", "gpt-4o"));
    assert!(store.set(ConfigType::Embedding, "cohere", "embed-v3"));
    assert_eq!(
        read(&store),
        json!({
            "llm": {"provider": "openai", "model": "gpt-4o"},
            "embedding": {"provider": "cohere", "model": "embed-v3"}
        })
    );
}

#[test]
fn test_two_handles_share_one_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings/rtx_active.json");
    let first = SelectionStore::new(&path);
    let second = SelectionStore::new(&path);

    assert!(first.set(ConfigType::Llm, "openai", "gpt-4o"));
    assert!(second.set(ConfigType::Llm, "anthropic", "claude-sonnet"));
    assert_eq!(
        first.get(ConfigType::Llm),
        Some(Selection {
            provider: "anthropic".to_string(),
            model: "claude-sonnet".to_string(),
        })
    );
}

#[test]
fn test_entry_with_missing_fields_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = SelectionStore::new(dir.path().join("rtx_active.json"));
    std::fs::write(store.path(), r#"{"llm": {"provider": "openai"}}"#).unwrap();

    assert_eq!(store.get(ConfigType::Llm), None);
    assert!(store.set(ConfigType::Embedding, "cohere", "embed-v3"));
    assert_eq!(read(&store)["llm"], json!({"provider": "openai"}));
}

#[test]
fn test_unwritable_location_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = SelectionStore::new(blocker.join("rtx_active.json"));

    assert!(!store.set(ConfigType::Llm, "openai", "gpt-4o"));
    assert_eq!(store.get(ConfigType::Llm), None);
}
