use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use deeptutor::pipeline::{
    self, Builtin, FactoryError, LocalPipeline, Pipeline, PipelineOptions, PipelineRegistry,
    ProviderModule, RegistryError, SearchMode, local::Chunking,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const BUILTIN_IDS: [&str; 5] = [
    "realtimex",
    "lightrag",
    "raganything",
    "raganything_docling",
    "llamaindex",
];

fn registry_without_optional_backends() -> PipelineRegistry {
    PipelineRegistry::with_modules(
        Builtin::all()
            .into_iter()
            .map(|b| {
                let enabled = b.engine().implementation() == "lightrag";
                Arc::new(b.with_enabled(enabled)) as Arc<dyn ProviderModule>
            })
            .collect(),
    )
}

#[test]
fn test_builtins_listed_in_order() {
    let registry = registry_without_optional_backends();
    let all: Vec<_> = registry.list(true).into_iter().map(|d| d.id).collect();
    assert_eq!(all, BUILTIN_IDS);

    let available: Vec<_> = registry.list(false).into_iter().map(|d| d.id).collect();
    assert_eq!(available, vec!["realtimex", "lightrag", "raganything_docling"]);
}

#[test]
fn test_unavailable_provider_names_its_feature() {
    let registry = registry_without_optional_backends();
    let err = registry
        .get("llamaindex", None, &PipelineOptions::new())
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable { .. }));
    let message = err.to_string();
    assert!(message.contains("enable the 'llamaindex' feature"));
    assert!(!message.starts_with("Unknown pipeline"));
}

#[test]
fn test_deferred_backend_fails_at_instantiation() {
    let registry = registry_without_optional_backends();
    assert!(registry.has("raganything_docling"));
    let err = registry
        .get("raganything_docling", None, &PipelineOptions::new())
        .unwrap_err();
    assert!(matches!(err, RegistryError::MissingDependency { ref name, .. } if name == "raganything_docling"));
    assert!(err.to_string().contains("switch provider to 'realtimex'/'lightrag'"));
}

#[test]
fn test_compiled_in_backends_follow_features() {
    let registry = PipelineRegistry::new();
    assert_eq!(registry.has("llamaindex"), cfg!(feature = "llamaindex"));
    assert_eq!(registry.has("raganything"), cfg!(feature = "raganything"));
    assert!(registry.has("realtimex"));
}

#[tokio::test]
async fn test_alias_and_technical_name_are_interchangeable() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PipelineRegistry::new();
    let options = PipelineOptions::new();

    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "entropy always increases").unwrap();

    let via_alias = registry.get("realtimex", Some(dir.path()), &options).unwrap();
    let via_name = registry.get("lightrag", Some(dir.path()), &options).unwrap();
    assert_eq!(via_alias.name(), via_name.name());

    via_alias.initialize("thermo", vec![notes]).await.unwrap();
    let result = via_name
        .search("entropy", "thermo", SearchMode::Hybrid, &options)
        .await
        .unwrap();
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.provider, "lightrag");
}

#[test]
fn test_register_is_identity_pass_through() {
    let registry = PipelineRegistry::new();
    let made: Arc<dyn Pipeline> = Arc::new(LocalPipeline::new(
        "custom",
        Some(Path::new("/srv/custom")),
        Chunking::Lines,
    ));
    let handed_out = made.clone();
    registry.register("custom", move |_: Option<&Path>, _: &PipelineOptions| {
        Ok(handed_out.clone())
    });

    let got = registry
        .get("custom", Some(Path::new("/srv/custom")), &PipelineOptions::new())
        .unwrap();
    assert!(Arc::ptr_eq(&got, &made));
}

#[test]
fn test_factory_sees_base_dir() {
    let registry = PipelineRegistry::new();
    registry.register("echo", |base: Option<&Path>, _: &PipelineOptions| {
        let base = base.ok_or_else(|| FactoryError::MissingDependency("base dir".to_string()))?;
        Ok(Arc::new(LocalPipeline::new("echo", Some(base), Chunking::Lines)) as Arc<dyn Pipeline>)
    });

    let got = registry
        .get("echo", Some(Path::new("/kb")), &PipelineOptions::new())
        .unwrap();
    assert_eq!(got.kb_base_dir(), PathBuf::from("/kb"));
}

#[test]
fn test_global_registry_is_shared() {
    assert!(std::ptr::eq(pipeline::global(), pipeline::global()));
    assert!(pipeline::global().has("lightrag"));
}

proptest! {
    #[test]
    fn prop_unknown_ids_are_not_found(name in "[a-z_]{1,24}") {
        prop_assume!(!BUILTIN_IDS.contains(&name.as_str()));
        let registry = PipelineRegistry::new();
        match registry.get(&name, None, &PipelineOptions::new()) {
            Err(RegistryError::NotFound { name: missing, known }) => {
                prop_assert_eq!(missing, name);
                prop_assert_eq!(known, BUILTIN_IDS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
            }
            other => prop_assert!(false, "expected NotFound, got {:?}", other.map(|p| p.name().to_string())),
        }
    }
}
