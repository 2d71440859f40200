use std::{collections::HashMap, sync::Arc, time::Duration};

use deeptutor::{
    AppState, ConfigType,
    adapter::{CompletionRequest, EmbeddingRequest, LlmError},
    config::{AppConfig, Environment, RealtimeXConfig},
    realtimex::{
        ApplyError, ConfigApplyRequest, RealtimeXContext, apply::MockActiveConfigSink,
        apply_config,
        sdk::{
            ChatResponse, EmbedResponse, MockRealtimeXSdk, MockSdkConnector, PingResult,
            ProviderCapability, RealtimeXSdk, RemoteProvider, SdkError,
        },
    },
};
use mockall::predicate::eq;
use pretty_assertions::assert_eq;

fn env(app_id: Option<&str>) -> Arc<dyn Environment> {
    let mut env = HashMap::new();
    if let Some(app_id) = app_id {
        env.insert("RTX_APP_ID".to_string(), app_id.to_string());
    }
    Arc::new(env)
}

fn state_with(sdk: MockRealtimeXSdk, data_dir: &std::path::Path) -> AppState {
    let sdk: Arc<dyn RealtimeXSdk> = Arc::new(sdk);
    let mut connector = MockSdkConnector::new();
    connector.expect_is_installed().return_const(true);
    connector
        .expect_connect()
        .times(1)
        .returning(move |_| Ok(sdk.clone()));
    let config = AppConfig {
        data_dir: data_dir.to_path_buf(),
        realtimex: RealtimeXConfig {
            providers_ttl: Duration::from_secs(60),
            ..Default::default()
        },
        ..Default::default()
    };
    let ctx = RealtimeXContext::new(config.realtimex.clone(), Arc::new(connector), env(Some("app-1")));
    AppState::with_context(config, Arc::new(ctx))
}

fn healthy_sdk() -> MockRealtimeXSdk {
    let mut sdk = MockRealtimeXSdk::new();
    sdk.expect_ping_blocking().times(1).returning(|_| {
        Ok(PingResult {
            success: true,
            mode: Some("production".to_string()),
            ..Default::default()
        })
    });
    sdk
}

#[test]
fn test_no_app_id_means_no_sdk_activity() {
    let mut connector = MockSdkConnector::new();
    connector.expect_is_installed().never();
    connector.expect_connect().never();
    let ctx = RealtimeXContext::new(RealtimeXConfig::default(), Arc::new(connector), env(None));

    assert!(!ctx.should_use(false));
    assert!(!ctx.should_use(true));
}

#[tokio::test]
async fn test_detected_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut sdk = healthy_sdk();
    sdk.expect_list_providers()
        .with(eq(ProviderCapability::Llm))
        .times(1)
        .returning(|_| {
            Ok(vec![RemoteProvider {
                provider: "openai".to_string(),
                name: Some("OpenAI".to_string()),
                models: vec!["gpt-4o".to_string()],
            }])
        });
    sdk.expect_list_providers()
        .with(eq(ProviderCapability::Embedding))
        .times(1)
        .returning(|_| Ok(vec![]));
    sdk.expect_chat().times(1).returning(|messages, options| {
        assert_eq!(messages.len(), 2);
        assert_eq!(options.model.as_deref(), Some("gpt-4o"));
        Ok(ChatResponse {
            success: true,
            content: Some("Photosynthesis converts light to chemical energy.".to_string()),
            ..Default::default()
        })
    });
    let state = state_with(sdk, dir.path());

    // Listings are fetched once and then served from the cache.
    let first = state.providers.get(&state.realtimex).await;
    let second = state.providers.get(&state.realtimex).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.llm[0].models, vec!["gpt-4o".to_string()]);

    let mut sink = MockActiveConfigSink::new();
    sink.expect_set_active()
        .with(eq(ConfigType::Llm), eq("rtx"))
        .times(1)
        .returning(|_, _| Ok(()));
    let outcome = apply_config(
        &state.realtimex,
        &state.selection,
        &sink,
        &ConfigApplyRequest {
            config_type: "llm".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
        },
    )
    .unwrap();
    assert!(outcome.success);

    let active = state.selection.get(ConfigType::Llm).unwrap();
    let answer = state
        .llm()
        .unwrap()
        .complete(&CompletionRequest::new("Explain photosynthesis").with_model(active.model))
        .await
        .unwrap();
    assert!(answer.starts_with("Photosynthesis"));
}

#[tokio::test]
async fn test_sink_failure_surfaces_after_store_write() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(healthy_sdk(), dir.path());
    let mut sink = MockActiveConfigSink::new();
    sink.expect_set_active()
        .returning(|_, _| Err(ApplyError::Sink("config manager offline".to_string())));

    let err = apply_config(
        &state.realtimex,
        &state.selection,
        &sink,
        &ConfigApplyRequest {
            config_type: "embedding".to_string(),
            provider: "cohere".to_string(),
            model: "embed-v3".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(err, ApplyError::Sink("config manager offline".to_string()));
    assert!(state.selection.get(ConfigType::Embedding).is_some());
}

#[tokio::test]
async fn test_embedding_through_state_uses_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut sdk = MockRealtimeXSdk::new();
    sdk.expect_embed()
        .with(eq(vec!["cell".to_string()]), eq(Some("embed-v3".to_string())))
        .times(1)
        .returning(|_, _| {
            Ok(EmbedResponse {
                success: true,
                embeddings: vec![vec![0.5; 8]],
                dimensions: 8,
                ..Default::default()
            })
        });
    let state = state_with(sdk, dir.path());
    assert!(state.selection.set(ConfigType::Embedding, "cohere", "embed-v3"));

    let response = state
        .embedding()
        .unwrap()
        .embed(EmbeddingRequest::new(vec!["cell".to_string()]))
        .await
        .unwrap();
    assert_eq!(response.model, "embed-v3");
    assert_eq!(response.dimensions, 8);
}

#[tokio::test]
async fn test_remote_errors_reach_callers_as_local_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let mut sdk = MockRealtimeXSdk::new();
    sdk.expect_chat().returning(|_, _| {
        Err(SdkError::PermissionDenied {
            permission: "llm.chat".to_string(),
        })
    });
    let state = state_with(sdk, dir.path());

    let err = state
        .llm()
        .unwrap()
        .complete(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LlmError::Permission {
            permission: "llm.chat".to_string(),
            message: "RealTimeX permission required: llm.chat".to_string(),
        }
    );
}
