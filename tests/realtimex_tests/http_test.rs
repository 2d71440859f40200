#![cfg(feature = "realtimex-sdk")]

use std::time::Duration;

use deeptutor::realtimex::{
    http::HttpConnector,
    sdk::{
        ChatMessage, ChatOptions, ProviderCapability, REQUIRED_PERMISSIONS, SdkConfig,
        SdkConnector, SdkError,
    },
};
use futures::StreamExt;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0)
}

fn route(request: &str) -> (&'static str, String) {
    let first_line = request.lines().next().unwrap_or_default();
    let authorized = request.to_lowercase().contains("x-rtx-app-id: app-1");
    if first_line.starts_with("GET /health") {
        return (
            "200 OK",
            r#"{"success": true, "mode": "development", "appId": "app-1"}"#.to_string(),
        );
    }
    if !authorized {
        return ("403 Forbidden", r#"{"error": "unknown app"}"#.to_string());
    }
    if first_line.starts_with("GET /sdk/llm/providers?type=llm") {
        return (
            "200 OK",
            r#"{"providers": [{"provider": "openai", "models": ["gpt-4o"]}]}"#.to_string(),
        );
    }
    if first_line.starts_with("POST /sdk/llm/chat/stream") {
        return (
            "200 OK",
            "{\"text\": \"Hel\"}\n{\"text\": \"lo\"}\n\n{\"error\": true}\n".to_string(),
        );
    }
    if first_line.starts_with("POST /sdk/llm/chat") {
        return (
            "429 Too Many Requests",
            r#"{"error": "slow down"}"#.to_string(),
        );
    }
    ("404 Not Found", r#"{"error": "no route"}"#.to_string())
}

async fn handle(mut socket: TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_string();
            if buf.len() >= end + 4 + content_length(&headers) {
                break;
            }
        }
    }
    let (status, body) = route(&String::from_utf8_lossy(&buf));
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = socket.shutdown().await;
}

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handle(socket));
        }
    });
    format!("http://{addr}")
}

fn config(base_url: String, app_id: Option<&str>) -> SdkConfig {
    SdkConfig {
        permissions: REQUIRED_PERMISSIONS.to_vec(),
        base_url,
        app_id: app_id.map(str::to_string),
    }
}

fn options() -> ChatOptions {
    ChatOptions {
        model: None,
        temperature: 0.7,
        max_tokens: 100,
        response_format: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_and_async_ping() {
    let base_url = start_server().await;
    let sdk = HttpConnector
        .connect(&config(base_url, Some("app-1")))
        .unwrap();
    assert_eq!(sdk.permissions(), REQUIRED_PERMISSIONS.to_vec());

    let ping = sdk.ping_blocking(Duration::from_secs(2)).unwrap();
    assert!(ping.success);
    assert_eq!(ping.mode.as_deref(), Some("development"));

    let ping = sdk.ping().await.unwrap();
    assert_eq!(ping.app_id.as_deref(), Some("app-1"));
}

#[tokio::test]
async fn test_providers_and_error_mapping() {
    let base_url = start_server().await;
    let sdk = HttpConnector
        .connect(&config(base_url.clone(), Some("app-1")))
        .unwrap();

    let providers = sdk.list_providers(ProviderCapability::Llm).await.unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].models, vec!["gpt-4o".to_string()]);

    let err = sdk
        .chat(vec![ChatMessage::user("hi")], options())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SdkError::Provider {
            code: "RATE_LIMIT".to_string(),
            message: "slow down".to_string()
        }
    );

    let anonymous = HttpConnector.connect(&config(base_url, None)).unwrap();
    let err = anonymous
        .list_providers(ProviderCapability::Llm)
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::PermissionDenied { .. }));
}

#[tokio::test]
async fn test_chat_stream_reads_ndjson() {
    let base_url = start_server().await;
    let sdk = HttpConnector
        .connect(&config(base_url, Some("app-1")))
        .unwrap();

    let chunks: Vec<_> = sdk
        .chat_stream(vec![ChatMessage::user("hi")], options())
        .await
        .unwrap()
        .collect()
        .await;
    let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].text.as_deref(), Some("Hel"));
    assert!(chunks[2].error);
}

#[test]
fn test_unreachable_host_is_transport_error() {
    let sdk = HttpConnector
        .connect(&config("http://127.0.0.1:9".to_string(), Some("app-1")))
        .unwrap();
    let err = sdk.ping_blocking(Duration::from_millis(500)).unwrap_err();
    assert!(matches!(err, SdkError::Transport(_)));
}
