//! HTTP client for the RealTimeX desktop app.
//!
//! Built only with the `realtimex-sdk` feature. Without it the connector
//! reports the SDK as not installed, which detection treats as a
//! misconfiguration rather than an absent integration.

use std::sync::Arc;

use tracing::debug;

use super::sdk::{RealtimeXSdk, SdkConfig, SdkConnector, SdkResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl SdkConnector for HttpConnector {
    fn is_installed(&self) -> bool {
        cfg!(feature = "realtimex-sdk")
    }

    #[cfg(feature = "realtimex-sdk")]
    fn connect(&self, config: &SdkConfig) -> SdkResult<Arc<dyn RealtimeXSdk>> {
        debug!("connecting to RealTimeX at {}", config.base_url);
        Ok(Arc::new(client::HttpSdk::new(config.clone())?))
    }

    #[cfg(not(feature = "realtimex-sdk"))]
    fn connect(&self, config: &SdkConfig) -> SdkResult<Arc<dyn RealtimeXSdk>> {
        debug!("RealTimeX client not compiled in (base url {})", config.base_url);
        Err(super::sdk::SdkError::NotInstalled(
            "RealTimeX integration requires the 'realtimex-sdk' feature".to_string(),
        ))
    }
}

#[cfg(feature = "realtimex-sdk")]
pub use client::HttpSdk;

#[cfg(feature = "realtimex-sdk")]
mod client {
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::StreamExt;
    use reqwest::{
        Client, Response, StatusCode,
        header::{HeaderMap, HeaderValue},
    };
    use serde::Deserialize;
    use serde_json::json;

    use crate::realtimex::sdk::{
        ChatChunk, ChatMessage, ChatOptions, ChatResponse, ChunkStream, EmbedResponse, Permission,
        PingResult, ProviderCapability, RealtimeXSdk, RemoteProvider, SdkConfig, SdkError,
        SdkResult,
    };

    const APP_ID_HEADER: &str = "x-rtx-app-id";
    const PERMISSIONS_HEADER: &str = "x-rtx-permissions";

    #[derive(Debug, Default, Deserialize)]
    struct RemoteErrorBody {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        permission: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct ProvidersBody {
        #[serde(default)]
        providers: Vec<RemoteProvider>,
    }

    pub struct HttpSdk {
        config: SdkConfig,
        client: Client,
        headers: HeaderMap,
    }

    impl HttpSdk {
        pub fn new(config: SdkConfig) -> SdkResult<Self> {
            let headers = build_headers(&config)?;
            Ok(Self {
                config,
                client: Client::new(),
                headers,
            })
        }

        fn url(&self, path: &str) -> String {
            format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
        }

        async fn post_json<T: serde::de::DeserializeOwned>(
            &self,
            path: &str,
            body: serde_json::Value,
        ) -> SdkResult<T> {
            let response = self
                .client
                .post(self.url(path))
                .headers(self.headers.clone())
                .json(&body)
                .send()
                .await
                .map_err(transport)?;
            let response = check_status(response).await?;
            response.json().await.map_err(transport)
        }
    }

    fn build_headers(config: &SdkConfig) -> SdkResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let scopes = config
            .permissions
            .iter()
            .map(Permission::to_string)
            .collect::<Vec<_>>()
            .join(",");
        headers.insert(
            PERMISSIONS_HEADER,
            HeaderValue::from_str(&scopes).map_err(|e| SdkError::Other(e.to_string()))?,
        );
        if let Some(app_id) = &config.app_id {
            headers.insert(
                APP_ID_HEADER,
                HeaderValue::from_str(app_id).map_err(|e| SdkError::Other(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    fn transport(e: reqwest::Error) -> SdkError {
        SdkError::Transport(e.to_string())
    }

    fn remote_error(status: StatusCode, body: &str) -> SdkError {
        let parsed: RemoteErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed.error.unwrap_or_else(|| body.to_string());
        if status == StatusCode::FORBIDDEN || parsed.permission.is_some() {
            return SdkError::PermissionDenied {
                permission: parsed.permission.unwrap_or_else(|| "unknown".to_string()),
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return SdkError::Provider {
                code: parsed.code.unwrap_or_else(|| "RATE_LIMIT".to_string()),
                message,
            };
        }
        match parsed.code {
            Some(code) => SdkError::Provider { code, message },
            None => SdkError::Other(format!("{status}: {message}")),
        }
    }

    async fn check_status(response: Response) -> SdkResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status, &body))
    }

    fn read_ping(status: StatusCode, body: &str) -> PingResult {
        if !status.is_success() {
            return PingResult::default();
        }
        serde_json::from_str(body).unwrap_or(PingResult {
            success: true,
            ..Default::default()
        })
    }

    #[async_trait]
    impl RealtimeXSdk for HttpSdk {
        fn permissions(&self) -> Vec<Permission> {
            self.config.permissions.clone()
        }

        fn ping_blocking(&self, timeout: Duration) -> SdkResult<PingResult> {
            let url = self.url("health");
            let headers = self.headers.clone();
            // The blocking client owns its own runtime, so it must not run on
            // (or be dropped from) an async worker thread.
            std::thread::scope(|scope| {
                scope
                    .spawn(move || -> SdkResult<PingResult> {
                        let client = reqwest::blocking::Client::builder()
                            .timeout(timeout)
                            .build()
                            .map_err(transport)?;
                        let response = client.get(url).headers(headers).send().map_err(transport)?;
                        let status = response.status();
                        let body = response.text().map_err(transport)?;
                        Ok(read_ping(status, &body))
                    })
                    .join()
                    .map_err(|_| SdkError::Other("health check thread panicked".to_string()))?
            })
        }

        async fn ping(&self) -> SdkResult<PingResult> {
            let response = self
                .client
                .get(self.url("health"))
                .headers(self.headers.clone())
                .send()
                .await
                .map_err(transport)?;
            let status = response.status();
            let body = response.text().await.map_err(transport)?;
            Ok(read_ping(status, &body))
        }

        async fn chat(
            &self,
            messages: Vec<ChatMessage>,
            options: ChatOptions,
        ) -> SdkResult<ChatResponse> {
            self.post_json(
                "sdk/llm/chat",
                json!({ "messages": messages, "options": options }),
            )
            .await
        }

        async fn chat_stream(
            &self,
            messages: Vec<ChatMessage>,
            options: ChatOptions,
        ) -> SdkResult<ChunkStream> {
            let response = self
                .client
                .post(self.url("sdk/llm/chat/stream"))
                .headers(self.headers.clone())
                .json(&json!({ "messages": messages, "options": options }))
                .send()
                .await
                .map_err(transport)?;
            let response = check_status(response).await?;

            // Newline-delimited JSON, one chunk per line.
            let mut bytes = Box::pin(response.bytes_stream());
            let stream = async_stream::try_stream! {
                let mut buffer: Vec<u8> = Vec::new();
                while let Some(piece) = bytes.next().await {
                    buffer.extend_from_slice(&piece.map_err(transport)?);
                    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=pos).collect();
                        if let Some(chunk) = parse_chunk(&line)? {
                            yield chunk;
                        }
                    }
                }
                if let Some(chunk) = parse_chunk(&buffer)? {
                    yield chunk;
                }
            };
            Ok(stream.boxed())
        }

        async fn embed(
            &self,
            input: Vec<String>,
            model: Option<String>,
        ) -> SdkResult<EmbedResponse> {
            self.post_json("sdk/llm/embed", json!({ "input": input, "model": model }))
                .await
        }

        async fn list_providers(
            &self,
            capability: ProviderCapability,
        ) -> SdkResult<Vec<RemoteProvider>> {
            let response = self
                .client
                .get(self.url("sdk/llm/providers"))
                .headers(self.headers.clone())
                .query(&[("type", capability.to_string())])
                .send()
                .await
                .map_err(transport)?;
            let body: ProvidersBody = check_status(response)
                .await?
                .json()
                .await
                .map_err(transport)?;
            Ok(body.providers)
        }
    }

    fn parse_chunk(line: &[u8]) -> SdkResult<Option<ChatChunk>> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| SdkError::Other(format!("malformed stream chunk: {e}")))
    }

}
