use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};

use super::{
    context::RealtimeXContext,
    sdk::{ProviderCapability, RemoteProvider, SdkResult},
};

/// Remote provider listings as served to the settings UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersSnapshot {
    pub rtx_enabled: bool,
    pub llm: Vec<RemoteProvider>,
    pub embedding: Vec<RemoteProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProvidersSnapshot {
    pub fn disabled() -> Self {
        Self::default()
    }

    fn failed(error: String) -> Self {
        Self {
            rtx_enabled: true,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// TTL guard around the remote provider listings.
///
/// A hit hands back the very same snapshot; a miss refetches both lists and
/// replaces the whole entry. Failed fetches are returned but never stored.
#[derive(Debug)]
pub struct ProvidersCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Arc<ProvidersSnapshot>)>>,
}

impl ProvidersCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, ctx: &RealtimeXContext) -> Arc<ProvidersSnapshot> {
        if !ctx.should_use(false) {
            return Arc::new(ProvidersSnapshot::disabled());
        }

        // Held across the fetch so concurrent misses do not both refetch.
        let mut entry = self.entry.lock().await;
        if let Some((fetched_at, snapshot)) = entry.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                debug!("providers cache hit");
                return snapshot.clone();
            }
        }

        match fetch(ctx).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *entry = Some((Instant::now(), snapshot.clone()));
                snapshot
            }
            Err(e) => {
                warn!("Failed to fetch RealTimeX providers: {}", e);
                Arc::new(ProvidersSnapshot::failed(e.to_string()))
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}

async fn fetch(ctx: &RealtimeXContext) -> SdkResult<ProvidersSnapshot> {
    let sdk = ctx.handle()?;
    let (llm, embedding) = tokio::try_join!(
        sdk.list_providers(ProviderCapability::Llm),
        sdk.list_providers(ProviderCapability::Embedding),
    )?;
    debug!(
        "fetched {} llm and {} embedding providers",
        llm.len(),
        embedding.len()
    );
    Ok(ProvidersSnapshot {
        rtx_enabled: true,
        llm,
        embedding,
        error: None,
    })
}
