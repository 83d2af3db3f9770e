//! Strategy router for intent resolution
//!
//! Exactly two strategies exist: remote (cloud) and local (offline). When
//! the cloud is disabled by configuration, the local resolver is called
//! directly. When enabled, the remote attempt runs under a timeout and its
//! result is used only if it arrives in budget and is not `Unsupported`;
//! in every other case the local result is used unconditionally. Remote
//! failures never propagate past this point.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{IntentResolver, LocalResolver, VoiceAction};
use crate::config::VoiceConfig;
use crate::context::PhoneContext;

pub struct ResolverRouter {
    remote: Arc<dyn IntentResolver>,
    local: LocalResolver,
    cloud_enabled: bool,
    cloud_timeout: Duration,
}

impl ResolverRouter {
    pub fn new(config: &VoiceConfig, remote: Arc<dyn IntentResolver>) -> Self {
        Self {
            remote,
            local: LocalResolver::new(),
            cloud_enabled: config.cloud_enabled,
            cloud_timeout: Duration::from_millis(config.cloud_timeout_ms),
        }
    }
}

#[async_trait]
impl IntentResolver for ResolverRouter {
    async fn resolve_intent(&self, transcript: &str, context: &PhoneContext) -> VoiceAction {
        if !self.cloud_enabled {
            return self.local.resolve_intent(transcript, context).await;
        }

        match timeout(self.cloud_timeout, self.remote.resolve_intent(transcript, context)).await {
            Ok(VoiceAction::Unsupported { reason }) => {
                debug!(reason, "cloud resolver unsupported, falling back to local");
                self.local.resolve_intent(transcript, context).await
            }
            Ok(action) => action,
            Err(_) => {
                warn!("cloud resolver timed out, falling back to local");
                self.local.resolve_intent(transcript, context).await
            }
        }
    }
}
