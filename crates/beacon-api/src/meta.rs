//! Sources of server meta-information.

use anyhow::Result;
use async_trait::async_trait;
use beacon_api_models::{ConfigResponse, StatusResponse};

/// Supplies the payloads served by the meta procedures.
#[async_trait]
pub trait MetaSource: Send + Sync {
    /// Current server status.
    async fn status(&self) -> Result<StatusResponse>;

    /// Current server configuration.
    async fn config(&self) -> Result<ConfigResponse>;
}

/// Fixed, in-memory meta-information.
#[derive(Debug, Clone, Default)]
pub struct StaticMeta {
    status: StatusResponse,
    config: ConfigResponse,
}

impl StaticMeta {
    /// Serve the given status and configuration for every call.
    #[must_use]
    pub const fn new(status: StatusResponse, config: ConfigResponse) -> Self {
        Self { status, config }
    }
}

#[async_trait]
impl MetaSource for StaticMeta {
    async fn status(&self) -> Result<StatusResponse> {
        Ok(self.status.clone())
    }

    async fn config(&self) -> Result<ConfigResponse> {
        Ok(self.config.clone())
    }
}
