use std::sync::Arc;

use pmcdep_core::Config;
use pmcdep_services::{DepositPipeline, DepositTransport, SftpTransport};
use pmcdep_storage::{FileFetcher, HttpFetcher};

/// Shared application state: the configured pipeline plus the client
/// used for job callbacks.
pub struct AppState {
    pub config: Config,
    pub pipeline: DepositPipeline,
    pub callback_client: reqwest::Client,
}

impl AppState {
    /// Wire up the production components from configuration.
    pub fn from_config(config: Config) -> Result<Arc<Self>, anyhow::Error> {
        let fetcher: Arc<dyn FileFetcher> = Arc::new(HttpFetcher::new(config.stream_buffer_bytes())?);
        let transport: Arc<dyn DepositTransport> = Arc::new(SftpTransport::new(config.sftp.clone()));
        Ok(Self::with_components(config, fetcher, transport))
    }

    /// Assemble state from explicit components. Tests use this to swap
    /// in mock fetchers and transports.
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn FileFetcher>,
        transport: Arc<dyn DepositTransport>,
    ) -> Arc<Self> {
        let pipeline = DepositPipeline::new(&config, fetcher, transport);
        Arc::new(Self {
            config,
            pipeline,
            callback_client: reqwest::Client::new(),
        })
    }
}
