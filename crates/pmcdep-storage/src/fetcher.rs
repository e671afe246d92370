use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use pmcdep_core::DepositError;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Source of remotely stored deposit files.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Stream the content at `url` into `dest`. Implementations must keep
    /// memory bounded regardless of the file size.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DepositError>;
}

/// Downloads files over HTTP, streaming response bodies straight to disk.
pub struct HttpFetcher {
    client: reqwest::Client,
    buffer_bytes: usize,
}

impl HttpFetcher {
    pub fn new(buffer_bytes: usize) -> Result<Self, DepositError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| DepositError::Internal(format!("Unable to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            buffer_bytes,
        })
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DepositError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DepositError::Acquisition(format!("Unable to download file: {url}: {err}")))?;

        if !response.status().is_success() {
            return Err(DepositError::Acquisition(format!(
                "Unable to download file: {url} (HTTP {})",
                response.status()
            )));
        }

        let file = tokio::fs::File::create(dest).await?;
        let mut writer = BufWriter::with_capacity(self.buffer_bytes, file);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                DepositError::Acquisition(format!("Unable to download file: {url}: {err}"))
            })?;
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        Ok(())
    }
}
