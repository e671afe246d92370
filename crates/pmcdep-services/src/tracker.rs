use async_trait::async_trait;
use pmcdep_core::DepositError;
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::DepositReceipt;

/// Callback endpoints supplied with a queued deposit. The job url
/// receives progress updates, the status url receives the final
/// submission state.
#[derive(Clone, Debug, Deserialize)]
pub struct Callbacks {
    pub job_url: String,
    pub status_url: String,
    pub handshake: String,
    pub success_state: String,
    pub failure_state: String,
    pub user_id: String,
}

/// Progress reporting for a deposit job. Implementations must never
/// fail the deposit: delivery problems are theirs to log and swallow.
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn running(&self, message: &str);
    async fn completed(&self, message: &str, receipt: &DepositReceipt);
    async fn failed(&self, message: &str);
}

/// Tracker used when a deposit carries no callbacks.
pub struct NoopTracker;

#[async_trait]
impl JobTracker for NoopTracker {
    async fn running(&self, _message: &str) {}
    async fn completed(&self, _message: &str, _receipt: &DepositReceipt) {}
    async fn failed(&self, _message: &str) {}
}

/// Reports progress to the callback endpoints over HTTP with the
/// handshake token as a bearer credential.
pub struct HttpJobTracker {
    client: reqwest::Client,
    callbacks: Callbacks,
}

impl HttpJobTracker {
    pub fn new(client: reqwest::Client, callbacks: Callbacks) -> Self {
        Self { client, callbacks }
    }

    async fn patch_job(&self, body: serde_json::Value) -> Result<(), DepositError> {
        let url = &self.callbacks.job_url;
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.callbacks.handshake)
            .json(&body)
            .send()
            .await
            .map_err(|err| DepositError::Callback(format!("{url}: {err}")))?;
        if !response.status().is_success() {
            return Err(DepositError::Callback(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn put_status(&self, state: &str) -> Result<(), DepositError> {
        let url = &self.callbacks.status_url;
        let body = json!({
            "status": state,
            "user_id": self.callbacks.user_id,
        });
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.callbacks.handshake)
            .json(&body)
            .send()
            .await
            .map_err(|err| DepositError::Callback(format!("{url}: {err}")))?;
        if !response.status().is_success() {
            return Err(DepositError::Callback(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn swallow(result: Result<(), DepositError>) {
        if let Err(err) = result {
            tracing::warn!(stage = err.stage(), error = %err, "callback delivery failed");
        }
    }
}

#[async_trait]
impl JobTracker for HttpJobTracker {
    async fn running(&self, message: &str) {
        Self::swallow(
            self.patch_job(json!({ "status": "running", "message": message }))
                .await,
        );
    }

    async fn completed(&self, message: &str, receipt: &DepositReceipt) {
        Self::swallow(
            self.patch_job(json!({
                "status": "complete",
                "message": message,
                "output": receipt,
            }))
            .await,
        );
        Self::swallow(self.put_status(&self.callbacks.success_state).await);
    }

    async fn failed(&self, message: &str) {
        Self::swallow(
            self.patch_job(json!({ "status": "failed", "message": message }))
                .await,
        );
        Self::swallow(self.put_status(&self.callbacks.failure_state).await);
    }
}
