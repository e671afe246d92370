use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pmcdep_core::{validate_manifest, DepositError};
use pmcdep_services::{Callbacks, HttpJobTracker, JobTracker, NoopTracker};
use serde::Deserialize;

use crate::error::{unprocessable, ApiError};
use crate::state::AppState;

/// Queue delivery envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub attributes: Attributes,
}

#[derive(Debug, Deserialize)]
pub struct Attributes {
    pub manifest: serde_json::Value,
    #[serde(default)]
    pub callbacks: Option<Callbacks>,
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "PMC deposit service"
}

/// Run a deposit from a queue delivery.
///
/// 201 on success. 422 tells the queue to drop the message (malformed
/// envelope, invalid manifest, missing files, metadata failure); 400
/// asks for a redelivery (acquisition, archive, upload, internal).
pub async fn submit_deposit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Response {
    let Json(envelope) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected malformed deposit envelope");
            return unprocessable(format!("Invalid deposit envelope: {rejection}"));
        }
    };
    let attributes = envelope.message.attributes;

    let manifest = match validate_manifest(&attributes.manifest, &state.config.default_agency) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!(error = %err, "rejected invalid manifest");
            return ApiError(DepositError::Validation(err)).into_response();
        }
    };

    let tracker: Box<dyn JobTracker> = match attributes.callbacks {
        Some(callbacks) => Box::new(HttpJobTracker::new(
            state.callback_client.clone(),
            callbacks,
        )),
        None => Box::new(NoopTracker),
    };

    match state.pipeline.run(&manifest, tracker.as_ref()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}
