//! HTTP service for queue-triggered PMC deposits.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use routes::build_router;
pub use state::AppState;
