use pmcdep_api::{build_router, server, telemetry, AppState};
use pmcdep_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let config = Config::from_env()?;
    config.validate_for_service()?;

    let state = AppState::from_config(config.clone())?;
    let app = build_router(state);

    server::start_server(&config, app).await
}
