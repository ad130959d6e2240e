//! snowprom exporter
//!
//! - Config: optional YAML file (`SNOWPROM_CONFIG`) + `SNOWFLAKE_*` / `EXPORTER_PORT` env
//! - Endpoints: `/metrics`, `/healthz`
//! - Queries run only when Prometheus scrapes

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use snowprom_core::error::{Result, SnowpromError};
use snowprom_exporter::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, class = e.class().as_str(), "snowprom-exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var(config::CONFIG_PATH_ENV).ok();
    let cfg = config::load(path.as_deref(), |k| std::env::var(k).ok())?;
    let listen = cfg.exporter.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "snowprom-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| SnowpromError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| SnowpromError::Internal(format!("server failed: {e}")))
}
