use anyhow::{anyhow, Context, Result};
use bromine_core::{init_from_config, open_db, BromineConfig};
use bromine_server::{router, AppState};
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = BromineConfig::load(None).context("failed to load configuration")?;
    init_from_config(&config).map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    let state = AppState::new(conn, config.cover_palette());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind `{}`", config.bind_addr))?;
    info!(
        "event=server_start module=server status=ok addr={} db_path={}",
        config.bind_addr,
        config.db_path.display()
    );

    axum::serve(listener, router(state))
        .await
        .context("server terminated")?;
    Ok(())
}
