use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use bot_core::{session::SWEEP_INTERVAL, BotContext};
use storage::Storage;
use telegram::TelegramClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod health;
mod polling;

use config::{load_settings, prepare_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let token = settings.bot_token()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let seeded = storage
        .seed_mandatory_channels(&settings.mandatory_channels)
        .await
        .context("failed to seed mandatory channels")?;
    if seeded > 0 {
        info!(seeded, "mandatory channels seeded from configuration");
    }

    if settings.backup_on_startup {
        match storage.create_full_backup(&settings.backup_dir).await {
            Ok(backup) => info!(
                database = %backup.database.display(),
                json = %backup.json.display(),
                "startup backup written"
            ),
            Err(error) => warn!(%error, "startup backup failed"),
        }
    }

    let client = TelegramClient::new(&settings.api_base_url, token);
    let me = client
        .get_me()
        .await
        .context("getMe failed; check the bot token and network access")?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or_default(),
        "connected to bot api"
    );

    let ctx = BotContext::new(
        storage.clone(),
        Arc::new(client.clone()),
        settings.flow_settings(),
    );
    let sweeper = ctx
        .sessions
        .spawn_sweeper(SWEEP_INTERVAL, settings.session_max_age());

    if let Some(bind) = &settings.health_bind {
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid health_bind '{bind}'"))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind health endpoint on {addr}"))?;
        info!(%addr, "health endpoint listening");
        let app = health::build_router(storage.clone());
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                error!(%error, "health endpoint stopped");
            }
        });
    }

    polling::run(client, ctx, settings.poll_timeout(), shutdown_signal()).await;
    sweeper.abort();
    storage.close().await;
    info!("bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
