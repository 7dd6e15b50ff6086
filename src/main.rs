use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod content;
mod error;
mod game;
mod player;
mod scoring;
mod state;
mod store;
mod web;

use crate::config::load_settings;
use crate::content::QuestionBankCache;
use crate::error::Result as AppResult;
use crate::scoring::ScoreLedger;
use crate::state::AppState;
use crate::store::StoreHandle;
use crate::web::run_server;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,tower_http=debug,{}::store=debug",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_settings = load_settings()?;
    tracing::info!(
        server.port = app_settings.server.port,
        content.source_type = ?app_settings.content.source_type,
        "Configuration loaded"
    );

    let bank = Arc::new(QuestionBankCache::new(app_settings.content.clone()).await?);
    tracing::info!(
        questions.count = bank.questions().await.len(),
        "Question bank initialized"
    );

    let store = StoreHandle::spawn(32);
    let ledger = Arc::new(ScoreLedger::new(store.clone()));

    let server_config = app_settings.server.clone();
    let app_state = AppState {
        store,
        bank,
        ledger,
        settings: Arc::new(app_settings),
    };

    run_server(app_state, server_config).await?;

    Ok(())
}
