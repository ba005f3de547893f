mod admin;
mod ai;
mod app;
mod auth;
mod chats;
mod config;
mod error;
mod memory;
mod premium;
mod profiles;
mod state;

use crate::ai::worker::{spawn_generation_worker, spawn_redelivery};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "buddy=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let (app_state, jobs_rx) = AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    spawn_generation_worker(jobs_rx, app_state.db.clone(), app_state.ai.clone());
    spawn_redelivery(app_state.db.clone(), app_state.jobs.clone());

    let app = app::build_app(app_state);
    app::serve(app).await
}
