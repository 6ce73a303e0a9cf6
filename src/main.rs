use std::sync::Arc;
use std::time::Duration;

mod app;
mod auth;
mod config;
mod error;
mod mailer;
mod outbox;
mod ratelimit;
mod state;
mod submissions;
mod templates;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "moot=debug,axum=info,tower_http=info".to_string());
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

    let (app_state, outbox_rx) = AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    // Notification delivery is decoupled from the requests that queue it.
    tokio::spawn(outbox::run_worker(
        outbox_rx,
        app_state.mailer.clone(),
        app_state.config.clone(),
    ));

    spawn_rate_limit_sweep(app_state.limits.clone());
    spawn_token_cleanup(app_state.clone());

    let app = app::build_app(app_state);
    app::serve(app).await
}

/// Hourly GC of stale rate-limit windows to bound memory growth.
fn spawn_rate_limit_sweep(limits: Arc<crate::ratelimit::RateLimits>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limits.sweep();
        }
    });
}

/// Periodic expired-token sweep; the admin endpoint triggers the same
/// operation on demand.
fn spawn_token_cleanup(state: AppState) {
    let hours = state.config.verification.cleanup_interval_hours.max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(hours * 60 * 60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match auth::services::cleanup_expired_tokens(&state).await {
                Ok(result) => {
                    if !result.cleaned_emails.is_empty() {
                        tracing::info!(
                            count = result.cleaned_emails.len(),
                            "scheduled token cleanup finished"
                        );
                    }
                }
                Err(err) => tracing::error!(error = %err, "scheduled token cleanup failed"),
            }
        }
    });
}
