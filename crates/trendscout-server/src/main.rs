mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, RateLimits},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let roster = trendscout_core::load_platforms(&config.platforms_path).with_context(|| {
        format!(
            "failed to load platform roster from {}",
            config.platforms_path.display()
        )
    })?;
    let aggregator = trendscout_trends::build_aggregator(&config, &roster);
    for plan in aggregator.plan() {
        tracing::info!(
            platform = %plan.platform,
            method = plan.method.map_or_else(|| "fallback".to_string(), |m| m.to_string()),
            "platform registered"
        );
    }

    let auth = AuthState::from_env(matches!(
        config.env,
        trendscout_core::Environment::Development
    ))?;
    let state = AppState {
        aggregator: Arc::new(aggregator),
        roster: Arc::new(roster),
    };
    let app = build_app(state, &auth, RateLimits::default());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "trendscout server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
