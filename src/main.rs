use adaptiquiz_backend::{build_router, config::init_config, middleware::cors::cors_layer, AppState};
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = init_config()?;

    let app_state = AppState::new(config)?;
    info!(
        model = %config.llm_model,
        endpoint = %config.llm_base_url,
        generation_timeout_secs = config.generation_timeout_secs,
        "Question generator configured"
    );

    {
        let sessions = app_state.sessions.clone();
        let ttl = config.session_ttl();
        let sweep_every = (ttl / 4).clamp(Duration::from_secs(30), Duration::from_secs(600));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(sweep_every).await;
                let removed = sessions.purge_idle(ttl).await;
                if removed > 0 {
                    tracing::debug!(removed, "Idle session sweep finished");
                }
            }
        });
    }

    let app = build_router(app_state, config.public_rps)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
