use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use conversa_api::config::AppConfig;
use conversa_api::database::Database;
use conversa_api::{routes, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "conversa-api",
    version,
    about = "CRUD REST backend for profiles, conversations, messages, documents, tags and activity logs"
)]
struct Args {
    /// Port to bind, overriding the PORT environment variable
    #[arg(short, long)]
    port: Option<u16>,

    /// Environment file loaded before configuration is read
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _ = dotenvy::from_filename(&args.env_file);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Configuration problems are fatal before anything binds
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    tracing::info!("starting conversa-api in {:?} mode", config.environment);

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("database connection failed: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = db.ensure_schema().await {
        eprintln!("schema bootstrap failed: {err}");
        std::process::exit(1);
    }

    let state = AppState::new(config, db.clone());
    let app = routes::app(state);

    let port = args
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(3000);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("conversa-api listening on http://{}", bind_addr);

    // connect info feeds the rate limiter's per-client fallback key
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    db.close().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
