use std::path::PathBuf;
use std::sync::Arc;

use catalog::config::{Cli, Config, default_config_dir, default_config_path};
use catalog::db::Database;
use catalog::handler::AppState;
use catalog::seed::{seed_sample_books, seed_school};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("catalog.svc starting");

    // With --config the database lives next to the config file, otherwise
    // both live under ~/.catalog/.
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let cfg = if config_path.exists() {
        Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = ?config_path, "failed to load config file");
            std::process::exit(1);
        })
    } else {
        tracing::warn!(path = ?config_path, "config file not found, using defaults");
        Config::default()
    };

    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));

    if cfg.app.seed_sample_data {
        if let Err(e) = seed_sample_books(&db).await {
            tracing::error!(error = %e, "failed to seed sample books");
            std::process::exit(1);
        }
        if let Err(e) = seed_school(&db).await {
            tracing::error!(error = %e, "failed to seed school data");
            std::process::exit(1);
        }
    }

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let app = catalog::router(AppState::new(db, &cfg));

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("catalog.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, shutting down");
        }
    }

    tracing::info!("catalog.svc going off");
}
