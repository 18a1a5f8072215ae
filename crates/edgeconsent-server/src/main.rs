//! Edge Consent — single-binary host for the consent extension.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use edgeconsent_core::constants::{EXTENSION_NAME, EXTENSION_VERSION};
use edgeconsent_core::ConsentConfig;
use edgeconsent_store::SqliteStore;
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("EDGECONSENT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        match command.as_str() {
            "--version" | "version" => {
                println!("{} {}", EXTENSION_NAME, EXTENSION_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("Edge Consent — consent preference host");
                println!();
                println!("Usage: edgeconsent [command]");
                println!();
                println!("Commands:");
                println!("  (none)      Start the server");
                println!("  version     Print the extension version");
                println!("  help        Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}. Use 'edgeconsent help' for usage.", other);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = ConsentConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = SqliteStore::open(&config.db_path, &config.datastore_name)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, Arc::new(store)));
    let app = routes::build_router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Edge Consent server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.hub.shutdown().await;
    Ok(())
}
