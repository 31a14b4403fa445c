//! Entry point for the credit-risk scoring service.
//!
//! Loads the artifact bundle once, fails fast when any artifact is missing,
//! and serves `/predict`, `/health`, and `/` until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;

use credit_risk::artifacts::ArtifactBundle;
use credit_risk::features::FieldMap;
use credit_risk::logging;
use credit_risk::service::{AppState, router};

const ARTIFACT_DIR_ENV: &str = "CREDIT_ARTIFACT_DIR";
const FIELD_MAP_FILE: &str = "field_map.json";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let artifact_dir = std::env::var_os(ARTIFACT_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));
    let bundle = ArtifactBundle::load(&artifact_dir).map_err(|err| err.to_string())?;

    let field_map_path = artifact_dir.join(FIELD_MAP_FILE);
    let field_map = if field_map_path.is_file() {
        FieldMap::from_json_file(&field_map_path).map_err(|err| err.to_string())?
    } else {
        FieldMap::default()
    };
    tracing::info!(
        dir = %artifact_dir.display(),
        model = bundle.model.name(),
        features = bundle.feature_names.len(),
        "artifacts loaded"
    );

    let app = router(AppState::new(bundle, field_map));

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("Invalid HOST:PORT configuration: {err}"))?;
    tracing::info!(
        "credit-risk v{} listening on {addr}",
        env!("CARGO_PKG_VERSION")
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("Failed to bind {addr}: {err}"))?;
    axum::serve(listener, app)
        .await
        .map_err(|err| format!("Server error: {err}"))
}
