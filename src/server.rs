use axum::{extract::State as AxumState, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ApiResult;
use crate::{notes, todos, AppState};

const SERVER_NAME: &str = "notes-app";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assemble the full HTTP surface.
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let app = Router::new()
        .route("/health", get(handle_health))
        .merge(notes::routes())
        .merge(todos::routes())
        .layer(TraceLayer::new_for_http());

    let app = if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

// Health check endpoint
async fn handle_health(AxumState(state): AxumState<AppState>) -> ApiResult<Json<Value>> {
    let (notes, todos) = state.with_store(|store| store.counts())?;

    Ok(Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "notes": notes,
        "todos": todos,
    })))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", addr, e))?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
