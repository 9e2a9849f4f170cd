//! ==============================================================================
//! mirror.rs - local json mirror of the cached status
//! ==============================================================================
//!
//! purpose:
//!     re-serves what the client already knows so a local dashboard can read
//!     it without talking to the device. never calls the device itself.
//!
//! routes:
//!     GET /api/status   StatusSnapshot as json
//!     GET /logs         cached log text
//!
//! ==============================================================================

use crate::client::DeviceStatusClient;
use crate::device::DeviceApi;
use crate::domain::StatusSnapshot;

use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn router<D: DeviceApi>(client: Arc<DeviceStatusClient<D>>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler::<D>))
        .route("/logs", get(logs_handler::<D>))
        .layer(CorsLayer::permissive())
        .with_state(client)
}

pub async fn serve<D: DeviceApi>(bind: &str, client: Arc<DeviceStatusClient<D>>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("[MIRROR] Status mirror live at http://{}", listener.local_addr()?);
    axum::serve(listener, router(client)).await?;
    Ok(())
}

async fn status_handler<D: DeviceApi>(
    State(client): State<Arc<DeviceStatusClient<D>>>,
) -> Json<StatusSnapshot> {
    Json(client.snapshot().await)
}

async fn logs_handler<D: DeviceApi>(State(client): State<Arc<DeviceStatusClient<D>>>) -> String {
    client.logs().await.as_str().to_string()
}
