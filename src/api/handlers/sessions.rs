//! Session mutation handlers: metadata and container status.
//!
//! These endpoints are the business-logic side of the broadcast boundary:
//! every accepted mutation fans out on the matching session channel.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};

use crate::api::dto::{RenameSessionRequest, UpsertContainerRequest};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::{ContainerInfo, ContainerStatus};

/// `PUT /sessions/:id/metadata` — Rename a session.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on an empty title.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/metadata",
    tag = "Sessions",
    summary = "Rename a session",
    description = "Updates the session title and publishes a delta on the session's metadata channel.",
    params(
        ("id" = String, Path, description = "Session identifier"),
    ),
    request_body = RenameSessionRequest,
    responses(
        (status = 200, description = "Updated metadata", body = serde_json::Value),
        (status = 400, description = "Invalid title", body = ErrorResponse),
    )
)]
pub async fn rename_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(GatewayError::InvalidRequest("title must not be empty".to_string()));
    }

    let metadata = state.workspace.rename_session(&id, title.to_string()).await;
    Ok(Json(metadata))
}

/// `PUT /sessions/:id/containers/:container_id` — Upsert container status.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on an unknown status string.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/containers/{container_id}",
    tag = "Sessions",
    summary = "Upsert a container",
    description = "Records a container's image and status and publishes a delta on the session's container channel.",
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("container_id" = String, Path, description = "Container identifier"),
    ),
    request_body = UpsertContainerRequest,
    responses(
        (status = 200, description = "Recorded container", body = serde_json::Value),
        (status = 400, description = "Invalid status", body = ErrorResponse),
    )
)]
pub async fn upsert_container(
    State(state): State<AppState>,
    Path((id, container_id)): Path<(String, String)>,
    Json(req): Json<UpsertContainerRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = parse_status(&req.status)?;
    let container = ContainerInfo {
        container_id,
        image: req.image,
        status,
    };
    state.workspace.upsert_container(&id, container.clone()).await;
    Ok(Json(container))
}

/// Session routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}/metadata", put(rename_session))
        .route("/sessions/{id}/containers/{container_id}", put(upsert_container))
}

fn parse_status(status: &str) -> Result<ContainerStatus, GatewayError> {
    match status {
        "starting" => Ok(ContainerStatus::Starting),
        "running" => Ok(ContainerStatus::Running),
        "stopped" => Ok(ContainerStatus::Stopped),
        "failed" => Ok(ContainerStatus::Failed),
        other => Err(GatewayError::InvalidRequest(format!(
            "invalid container status: {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_accepts_known_states() {
        assert!(matches!(parse_status("running"), Ok(ContainerStatus::Running)));
        assert!(matches!(parse_status("failed"), Ok(ContainerStatus::Failed)));
    }

    #[test]
    fn parse_status_rejects_unknown_states() {
        assert!(parse_status("rebooting").is_err());
        assert!(parse_status("").is_err());
    }
}
