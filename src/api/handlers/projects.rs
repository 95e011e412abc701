//! Project mutation handlers: roster replacement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};

use crate::api::dto::ReplaceRosterRequest;
use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::service::ProjectMember;

/// `PUT /projects/:id/roster` — Replace the project roster.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when a member entry has an
/// empty user id.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}/roster",
    tag = "Projects",
    summary = "Replace a project roster",
    description = "Replaces the member list and publishes a delta on the project's roster channel. Subsequent roster-channel subscribes are restricted to the new members.",
    params(
        ("id" = String, Path, description = "Project identifier"),
    ),
    request_body = ReplaceRosterRequest,
    responses(
        (status = 204, description = "Roster replaced"),
        (status = 400, description = "Invalid member entry"),
    )
)]
pub async fn replace_roster(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceRosterRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut members = Vec::with_capacity(req.members.len());
    for member in req.members {
        if member.user_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "member user_id must not be empty".to_string(),
            ));
        }
        members.push(ProjectMember {
            user_id: member.user_id,
            display_name: member.display_name,
        });
    }

    state.workspace.set_roster(&id, members).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Project routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/projects/{id}/roster", put(replace_roster))
}
