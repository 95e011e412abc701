//! Workspace-related DTOs for the mutation endpoints.

use serde::Deserialize;
use utoipa::ToSchema;

/// Request body for `PUT /sessions/:id/metadata`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameSessionRequest {
    /// New session title (must be non-empty).
    pub title: String,
}

/// Request body for `PUT /sessions/:id/containers/:container_id`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertContainerRequest {
    /// Image the container runs.
    pub image: String,
    /// Lifecycle state: `starting`, `running`, `stopped`, or `failed`.
    pub status: String,
}

/// One roster entry in `PUT /projects/:id/roster`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberDto {
    /// Stable user identifier.
    pub user_id: String,
    /// Human-readable name.
    pub display_name: String,
}

/// Request body for `PUT /projects/:id/roster`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceRosterRequest {
    /// Full replacement member list.
    pub members: Vec<MemberDto>,
}
