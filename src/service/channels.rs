//! The built-in channel families and their hook implementations.
//!
//! Each family's `snapshot` reads from [`WorkspaceService`]; the roster
//! family is the one with a real `authorize` policy. Declaration order in
//! [`build_registry`] is routing order.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::workspace::WorkspaceService;
use crate::channel::{ChannelDefinition, ChannelHandlers, ChannelRegistry, ChannelRequest, ConnectionId};
use crate::auth::AuthContext;
use crate::ws::dispatch::MessageHandler;
use crate::ws::messages::ClientCommand;

/// `session/{session_id}/metadata` — title and participant count.
#[derive(Debug)]
pub struct SessionMetadataChannel {
    workspace: Arc<WorkspaceService>,
}

#[async_trait]
impl ChannelHandlers for SessionMetadataChannel {
    async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<Value> {
        let metadata = self
            .workspace
            .session_metadata(request.param("session_id"))
            .await;
        Ok(serde_json::to_value(metadata)?)
    }
}

/// `session/{session_id}/containers` — the session's container list.
#[derive(Debug)]
pub struct SessionContainersChannel {
    workspace: Arc<WorkspaceService>,
}

#[async_trait]
impl ChannelHandlers for SessionContainersChannel {
    async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<Value> {
        let containers = self.workspace.containers(request.param("session_id")).await;
        Ok(serde_json::to_value(containers)?)
    }
}

/// `project/{project_id}/roster` — member list, readable by members only.
#[derive(Debug)]
pub struct ProjectRosterChannel {
    workspace: Arc<WorkspaceService>,
}

#[async_trait]
impl ChannelHandlers for ProjectRosterChannel {
    async fn authorize(&self, request: &ChannelRequest) -> bool {
        self.workspace
            .is_project_member(request.param("project_id"), &request.auth.user_id)
            .await
    }

    async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<Value> {
        let roster = self.workspace.roster(request.param("project_id")).await;
        Ok(serde_json::to_value(roster)?)
    }
}

/// `session/{session_id}/typing` — who is composing right now.
#[derive(Debug)]
pub struct SessionTypingChannel {
    workspace: Arc<WorkspaceService>,
}

#[async_trait]
impl ChannelHandlers for SessionTypingChannel {
    async fn snapshot(&self, request: &ChannelRequest) -> anyhow::Result<Value> {
        let users = self
            .workspace
            .typing_users(request.param("session_id"))
            .await;
        Ok(serde_json::to_value(users)?)
    }
}

/// Builds the registry of built-in channel families.
#[must_use]
pub fn build_registry(workspace: &Arc<WorkspaceService>) -> ChannelRegistry {
    ChannelRegistry::builder()
        .channel(
            ChannelDefinition::new("session_metadata", "session/{session_id}/metadata")
                .with_delta()
                .with_default_snapshot(serde_json::json!({
                    "title": "Untitled",
                    "participantCount": 0,
                })),
            Arc::new(SessionMetadataChannel {
                workspace: Arc::clone(workspace),
            }),
        )
        .channel(
            ChannelDefinition::new("session_containers", "session/{session_id}/containers")
                .with_delta()
                .with_default_snapshot(serde_json::json!([])),
            Arc::new(SessionContainersChannel {
                workspace: Arc::clone(workspace),
            }),
        )
        .channel(
            ChannelDefinition::new("project_roster", "project/{project_id}/roster")
                .with_delta()
                .with_default_snapshot(serde_json::json!([])),
            Arc::new(ProjectRosterChannel {
                workspace: Arc::clone(workspace),
            }),
        )
        .channel(
            ChannelDefinition::new("session_typing", "session/{session_id}/typing")
                .with_event()
                .with_default_snapshot(serde_json::json!([])),
            Arc::new(SessionTypingChannel {
                workspace: Arc::clone(workspace),
            }),
        )
        .build()
}

/// Routes `message` frames into workspace mutations.
#[async_trait]
impl MessageHandler for WorkspaceService {
    async fn on_message(
        &self,
        auth: &AuthContext,
        _connection: ConnectionId,
        command: ClientCommand,
    ) -> anyhow::Result<()> {
        match command {
            ClientCommand::Typing {
                session_id,
                is_typing,
            } => {
                self.set_typing(&session_id, &auth.user_id, is_typing).await;
            }
            ClientCommand::SessionJoin { session_id } => {
                self.adjust_participants(&session_id, 1).await;
            }
            ClientCommand::SessionLeave { session_id } => {
                self.adjust_participants(&session_id, -1).await;
            }
        }
        Ok(())
    }
}
