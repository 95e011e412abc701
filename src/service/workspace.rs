//! Workspace service: the in-memory entities behind the built-in channels.
//!
//! Every mutation follows the same pattern: update the store, publish the
//! change through the topic hub, log. The engine never calls these
//! methods on its own — REST handlers and the message handler do, which
//! makes this module the business-logic side of the `publish` boundary.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::channel::{PublishKind, TopicHub};

/// Live metadata of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Display title.
    pub title: String,
    /// Number of users currently viewing the session.
    pub participant_count: u32,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            participant_count: 0,
        }
    }
}

/// Lifecycle state of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    /// Container is being provisioned.
    Starting,
    /// Container is serving.
    Running,
    /// Container exited cleanly.
    Stopped,
    /// Container exited with an error.
    Failed,
}

/// One container attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// Stable container identifier.
    pub container_id: String,
    /// Image the container runs.
    pub image: String,
    /// Current lifecycle state.
    pub status: ContainerStatus,
}

/// One member of a project roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    /// Stable user identifier.
    pub user_id: String,
    /// Human-readable name.
    pub display_name: String,
}

#[derive(Debug, Default)]
struct SessionRecord {
    metadata: SessionMetadata,
    /// Keyed by container id; ordered for stable snapshots.
    containers: BTreeMap<String, ContainerInfo>,
    /// User ids currently typing.
    typing: HashSet<String>,
}

/// In-memory workspace state plus the hub it publishes through.
#[derive(Debug)]
pub struct WorkspaceService {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    rosters: RwLock<HashMap<String, Vec<ProjectMember>>>,
    hub: TopicHub,
}

/// Concrete channel string for a session's metadata.
#[must_use]
pub fn metadata_topic(session_id: &str) -> String {
    format!("session/{session_id}/metadata")
}

/// Concrete channel string for a session's container list.
#[must_use]
pub fn containers_topic(session_id: &str) -> String {
    format!("session/{session_id}/containers")
}

/// Concrete channel string for a project's roster.
#[must_use]
pub fn roster_topic(project_id: &str) -> String {
    format!("project/{project_id}/roster")
}

/// Concrete channel string for a session's typing indicators.
#[must_use]
pub fn typing_topic(session_id: &str) -> String {
    format!("session/{session_id}/typing")
}

impl WorkspaceService {
    /// Creates an empty workspace publishing through `hub`.
    #[must_use]
    pub fn new(hub: TopicHub) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            rosters: RwLock::new(HashMap::new()),
            hub,
        }
    }

    /// Returns a session's metadata; absent sessions read as the default.
    pub async fn session_metadata(&self, session_id: &str) -> SessionMetadata {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|record| record.metadata.clone())
            .unwrap_or_default()
    }

    /// Renames a session and publishes the updated metadata.
    pub async fn rename_session(&self, session_id: &str, title: String) -> SessionMetadata {
        let metadata = {
            let mut sessions = self.sessions.write().await;
            let record = sessions.entry(session_id.to_string()).or_default();
            record.metadata.title = title;
            record.metadata.clone()
        };
        self.publish_metadata(session_id, &metadata).await;
        tracing::info!(session = session_id, title = %metadata.title, "session renamed");
        metadata
    }

    /// Adjusts a session's participant count (join = +1, leave = -1) and
    /// publishes the updated metadata.
    pub async fn adjust_participants(&self, session_id: &str, delta: i64) -> SessionMetadata {
        let metadata = {
            let mut sessions = self.sessions.write().await;
            let record = sessions.entry(session_id.to_string()).or_default();
            let current = i64::from(record.metadata.participant_count);
            record.metadata.participant_count =
                u32::try_from(current.saturating_add(delta).max(0)).unwrap_or(u32::MAX);
            record.metadata.clone()
        };
        self.publish_metadata(session_id, &metadata).await;
        metadata
    }

    /// Returns a session's containers; absent sessions read as empty.
    pub async fn containers(&self, session_id: &str) -> Vec<ContainerInfo> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|record| record.containers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Inserts or updates one container and publishes the changed entry.
    pub async fn upsert_container(&self, session_id: &str, container: ContainerInfo) {
        {
            let mut sessions = self.sessions.write().await;
            let record = sessions.entry(session_id.to_string()).or_default();
            record
                .containers
                .insert(container.container_id.clone(), container.clone());
        }
        let payload = serde_json::to_value(&container).unwrap_or_default();
        self.hub
            .publish(&containers_topic(session_id), PublishKind::Delta, payload)
            .await;
        tracing::info!(
            session = session_id,
            container = %container.container_id,
            status = ?container.status,
            "container updated"
        );
    }

    /// Returns a project's roster; unknown projects read as empty.
    pub async fn roster(&self, project_id: &str) -> Vec<ProjectMember> {
        self.rosters
            .read()
            .await
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if the user may read the project's channels: members
    /// always may, and a project with no roster yet is open to everyone.
    pub async fn is_project_member(&self, project_id: &str, user_id: &str) -> bool {
        let rosters = self.rosters.read().await;
        match rosters.get(project_id) {
            Some(members) => members.iter().any(|m| m.user_id == user_id),
            None => true,
        }
    }

    /// Replaces a project's roster and publishes the new member list.
    pub async fn set_roster(&self, project_id: &str, members: Vec<ProjectMember>) {
        {
            let mut rosters = self.rosters.write().await;
            rosters.insert(project_id.to_string(), members.clone());
        }
        let payload = serde_json::to_value(&members).unwrap_or_default();
        self.hub
            .publish(&roster_topic(project_id), PublishKind::Delta, payload)
            .await;
        tracing::info!(project = project_id, members = members.len(), "roster replaced");
    }

    /// Returns the user ids currently typing in a session, sorted.
    pub async fn typing_users(&self, session_id: &str) -> Vec<String> {
        let mut users: Vec<String> = self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|record| record.typing.iter().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }

    /// Records a typing state change and publishes it as a discrete event.
    ///
    /// Redundant changes (already typing / already idle) publish nothing.
    pub async fn set_typing(&self, session_id: &str, user_id: &str, is_typing: bool) {
        let changed = {
            let mut sessions = self.sessions.write().await;
            let record = sessions.entry(session_id.to_string()).or_default();
            if is_typing {
                record.typing.insert(user_id.to_string())
            } else {
                record.typing.remove(user_id)
            }
        };
        if !changed {
            return;
        }
        let payload = serde_json::json!({
            "userId": user_id,
            "isTyping": is_typing,
        });
        self.hub
            .publish(&typing_topic(session_id), PublishKind::Event, payload)
            .await;
    }

    async fn publish_metadata(&self, session_id: &str, metadata: &SessionMetadata) {
        let payload = serde_json::to_value(metadata).unwrap_or_default();
        self.hub
            .publish(&metadata_topic(session_id), PublishKind::Delta, payload)
            .await;
    }
}
