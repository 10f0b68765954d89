//! Top-level client: session factory plus workspace administration.

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{SessionInfo, SessionListBody, WorkspaceInfo, WorkspaceListBody};

/// Options for [`SandboxClient::create_session`]. Unset fields are omitted
/// from the request body so the daemon applies its own defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateSessionOptions {
    /// Idle lifetime in seconds before the daemon reclaims the session.
    pub ttl_seconds: Option<u64>,
    /// Attach the session to an existing persistent workspace.
    pub workspace_id: Option<String>,
}

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreateSessionPayload {
    id: String,
}

/// Entry point for talking to a sandbox daemon.
///
/// Cloning shares the underlying connection pool, as do the [`Session`]
/// handles it creates. All methods are safe to call concurrently.
#[derive(Clone, Debug)]
pub struct SandboxClient {
    transport: Transport,
}

impl SandboxClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            transport: Transport::new(&config)?,
        })
    }

    /// Build a client from `SANDKASTEN_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a new sandbox session from a container image and return a
    /// bound handle for it.
    pub async fn create_session(
        &self,
        image: &str,
        options: CreateSessionOptions,
    ) -> Result<Session, ClientError> {
        tracing::debug!(image, workspace_id = ?options.workspace_id, "create session");
        let body = CreateSessionBody {
            image,
            ttl_seconds: options.ttl_seconds,
            workspace_id: options.workspace_id.as_deref(),
        };
        let payload: CreateSessionPayload = self
            .transport
            .post_json("create_session", "/v1/sessions", &body)
            .await?;
        Ok(Session::new(self.transport.clone(), payload.id))
    }

    /// Obtain a handle to an existing session, verifying it exists first.
    pub async fn get_session(&self, id: &str) -> Result<Session, ClientError> {
        let path = format!("/v1/sessions/{id}");
        let _: SessionInfo = self.transport.get_json("get_session", &path, &[]).await?;
        Ok(Session::new(self.transport.clone(), id.to_string()))
    }

    /// List all live sessions known to the daemon.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ClientError> {
        let body: SessionListBody = self
            .transport
            .get_json("list_sessions", "/v1/sessions", &[])
            .await?;
        Ok(body.into_sessions())
    }

    /// List persistent workspaces.
    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, ClientError> {
        let body: WorkspaceListBody = self
            .transport
            .get_json("list_workspaces", "/v1/workspaces", &[])
            .await?;
        Ok(body.workspaces)
    }

    /// Delete a persistent workspace and its stored data.
    pub async fn delete_workspace(&self, id: &str) -> Result<(), ClientError> {
        tracing::debug!(workspace_id = id, "delete workspace");
        let path = format!("/v1/workspaces/{id}");
        self.transport.delete("delete_workspace", &path).await
    }
}
