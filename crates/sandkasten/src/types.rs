//! Result and record types for the sandbox protocol.

use serde::{Deserialize, Serialize};

/// Timestamp encoded as an ISO-8601 string.
pub type Timestamp = String;

/// Session lifecycle status as reported by the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Expired,
    Destroyed,
    /// A status value this client version does not know about.
    #[serde(other)]
    Unknown,
}

/// Record describing a sandbox session.
///
/// `container_id`, `last_activity`, and `workspace_id` are optional on the
/// wire; absence decodes to `None` rather than an empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    pub status: SessionStatus,
    pub cwd: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

/// Result of a non-streamed command execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i32,
    /// Working directory after the command ran. The remote shell is
    /// persistent, so this carries over to the next exec on the session.
    pub cwd: String,
    /// Combined stdout/stderr.
    pub output: String,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub duration_ms: u64,
}

/// One increment of a streamed command execution.
///
/// Intermediate chunks carry `output` and `timestamp` with `done == false`.
/// Exactly one terminal chunk per stream, always last, carries `done == true`
/// plus `exit_code`, `cwd`, and `duration_ms`, with empty output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecChunk {
    pub output: String,
    /// Unix timestamp in milliseconds (intermediate chunks only).
    pub timestamp: u64,
    pub done: bool,
    pub exit_code: i32,
    pub cwd: String,
    pub duration_ms: u64,
}

impl ExecChunk {
    pub(crate) fn output(output: String, timestamp: u64) -> Self {
        Self {
            output,
            timestamp,
            done: false,
            exit_code: 0,
            cwd: String::new(),
            duration_ms: 0,
        }
    }

    pub(crate) fn terminal(exit_code: i32, cwd: String, duration_ms: u64) -> Self {
        Self {
            output: String::new(),
            timestamp: 0,
            done: true,
            exit_code,
            cwd,
            duration_ms,
        }
    }
}

/// Result of reading a file from the sandbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadResult {
    pub content: Vec<u8>,
    /// The path the daemon actually read.
    pub path: String,
    /// True when `max_bytes` cut the file short.
    pub truncated: bool,
}

/// Point-in-time resource usage snapshot for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub memory_bytes: u64,
    /// Memory limit in bytes; 0 means no limit was reported.
    #[serde(default)]
    pub memory_limit: u64,
    pub cpu_usage_usec: u64,
}

/// A persistent workspace, reattachable by later sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: String,
}

/// The daemon returns session lists in two shapes: a bare array or an object
/// wrapping a `sessions` array. Both are valid per the server contract; this
/// two-case decode is deliberately local to the list endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SessionListBody {
    Wrapped { sessions: Vec<SessionInfo> },
    Bare(Vec<SessionInfo>),
}

impl SessionListBody {
    pub(crate) fn into_sessions(self) -> Vec<SessionInfo> {
        match self {
            SessionListBody::Wrapped { sessions } => sessions,
            SessionListBody::Bare(sessions) => sessions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceListBody {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceInfo>,
}
