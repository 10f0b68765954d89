//! Stateful handle for one remote sandbox session.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, DecodeError, StreamProtocolError, TransportError, UsageError};
use crate::sse::{SseEvent, SseParser};
use crate::transport::Transport;
use crate::types::{ExecChunk, ExecResult, ReadResult, SessionInfo, SessionStats};

/// Lazy, finite, non-restartable sequence of exec chunks.
///
/// The stream owns the HTTP response body; dropping it before the terminal
/// chunk closes the connection immediately. The remote command may keep
/// running under the session's persistent shell.
pub type ExecChunkStream = Pin<Box<dyn Stream<Item = Result<ExecChunk, ClientError>> + Send>>;

/// Knobs shared by [`Session::exec`] and [`Session::exec_stream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecOptions {
    /// Remote command timeout in milliseconds. Exceeding it is the daemon's
    /// to report (non-zero exit and/or truncation); the client adds no
    /// watchdog of its own beyond the transport timeout.
    pub timeout_ms: u64,
    /// When true the daemon preserves control sequences and line endings
    /// instead of cooking the output.
    pub raw_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            raw_output: false,
        }
    }
}

/// Input for [`Session::upload`]: a local file or an in-memory buffer.
///
/// A buffer has no intrinsic name, so uploading one requires an explicit
/// filename; that is checked before any I/O happens.
#[derive(Clone, Debug)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<&str> for UploadSource {
    fn from(path: &str) -> Self {
        UploadSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        UploadSource::Bytes(data)
    }
}

#[derive(Serialize)]
struct ExecBody<'a> {
    cmd: &'a str,
    timeout_ms: u64,
    raw_output: bool,
}

#[derive(Serialize)]
struct WriteBody<'a> {
    path: &'a str,
    content_base64: String,
}

#[derive(Deserialize)]
struct ReadBody {
    path: String,
    content_base64: String,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct UploadBody {
    #[serde(default)]
    paths: Vec<String>,
}

/// A remote, stateful execution context: persistent shell plus filesystem,
/// identified by an opaque id the daemon assigned at creation.
///
/// Directory changes, environment variables, and background processes started
/// by one exec remain in effect for the next exec on the same session; the
/// client never resets shell state between calls. Concurrent operations on
/// one session race at the remote shell exactly as concurrent terminal input
/// would — nothing is queued client-side.
#[derive(Clone, Debug)]
pub struct Session {
    transport: Transport,
    id: String,
}

impl Session {
    pub(crate) fn new(transport: Transport, id: String) -> Self {
        Self { transport, id }
    }

    /// Opaque session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execute a shell command and wait for the complete result.
    pub async fn exec(&self, cmd: &str, options: ExecOptions) -> Result<ExecResult, ClientError> {
        tracing::debug!(session_id = %self.id, cmd, "exec");
        let path = format!("/v1/sessions/{}/exec", self.id);
        let body = ExecBody {
            cmd,
            timeout_ms: options.timeout_ms,
            raw_output: options.raw_output,
        };
        self.transport.post_json("exec", &path, &body).await
    }

    /// Execute a shell command, streaming output as it is produced.
    ///
    /// The returned stream yields intermediate chunks followed by exactly one
    /// terminal chunk (`done == true`), or fails with a stream-protocol error
    /// when the daemon sends an in-band `error` event.
    pub async fn exec_stream(
        &self,
        cmd: &str,
        options: ExecOptions,
    ) -> Result<ExecChunkStream, ClientError> {
        tracing::debug!(session_id = %self.id, cmd, "exec stream");
        let path = format!("/v1/sessions/{}/exec/stream", self.id);
        let body = ExecBody {
            cmd,
            timeout_ms: options.timeout_ms,
            raw_output: options.raw_output,
        };
        let response = self.transport.post_stream("exec_stream", &path, &body).await?;

        // The unfold state owns the response body, so dropping the returned
        // stream closes the connection even while a read is pending.
        let session_id = self.id.clone();
        let source = Some((response.bytes_stream(), SseParser::new()));
        let pending: VecDeque<Result<ExecChunk, ClientError>> = VecDeque::new();

        let stream = futures::stream::unfold(
            (source, pending, session_id, path),
            |(mut source, mut pending, session_id, path)| async move {
                loop {
                    if let Some(item) = pending.pop_front() {
                        let terminal = match &item {
                            Ok(chunk) => chunk.done,
                            Err(_) => true,
                        };
                        if terminal {
                            source = None;
                            pending.clear();
                        }
                        return Some((item, (source, pending, session_id, path)));
                    }

                    let Some((byte_stream, parser)) = source.as_mut() else {
                        return None;
                    };
                    match byte_stream.next().await {
                        Some(Ok(bytes)) => {
                            for event in parser.push(&bytes) {
                                match dispatch_exec_event(&session_id, &event) {
                                    ExecEvent::Chunk(chunk) | ExecEvent::Done(chunk) => {
                                        pending.push_back(Ok(chunk));
                                    }
                                    ExecEvent::Fail(error) => pending.push_back(Err(error)),
                                    ExecEvent::Skip => {}
                                }
                            }
                        }
                        Some(Err(error)) => {
                            pending.push_back(Err(ClientError::Transport(TransportError::new(
                                "exec_stream",
                                &path,
                                error.to_string(),
                            ))));
                        }
                        None => {
                            if let Some((_, parser)) = source.take() {
                                if let Some(event) = parser.finish() {
                                    match dispatch_exec_event(&session_id, &event) {
                                        ExecEvent::Chunk(chunk) | ExecEvent::Done(chunk) => {
                                            pending.push_back(Ok(chunk));
                                        }
                                        ExecEvent::Fail(error) => pending.push_back(Err(error)),
                                        ExecEvent::Skip => {}
                                    }
                                }
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    /// Write content to a file in the sandbox. Text goes in as UTF-8 bytes.
    ///
    /// The content travels base64-encoded inline in the JSON body, which
    /// suits modest files; use [`Session::upload`] for anything bulky.
    pub async fn write(&self, path: &str, content: impl AsRef<[u8]>) -> Result<(), ClientError> {
        let file_path = path;
        tracing::debug!(session_id = %self.id, path = file_path, "fs write");
        let path = format!("/v1/sessions/{}/fs/write", self.id);
        let body = WriteBody {
            path: file_path,
            content_base64: BASE64.encode(content.as_ref()),
        };
        self.transport.post_ack("write", &path, &body).await
    }

    /// Read a file from the sandbox, optionally capped at `max_bytes`.
    pub async fn read(
        &self,
        path: &str,
        max_bytes: Option<u64>,
    ) -> Result<ReadResult, ClientError> {
        let file_path = path;
        tracing::debug!(session_id = %self.id, path = file_path, ?max_bytes, "fs read");
        let path = format!("/v1/sessions/{}/fs/read", self.id);
        let mut query = vec![("path", file_path.to_string())];
        if let Some(max_bytes) = max_bytes {
            query.push(("max_bytes", max_bytes.to_string()));
        }
        let body: ReadBody = self.transport.get_json("read", &path, &query).await?;
        let content = BASE64.decode(body.content_base64.as_bytes()).map_err(|error| {
            ClientError::Decode(DecodeError::new(
                "read",
                format!("invalid base64 content for '{}': {}", body.path, error),
            ))
        })?;
        Ok(ReadResult {
            content,
            path: body.path,
            truncated: body.truncated,
        })
    }

    /// Upload a file as multipart form data into `dest_path`.
    ///
    /// `filename` overrides the name derived from a path source and is
    /// mandatory for a bytes source. Returns the resulting remote paths.
    pub async fn upload(
        &self,
        source: impl Into<UploadSource>,
        dest_path: &str,
        filename: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let (data, name) = match source.into() {
            UploadSource::Bytes(data) => {
                let Some(name) = filename else {
                    return Err(ClientError::Usage(UsageError::new(
                        "uploading from a byte buffer requires an explicit filename",
                    )));
                };
                (data, name.to_string())
            }
            UploadSource::Path(path) => {
                let name = match filename {
                    Some(name) => name.to_string(),
                    None => path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            ClientError::Usage(UsageError::new(format!(
                                "'{}' has no usable file name; pass one explicitly",
                                path.display()
                            )))
                        })?,
                };
                let data = tokio::fs::read(&path).await.map_err(|error| {
                    ClientError::Usage(UsageError::new(format!(
                        "cannot read upload source '{}': {}",
                        path.display(),
                        error
                    )))
                })?;
                (data, name)
            }
        };

        tracing::debug!(session_id = %self.id, dest_path, filename = %name, "fs upload");
        let path = format!("/v1/sessions/{}/fs/upload", self.id);
        let form = reqwest::multipart::Form::new()
            .text("path", dest_path.to_string())
            .part("file", reqwest::multipart::Part::bytes(data).file_name(name));
        let body: UploadBody = self.transport.post_multipart("upload", &path, form).await?;
        Ok(body.paths)
    }

    /// Fetch the current session record.
    pub async fn info(&self) -> Result<SessionInfo, ClientError> {
        let path = format!("/v1/sessions/{}", self.id);
        self.transport.get_json("info", &path, &[]).await
    }

    /// Fetch a point-in-time resource usage snapshot.
    pub async fn stats(&self) -> Result<SessionStats, ClientError> {
        let path = format!("/v1/sessions/{}/stats", self.id);
        self.transport.get_json("stats", &path, &[]).await
    }

    /// Destroy the session and release its remote resources.
    ///
    /// The daemon is authoritative about liveness; the client keeps no local
    /// destroyed flag, so calls after destroy fail with the server's API
    /// error rather than a client-side refusal.
    pub async fn destroy(&self) -> Result<(), ClientError> {
        tracing::debug!(session_id = %self.id, "destroy");
        let path = format!("/v1/sessions/{}", self.id);
        self.transport.delete("destroy", &path).await
    }
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    chunk: String,
    #[serde(default)]
    timestamp: u64,
}

#[derive(Deserialize)]
struct DonePayload {
    #[serde(default)]
    exit_code: i32,
    #[serde(default)]
    cwd: String,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

enum ExecEvent {
    Chunk(ExecChunk),
    Done(ExecChunk),
    Fail(ClientError),
    Skip,
}

/// Map one SSE frame to its effect on the chunk stream. Frames with no
/// `event:` field and unrecognized event types are skipped.
fn dispatch_exec_event(session_id: &str, event: &SseEvent) -> ExecEvent {
    let Some(kind) = event.event.as_deref() else {
        return ExecEvent::Skip;
    };
    match kind {
        "chunk" => match serde_json::from_str::<ChunkPayload>(&event.data) {
            Ok(payload) => ExecEvent::Chunk(ExecChunk::output(payload.chunk, payload.timestamp)),
            Err(error) => ExecEvent::Fail(ClientError::Stream(StreamProtocolError::new(
                session_id,
                format!("invalid chunk event payload: {error}"),
            ))),
        },
        "done" => match serde_json::from_str::<DonePayload>(&event.data) {
            Ok(payload) => ExecEvent::Done(ExecChunk::terminal(
                payload.exit_code,
                payload.cwd,
                payload.duration_ms,
            )),
            Err(error) => ExecEvent::Fail(ClientError::Stream(StreamProtocolError::new(
                session_id,
                format!("invalid done event payload: {error}"),
            ))),
        },
        "error" => {
            let message = serde_json::from_str::<ErrorPayload>(&event.data)
                .map(|payload| payload.error)
                .unwrap_or_else(|_| event.data.clone());
            ExecEvent::Fail(ClientError::Stream(StreamProtocolError::new(
                session_id, message,
            )))
        }
        _ => ExecEvent::Skip,
    }
}
