//! Async client for the Sandkasten sandbox daemon.
//!
//! A [`SandboxClient`] creates and looks up remote execution sessions over
//! HTTP; each [`Session`] wraps one sandbox id and exposes command execution
//! (plain or SSE-streamed), file transfer, resource stats, and teardown.

pub mod client;
pub mod config;
pub mod errors;
pub mod session;
pub mod sse;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

#[allow(unused_imports)]
pub use client::*;
#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use errors::*;
#[allow(unused_imports)]
pub use session::*;
#[allow(unused_imports)]
pub use transport::*;
#[allow(unused_imports)]
pub use types::*;
