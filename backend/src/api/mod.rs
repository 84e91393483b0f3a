//! HTTP API module.
//!
//! This module provides the HTTP server, API types and log streaming for
//! the Tabshift backend.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState, UploadForm};
pub use types::*;
