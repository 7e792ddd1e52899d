//! readmegen is a client for a README generation service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire payloads and endpoint templates.
//! - [`core`] owns runtime state: the authenticated HTTP client with its
//!   single-flight token refresh, the session flag, the SSE task protocol
//!   (listener, result store, fallback recovery), the section editor, and
//!   configuration and credential persistence.
//! - [`cli`] is the `readmegen` command-line front end.
//! - [`utils`] holds URL and logging helpers.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`], which
//! builds the tokio runtime and dispatches one command.

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
