//! HTTP API and worker wiring for doc2md.
//!
//! The router in [`app`] accepts uploads and serves task status; the worker
//! loops in [`worker`] drain the shared job queue. Both binaries build their
//! collaborators with the helpers in [`config_helpers`].

pub mod app;
pub mod cli;
pub mod config_helpers;
pub mod error;
pub mod handlers;
pub mod state;
pub mod tracing_setup;
pub mod worker;

pub use app::{build_router, RouterOptions};
