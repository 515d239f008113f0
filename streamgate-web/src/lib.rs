//! Streamgate Web - HTTP streaming server
//!
//! Exposes stored chat media and third-party download links as ordinary
//! HTTP resources with full byte-range support, so standard players and
//! browsers can seek and resume without re-downloading whole files.

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, build_router, run_server, run_server_with_sessions};
