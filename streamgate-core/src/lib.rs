//! Streamgate Core - chat-storage streaming gateway
//!
//! This crate provides the building blocks for serving media held in a
//! remote chat-based object store over plain HTTP: range parsing, chunk
//! planning, session pooling, metadata resolution, chunk streaming, and a
//! generic upstream passthrough.

pub mod backend;
pub mod config;
pub mod gateway;
pub mod mode;
pub mod token;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use backend::{BackendError, ChatSession, MediaKind, ResolvedFile};
pub use config::StreamgateConfig;
pub use gateway::{Gateway, GatewayError, GatewayResult, MediaLocator};
pub use mode::RuntimeMode;
