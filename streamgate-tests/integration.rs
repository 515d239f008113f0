//! Integration tests for Streamgate
//!
//! Drives the full axum router against the simulated chat-storage backend,
//! verifying range semantics, access gating, and proxy passthrough exactly
//! as an HTTP client would observe them.

#[path = "integration/support.rs"]
mod support;

#[path = "integration/gateway_streaming.rs"]
mod gateway_streaming;

#[path = "integration/proxy_passthrough.rs"]
mod proxy_passthrough;
