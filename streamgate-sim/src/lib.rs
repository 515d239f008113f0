//! Streamgate Sim - in-memory chat-storage backend
//!
//! Provides a deterministic, offline implementation of the backend session
//! contract for development mode and tests. Items are held in process
//! memory; content is generated arithmetically so tests can assert exact
//! byte ranges without fixture files.

mod session;
mod storage;

pub use session::{SimSessionConfig, SimulatedSession, simulated_session_pool};
pub use storage::{InMemoryChatStorage, StoredItem, patterned_bytes};
