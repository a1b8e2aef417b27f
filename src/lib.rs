// Library root — the coach engine, usable from the host add-in bridge and
// from integration tests. The CLI entry point is src/main.rs.

pub mod coach;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod logger;
pub mod store;

pub use coach::{Coach, CoachError};
pub use context::SessionContext;
