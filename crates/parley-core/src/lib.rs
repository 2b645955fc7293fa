//! Core types and error definitions for the Parley chat client.
//!
//! This crate provides the foundational types shared across all Parley crates,
//! including error handling and the chat turn representation that is persisted
//! and exchanged with the browser.
//!
//! # Main types
//!
//! - [`ParleyError`]: Unified error enum for all Parley subsystems.
//! - [`ParleyResult`]: Convenience alias for `Result<T, ParleyError>`.
//! - [`Role`]: Author of a turn (user or assistant).
//! - [`ChatTurn`]: A single `{role, content}` entry of a transcript.

/// Error types shared by every crate in the workspace.
pub mod error;
/// Chat turn and role types.
pub mod message;

pub use error::{ParleyError, ParleyResult};
pub use message::{ChatTurn, Role};
