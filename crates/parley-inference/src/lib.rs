//! Client for the hosted inference endpoint.
//!
//! [`InferenceClient`] sends one `{"prompt": ...}` POST per user turn,
//! optionally SigV4-signed, and always yields reply text: the model's
//! `response`, [`FALLBACK_REPLY`], or an `Error: ...` line.

/// HTTP client and the [`InferenceBackend`] seam.
pub mod client;
/// `[inference]` configuration.
pub mod config;

pub use client::{InferenceBackend, InferenceClient, FALLBACK_REPLY};
pub use config::{InferenceConfig, SigningConfig};
