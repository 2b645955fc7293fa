//! Security primitives for Parley.
//!
//! Provides the login credential check, prompt sanitizing, and AWS Signature
//! Version 4 request signing used by the remote table and the signed
//! inference variant.
//!
//! # Main types
//!
//! - [`CredentialVerifier`]: Pluggable username/password check.
//! - [`StaticCredentials`]: The built-in, fixed allow-list.
//! - [`Sanitizer`]: Prompt length and control-character checks.
//! - [`SigV4Signer`]: Signs outbound `reqwest` requests.
//! - [`AwsCredentials`]: Caller credentials discovered from the environment.

/// Username/password verification.
pub mod credentials;
/// Prompt checks.
pub mod sanitizer;
/// AWS Signature Version 4 signing.
pub mod sigv4;

pub use credentials::{AuthOutcome, CredentialVerifier, StaticCredentials, LOGIN_FAILED_MESSAGE};
pub use sanitizer::{PromptRejection, Sanitizer};
pub use sigv4::{AwsCredentials, SigV4Signer};
