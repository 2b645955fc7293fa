//! Transcript persistence for Parley.
//!
//! A [`SessionStore`] maps a (user scope, [`SessionId`]) pair to a
//! [`Transcript`]. [`FileSessionStore`] keeps JSON files on disk,
//! [`DynamoTable`] keeps items in a DynamoDB table, and
//! [`TieredSessionStore`] layers the two as a cache-aside pair.
//! [`SessionPicker`] builds the "previous chats" list.

/// `[storage]` configuration.
pub mod config;
/// DynamoDB-backed remote tier.
pub mod dynamo;
/// Previous-chats list.
pub mod picker;
/// Session identifiers.
pub mod session_id;
/// Store trait and the file store.
pub mod store;
/// Local/remote cache-aside store.
pub mod tiered;
/// Ordered turns of one session.
pub mod transcript;

pub use config::{RemoteTableConfig, StorageConfig};
pub use dynamo::DynamoTable;
pub use picker::{PickerEntry, SessionPicker};
pub use session_id::SessionId;
pub use store::{FileSessionStore, SessionStore, StoreScope};
pub use tiered::TieredSessionStore;
pub use transcript::{Transcript, DEFAULT_LABEL_WIDTH};
