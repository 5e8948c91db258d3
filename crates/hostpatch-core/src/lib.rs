//! Endpoint rewrite engine for configuration documents embedded in binary
//! asset containers.
//!
//! Payloads come from a [`store::ContainerStore`]; each is decoded to text,
//! classified by root-element marker, and has its endpoint fields pointed at a
//! new host. The [`patch::Patcher`] wraps this in a backup-first, fail-closed,
//! atomically committed pass.

pub mod backup;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod inspect;
pub mod markup;
pub mod patch;
pub mod rewrite;
pub mod schema;
pub mod store;

pub use config::{PatchConfig, RestoreConfig};
pub use error::CoreError;
pub use patch::{restore_asset, PatchOutcome, PatchReport, PatchStats, Patcher};
pub use schema::Schema;
pub use store::{Container, ContainerStore, EntryId, PayloadEntry};
