use std::path::Path;

use crate::error::CoreError;

/// Store-assigned identifier of a payload entry, stable for one loaded container.
pub type EntryId = i64;

/// An opaque named blob held by a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub id: EntryId,
    pub name: String,
    pub raw_bytes: Vec<u8>,
}

/// A loaded container whose payload entries can be read and replaced.
///
/// Replacements are staged in memory; nothing touches disk until the caller
/// writes out [`Container::serialize`].
pub trait Container {
    /// Every payload entry, in container order.
    fn list_entries(&self) -> Result<Vec<PayloadEntry>, CoreError>;

    /// Current payload of one entry, including staged replacements.
    fn entry_payload(&self, id: EntryId) -> Result<Vec<u8>, CoreError>;

    /// Stage a new payload for an entry.
    fn set_entry_payload(&mut self, id: EntryId, bytes: Vec<u8>) -> Result<(), CoreError>;

    /// The whole container as bytes, with staged replacements applied.
    fn serialize(&self) -> Result<Vec<u8>, CoreError>;

    /// Object counts per kind, for diagnostics.
    fn kind_counts(&self) -> Vec<(String, usize)> {
        Vec::new()
    }
}

/// Opens containers of one format.
pub trait ContainerStore {
    type Container: Container;

    /// Human-readable format name.
    fn name(&self) -> &str;

    fn load(&self, path: &Path) -> Result<Self::Container, CoreError>;
}
