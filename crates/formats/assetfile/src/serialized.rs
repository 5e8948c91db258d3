use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::reader::{Header, ObjectIndex, ObjectInfo};
use crate::text_asset::{TextAsset, TEXT_ASSET_CLASS_ID};
use crate::writer;

/// High-level wrapper over a Unity serialized file.
///
/// The object table is parsed eagerly; object data is decoded on request.
/// Replacements are staged in memory and only applied by [`SerializedFile::to_bytes`],
/// so the original bytes stay available until the caller decides to write.
pub struct SerializedFile {
    data: Vec<u8>,
    index: ObjectIndex,
    replacements: BTreeMap<i64, Vec<u8>>,
}

impl SerializedFile {
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let index = ObjectIndex::parse(&data)?;
        Ok(Self {
            data,
            index,
            replacements: BTreeMap::new(),
        })
    }

    pub fn header(&self) -> &Header {
        self.index.header()
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn objects(&self) -> &[ObjectInfo] {
        self.index.objects()
    }

    /// Current data for an object, including staged replacements.
    pub fn object_data(&self, path_id: i64) -> Result<&[u8]> {
        if let Some(bytes) = self.replacements.get(&path_id) {
            return Ok(bytes);
        }
        let info = self.index.find(path_id).ok_or(Error::ObjectNotFound { path_id })?;
        Ok(self.index.object_data(&self.data, info))
    }

    /// Stage new data for an object.
    pub fn replace_object_data(&mut self, path_id: i64, bytes: Vec<u8>) -> Result<()> {
        if self.index.find(path_id).is_none() {
            return Err(Error::ObjectNotFound { path_id });
        }
        self.replacements.insert(path_id, bytes);
        Ok(())
    }

    /// Whether any object data has been replaced.
    pub fn is_modified(&self) -> bool {
        !self.replacements.is_empty()
    }

    /// Decode every `TextAsset` object, in table order.
    pub fn text_assets(&self) -> Result<Vec<(i64, TextAsset)>> {
        self.objects()
            .iter()
            .filter(|o| o.class_id == TEXT_ASSET_CLASS_ID)
            .map(|o| Ok((o.path_id, self.text_asset(o.path_id)?)))
            .collect()
    }

    /// Decode a single `TextAsset` by path id.
    pub fn text_asset(&self, path_id: i64) -> Result<TextAsset> {
        let info = self.index.find(path_id).ok_or(Error::ObjectNotFound { path_id })?;
        if info.class_id != TEXT_ASSET_CLASS_ID {
            return Err(Error::NotTextAsset {
                path_id,
                class_id: info.class_id,
            });
        }
        TextAsset::parse(self.object_data(path_id)?, self.header().endian)
    }

    /// Replace a `TextAsset`'s script payload, keeping its name and other fields.
    pub fn set_text_asset_script(&mut self, path_id: i64, script: Vec<u8>) -> Result<()> {
        let mut asset = self.text_asset(path_id)?;
        asset.script = script;
        let bytes = asset.to_bytes(self.header().endian)?;
        self.replace_object_data(path_id, bytes)
    }

    /// Serialize the file with all staged replacements applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::rebuild(&self.data, &self.index, &self.replacements)
    }
}

impl std::fmt::Debug for SerializedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedFile")
            .field("size", &self.data.len())
            .field("version", &self.header().version)
            .field("objects", &self.objects().len())
            .field("replacements", &self.replacements.len())
            .finish()
    }
}
