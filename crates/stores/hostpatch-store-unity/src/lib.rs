//! Unity serialized files as a container store.
//!
//! Payload entries are the `TextAsset` objects: the entry id is the object's
//! path id, the name is `m_Name` and the payload is `m_Script`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use assetfile::classes::display_class;
use assetfile::SerializedFile;
use hostpatch_core::error::CoreError;
use hostpatch_core::store::{Container, ContainerStore, EntryId, PayloadEntry};
use tracing::debug;

/// Opens `.assets` files.
pub struct UnityAssetStore;

impl ContainerStore for UnityAssetStore {
    type Container = UnityContainer;

    fn name(&self) -> &str {
        "unity-serialized-file"
    }

    fn load(&self, path: &Path) -> Result<UnityContainer, CoreError> {
        let data = fs::read(path).map_err(|e| CoreError::io("read", path, e))?;
        let file = SerializedFile::parse(data).map_err(|e| store_error(path, e))?;
        debug!(
            version = file.header().version,
            objects = file.objects().len(),
            unity = file.index().unity_version(),
            "parsed serialized file"
        );
        Ok(UnityContainer {
            path: path.to_path_buf(),
            file,
        })
    }
}

/// A parsed serialized file with staged `TextAsset` edits.
#[derive(Debug)]
pub struct UnityContainer {
    path: PathBuf,
    file: SerializedFile,
}

fn store_error(path: &Path, e: assetfile::Error) -> CoreError {
    CoreError::Store {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl Container for UnityContainer {
    fn list_entries(&self) -> Result<Vec<PayloadEntry>, CoreError> {
        let assets = self.file.text_assets().map_err(|e| store_error(&self.path, e))?;
        Ok(assets
            .into_iter()
            .map(|(path_id, asset)| PayloadEntry {
                id: path_id,
                name: asset.name().into_owned(),
                raw_bytes: asset.script,
            })
            .collect())
    }

    fn entry_payload(&self, id: EntryId) -> Result<Vec<u8>, CoreError> {
        let asset = self.file.text_asset(id).map_err(|e| store_error(&self.path, e))?;
        Ok(asset.script)
    }

    fn set_entry_payload(&mut self, id: EntryId, bytes: Vec<u8>) -> Result<(), CoreError> {
        self.file
            .set_text_asset_script(id, bytes)
            .map_err(|e| store_error(&self.path, e))
    }

    fn serialize(&self) -> Result<Vec<u8>, CoreError> {
        self.file.to_bytes().map_err(|e| store_error(&self.path, e))
    }

    fn kind_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for object in self.file.objects() {
            *counts.entry(object.class_id).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(class_id, count)| (display_class(class_id), count))
            .collect()
    }
}
