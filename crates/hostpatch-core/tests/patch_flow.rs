//! Orchestrator flows against a JSON-backed test store.

use std::fs;
use std::path::{Path, PathBuf};

use hostpatch_core::backup::BackupOutcome;
use hostpatch_core::decode::decode_payload;
use hostpatch_core::inspect::inspect;
use hostpatch_core::{
    restore_asset, Container, ContainerStore, CoreError, EntryId, PatchConfig, PatchOutcome, Patcher,
    PayloadEntry, RestoreConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: EntryId,
    name: String,
    bytes: Vec<u8>,
}

struct JsonStore;

struct JsonContainer {
    path: PathBuf,
    entries: Vec<StoredEntry>,
}

fn store_error(path: &Path, message: impl ToString) -> CoreError {
    CoreError::Store {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

impl ContainerStore for JsonStore {
    type Container = JsonContainer;

    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, path: &Path) -> Result<JsonContainer, CoreError> {
        let bytes = fs::read(path).map_err(|e| store_error(path, e))?;
        let entries = serde_json::from_slice(&bytes).map_err(|e| store_error(path, e))?;
        Ok(JsonContainer {
            path: path.to_path_buf(),
            entries,
        })
    }
}

impl Container for JsonContainer {
    fn list_entries(&self) -> Result<Vec<PayloadEntry>, CoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| PayloadEntry {
                id: e.id,
                name: e.name.clone(),
                raw_bytes: e.bytes.clone(),
            })
            .collect())
    }

    fn entry_payload(&self, id: EntryId) -> Result<Vec<u8>, CoreError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.bytes.clone())
            .ok_or_else(|| store_error(&self.path, format!("no entry {id}")))
    }

    fn set_entry_payload(&mut self, id: EntryId, bytes: Vec<u8>) -> Result<(), CoreError> {
        let path = self.path.clone();
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| store_error(&path, format!("no entry {id}")))?;
        entry.bytes = bytes;
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(&self.entries).map_err(|e| store_error(&self.path, e))
    }

    fn kind_counts(&self) -> Vec<(String, usize)> {
        vec![("TextAsset".to_string(), self.entries.len())]
    }
}

const BASE_DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BaseConfiguration>
  <ServerAddress>old.example.com:9100</ServerAddress>
  <AccountServiceAddress>https://old.example.com/AccountService</AccountServiceAddress>
</BaseConfiguration>"#;

const LAUNCHER_DOC: &str = r#"<LauncherConfig>
  <PatchesUrl>https://cdn.old.com:8443/p/live</PatchesUrl>
</LauncherConfig>"#;

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn entry(id: EntryId, name: &str, bytes: Vec<u8>) -> StoredEntry {
    StoredEntry {
        id,
        name: name.to_string(),
        bytes,
    }
}

fn write_container(dir: &Path, entries: &[StoredEntry]) -> PathBuf {
    let path = dir.join("Data").join("resources.assets");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, serde_json::to_vec(entries).unwrap()).unwrap();
    path
}

fn read_entries(path: &Path) -> Vec<StoredEntry> {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn standard_container(dir: &Path) -> PathBuf {
    write_container(
        dir,
        &[
            entry(1, "readme", b"nothing to see".to_vec()),
            entry(2, "clientBaseConfig", BASE_DOC.as_bytes().to_vec()),
            entry(3, "LauncherConfig", utf16le(LAUNCHER_DOC)),
        ],
    )
}

#[test]
fn patch_rewrites_both_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();

    let report = Patcher::new(JsonStore)
        .patch(&PatchConfig::new(&asset, "10.0.0.5"))
        .unwrap();

    assert_eq!(report.outcome, PatchOutcome::Success);
    assert!(report.stats.base_config_patched);
    assert!(report.stats.launcher_config_patched);
    assert_eq!(report.stats.total_changed_fields, 3);
    assert_eq!(report.entries_scanned, 3);
    assert_eq!(report.backup, BackupOutcome::Created);
    assert_eq!(report.patched_entries.len(), 2);
    assert_eq!(fs::read(&report.backup_path).unwrap(), original);

    let entries = read_entries(&asset);
    assert_eq!(entries[0].bytes, b"nothing to see");
    let base = decode_payload(&entries[1].bytes).unwrap();
    assert!(base.text.contains("<ServerAddress>10.0.0.5:9100</ServerAddress>"));
    assert!(base.text.contains("https://10.0.0.5/AccountService"));
    let launcher = decode_payload(&entries[2].bytes).unwrap();
    assert_eq!(entries[2].bytes, utf16le(&launcher.text));
    assert!(launcher.text.contains("https://10.0.0.5:8443/p/live"));
}

#[test]
fn no_recognized_entries_is_partial_warning() {
    let dir = tempfile::tempdir().unwrap();
    let asset = write_container(dir.path(), &[entry(7, "Settings", b"<Settings/>".to_vec())]);
    let original = fs::read(&asset).unwrap();

    let report = Patcher::new(JsonStore)
        .patch(&PatchConfig::new(&asset, "10.0.0.5"))
        .unwrap();

    assert_eq!(report.outcome, PatchOutcome::PartialWarning);
    assert!(!report.stats.base_config_patched);
    assert!(!report.stats.launcher_config_patched);
    assert_eq!(report.stats.total_changed_fields, 0);
    assert_eq!(fs::read(&asset).unwrap(), original);
}

#[test]
fn malformed_document_aborts_before_write() {
    let dir = tempfile::tempdir().unwrap();
    let asset = write_container(
        dir.path(),
        &[
            entry(1, "LauncherConfig", LAUNCHER_DOC.as_bytes().to_vec()),
            entry(2, "broken", b"<BaseConfiguration><ServerAddress>x:1</BaseConfiguration>".to_vec()),
        ],
    );
    let original = fs::read(&asset).unwrap();

    let err = Patcher::new(JsonStore)
        .patch(&PatchConfig::new(&asset, "10.0.0.5"))
        .unwrap_err();

    match err {
        CoreError::Markup { entry, schema, .. } => {
            assert_eq!(entry, "broken");
            assert_eq!(schema, "BaseConfiguration");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(&asset).unwrap(), original);
}

#[test]
fn existing_backup_is_kept_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();
    let patcher = Patcher::new(JsonStore);

    patcher.patch(&PatchConfig::new(&asset, "10.0.0.5")).unwrap();
    let once = fs::read(&asset).unwrap();

    let report = patcher.patch(&PatchConfig::new(&asset, "10.0.0.6")).unwrap();
    assert_eq!(report.backup, BackupOutcome::Reused);
    assert_eq!(fs::read(&report.backup_path).unwrap(), original);

    let forced = PatchConfig::new(&asset, "10.0.0.6").with_force_backup(true);
    let twice = fs::read(&asset).unwrap();
    let report = patcher.patch(&forced).unwrap();
    assert_eq!(report.backup, BackupOutcome::Created);
    assert_eq!(fs::read(&report.backup_path).unwrap(), twice);
    assert_ne!(once, twice);
}

#[test]
fn directory_in_place_of_backup_leaves_asset_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();
    let config = PatchConfig::new(&asset, "10.0.0.5");
    fs::create_dir(&config.backup).unwrap();

    let err = Patcher::new(JsonStore).patch(&config).unwrap_err();
    assert!(matches!(err, CoreError::BackupNotAFile { .. }), "{err}");
    assert!(err.is_validation());
    assert_eq!(fs::read(&asset).unwrap(), original);

    let err = Patcher::new(JsonStore)
        .patch(&config.clone().with_force_backup(true))
        .unwrap_err();
    assert!(matches!(err, CoreError::BackupNotAFile { .. }), "{err}");
    assert_eq!(fs::read(&asset).unwrap(), original);
}

#[test]
fn repatching_same_host_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let patcher = Patcher::new(JsonStore);

    patcher.patch(&PatchConfig::new(&asset, "10.0.0.5")).unwrap();
    let patched = fs::read(&asset).unwrap();
    let report = patcher.patch(&PatchConfig::new(&asset, "10.0.0.5")).unwrap();

    assert_eq!(report.outcome, PatchOutcome::PartialWarning);
    assert_eq!(report.stats.total_changed_fields, 0);
    assert_eq!(fs::read(&asset).unwrap(), patched);
}

#[test]
fn invalid_host_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let config = PatchConfig::new(&asset, "10.0.0.5:80");

    let err = Patcher::new(JsonStore).patch(&config).unwrap_err();
    assert!(matches!(err, CoreError::InvalidHost { .. }));
    assert!(err.is_validation());
    assert!(!config.backup.exists());
}

#[test]
fn missing_asset_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PatchConfig::new(dir.path().join("nope.assets"), "h");
    let err = Patcher::new(JsonStore).patch(&config).unwrap_err();
    assert!(matches!(err, CoreError::AssetNotFound { .. }));
    assert!(!config.backup.exists());
}

#[test]
fn unreadable_container_is_a_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("garbage.assets");
    fs::write(&asset, b"not json").unwrap();
    let err = Patcher::new(JsonStore)
        .patch(&PatchConfig::new(&asset, "h"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Store { .. }));
    assert!(!err.is_validation());
    assert_eq!(fs::read(&asset).unwrap(), b"not json");
}

#[test]
fn restore_without_backup_fails() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();

    let err = restore_asset(&RestoreConfig::new(&asset)).unwrap_err();
    assert!(matches!(err, CoreError::BackupNotFound { .. }));
    assert_eq!(fs::read(&asset).unwrap(), original);
}

#[test]
fn restore_undoes_patch() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();
    let backup = dir.path().join("backups").join("resources.assets.orig");

    let config = PatchConfig::new(&asset, "10.0.0.5").with_backup(Some(backup.clone()));
    Patcher::new(JsonStore).patch(&config).unwrap();
    assert_ne!(fs::read(&asset).unwrap(), original);

    restore_asset(&RestoreConfig::new(&asset).with_backup(Some(backup))).unwrap();
    assert_eq!(fs::read(&asset).unwrap(), original);
}

#[test]
fn inspect_reports_hits_and_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let asset = standard_container(dir.path());
    let original = fs::read(&asset).unwrap();
    let dump = dir.path().join("dump");

    let needles = vec!["cdn.old.com".to_string(), "see".to_string()];
    let report = inspect(&JsonStore, &asset, &needles, Some(&dump)).unwrap();

    assert_eq!(report.entries_scanned, 3);
    assert_eq!(report.kind_counts[0].kind, "TextAsset");
    assert_eq!(report.kind_counts[0].count, 3);
    let names: Vec<&str> = report.hits.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, ["readme", "clientBaseConfig", "LauncherConfig"]);
    assert_eq!(report.hits[0].needles, ["see"]);
    assert!(report.hits[0].schema.is_none());
    // UTF-16 payloads do not contain the UTF-8 needle bytes.
    assert!(report.hits[2].needles.is_empty());
    assert_eq!(report.hits[2].schema, Some(hostpatch_core::Schema::LauncherConfig));

    let dumped = dump.join("resources.assets__clientBaseConfig__2.bin");
    assert_eq!(fs::read(dumped).unwrap(), BASE_DOC.as_bytes());
    assert_eq!(fs::read(&asset).unwrap(), original);
}
