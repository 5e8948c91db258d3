//! The transactional patch pass: validate, back up, rewrite, commit.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backup::{ensure_backup, restore, write_atomic, BackupOutcome};
use crate::config::{PatchConfig, RestoreConfig};
use crate::decode::{decode_payload, encode_text, TextEncoding};
use crate::endpoint::validate_host;
use crate::error::CoreError;
use crate::rewrite::rewrite_document;
use crate::schema::{classify, Schema, RECOGNIZED};
use crate::store::{Container, ContainerStore, EntryId};

/// Aggregate result of one pass over a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchStats {
    pub base_config_patched: bool,
    pub launcher_config_patched: bool,
    pub total_changed_fields: usize,
}

impl PatchStats {
    fn record(&mut self, schema: Schema, changed_fields: usize) {
        match schema {
            Schema::BaseConfiguration => self.base_config_patched = true,
            Schema::LauncherConfig => self.launcher_config_patched = true,
            Schema::Unrecognized => return,
        }
        self.total_changed_fields += changed_fields;
    }

    pub fn patched(&self, schema: Schema) -> bool {
        match schema {
            Schema::BaseConfiguration => self.base_config_patched,
            Schema::LauncherConfig => self.launcher_config_patched,
            Schema::Unrecognized => false,
        }
    }

    pub fn any_patched(&self) -> bool {
        self.base_config_patched || self.launcher_config_patched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    /// At least one schema had fields rewritten.
    Success,
    /// The container was written back but no schema was patched.
    PartialWarning,
}

/// One entry whose payload was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchedEntry {
    pub id: EntryId,
    pub name: String,
    pub schema: Schema,
    pub encoding: TextEncoding,
    pub changed_fields: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub outcome: PatchOutcome,
    pub stats: PatchStats,
    pub backup: BackupOutcome,
    pub entries_scanned: usize,
    pub patched_entries: Vec<PatchedEntry>,
    pub asset: PathBuf,
    pub backup_path: PathBuf,
}

/// Drives patch runs against containers opened by a [`ContainerStore`].
pub struct Patcher<S> {
    store: S,
}

impl<S: ContainerStore> Patcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rewrite every endpoint field in the asset to point at the configured host.
    ///
    /// The backup is durable before the container is opened. Any structural
    /// error in a recognized document aborts the pass before the asset is
    /// written; otherwise the container is committed with one atomic replace.
    pub fn patch(&self, config: &PatchConfig) -> Result<PatchReport, CoreError> {
        let host = validate_host(&config.host)?;
        if !config.asset.is_file() {
            return Err(CoreError::AssetNotFound {
                path: config.asset.clone(),
            });
        }

        let backup = ensure_backup(&config.asset, &config.backup, config.force_backup)?;

        let mut container = self.store.load(&config.asset)?;
        let entries = container.list_entries()?;
        debug!(store = self.store.name(), entries = entries.len(), "loaded container");

        let mut stats = PatchStats::default();
        let mut patched_entries = Vec::new();
        for entry in &entries {
            let Some(decoded) = decode_payload(&entry.raw_bytes) else {
                continue;
            };
            let schema = classify(&decoded.text);
            if schema == Schema::Unrecognized {
                debug!(entry = %entry.name, "no single schema marker, skipping");
                continue;
            }

            let result = rewrite_document(schema, &decoded.text, &host).map_err(|e| CoreError::Markup {
                entry: entry.name.clone(),
                schema: schema.name(),
                offset: e.offset,
                message: e.message,
            })?;
            if result.changed_field_count == 0 {
                debug!(entry = %entry.name, %schema, "no endpoint fields changed");
                continue;
            }

            container.set_entry_payload(entry.id, encode_text(&result.patched_text, decoded.encoding))?;
            stats.record(schema, result.changed_field_count);
            info!(
                entry = %entry.name,
                %schema,
                fields = result.changed_field_count,
                "patched entry"
            );
            patched_entries.push(PatchedEntry {
                id: entry.id,
                name: entry.name.clone(),
                schema,
                encoding: decoded.encoding,
                changed_fields: result.changed_field_count,
            });
        }

        let bytes = container.serialize()?;
        write_atomic(&config.asset, &bytes)?;
        info!(asset = %config.asset.display(), bytes = bytes.len(), "container written");

        for schema in RECOGNIZED {
            if !stats.patched(schema) {
                warn!("did not patch any <{schema}> payload");
            }
        }
        let outcome = if stats.any_patched() {
            PatchOutcome::Success
        } else {
            PatchOutcome::PartialWarning
        };

        Ok(PatchReport {
            outcome,
            stats,
            backup,
            entries_scanned: entries.len(),
            patched_entries,
            asset: config.asset.clone(),
            backup_path: config.backup.clone(),
        })
    }
}

/// Copy the backup back over the asset. The asset is untouched when the
/// backup is missing.
pub fn restore_asset(config: &RestoreConfig) -> Result<(), CoreError> {
    restore(&config.asset, &config.backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_record_per_schema() {
        let mut stats = PatchStats::default();
        assert!(!stats.any_patched());
        stats.record(Schema::LauncherConfig, 2);
        stats.record(Schema::Unrecognized, 5);
        assert!(stats.launcher_config_patched);
        assert!(!stats.patched(Schema::BaseConfiguration));
        assert_eq!(stats.total_changed_fields, 2);
        stats.record(Schema::BaseConfiguration, 1);
        assert_eq!(stats.total_changed_fields, 3);
        assert!(stats.any_patched());
    }

    #[test]
    fn report_serializes_snake_case() {
        let report = PatchReport {
            outcome: PatchOutcome::PartialWarning,
            stats: PatchStats::default(),
            backup: BackupOutcome::Reused,
            entries_scanned: 0,
            patched_entries: Vec::new(),
            asset: PathBuf::from("a.assets"),
            backup_path: PathBuf::from("a.assets.bak"),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "partial_warning");
        assert_eq!(json["backup"], "reused");
        assert_eq!(json["stats"]["base_config_patched"], false);
        assert_eq!(json["backup_path"], "a.assets.bak");
    }
}
