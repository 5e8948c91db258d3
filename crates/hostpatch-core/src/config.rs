use std::path::PathBuf;

use crate::backup::default_backup_path;

/// Settings for one patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    pub asset: PathBuf,
    pub backup: PathBuf,
    /// Replacement host, validated when the run starts.
    pub host: String,
    /// Overwrite an existing backup instead of reusing it.
    pub force_backup: bool,
}

impl PatchConfig {
    /// Config with the backup next to the asset.
    pub fn new(asset: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        let asset = asset.into();
        Self {
            backup: default_backup_path(&asset),
            asset,
            host: host.into(),
            force_backup: false,
        }
    }

    /// Use `backup` instead of the default location when given.
    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        if let Some(backup) = backup {
            self.backup = backup;
        }
        self
    }

    pub fn with_force_backup(mut self, force: bool) -> Self {
        self.force_backup = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    pub asset: PathBuf,
    pub backup: PathBuf,
}

impl RestoreConfig {
    pub fn new(asset: impl Into<PathBuf>) -> Self {
        let asset = asset.into();
        Self {
            backup: default_backup_path(&asset),
            asset,
        }
    }

    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        if let Some(backup) = backup {
            self.backup = backup;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_place_backup_beside_asset() {
        let config = PatchConfig::new("Data/resources.assets", "10.0.0.5");
        assert_eq!(config.backup, PathBuf::from("Data/resources.assets.bak"));
        assert!(!config.force_backup);

        let restore = RestoreConfig::new("Data/resources.assets");
        assert_eq!(restore.backup, config.backup);
    }

    #[test]
    fn explicit_backup_overrides_default() {
        let config = PatchConfig::new("a.assets", "h")
            .with_backup(Some(PathBuf::from("/tmp/keep.bin")))
            .with_force_backup(true);
        assert_eq!(config.backup, PathBuf::from("/tmp/keep.bin"));
        assert!(config.force_backup);

        let restore = RestoreConfig::new("a.assets").with_backup(None);
        assert_eq!(restore.backup, PathBuf::from("a.assets.bak"));
    }
}
