//! Locating and loading the configuration
//!
//! The config file lives at `<config_dir>/rsyncx/config.toml` unless a path
//! is given explicitly. An optional rsync-style `filter` file next to it
//! replaces the built-in default excludes.

use std::path::{Path, PathBuf};

use rsyncx_fs::{ConfigStore, RsyncxPath, expand_home};

use super::manifest::Manifest;
use super::template::{CONFIG_TEMPLATE, filter_template, write_if_absent};
use crate::filter::{DEFAULT_EXCLUDES, ExcludeFilter, parse_filter_file};
use crate::group::{GroupRegistry, SyncGroup};
use crate::layout::DataLayout;
use crate::sync::SyncEngine;
use crate::{Error, Result};

/// Where the config and filter files are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    config_file: PathBuf,
}

impl ConfigPaths {
    /// `<config_dir>/rsyncx/` for the current platform.
    pub fn platform_default() -> Option<Self> {
        dirs::config_dir().map(|d| Self::in_dir(d.join(RsyncxPath::AppDir.as_str())))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_file: dir.as_ref().join(RsyncxPath::ConfigFile.as_str()),
        }
    }

    /// Use an explicit config file; the filter file is looked up beside it.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file: path.into(),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn filter_file(&self) -> PathBuf {
        self.config_file.with_file_name(RsyncxPath::FilterFile.as_str())
    }
}

/// What `configure` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureReport {
    pub config_file: PathBuf,
    pub config_created: bool,
    pub filter_file: PathBuf,
    pub filter_created: bool,
    pub data_dir: PathBuf,
}

/// Loaded configuration, ready to drive an engine.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub manifest: Manifest,
    pub groups: Vec<SyncGroup>,
    pub filter: ExcludeFilter,
    pub layout: DataLayout,
}

impl ResolvedConfig {
    /// An engine configured from the settings section.
    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.layout.clone())
            .with_filter(self.filter.clone())
            .with_probe_timeout(self.manifest.settings.probe_timeout())
            .with_lock_timeout(self.manifest.settings.lock_timeout())
    }
}

impl GroupRegistry for ResolvedConfig {
    fn list_groups(&self) -> Vec<SyncGroup> {
        self.groups.clone()
    }
}

/// Loads configuration from disk
pub struct ConfigResolver {
    paths: ConfigPaths,
    /// Override for the data directory (used for testing).
    data_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(paths: ConfigPaths) -> Self {
        Self {
            paths,
            data_dir_override: None,
        }
    }

    /// Force the data directory regardless of `settings.data_dir`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir_override = Some(data_dir.into());
        self
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    fn layout_for(&self, manifest: &Manifest) -> Result<DataLayout> {
        if let Some(dir) = &self.data_dir_override {
            return Ok(DataLayout::new(dir));
        }
        if let Some(dir) = &manifest.settings.data_dir {
            return Ok(DataLayout::new(expand_home(dir)));
        }
        DataLayout::platform_default().ok_or_else(|| Error::Config {
            message: "no platform data directory; set settings.data_dir".to_string(),
        })
    }

    /// Load the manifest only.
    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.paths.config_file();
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(?path, "Loading config");
        Ok(ConfigStore::new().load(path)?)
    }

    /// Exclude patterns: the filter file if present, else the defaults, plus
    /// `settings.exclude`.
    fn filter_for(&self, manifest: &Manifest) -> Result<ExcludeFilter> {
        let filter_file = self.paths.filter_file();
        let mut patterns: Vec<String> = if filter_file.is_file() {
            tracing::debug!(?filter_file, "Loading filter file");
            parse_filter_file(&rsyncx_fs::io::read_text(&filter_file)?)
        } else {
            DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect()
        };
        patterns.extend(manifest.settings.exclude.iter().cloned());
        ExcludeFilter::new(patterns)
    }

    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let manifest = self.load_manifest()?;
        let groups = manifest.sync_groups()?;
        let filter = self.filter_for(&manifest)?;
        let layout = self.layout_for(&manifest)?;

        tracing::debug!(
            "Resolved {} groups, data dir {}",
            groups.len(),
            layout.data_dir().display()
        );
        Ok(ResolvedConfig {
            manifest,
            groups,
            filter,
            layout,
        })
    }

    /// Create the config, filter file and data directory if missing.
    ///
    /// Existing files are never overwritten.
    pub fn configure(&self) -> Result<ConfigureReport> {
        let config_created = write_if_absent(self.paths.config_file(), CONFIG_TEMPLATE)?;
        let filter_file = self.paths.filter_file();
        let filter_created = write_if_absent(&filter_file, &filter_template())?;

        let manifest = self.load_manifest()?;
        let layout = self.layout_for(&manifest)?;
        for dir in [
            layout.data_dir().join(RsyncxPath::GroupsDir.as_str()),
            layout.trash_root(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| rsyncx_fs::Error::io(&dir, e))?;
        }

        Ok(ConfigureReport {
            config_file: self.paths.config_file().to_path_buf(),
            config_created,
            filter_file,
            filter_created,
            data_dir: layout.data_dir().to_path_buf(),
        })
    }
}
