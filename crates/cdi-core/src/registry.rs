//! The refreshable device registry
//!
//! The registry owns one published `Snapshot` at a time. `refresh` builds a
//! complete replacement off to the side and swaps it in with a single atomic
//! store, so readers always see either the old index or the new one, never a
//! mix. Readers never take a lock.
//!
//! Refreshes are serialized: a second caller waits for the first to publish,
//! then scans again.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::error::{ErrorMap, ErrorRecord, RegistryError};
use crate::index::{IndexedDevice, Snapshot};
use crate::loader::scan_dirs;
use crate::qualified::QualifiedName;
use crate::resolve::{resolve, Resolution};
use crate::validate::validate;

/// Standard specification directories, highest priority first
pub const DEFAULT_SPEC_DIRS: &[&str] = &["/etc/cdi", "/var/run/cdi"];

/// Environment variable holding a colon-separated directory list
pub const SPEC_DIRS_ENV: &str = "CDI_SPEC_DIRS";

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directories to scan, highest priority first
    #[serde(default = "default_spec_dirs")]
    pub spec_dirs: Vec<PathBuf>,
    /// Rescan before every read
    #[serde(default)]
    pub auto_refresh: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            spec_dirs: default_spec_dirs(),
            auto_refresh: false,
        }
    }
}

pub fn default_spec_dirs() -> Vec<PathBuf> {
    DEFAULT_SPEC_DIRS.iter().map(PathBuf::from).collect()
}

/// Split a colon-separated directory list, dropping empty entries
pub fn parse_spec_dirs(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl RegistryConfig {
    /// Defaults, with the directory list taken from `CDI_SPEC_DIRS` when it
    /// is set and non-empty
    pub fn from_env() -> Self {
        let spec_dirs = std::env::var(SPEC_DIRS_ENV)
            .ok()
            .map(|v| parse_spec_dirs(&v))
            .filter(|dirs| !dirs.is_empty())
            .unwrap_or_else(default_spec_dirs);
        Self {
            spec_dirs,
            auto_refresh: false,
        }
    }
}

/// Builder for `Registry`
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub fn spec_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.spec_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.config.auto_refresh = enabled;
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        Registry::new(self.config)
    }
}

/// Device registry over a set of specification directories
pub struct Registry {
    config: RegistryConfig,
    current: ArcSwap<Snapshot>,
    /// Serializes refreshes; holds the last generation number issued
    refresh_lock: Mutex<u64>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.current.load();
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("generation", &snap.generation())
            .field("devices", &snap.device_count())
            .finish()
    }
}

impl Registry {
    /// Create a registry. No directories are scanned until the first
    /// refresh, or the first read when auto-refresh is enabled.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        if config.spec_dirs.is_empty() {
            return Err(RegistryError::NoSpecDirs);
        }
        Ok(Self::from_config(config))
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    fn from_config(config: RegistryConfig) -> Self {
        Self {
            config,
            current: ArcSwap::from_pointee(Snapshot::empty()),
            refresh_lock: Mutex::new(0),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Rescan all directories and publish a new index.
    ///
    /// Per-file and per-device problems do not fail the refresh; they are
    /// available from `get_errors`. Only setup errors are returned, and in
    /// that case the previous snapshot stays published.
    pub fn refresh(&self) -> Result<(), RegistryError> {
        let dirs = &self.config.spec_dirs;
        if dirs.is_empty() {
            return Err(RegistryError::NoSpecDirs);
        }

        let mut generation = self.refresh_lock.lock();

        let scan = scan_dirs(dirs);
        if scan.scanned_dirs == 0 && scan.failed_dirs > 0 {
            let listed = dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RegistryError::NoReadableSpecDirs(listed));
        }

        let mut errors = scan.errors;
        let mut specs = Vec::with_capacity(scan.specs.len());
        for raw in scan.specs {
            match validate(raw) {
                Ok(spec) => specs.push(spec),
                Err(record) => {
                    warn!(path = %record.source, error = %record.message, "Invalid spec");
                    errors.push(record);
                }
            }
        }

        *generation += 1;
        let snapshot = Snapshot::build(*generation, specs, errors);
        info!(
            generation = snapshot.generation(),
            specs = snapshot.specs().len(),
            devices = snapshot.device_count(),
            errors = snapshot.error_count(),
            "Registry refreshed"
        );
        self.current.store(Arc::new(snapshot));
        Ok(())
    }

    /// The current snapshot, for several reads against the same index
    pub fn snapshot(&self) -> Arc<Snapshot> {
        if self.config.auto_refresh {
            if let Err(e) = self.refresh() {
                warn!(error = %e, "Auto-refresh failed, using previous index");
            }
        }
        self.current.load_full()
    }

    /// Errors from the most recent refresh, keyed by source
    pub fn get_errors(&self) -> ErrorMap {
        self.snapshot().errors().clone()
    }

    /// Errors from the most recent refresh, flattened in source order
    pub fn error_records(&self) -> Vec<ErrorRecord> {
        self.snapshot().errors().values().flatten().cloned().collect()
    }

    /// All qualified device names, sorted
    pub fn list_devices(&self) -> Vec<QualifiedName> {
        self.snapshot().device_names().cloned().collect()
    }

    pub fn get_device(&self, name: &str) -> Option<IndexedDevice> {
        let name = QualifiedName::parse(name).ok()?;
        self.snapshot().get(&name).cloned()
    }

    pub fn list_vendors(&self) -> BTreeSet<String> {
        self.snapshot().vendors()
    }

    pub fn list_classes(&self) -> BTreeSet<String> {
        self.snapshot().classes()
    }

    /// Resolve devices against the current snapshot
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Resolution, RegistryError> {
        let snapshot = self.snapshot();
        debug!(generation = snapshot.generation(), requested = names.len(), "Resolving devices");
        resolve(&snapshot, names)
    }
}

static DEFAULT_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry configured from the environment.
///
/// Created on first use; callers still decide when to refresh it.
pub fn default_registry() -> &'static Registry {
    // from_env never yields an empty directory list
    DEFAULT_REGISTRY.get_or_init(|| Registry::from_config(RegistryConfig::from_env()))
}
