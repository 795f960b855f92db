//! Immutable device index built by a single merge pass
//!
//! A `Snapshot` is never modified after `Snapshot::build` returns. The
//! registry publishes a new one on every refresh; readers holding an old
//! snapshot keep a consistent view of it.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

use crate::edits::ContainerEdits;
use crate::error::{group_by_source, ErrorMap, ErrorRecord};
use crate::qualified::QualifiedName;
use crate::spec::{DeviceEntry, Spec};

/// A device in the index together with the specification that owns it
#[derive(Debug, Clone)]
pub struct IndexedDevice {
    name: QualifiedName,
    spec: Arc<Spec>,
    position: usize,
}

impl IndexedDevice {
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    pub fn entry(&self) -> &DeviceEntry {
        &self.spec.devices()[self.position]
    }

    /// The device's own edits, without specification-level edits
    pub fn edits(&self) -> &ContainerEdits {
        &self.entry().edits
    }
}

/// One published state of the registry: the device index plus every error
/// recorded while building it
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
    specs: Vec<Arc<Spec>>,
    devices: BTreeMap<QualifiedName, IndexedDevice>,
    errors: ErrorMap,
}

impl Snapshot {
    /// An empty snapshot, as seen before the first refresh
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge validated specifications into a new index.
    ///
    /// Specifications are processed by ascending priority rank, then in the
    /// order given. The first definition of a qualified name wins; each later
    /// one is dropped and recorded as a conflict against its own file.
    pub fn build(generation: u64, mut specs: Vec<Spec>, mut errors: Vec<ErrorRecord>) -> Self {
        // Stable, so files keep their scan order within one rank
        specs.sort_by_key(|s| s.priority());

        let specs: Vec<Arc<Spec>> = specs.into_iter().map(Arc::new).collect();
        let mut devices: BTreeMap<QualifiedName, IndexedDevice> = BTreeMap::new();

        for spec in &specs {
            for (position, device) in spec.devices().iter().enumerate() {
                let name = match QualifiedName::new(spec.vendor(), spec.class(), &device.name) {
                    Ok(name) => name,
                    Err(e) => {
                        errors.push(ErrorRecord::validation(
                            spec.path().display().to_string(),
                            e.to_string(),
                        ));
                        continue;
                    }
                };

                if let Some(existing) = devices.get(&name) {
                    warn!(
                        device = %name,
                        winner = %existing.spec.path().display(),
                        loser = %spec.path().display(),
                        "Conflicting device definition"
                    );
                    errors.push(ErrorRecord::conflict(
                        spec.path().display().to_string(),
                        format!(
                            "duplicate device {}: already defined by {}",
                            name,
                            existing.spec.path().display()
                        ),
                    ));
                    continue;
                }

                devices.insert(
                    name.clone(),
                    IndexedDevice {
                        name,
                        spec: Arc::clone(spec),
                        position,
                    },
                );
            }
        }

        Self {
            generation,
            refreshed_at: Some(Utc::now()),
            specs,
            devices,
            errors: group_by_source(errors),
        }
    }

    /// Refresh counter; 0 for the initial empty snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// All specifications that passed validation, by priority
    pub fn specs(&self) -> &[Arc<Spec>] {
        &self.specs
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&IndexedDevice> {
        self.devices.get(name)
    }

    /// Qualified names in lexicographic order
    pub fn device_names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.devices.keys()
    }

    pub fn devices(&self) -> impl Iterator<Item = &IndexedDevice> {
        self.devices.values()
    }

    /// Distinct vendors with at least one indexed device
    pub fn vendors(&self) -> BTreeSet<String> {
        self.devices.keys().map(|n| n.vendor().to_string()).collect()
    }

    /// Distinct classes with at least one indexed device
    pub fn classes(&self) -> BTreeSet<String> {
        self.devices.keys().map(|n| n.class().to_string()).collect()
    }
}
