//! Device resolution: turn requested device names into one edit set

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::edits::ContainerEdits;
use crate::error::RegistryError;
use crate::index::{IndexedDevice, Snapshot};
use crate::qualified::QualifiedName;

/// Consolidated edits for a list of requested devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Resolved devices, in request order
    pub devices: Vec<QualifiedName>,
    pub edits: ContainerEdits,
}

/// Resolve `names` against one snapshot.
///
/// Every name must be present; the first missing or malformed name fails
/// the whole call and no edits are returned. Edits are concatenated in
/// request order. A specification's own edits are added once, just before
/// the first of its devices.
pub fn resolve<S: AsRef<str>>(snapshot: &Snapshot, names: &[S]) -> Result<Resolution, RegistryError> {
    let found = lookup_all(snapshot, names)?;

    let mut resolution = Resolution::default();
    let mut applied_specs: HashSet<&Path> = HashSet::new();

    for device in found {
        let spec = device.spec();
        if applied_specs.insert(spec.path()) {
            resolution.edits.append(spec.edits());
        }
        resolution.edits.append(device.edits());
        resolution.devices.push(device.name().clone());
    }

    debug!(
        devices = resolution.devices.len(),
        mounts = resolution.edits.mounts.len(),
        hooks = resolution.edits.hooks.len(),
        "Resolved devices"
    );
    Ok(resolution)
}

fn lookup_all<'a, S: AsRef<str>>(
    snapshot: &'a Snapshot,
    names: &[S],
) -> Result<Vec<&'a IndexedDevice>, RegistryError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let qualified = QualifiedName::parse(name)
                .map_err(|e| RegistryError::InvalidDeviceName(name.to_string(), e.to_string()))?;
            snapshot
                .get(&qualified)
                .ok_or_else(|| RegistryError::DeviceNotFound(name.to_string()))
        })
        .collect()
}
