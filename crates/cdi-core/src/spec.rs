//! Specification files and the in-memory records built from them
//!
//! A specification file describes one vendor/class pair and the devices it
//! exposes. Files are JSON (`.json`) or YAML (`.yaml`, `.yml`):
//!
//! ```yaml
//! version: 0.6.0
//! vendor: vendor.com
//! class: gpu
//! devices:
//!   - name: "0"
//!     edits:
//!       deviceNodes:
//!         - path: /dev/gpu0
//! edits:
//!   env:
//!     - GPU_DRIVER=1
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::edits::ContainerEdits;
use crate::qualified::QualifiedName;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("failed to read specification: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse JSON specification: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("failed to parse YAML specification: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("unsupported file extension: {0}")]
    UnknownFormat(String),
}

/// Encoding of a specification file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// A device entry as written in a specification file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Short name, unique within the specification
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub edits: ContainerEdits,
}

/// Decoded contents of a specification file, before validation.
///
/// Required fields default to empty so that a missing field is reported
/// by validation rather than as a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFile {
    #[serde(default, alias = "cdiVersion")]
    pub version: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub class: String,
    /// `vendor/class`, accepted in place of separate vendor and class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default, skip_serializing_if = "ContainerEdits::is_empty")]
    pub edits: ContainerEdits,
}

impl SpecFile {
    /// Decode a specification in the given format
    pub fn from_slice(bytes: &[u8], format: SpecFormat) -> Result<Self, SpecError> {
        let spec = match format {
            SpecFormat::Json => serde_json::from_slice(bytes)?,
            SpecFormat::Yaml => serde_yaml::from_slice(bytes)?,
        };
        Ok(spec)
    }

    /// Read and decode a specification file, picking the format by extension
    pub fn from_file(path: &Path) -> Result<Self, SpecError> {
        let format = SpecFormat::from_path(path)
            .ok_or_else(|| SpecError::UnknownFormat(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes, format)
    }
}

/// A decoded file tagged with where it came from
#[derive(Debug, Clone)]
pub struct RawSpec {
    pub path: PathBuf,
    /// Index of the directory it was found in; lower ranks take precedence
    pub priority: usize,
    pub file: SpecFile,
}

/// A validated specification.
///
/// Vendor and class are fixed at construction. Every device name is a
/// valid, unique short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    path: PathBuf,
    priority: usize,
    version: semver::Version,
    vendor: String,
    class: String,
    devices: Vec<DeviceEntry>,
    edits: ContainerEdits,
}

impl Spec {
    pub(crate) fn new(
        raw: RawSpec,
        version: semver::Version,
        vendor: String,
        class: String,
    ) -> Self {
        Self {
            path: raw.path,
            priority: raw.priority,
            version,
            vendor,
            class,
            devices: raw.file.devices,
            edits: raw.file.edits,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn kind(&self) -> String {
        format!("{}/{}", self.vendor, self.class)
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    /// Edits applying to every device of this specification
    pub fn edits(&self) -> &ContainerEdits {
        &self.edits
    }

    /// Qualified names of all devices, in file order
    pub fn qualified_names(&self) -> impl Iterator<Item = (QualifiedName, &DeviceEntry)> + '_ {
        self.devices.iter().filter_map(move |d| {
            QualifiedName::new(&self.vendor, &self.class, &d.name)
                .ok()
                .map(|q| (q, d))
        })
    }
}
