//! Specification validation
//!
//! Validation turns a decoded file into a `Spec` or rejects the whole file
//! with one validation error record. Checks run in order and stop at the
//! first failure: schema version, vendor and class, device names, edits.

use semver::Version;
use std::collections::HashSet;
use std::path::Path;

use crate::edits::ContainerEdits;
use crate::error::ErrorRecord;
use crate::qualified::{parse_kind, validate_class, validate_device_name, validate_vendor};
use crate::spec::{DeviceEntry, RawSpec, Spec};

/// Oldest schema version accepted
pub const MIN_SUPPORTED_VERSION: Version = Version::new(0, 3, 0);
/// Newest schema version accepted
pub const MAX_SUPPORTED_VERSION: Version = Version::new(1, 0, 0);

/// Parse a schema version and check it is in the supported range
pub fn check_version(version: &str) -> Result<Version, String> {
    let parsed = Version::parse(version.trim_start_matches('v'))
        .map_err(|_| format!("unsupported version {:?}", version))?;
    if parsed < MIN_SUPPORTED_VERSION || parsed > MAX_SUPPORTED_VERSION {
        return Err(format!(
            "unsupported version {:?} (supported {} to {})",
            version, MIN_SUPPORTED_VERSION, MAX_SUPPORTED_VERSION
        ));
    }
    Ok(parsed)
}

/// Validate a decoded file
pub fn validate(raw: RawSpec) -> Result<Spec, ErrorRecord> {
    let source = raw.path.display().to_string();
    let fail = |message: String| ErrorRecord::validation(source.clone(), message);

    if raw.file.version.is_empty() {
        return Err(fail("missing required field \"version\"".to_string()));
    }
    let version = check_version(&raw.file.version).map_err(&fail)?;

    let (vendor, class) = resolve_kind(&raw).map_err(&fail)?;

    validate_devices(&raw.file.devices).map_err(&fail)?;
    validate_edits(&raw.file.edits).map_err(|e| fail(format!("spec edits: {}", e)))?;

    Ok(Spec::new(raw, version, vendor, class))
}

/// Vendor and class, from the separate fields or from `kind`
fn resolve_kind(raw: &RawSpec) -> Result<(String, String), String> {
    let file = &raw.file;
    let (vendor, class) = match (&file.kind, file.vendor.is_empty() && file.class.is_empty()) {
        (Some(kind), true) => parse_kind(kind).map_err(|e| e.to_string())?,
        (Some(kind), false) => {
            if *kind != format!("{}/{}", file.vendor, file.class) {
                return Err(format!(
                    "kind {:?} does not match vendor {:?} and class {:?}",
                    kind, file.vendor, file.class
                ));
            }
            (file.vendor.clone(), file.class.clone())
        }
        (None, _) => (file.vendor.clone(), file.class.clone()),
    };

    if vendor.is_empty() {
        return Err("missing required field \"vendor\"".to_string());
    }
    if class.is_empty() {
        return Err("missing required field \"class\"".to_string());
    }
    validate_vendor(&vendor).map_err(|e| e.to_string())?;
    validate_class(&class).map_err(|e| e.to_string())?;
    Ok((vendor, class))
}

/// Device names are present, well formed and unique; device edits are valid
fn validate_devices(devices: &[DeviceEntry]) -> Result<(), String> {
    if devices.is_empty() {
        return Err("no devices defined".to_string());
    }
    let mut names = HashSet::with_capacity(devices.len());
    for (i, device) in devices.iter().enumerate() {
        if device.name.is_empty() {
            return Err(format!("device #{} is missing a name", i));
        }
        validate_device_name(&device.name).map_err(|e| e.to_string())?;
        if !names.insert(device.name.as_str()) {
            return Err(format!("duplicate device name {:?}", device.name));
        }
        validate_edits(&device.edits).map_err(|e| format!("device {:?}: {}", device.name, e))?;
    }
    Ok(())
}

/// Check the individual entries of an edit set
pub fn validate_edits(edits: &ContainerEdits) -> Result<(), String> {
    for env in &edits.env {
        match env.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => return Err(format!("invalid environment variable {:?}", env)),
        }
    }
    for mount in &edits.mounts {
        if mount.source.is_empty() {
            return Err(format!("mount {:?} has no source", mount.destination));
        }
        if !is_absolute(&mount.destination) {
            return Err(format!(
                "mount destination {:?} is not an absolute path",
                mount.destination
            ));
        }
    }
    for node in &edits.device_nodes {
        if !is_absolute(&node.path) {
            return Err(format!("device node path {:?} is not an absolute path", node.path));
        }
        if let Some(perms) = &node.permissions {
            if perms.chars().any(|c| !matches!(c, 'r' | 'w' | 'm')) {
                return Err(format!(
                    "device node {:?} has invalid permissions {:?}",
                    node.path, perms
                ));
            }
        }
    }
    for hook in &edits.hooks {
        if hook.path.is_empty() {
            return Err(format!("hook {:?} has no path", hook.name));
        }
    }
    Ok(())
}

fn is_absolute(path: &str) -> bool {
    !path.is_empty() && Path::new(path).has_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::{DeviceNode, Mount};
    use crate::error::ErrorKind;
    use crate::spec::SpecFile;
    use std::path::PathBuf;

    fn raw(file: SpecFile) -> RawSpec {
        RawSpec {
            path: PathBuf::from("/etc/cdi/test.json"),
            priority: 0,
            file,
        }
    }

    fn device(name: &str) -> DeviceEntry {
        DeviceEntry {
            name: name.to_string(),
            edits: ContainerEdits::default(),
        }
    }

    fn valid_file() -> SpecFile {
        SpecFile {
            version: "0.6.0".to_string(),
            vendor: "vendor.com".to_string(),
            class: "gpu".to_string(),
            kind: None,
            devices: vec![device("0"), device("1")],
            edits: ContainerEdits::default(),
        }
    }

    fn message(file: SpecFile) -> String {
        let err = validate(raw(file)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.source, "/etc/cdi/test.json");
        err.message
    }

    #[test]
    fn test_valid_spec() {
        let spec = validate(raw(valid_file())).unwrap();
        assert_eq!(spec.kind(), "vendor.com/gpu");
        assert_eq!(spec.version(), &Version::new(0, 6, 0));
        let names: Vec<String> = spec.qualified_names().map(|(q, _)| q.to_string()).collect();
        assert_eq!(names, vec!["vendor.com/gpu=0", "vendor.com/gpu=1"]);
    }

    #[test]
    fn test_version_checked_first() {
        let mut file = valid_file();
        file.version = "9.0.0".to_string();
        file.vendor = String::new();
        assert!(message(file).starts_with("unsupported version"));

        let mut file = valid_file();
        file.version = "latest".to_string();
        assert!(message(file).starts_with("unsupported version"));

        let mut file = valid_file();
        file.version = String::new();
        assert!(message(file).contains("\"version\""));
    }

    #[test]
    fn test_supported_version_bounds() {
        assert!(check_version("0.3.0").is_ok());
        assert!(check_version("1.0.0").is_ok());
        assert!(check_version("v0.8.0").is_ok());
        assert!(check_version("0.2.9").is_err());
        assert!(check_version("1.0.1").is_err());
    }

    #[test]
    fn test_missing_vendor_or_class() {
        let mut file = valid_file();
        file.vendor = String::new();
        assert!(message(file).contains("\"vendor\""));

        let mut file = valid_file();
        file.class = String::new();
        assert!(message(file).contains("\"class\""));

        let mut file = valid_file();
        file.vendor = "-bad".to_string();
        assert!(message(file).contains("invalid vendor"));
    }

    #[test]
    fn test_kind_field() {
        let mut file = valid_file();
        file.vendor = String::new();
        file.class = String::new();
        file.kind = Some("acme.io/fpga".to_string());
        let spec = validate(raw(file)).unwrap();
        assert_eq!(spec.vendor(), "acme.io");
        assert_eq!(spec.class(), "fpga");

        let mut file = valid_file();
        file.kind = Some("other.com/gpu".to_string());
        assert!(message(file).contains("does not match"));
    }

    #[test]
    fn test_device_names() {
        let mut file = valid_file();
        file.devices.push(device("0"));
        assert!(message(file).contains("duplicate device name \"0\""));

        let mut file = valid_file();
        file.devices.push(device(""));
        assert!(message(file).contains("missing a name"));

        let mut file = valid_file();
        file.devices.push(device("bad name"));
        assert!(message(file).contains("invalid device name"));

        let mut file = valid_file();
        file.devices.clear();
        assert_eq!(message(file), "no devices defined");
    }

    #[test]
    fn test_edit_checks() {
        let mut edits = ContainerEdits::default();
        edits.env.push("NOEQUALS".to_string());
        assert!(validate_edits(&edits).is_err());

        let mut edits = ContainerEdits::default();
        edits.env.push("EMPTY=".to_string());
        assert!(validate_edits(&edits).is_ok());

        let mut edits = ContainerEdits::default();
        edits.mounts.push(Mount {
            source: "/lib".to_string(),
            destination: "lib".to_string(),
            options: Vec::new(),
        });
        assert!(validate_edits(&edits).is_err());

        let mut edits = ContainerEdits::default();
        edits.device_nodes.push(DeviceNode {
            path: "/dev/gpu0".to_string(),
            host_path: None,
            permissions: Some("rwx".to_string()),
        });
        assert!(validate_edits(&edits).is_err());
    }

    #[test]
    fn test_bad_device_edits_reject_file() {
        let mut file = valid_file();
        file.devices[1].edits.env.push("=oops".to_string());
        assert!(message(file).starts_with("device \"1\""));
    }
}
