//! Container edits: the mounts, environment, device nodes and hooks that
//! expose a device inside a container

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bind mount from the host into the container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mount {
    /// Path on the host
    pub source: String,
    /// Path inside the container
    pub destination: String,
    /// Mount options (e.g. `ro`, `nosuid`, `bind`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A device node to create in the container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNode {
    /// Path inside the container
    pub path: String,
    /// Path on the host, defaults to `path` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<String>,
    /// Cgroup access, any combination of `r`, `w` and `m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

/// When a hook runs in the container lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    PreStart,
    PostStart,
    PreStop,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::PreStart => "pre-start",
            HookPhase::PostStart => "post-start",
            HookPhase::PreStop => "pre-stop",
        };
        f.write_str(s)
    }
}

/// A lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    /// Executable to run
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub phase: HookPhase,
}

/// The full set of edits for a device or a specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEdits {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
    /// `KEY=value` assignments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_nodes: Vec<DeviceNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<Hook>,
}

impl ContainerEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
            && self.env.is_empty()
            && self.device_nodes.is_empty()
            && self.hooks.is_empty()
    }

    /// Append `other` after the current edits.
    ///
    /// Order within each category is preserved. Mounts and device nodes
    /// identical to one already present are dropped; environment entries
    /// and hooks are always appended.
    pub fn append(&mut self, other: &ContainerEdits) {
        for mount in &other.mounts {
            if !self.mounts.contains(mount) {
                self.mounts.push(mount.clone());
            }
        }
        self.env.extend(other.env.iter().cloned());
        for node in &other.device_nodes {
            if !self.device_nodes.contains(node) {
                self.device_nodes.push(node.clone());
            }
        }
        self.hooks.extend(other.hooks.iter().cloned());
    }

    /// Hooks for a single lifecycle phase, in order
    pub fn hooks_for(&self, phase: HookPhase) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().filter(move |h| h.phase == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(src: &str, dst: &str) -> Mount {
        Mount {
            source: src.to_string(),
            destination: dst.to_string(),
            options: vec!["ro".to_string()],
        }
    }

    fn hook(name: &str, phase: HookPhase) -> Hook {
        Hook {
            name: name.to_string(),
            path: "/usr/bin/ldconfig".to_string(),
            args: Vec::new(),
            phase,
        }
    }

    #[test]
    fn test_append_dedups_mounts_and_nodes() {
        let a = ContainerEdits {
            mounts: vec![mount("/lib/a.so", "/lib/a.so"), mount("/lib/b.so", "/lib/b.so")],
            env: vec!["A=1".to_string()],
            device_nodes: vec![DeviceNode {
                path: "/dev/gpu0".to_string(),
                host_path: None,
                permissions: Some("rw".to_string()),
            }],
            hooks: vec![hook("ldcache", HookPhase::PreStart)],
        };

        let mut merged = ContainerEdits::new();
        merged.append(&a);
        merged.append(&a);

        assert_eq!(merged.mounts.len(), 2);
        assert_eq!(merged.device_nodes.len(), 1);
        assert_eq!(merged.env, vec!["A=1", "A=1"]);
        assert_eq!(merged.hooks.len(), 2);
    }

    #[test]
    fn test_append_preserves_order() {
        let first = ContainerEdits {
            mounts: vec![mount("/b", "/b")],
            ..Default::default()
        };
        let second = ContainerEdits {
            mounts: vec![mount("/a", "/a"), mount("/b", "/b"), mount("/c", "/c")],
            ..Default::default()
        };

        let mut merged = first.clone();
        merged.append(&second);

        let dests: Vec<&str> = merged.mounts.iter().map(|m| m.destination.as_str()).collect();
        assert_eq!(dests, vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn test_mounts_differing_in_options_are_distinct() {
        let mut rw = mount("/data", "/data");
        rw.options = vec!["rw".to_string()];

        let mut merged = ContainerEdits {
            mounts: vec![mount("/data", "/data")],
            ..Default::default()
        };
        merged.append(&ContainerEdits {
            mounts: vec![rw],
            ..Default::default()
        });
        assert_eq!(merged.mounts.len(), 2);
    }

    #[test]
    fn test_hook_phase_serde() {
        let json = r#"{"name":"ld","path":"/bin/ld","phase":"post-start"}"#;
        let h: Hook = serde_json::from_str(json).unwrap();
        assert_eq!(h.phase, HookPhase::PostStart);
        assert_eq!(h.phase.to_string(), "post-start");

        let bad = r#"{"name":"ld","path":"/bin/ld","phase":"whenever"}"#;
        assert!(serde_json::from_str::<Hook>(bad).is_err());
    }

    #[test]
    fn test_hooks_for_phase() {
        let edits = ContainerEdits {
            hooks: vec![
                hook("a", HookPhase::PreStart),
                hook("b", HookPhase::PreStop),
                hook("c", HookPhase::PreStart),
            ],
            ..Default::default()
        };
        let names: Vec<&str> = edits
            .hooks_for(HookPhase::PreStart)
            .map(|h| h.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
