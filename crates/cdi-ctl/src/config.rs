//! Configuration loading and validation

use anyhow::{bail, Context, Result};
use cdi_core::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Load configuration from file, falling back to defaults if it is missing
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Registry settings after applying command line overrides.
///
/// Directories given on the command line (or through the environment)
/// replace the configured list entirely.
pub fn registry_config(config: &Config, spec_dirs: &[PathBuf]) -> Result<RegistryConfig> {
    let mut registry = config.registry.clone();
    if !spec_dirs.is_empty() {
        registry.spec_dirs = spec_dirs.to_vec();
    }
    if registry.spec_dirs.is_empty() {
        bail!("at least one CDI specification directory must be specified");
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/cdictl.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.registry.spec_dirs, cdi_core::registry::default_spec_dirs());
    }

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cdictl.toml");
        std::fs::write(
            &path,
            r#"
[registry]
spec_dirs = ["/opt/cdi", "/etc/cdi"]
auto_refresh = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.registry.spec_dirs,
            vec![PathBuf::from("/opt/cdi"), PathBuf::from("/etc/cdi")]
        );
        assert!(config.registry.auto_refresh);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::default();
        let registry = registry_config(&config, &[PathBuf::from("/run/cdi")]).unwrap();
        assert_eq!(registry.spec_dirs, vec![PathBuf::from("/run/cdi")]);
    }

    #[test]
    fn test_empty_dir_list_rejected() {
        let config = Config {
            registry: RegistryConfig {
                spec_dirs: Vec::new(),
                auto_refresh: false,
            },
        };
        let err = registry_config(&config, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at least one CDI specification directory must be specified"
        );
    }
}
