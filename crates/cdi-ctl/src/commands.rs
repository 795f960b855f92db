//! Subcommand implementations
//!
//! Output goes to the given writer; diagnostics go through tracing.

use anyhow::{bail, Context, Result};
use cdi_core::Registry;
use std::io::Write;
use tracing::{info, warn};

/// Refresh and report every recorded error as a warning
fn refresh_and_report(registry: &Registry) {
    if let Err(e) = registry.refresh() {
        warn!(error = %e, "Failed to refresh CDI registry");
    }
    let errors = registry.get_errors();
    if !errors.is_empty() {
        warn!("The following registry errors were reported:");
        for (source, records) in &errors {
            for record in records {
                warn!("{}: {}", source, record);
            }
        }
    }
}

/// Print every known device, one qualified name per line
pub fn list(registry: &Registry, out: &mut impl Write) -> Result<()> {
    refresh_and_report(registry);

    let devices = registry.list_devices();
    info!("Found {} CDI devices", devices.len());
    for device in devices {
        writeln!(out, "{}", device)?;
    }
    Ok(())
}

/// Print the consolidated edits for the requested devices as JSON
pub fn resolve(registry: &Registry, names: &[String], out: &mut impl Write) -> Result<()> {
    refresh_and_report(registry);

    let resolution = registry
        .resolve(names)
        .context("failed to resolve CDI devices")?;
    serde_json::to_writer_pretty(&mut *out, &resolution)?;
    writeln!(out)?;
    Ok(())
}

/// Print every recorded error; fails if there were any
pub fn errors(registry: &Registry, out: &mut impl Write) -> Result<()> {
    registry.refresh()?;

    let records = registry.error_records();
    for record in &records {
        writeln!(out, "{}: {}: {}", record.source, record.kind, record.message)?;
    }
    if !records.is_empty() {
        bail!("{} CDI registry errors reported", records.len());
    }
    Ok(())
}
