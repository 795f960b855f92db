use cdi_core::Registry;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

const DEVICES_PER_PASS: usize = 8;

/// Every device of one pass shares the class `pass<N>`
fn write_pass(dir: &Path, pass: usize) {
    let devices: Vec<String> = (0..DEVICES_PER_PASS)
        .map(|i| format!(r#"{{"name": "{}"}}"#, i))
        .collect();
    let content = format!(
        r#"{{"version": "0.6.0", "vendor": "vendor.com", "class": "pass{}", "devices": [{}]}}"#,
        pass,
        devices.join(",")
    );
    // Rename so a concurrent scan never reads a half-written file
    let tmp = dir.join(".gpu.json.tmp");
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, dir.join("gpu.json")).unwrap();
}

#[test]
fn test_readers_never_see_mixed_index() {
    let dir = TempDir::new().unwrap();
    write_pass(dir.path(), 0);

    let registry = Registry::builder().spec_dirs([dir.path()]).build().unwrap();
    registry.refresh().unwrap();

    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    let devices = registry.list_devices();
                    assert_eq!(devices.len(), DEVICES_PER_PASS);
                    let class = devices[0].class().to_string();
                    assert!(devices.iter().all(|d| d.class() == class));

                    let requested = [format!("vendor.com/{}=0", class)];
                    // A refresh may have replaced the index since list_devices
                    if let Ok(res) = registry.resolve(&requested) {
                        assert_eq!(res.devices.len(), 1);
                    }
                }
            });
        }

        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..25 {
                    registry.refresh().unwrap();
                }
            });
        }

        for pass in 1..=50 {
            write_pass(dir.path(), pass);
            registry.refresh().unwrap();
        }
        done.store(true, Ordering::Relaxed);
    });

    let last = registry.list_devices();
    assert!(last.iter().all(|d| d.class() == "pass50"));
    assert!(registry.get_errors().is_empty());
}
