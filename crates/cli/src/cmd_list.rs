use std::path::PathBuf;

use anyhow::Result;
use shadowmount_snapshot::{ShadowVolume, SnapshotError};

pub fn exec(volume: PathBuf, volume_offset: u64) -> Result<()> {
    let parsed = match ShadowVolume::open(&volume, volume_offset) {
        Ok(parsed) => parsed,
        Err(SnapshotError::SnapshotsDisabled) => {
            println!("Snapshots are disabled on this volume.");
            return Ok(());
        }
        Err(e @ SnapshotError::InvalidVolumeFormat { .. }) => {
            println!("{}", e);
            return Ok(());
        }
        // Missing or unreadable backing file is an operational failure.
        Err(e) => return Err(e.into()),
    };

    let snapshots = parsed.snapshots();
    if snapshots.is_empty() {
        println!("No snapshots present on this volume.");
        return Ok(());
    }
    println!("Snapshots on {}:", volume.display());
    if parsed.maximum_size() > 0 {
        println!("  diff-area limit: {} bytes", parsed.maximum_size());
    }
    for info in snapshots {
        println!(
            "  {}  {}  (sequence {})",
            info.stack_position,
            info.created.format("%Y-%m-%d %H:%M:%S UTC"),
            info.sequence
        );
    }
    Ok(())
}
