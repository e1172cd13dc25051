use std::path::PathBuf;

use anyhow::Result;
use shadowmount_snapshot::FillMode;
use shadowmount_vfs::{mount_shadow_copy, MountOptions};

pub fn exec(
    volume: PathBuf,
    volume_offset: u64,
    stack_position: usize,
    mountpoint: PathBuf,
    fill: FillMode,
) -> Result<()> {
    let options = MountOptions::default().with_fill(fill);
    mount_shadow_copy(&volume, volume_offset, stack_position, &mountpoint, options)?;
    Ok(())
}
