//! Mount lifecycle: open, select, serve, tear down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fuser::MountOption;
use shadowmount_snapshot::{ShadowCopy, ShadowVolume, SnapshotError};
use thiserror::Error;

use crate::core::ShadowVfs;
use crate::fuse::ShadowFs;
use crate::options::MountOptions;
use crate::source::SelectedCopy;

/// Errors that abort a mount attempt before any request is served.
#[derive(Debug, Error)]
pub enum MountError {
    /// The mount target does not exist or is not a directory.
    #[error("Mount target {0} is not a directory")]
    NotADirectory(PathBuf),

    /// Opening the volume or selecting the snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The FUSE session could not be established or ended abnormally.
    #[error("FUSE session failed: {0}")]
    Session(#[source] std::io::Error),
}

/// Mount one shadow copy and serve it until unmounted.
///
/// Initialization is all-or-nothing: the volume is opened and locked and
/// the snapshot selected before the filesystem is presented; any failure
/// returns without exposing partial mount state, and resources acquired up
/// to that point are released on the way out. The FUSE session loop is
/// single-threaded, so dispatched operations are serialized; snapshot
/// reads are additionally positionless (`pread`), so serialization is not
/// load-bearing for offset correctness.
///
/// # Arguments
/// * `volume_path` - Backing volume file
/// * `volume_offset` - Byte offset of the volume within the file
/// * `stack_position` - 1-based ordinal of the snapshot to expose
/// * `mountpoint` - Existing directory to mount on
/// * `options` - Fill mode and kernel cache timeouts
pub fn mount_shadow_copy(
    volume_path: &Path,
    volume_offset: u64,
    stack_position: usize,
    mountpoint: &Path,
    options: MountOptions,
) -> Result<(), MountError> {
    if !mountpoint.is_dir() {
        return Err(MountError::NotADirectory(mountpoint.to_path_buf()));
    }

    let volume: ShadowVolume = ShadowVolume::open(volume_path, volume_offset)?;
    let copy: ShadowCopy = volume.select(stack_position)?;
    // The catalog is no longer needed; the copy keeps the backing file
    // (and its lock) alive on its own.
    drop(volume);

    let source = Arc::new(SelectedCopy::new(copy, options.fill));
    let fs = ShadowFs::new(ShadowVfs::new(source), &options);
    let mount_options = [
        MountOption::RO,
        MountOption::FSName(options.fsname.clone()),
    ];

    log::info!(
        "mounting snapshot {} of {} on {}",
        stack_position,
        volume_path.display(),
        mountpoint.display()
    );
    fuser::mount2(fs, mountpoint, &mount_options).map_err(MountError::Session)?;
    log::info!("unmounted {}", mountpoint.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mountpoint_fails_before_volume_open() {
        // The volume path is also bad; the mountpoint check must win.
        let err = mount_shadow_copy(
            Path::new("/nonexistent/volume.img"),
            0,
            1,
            Path::new("/nonexistent/mountpoint"),
            MountOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MountError::NotADirectory(_)));
    }

    #[test]
    fn test_missing_volume_fails_before_mounting() {
        let mountpoint = tempfile::tempdir().unwrap();
        let err = mount_shadow_copy(
            Path::new("/nonexistent/volume.img"),
            0,
            1,
            mountpoint.path(),
            MountOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MountError::Snapshot(SnapshotError::Io { .. })));
    }
}
