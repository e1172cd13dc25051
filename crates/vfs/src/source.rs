//! The capability the read path dispatches to.

use shadowmount_snapshot::{FillMode, ShadowCopy, SnapshotError};

use crate::error::VfsError;

/// A positioned-read view of one selected snapshot.
///
/// Every call carries its own offset; implementations must not keep a
/// shared mutable cursor, so interleaved requests can never corrupt each
/// other's position. This is the only seam between the filesystem adapter
/// and the snapshot reader.
pub trait SnapshotSource: Send + Sync {
    /// Current total size of the reconstructed stream. Queried on every
    /// attribute request; never cached by the adapter.
    fn size(&self) -> u64;

    /// Read up to `length` bytes at `offset`. Short at end of stream,
    /// empty at or beyond it.
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, VfsError>;
}

/// A [`ShadowCopy`] paired with the fill mode chosen at mount time.
pub struct SelectedCopy {
    copy: ShadowCopy,
    fill: FillMode,
}

impl SelectedCopy {
    /// Wrap a selected shadow copy.
    ///
    /// # Arguments
    /// * `copy` - The snapshot selected at mount time
    /// * `fill` - Fill mode forwarded to every read
    pub fn new(copy: ShadowCopy, fill: FillMode) -> Self {
        Self { copy, fill }
    }
}

impl SnapshotSource for SelectedCopy {
    fn size(&self) -> u64 {
        self.copy.size()
    }

    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, VfsError> {
        self.copy
            .read_at(offset, length, self.fill)
            .map_err(|e| match e {
                SnapshotError::BadOffset { .. } => VfsError::BadArgument,
                other => VfsError::Io(other.to_string()),
            })
    }
}
