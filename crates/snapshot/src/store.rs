//! Positioned reads over one selected shadow copy.

use std::collections::BTreeMap;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use shadowmount_common::{ALTERNATE_FILL_BYTE, SNAPSHOT_BLOCK_SIZE};

use crate::error::SnapshotError;

/// How to materialize blocks that have no saved copy in the store.
///
/// In the default mode such blocks are read from the live volume at their
/// original offset; the bytes there may have been overwritten since the
/// snapshot was taken. The alternate mode never touches live data and
/// instead emits a recognizable filler, so a reader can tell "genuinely
/// empty" (zeros, from unused blocks) apart from "present but not
/// recoverable" (the filler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Read unsaved blocks from the live volume.
    #[default]
    Default,
    /// Fill unsaved blocks with [`ALTERNATE_FILL_BYTE`].
    Alternate,
}

/// Resolution of one 16 KiB block within a store.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Block {
    /// Offset of the saved copy, relative to the volume start. Meaningless
    /// when `unused` is set.
    pub(crate) store_offset: u64,
    /// Block was unallocated at snapshot time; reads as zeros.
    pub(crate) unused: bool,
}

/// One selected shadow copy: a reconstructed, read-only byte stream.
///
/// Reads carry their own offset and go through `pread`; there is no shared
/// cursor, so concurrent readers cannot corrupt each other's position.
pub struct ShadowCopy {
    file: Arc<File>,
    volume_offset: u64,
    size: u64,
    blocks: BTreeMap<u64, Block>,
}

impl ShadowCopy {
    pub(crate) fn new(
        file: Arc<File>,
        volume_offset: u64,
        size: u64,
        blocks: BTreeMap<u64, Block>,
    ) -> Self {
        Self {
            file,
            volume_offset,
            size,
            blocks,
        }
    }

    /// Total size of the reconstructed stream in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read up to `length` bytes of reconstructed content at `offset`.
    ///
    /// Returns a short buffer when the range runs past the end of the
    /// stream, and an empty buffer for any offset at or beyond the end.
    ///
    /// # Arguments
    /// * `offset` - Byte offset within the reconstructed stream
    /// * `length` - Maximum number of bytes to return
    /// * `fill` - Materialization policy for unsaved blocks
    pub fn read_at(
        &self,
        offset: u64,
        length: usize,
        fill: FillMode,
    ) -> Result<Vec<u8>, SnapshotError> {
        if offset > i64::MAX as u64 {
            return Err(SnapshotError::BadOffset { offset });
        }
        if offset >= self.size {
            return Ok(Vec::new());
        }

        let end: u64 = offset.saturating_add(length as u64).min(self.size);
        let mut out: Vec<u8> = Vec::with_capacity((end - offset) as usize);
        let mut cursor: u64 = offset;

        while cursor < end {
            let block_start: u64 = cursor - cursor % SNAPSHOT_BLOCK_SIZE;
            let within: u64 = cursor - block_start;
            let take: usize = (SNAPSHOT_BLOCK_SIZE - within).min(end - cursor) as usize;

            match self.blocks.get(&block_start) {
                Some(block) if block.unused => {
                    out.resize(out.len() + take, 0);
                }
                Some(block) => {
                    self.read_volume(block.store_offset + within, take, &mut out)?;
                }
                None => match fill {
                    FillMode::Default => {
                        self.read_volume(cursor, take, &mut out)?;
                    }
                    FillMode::Alternate => {
                        out.resize(out.len() + take, ALTERNATE_FILL_BYTE);
                    }
                },
            }
            cursor += take as u64;
        }

        Ok(out)
    }

    /// Read raw bytes from the backing volume into `out`.
    ///
    /// `at` is relative to the volume start; the configured volume offset
    /// within the backing file is applied here.
    fn read_volume(&self, at: u64, len: usize, out: &mut Vec<u8>) -> Result<(), SnapshotError> {
        // `at` comes from on-disk descriptors or the stream cursor; the sum
        // must stay addressable.
        let position: u64 = self
            .volume_offset
            .checked_add(at)
            .ok_or(SnapshotError::BadOffset { offset: at })?;
        let start: usize = out.len();
        out.resize(start + len, 0);
        self.file
            .read_exact_at(&mut out[start..], position)
            .map_err(|e| {
                SnapshotError::io(format!("reading {} bytes at volume offset {}", len, at), e)
            })
    }
}
