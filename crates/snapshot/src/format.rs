//! On-disk snapshot layout.
//!
//! The snapshot index lives inside the volume it describes. A fixed header
//! at [`VOLUME_HEADER_OFFSET`](shadowmount_common::VOLUME_HEADER_OFFSET)
//! points at a catalog of 128-byte entries; each store (one per shadow
//! copy) is described by a paired store entry and region entry, matched by
//! GUID. The region entry points at a flat list of 32-byte block
//! descriptors mapping original volume offsets to store data offsets.
//!
//! All integers are little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::SnapshotError;

/// Snapshot volume identifier GUID {3808876b-c176-4e48-b7ae-04046e6cc752},
/// in on-disk (mixed-endian) byte order.
pub const VOLUME_IDENTIFIER: [u8; 16] = [
    0x6b, 0x87, 0x08, 0x38, 0x76, 0xc1, 0x48, 0x4e, 0xb7, 0xae, 0x04, 0x04, 0x6e, 0x6c, 0xc7, 0x52,
];

/// Supported header version.
pub const HEADER_VERSION: u32 = 1;

/// Record type of the volume header.
pub const HEADER_RECORD_TYPE: u32 = 1;

/// Size of the volume header region in bytes.
pub const HEADER_SIZE: usize = 512;

/// Size of one catalog entry in bytes.
pub const CATALOG_ENTRY_SIZE: usize = 128;

/// Size of one block descriptor in bytes.
pub const BLOCK_DESCRIPTOR_SIZE: usize = 32;

/// Block descriptor flag: the block was unallocated when the snapshot was
/// taken; it reads as zeros.
pub const BLOCK_FLAG_UNUSED: u32 = 0x4;

/// Upper bound on catalog entries accepted from a volume. A catalog past
/// this point is treated as corrupt.
pub const MAX_CATALOG_ENTRIES: usize = 1024;

/// Upper bound on block descriptors per store (enough for a 256 GiB store
/// area). A larger count is treated as corrupt.
pub const MAX_BLOCK_DESCRIPTORS: u64 = 1 << 24;

/// Parsed volume header.
#[derive(Debug, Clone, Copy)]
pub struct VolumeHeader {
    /// Catalog offset relative to the volume start; 0 when no snapshot has
    /// been taken yet.
    pub catalog_offset: u64,
    /// Maximum diff-area size recorded by the snapshot writer. Informational.
    pub maximum_size: u64,
}

impl VolumeHeader {
    /// Parse the header region.
    ///
    /// An all-zero region means snapshotting is disabled on the volume; any
    /// other identifier mismatch is a format error.
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self, SnapshotError> {
        if buf.iter().all(|b| *b == 0) {
            return Err(SnapshotError::SnapshotsDisabled);
        }
        if buf[0..16] != VOLUME_IDENTIFIER {
            return Err(SnapshotError::invalid("volume identifier mismatch"));
        }
        let version: u32 = LittleEndian::read_u32(&buf[16..20]);
        if version != HEADER_VERSION {
            return Err(SnapshotError::invalid(format!(
                "unsupported header version {}",
                version
            )));
        }
        let record_type: u32 = LittleEndian::read_u32(&buf[20..24]);
        if record_type != HEADER_RECORD_TYPE {
            return Err(SnapshotError::invalid(format!(
                "unexpected header record type {}",
                record_type
            )));
        }
        Ok(Self {
            catalog_offset: LittleEndian::read_u64(&buf[24..32]),
            maximum_size: LittleEndian::read_u64(&buf[32..40]),
        })
    }
}

/// One parsed catalog entry.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    /// End of catalog.
    End,
    /// Padding; skipped.
    Padding,
    /// Store descriptor: identity and metadata of one shadow copy.
    Store {
        /// Store GUID pairing this entry with its region entry.
        guid: [u8; 16],
        /// Size of the snapshotted volume in bytes.
        volume_size: u64,
        /// Monotonic sequence number assigned at creation.
        sequence: u64,
        /// Creation time as a FILETIME value.
        created: u64,
    },
    /// Region pointers: where the store's block list lives.
    Region {
        /// Store GUID pairing this entry with its store entry.
        guid: [u8; 16],
        /// Offset of the block descriptor list, relative to the volume start.
        block_list_offset: u64,
        /// Number of block descriptors in the list.
        block_count: u64,
    },
}

impl CatalogEntry {
    /// Parse one 128-byte catalog entry.
    pub fn parse(buf: &[u8; CATALOG_ENTRY_SIZE]) -> Result<Self, SnapshotError> {
        let entry_type: u64 = LittleEndian::read_u64(&buf[0..8]);
        match entry_type {
            0 => Ok(Self::End),
            1 => Ok(Self::Padding),
            2 => {
                let mut guid = [0u8; 16];
                guid.copy_from_slice(&buf[16..32]);
                Ok(Self::Store {
                    guid,
                    volume_size: LittleEndian::read_u64(&buf[8..16]),
                    sequence: LittleEndian::read_u64(&buf[32..40]),
                    created: LittleEndian::read_u64(&buf[40..48]),
                })
            }
            3 => {
                let mut guid = [0u8; 16];
                guid.copy_from_slice(&buf[8..24]);
                Ok(Self::Region {
                    guid,
                    block_list_offset: LittleEndian::read_u64(&buf[24..32]),
                    block_count: LittleEndian::read_u64(&buf[32..40]),
                })
            }
            other => Err(SnapshotError::invalid(format!(
                "unknown catalog entry type {}",
                other
            ))),
        }
    }
}

/// One parsed block descriptor.
#[derive(Debug, Clone, Copy)]
pub struct BlockDescriptor {
    /// Offset of the block within the original volume.
    pub original_offset: u64,
    /// Offset of the saved copy, relative to the volume start.
    pub store_offset: u64,
    /// Descriptor flags; see [`BLOCK_FLAG_UNUSED`].
    pub flags: u32,
}

impl BlockDescriptor {
    /// Parse one 32-byte block descriptor.
    pub fn parse(buf: &[u8; BLOCK_DESCRIPTOR_SIZE]) -> Self {
        Self {
            original_offset: LittleEndian::read_u64(&buf[0..8]),
            store_offset: LittleEndian::read_u64(&buf[8..16]),
            flags: LittleEndian::read_u32(&buf[16..20]),
        }
    }
}
