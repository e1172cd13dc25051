//! Volume-level access: header validation, catalog parsing, store selection.

use std::collections::BTreeMap;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fs2::FileExt as LockExt;
use shadowmount_common::{filetime_to_utc, SNAPSHOT_BLOCK_SIZE, VOLUME_HEADER_OFFSET};

use crate::error::SnapshotError;
use crate::format::{
    BlockDescriptor, CatalogEntry, VolumeHeader, BLOCK_DESCRIPTOR_SIZE, BLOCK_FLAG_UNUSED,
    CATALOG_ENTRY_SIZE, HEADER_SIZE, MAX_BLOCK_DESCRIPTORS, MAX_CATALOG_ENTRIES,
};
use crate::store::{Block, ShadowCopy};

/// Metadata of one shadow copy, as reported by listing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// 1-based position in the catalog order.
    pub stack_position: usize,
    /// Sequence number assigned when the snapshot was taken.
    pub sequence: u64,
    /// Creation time.
    pub created: DateTime<Utc>,
}

/// One fully parsed store: catalog metadata plus region pointers.
#[derive(Debug, Clone)]
struct StoreRecord {
    volume_size: u64,
    sequence: u64,
    created: DateTime<Utc>,
    block_list_offset: u64,
    block_count: u64,
}

/// An open snapshot volume.
///
/// Opening validates the header and parses the full catalog; afterwards the
/// catalog is immutable. The backing file is held with an exclusive lock
/// for the lifetime of the value and released when it is dropped.
pub struct ShadowVolume {
    file: Arc<File>,
    volume_offset: u64,
    maximum_size: u64,
    stores: Vec<StoreRecord>,
}

impl ShadowVolume {
    /// Open a volume and parse its snapshot catalog.
    ///
    /// # Arguments
    /// * `path` - Backing volume file
    /// * `volume_offset` - Byte offset of the volume within the file (the
    ///   volume may be embedded inside a larger image)
    pub fn open(path: &Path, volume_offset: u64) -> Result<Self, SnapshotError> {
        let file: File = File::open(path)
            .map_err(|e| SnapshotError::io(format!("opening {}", path.display()), e))?;
        file.try_lock_exclusive()
            .map_err(|e| SnapshotError::io(format!("locking {}", path.display()), e))?;

        let file = Arc::new(file);
        let header: VolumeHeader = read_header(&file, volume_offset)?;
        let stores: Vec<StoreRecord> = read_catalog(&file, volume_offset, header.catalog_offset)?;
        log::debug!(
            "opened volume {} at offset {}: {} snapshot(s)",
            path.display(),
            volume_offset,
            stores.len()
        );

        Ok(Self {
            file,
            volume_offset,
            maximum_size: header.maximum_size,
            stores,
        })
    }

    /// Number of snapshots present on the volume.
    pub fn snapshot_count(&self) -> usize {
        self.stores.len()
    }

    /// Diff-area size limit recorded in the volume header, in bytes.
    pub fn maximum_size(&self) -> u64 {
        self.maximum_size
    }

    /// Enumerate snapshots in catalog order.
    pub fn snapshots(&self) -> Vec<SnapshotInfo> {
        self.stores
            .iter()
            .enumerate()
            .map(|(i, s)| SnapshotInfo {
                stack_position: i + 1,
                sequence: s.sequence,
                created: s.created,
            })
            .collect()
    }

    /// Select one snapshot by 1-based stack position and build its block
    /// map.
    ///
    /// # Arguments
    /// * `stack_position` - Ordinal of the snapshot to reconstruct
    pub fn select(&self, stack_position: usize) -> Result<ShadowCopy, SnapshotError> {
        let store: &StoreRecord = stack_position
            .checked_sub(1)
            .and_then(|i| self.stores.get(i))
            .ok_or(SnapshotError::NoSuchSnapshot {
                position: stack_position,
                available: self.stores.len(),
            })?;

        let blocks: BTreeMap<u64, Block> = read_block_list(
            &self.file,
            self.volume_offset,
            store.block_list_offset,
            store.block_count,
        )?;
        log::debug!(
            "selected snapshot {} (sequence {}): size {} bytes, {} saved block(s)",
            stack_position,
            store.sequence,
            store.volume_size,
            blocks.len()
        );

        Ok(ShadowCopy::new(
            self.file.clone(),
            self.volume_offset,
            store.volume_size,
            blocks,
        ))
    }
}

fn read_header(file: &File, volume_offset: u64) -> Result<VolumeHeader, SnapshotError> {
    let mut buf = [0u8; HEADER_SIZE];
    file.read_exact_at(&mut buf, volume_offset + VOLUME_HEADER_OFFSET)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                SnapshotError::invalid("volume too small to carry a snapshot header")
            }
            _ => SnapshotError::io("reading volume header", e),
        })?;
    VolumeHeader::parse(&buf)
}

fn read_catalog(
    file: &File,
    volume_offset: u64,
    catalog_offset: u64,
) -> Result<Vec<StoreRecord>, SnapshotError> {
    // Catalog offset 0 means snapshotting is enabled but no snapshot has
    // been taken yet.
    if catalog_offset == 0 {
        return Ok(Vec::new());
    }

    struct StoreMeta {
        guid: [u8; 16],
        volume_size: u64,
        sequence: u64,
        created: DateTime<Utc>,
    }

    // The catalog offset is untrusted; the whole window the scan below can
    // touch must be addressable.
    let catalog_len: u64 = (MAX_CATALOG_ENTRIES * CATALOG_ENTRY_SIZE) as u64;
    let base: u64 = volume_offset
        .checked_add(catalog_offset)
        .filter(|b| b.checked_add(catalog_len).is_some())
        .ok_or_else(|| SnapshotError::invalid("catalog offset out of range"))?;

    let mut metas: Vec<StoreMeta> = Vec::new();
    let mut regions: Vec<([u8; 16], u64, u64)> = Vec::new();

    for index in 0..MAX_CATALOG_ENTRIES {
        let mut buf = [0u8; CATALOG_ENTRY_SIZE];
        let at: u64 = base + (index * CATALOG_ENTRY_SIZE) as u64;
        file.read_exact_at(&mut buf, at).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                SnapshotError::invalid("catalog is truncated")
            }
            _ => SnapshotError::io("reading catalog entry", e),
        })?;

        match CatalogEntry::parse(&buf)? {
            CatalogEntry::End => {
                let mut stores: Vec<StoreRecord> = Vec::with_capacity(metas.len());
                for meta in metas {
                    let (_, block_list_offset, block_count) = *regions
                        .iter()
                        .find(|(guid, _, _)| *guid == meta.guid)
                        .ok_or_else(|| {
                            SnapshotError::invalid("store without a region entry")
                        })?;
                    stores.push(StoreRecord {
                        volume_size: meta.volume_size,
                        sequence: meta.sequence,
                        created: meta.created,
                        block_list_offset,
                        block_count,
                    });
                }
                return Ok(stores);
            }
            CatalogEntry::Padding => continue,
            CatalogEntry::Store {
                guid,
                volume_size,
                sequence,
                created,
            } => {
                let created: DateTime<Utc> = filetime_to_utc(created)
                    .ok_or_else(|| SnapshotError::invalid("store creation time out of range"))?;
                metas.push(StoreMeta {
                    guid,
                    volume_size,
                    sequence,
                    created,
                });
            }
            CatalogEntry::Region {
                guid,
                block_list_offset,
                block_count,
            } => {
                regions.push((guid, block_list_offset, block_count));
            }
        }
    }

    Err(SnapshotError::invalid("catalog has no end marker"))
}

fn read_block_list(
    file: &File,
    volume_offset: u64,
    block_list_offset: u64,
    block_count: u64,
) -> Result<BTreeMap<u64, Block>, SnapshotError> {
    if block_count > MAX_BLOCK_DESCRIPTORS {
        return Err(SnapshotError::invalid(format!(
            "block descriptor count {} exceeds limit",
            block_count
        )));
    }

    // The list offset comes from a region entry; the count is already
    // bounded, so the full list window must be addressable.
    let list_len: u64 = block_count * BLOCK_DESCRIPTOR_SIZE as u64;
    let base: u64 = volume_offset
        .checked_add(block_list_offset)
        .filter(|b| b.checked_add(list_len).is_some())
        .ok_or_else(|| SnapshotError::invalid("block descriptor list offset out of range"))?;

    let mut blocks: BTreeMap<u64, Block> = BTreeMap::new();
    for index in 0..block_count {
        let mut buf = [0u8; BLOCK_DESCRIPTOR_SIZE];
        let at: u64 = base + index * BLOCK_DESCRIPTOR_SIZE as u64;
        file.read_exact_at(&mut buf, at).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                SnapshotError::invalid("block descriptor list is truncated")
            }
            _ => SnapshotError::io("reading block descriptor", e),
        })?;

        let desc: BlockDescriptor = BlockDescriptor::parse(&buf);
        if desc.original_offset % SNAPSHOT_BLOCK_SIZE != 0 {
            return Err(SnapshotError::invalid(format!(
                "block descriptor offset {} is not block-aligned",
                desc.original_offset
            )));
        }
        let unused: bool = desc.flags & BLOCK_FLAG_UNUSED != 0;
        // A saved block is read as one full block at volume_offset +
        // store_offset; reject descriptors that would put any of it past
        // the addressable range.
        if !unused
            && desc
                .store_offset
                .checked_add(SNAPSHOT_BLOCK_SIZE)
                .and_then(|end| end.checked_add(volume_offset))
                .is_none()
        {
            return Err(SnapshotError::invalid(format!(
                "block descriptor store offset {} out of range",
                desc.store_offset
            )));
        }
        blocks.insert(
            desc.original_offset,
            Block {
                store_offset: desc.store_offset,
                unused,
            },
        );
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_open_disabled_volume() {
        let file = testutil::disabled_volume();
        match ShadowVolume::open(file.path(), 0) {
            Err(SnapshotError::SnapshotsDisabled) => {}
            other => panic!("expected SnapshotsDisabled, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_invalid_identifier() {
        let file = testutil::invalid_volume();
        match ShadowVolume::open(file.path(), 0) {
            Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected InvalidVolumeFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let missing = std::path::Path::new("/nonexistent/volume.img");
        match ShadowVolume::open(missing, 0) {
            Err(SnapshotError::Io { .. }) => {}
            other => panic!("expected Io, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_truncated_volume_is_invalid() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 100]).unwrap();
        match ShadowVolume::open(file.path(), 0) {
            Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected InvalidVolumeFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_enumerate_in_catalog_order() {
        let file = testutil::two_store_volume(0);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        assert_eq!(volume.snapshot_count(), 2);

        let infos: Vec<SnapshotInfo> = volume.snapshots();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].stack_position, 1);
        assert_eq!(infos[0].sequence, testutil::SEQ_A);
        assert_eq!(infos[0].created, testutil::created_a());
        assert_eq!(infos[1].stack_position, 2);
        assert_eq!(infos[1].sequence, testutil::SEQ_B);
        assert_eq!(infos[1].created, testutil::created_b());
    }

    #[test]
    fn test_enumerate_is_repeatable() {
        let file = testutil::two_store_volume(0);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        assert_eq!(volume.snapshots(), volume.snapshots());
    }

    #[test]
    fn test_select_out_of_range() {
        let file = testutil::two_store_volume(0);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        for position in [0usize, 3, 99] {
            match volume.select(position) {
                Err(SnapshotError::NoSuchSnapshot {
                    position: p,
                    available,
                }) => {
                    assert_eq!(p, position);
                    assert_eq!(available, 2);
                }
                other => panic!("expected NoSuchSnapshot, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_select_reports_store_size() {
        let file = testutil::two_store_volume(0);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        assert_eq!(volume.select(1).unwrap().size(), testutil::SIZE_A);
        assert_eq!(volume.select(2).unwrap().size(), testutil::SIZE_B);
    }

    #[test]
    fn test_reports_maximum_size() {
        let file = testutil::two_store_volume(0);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        assert_eq!(volume.maximum_size(), testutil::MAX_SIZE);
    }

    #[test]
    fn test_catalog_offset_near_u64_max_is_invalid() {
        let file = testutil::two_store_volume(0);
        testutil::patch_u64(&file, VOLUME_HEADER_OFFSET + 24, u64::MAX - 64);
        match ShadowVolume::open(file.path(), 0) {
            Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected InvalidVolumeFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_block_list_offset_near_u64_max_is_invalid() {
        let file = testutil::two_store_volume(0);
        // Region entry of store A is the second catalog entry; its block
        // list offset sits 24 bytes in.
        testutil::patch_u64(&file, testutil::CATALOG_OFF + 128 + 24, u64::MAX - 16);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        match volume.select(1) {
            Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected InvalidVolumeFormat, got {:?}", other.map(|_| ())),
        }
        // The other store is untouched and still selectable.
        assert_eq!(volume.select(2).unwrap().size(), testutil::SIZE_B);
    }

    #[test]
    fn test_store_offset_near_u64_max_is_invalid() {
        let file = testutil::two_store_volume(0);
        // Store A's first descriptor holds its store offset 8 bytes in.
        testutil::patch_u64(&file, testutil::BLOCK_LIST_A + 8, u64::MAX - 8);
        let volume = ShadowVolume::open(file.path(), 0).unwrap();
        match volume.select(1) {
            Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected InvalidVolumeFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_embedded_volume() {
        let file = testutil::two_store_volume(4096);
        let volume = ShadowVolume::open(file.path(), 4096).unwrap();
        assert_eq!(volume.snapshot_count(), 2);
        // Same volume parsed at offset 0 is garbage.
        drop(volume);
        match ShadowVolume::open(file.path(), 0) {
            Err(SnapshotError::SnapshotsDisabled)
            | Err(SnapshotError::InvalidVolumeFormat { .. }) => {}
            other => panic!("expected a format error, got {:?}", other.map(|_| ())),
        }
    }
}
