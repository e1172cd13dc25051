//! Snapshot volume access for shadowmount.
//!
//! This crate owns the on-disk snapshot format: it validates the volume
//! header, parses the catalog of shadow copy stores, and reconstructs the
//! byte stream of one selected snapshot through positioned reads.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: ShadowCopy (block-map reconstruction, pread-based read_at)
//! Layer 1: ShadowVolume (header + catalog parsing, store selection)
//! Layer 0: format (byte-level record layouts)
//! ```

pub mod error;
pub mod format;
pub mod store;
pub mod volume;

pub use error::SnapshotError;
pub use store::{FillMode, ShadowCopy};
pub use volume::{ShadowVolume, SnapshotInfo};

#[cfg(test)]
pub(crate) mod testutil {
    //! Synthetic volume images for tests.

    use std::io::Write;

    use byteorder::{ByteOrder, LittleEndian};
    use chrono::{TimeZone, Utc};
    use shadowmount_common::{utc_to_filetime, SNAPSHOT_BLOCK_SIZE, VOLUME_HEADER_OFFSET};
    use tempfile::NamedTempFile;

    use crate::format::{BLOCK_FLAG_UNUSED, HEADER_RECORD_TYPE, HEADER_VERSION, VOLUME_IDENTIFIER};

    pub(crate) const BLOCK: u64 = SNAPSHOT_BLOCK_SIZE;
    pub(crate) const CATALOG_OFF: u64 = 0x10000;
    pub(crate) const BLOCK_LIST_A: u64 = 0x11000;
    pub(crate) const BLOCK_LIST_B: u64 = 0x12000;
    pub(crate) const STORE_DATA_A: u64 = 0x20000;
    pub(crate) const STORE_DATA_B: u64 = 0x24000;
    pub(crate) const VOLUME_LEN: u64 = 0x28000;

    /// Store A: full three-block volume, one saved block, one unused block,
    /// one block left to the live volume.
    pub(crate) const SIZE_A: u64 = 3 * BLOCK;
    pub(crate) const SEQ_A: u64 = 7;
    /// Store B: two-block volume with a single saved block.
    pub(crate) const SIZE_B: u64 = 2 * BLOCK;
    pub(crate) const SEQ_B: u64 = 9;
    /// Diff-area limit recorded in the header.
    pub(crate) const MAX_SIZE: u64 = 64 * 1024 * 1024;

    pub(crate) fn created_a() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    pub(crate) fn created_b() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 20, 8, 30, 0).unwrap()
    }

    fn put_u32(buf: &mut [u8], at: usize, v: u32) {
        LittleEndian::write_u32(&mut buf[at..at + 4], v);
    }

    fn put_u64(buf: &mut [u8], at: usize, v: u64) {
        LittleEndian::write_u64(&mut buf[at..at + 8], v);
    }

    fn store_entry(guid: u8, volume_size: u64, sequence: u64, created_ft: u64) -> [u8; 128] {
        let mut e = [0u8; 128];
        put_u64(&mut e, 0, 2);
        put_u64(&mut e, 8, volume_size);
        e[16..32].fill(guid);
        put_u64(&mut e, 32, sequence);
        put_u64(&mut e, 40, created_ft);
        e
    }

    fn region_entry(guid: u8, block_list_offset: u64, block_count: u64) -> [u8; 128] {
        let mut e = [0u8; 128];
        put_u64(&mut e, 0, 3);
        e[8..24].fill(guid);
        put_u64(&mut e, 24, block_list_offset);
        put_u64(&mut e, 32, block_count);
        e
    }

    fn block_descriptor(original: u64, store: u64, flags: u32) -> [u8; 32] {
        let mut d = [0u8; 32];
        put_u64(&mut d, 0, original);
        put_u64(&mut d, 8, store);
        put_u32(&mut d, 16, flags);
        d
    }

    fn write_image(image: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(image).unwrap();
        file.flush().unwrap();
        file
    }

    /// Patch one little-endian u64 in a written image, for corruption
    /// tests.
    pub(crate) fn patch_u64(file: &NamedTempFile, at: u64, v: u64) {
        use std::os::unix::fs::FileExt;
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, v);
        file.as_file().write_all_at(&buf, at).unwrap();
    }

    /// A volume with two shadow copies, optionally embedded at a nonzero
    /// offset inside the image file.
    pub(crate) fn two_store_volume(volume_offset: u64) -> NamedTempFile {
        let mut image: Vec<u8> = vec![0u8; (volume_offset + VOLUME_LEN) as usize];
        let vol = volume_offset as usize;

        // Live volume content, one marker byte per block.
        for (i, marker) in [0x11u8, 0x22, 0x33].iter().enumerate() {
            let start: usize = vol + i * BLOCK as usize;
            image[start..start + BLOCK as usize].fill(*marker);
        }

        // Header.
        let h: usize = vol + VOLUME_HEADER_OFFSET as usize;
        image[h..h + 16].copy_from_slice(&VOLUME_IDENTIFIER);
        put_u32(&mut image[h..], 16, HEADER_VERSION);
        put_u32(&mut image[h..], 20, HEADER_RECORD_TYPE);
        put_u64(&mut image[h..], 24, CATALOG_OFF);
        put_u64(&mut image[h..], 32, MAX_SIZE);

        // Catalog: store A, region A, padding, store B, region B, end.
        let ft_a: u64 = utc_to_filetime(created_a()).unwrap();
        let ft_b: u64 = utc_to_filetime(created_b()).unwrap();
        let mut padding = [0u8; 128];
        put_u64(&mut padding, 0, 1);
        let entries: Vec<[u8; 128]> = vec![
            store_entry(0xaa, SIZE_A, SEQ_A, ft_a),
            region_entry(0xaa, BLOCK_LIST_A, 2),
            padding,
            store_entry(0xbb, SIZE_B, SEQ_B, ft_b),
            region_entry(0xbb, BLOCK_LIST_B, 1),
            [0u8; 128],
        ];
        let mut at: usize = vol + CATALOG_OFF as usize;
        for entry in entries {
            image[at..at + 128].copy_from_slice(&entry);
            at += 128;
        }

        // Block lists.
        let a0 = block_descriptor(0, STORE_DATA_A, 0);
        let a1 = block_descriptor(BLOCK, 0, BLOCK_FLAG_UNUSED);
        let la: usize = vol + BLOCK_LIST_A as usize;
        image[la..la + 32].copy_from_slice(&a0);
        image[la + 32..la + 64].copy_from_slice(&a1);
        let b0 = block_descriptor(0, STORE_DATA_B, 0);
        let lb: usize = vol + BLOCK_LIST_B as usize;
        image[lb..lb + 32].copy_from_slice(&b0);

        // Store data.
        let da: usize = vol + STORE_DATA_A as usize;
        image[da..da + BLOCK as usize].fill(0xa1);
        let db: usize = vol + STORE_DATA_B as usize;
        image[db..db + BLOCK as usize].fill(0xb1);

        write_image(&image)
    }

    /// A volume whose header region is all zeros: snapshotting disabled.
    pub(crate) fn disabled_volume() -> NamedTempFile {
        write_image(&vec![0u8; (VOLUME_HEADER_OFFSET + 4096) as usize])
    }

    /// A volume with garbage where the identifier should be.
    pub(crate) fn invalid_volume() -> NamedTempFile {
        let mut image: Vec<u8> = vec![0u8; (VOLUME_HEADER_OFFSET + 4096) as usize];
        image[VOLUME_HEADER_OFFSET as usize..VOLUME_HEADER_OFFSET as usize + 16]
            .copy_from_slice(b"not a vss volume");
        write_image(&image)
    }
}
