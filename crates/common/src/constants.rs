//! Fixed identifiers shared by the snapshot reader and the VFS.
//!
//! The mounted namespace is static: one root directory and one synthetic
//! file. Every inode and handle value is known at compile time, so they
//! live here as named constants rather than in any runtime allocator.

/// Inode of the root directory.
pub const ROOT_INO: u64 = 1;

/// Inode of the synthetic shadow copy file.
pub const IMAGE_INO: u64 = 2;

/// Handle returned by `opendir` on the root directory.
pub const DIR_HANDLE: u64 = 1;

/// Handle returned by `open` on the shadow copy file.
pub const FILE_HANDLE: u64 = 2;

/// Name of the single file served from the root directory.
pub const IMAGE_NAME: &str = "shadow_copy.raw";

/// Block size reported through getattr and statfs.
pub const ATTR_BLOCK_SIZE: u32 = 512;

/// Snapshot allocation unit (16 KiB), matching the on-disk store layout.
pub const SNAPSHOT_BLOCK_SIZE: u64 = 0x4000;

/// Byte offset of the snapshot volume header within the volume.
pub const VOLUME_HEADER_OFFSET: u64 = 7680;

/// Filler byte emitted in alternate fill mode for blocks whose snapshot
/// copy was never taken (the live volume may have overwritten them).
pub const ALTERNATE_FILL_BYTE: u8 = 0xbd;
