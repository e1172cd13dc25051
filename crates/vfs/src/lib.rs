//! FUSE-based virtual filesystem exposing one volume shadow copy as a
//! single synthetic read-only file.
//!
//! Standard tools can open, seek, and read the reconstructed snapshot
//! stream without understanding the on-disk snapshot format. The served
//! namespace is fixed: a root directory containing exactly one file.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE Interface (fuse::ShadowFs, errno mapping, EROFS wall)
//! Layer 2: VFS Operations (core::ShadowVfs: attributes, lookup, read)
//! Layer 1: Snapshot source (source::SnapshotSource over a ShadowCopy)
//! ```

pub mod core;
pub mod error;
pub mod fuse;
pub mod mount;
pub mod options;
pub mod source;

pub use self::core::{DirEntry, FsStatistics, ShadowVfs};
pub use self::error::VfsError;
pub use self::fuse::ShadowFs;
pub use self::mount::{mount_shadow_copy, MountError};
pub use self::options::MountOptions;
pub use self::source::{SelectedCopy, SnapshotSource};
