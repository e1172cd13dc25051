//! VFS operations, independent of the FUSE wire layer.
//!
//! The namespace is fixed for the lifetime of a mount: inode 1 is the root
//! directory and inode 2 is the synthetic shadow copy file. Handles are
//! stateless capability tags; there is no open-file table, so releasing a
//! handle has nothing to do.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use fuser::{FileAttr, FileType};
use shadowmount_common::{
    ATTR_BLOCK_SIZE, DIR_HANDLE, FILE_HANDLE, IMAGE_INO, IMAGE_NAME, ROOT_INO,
};

use crate::error::VfsError;
use crate::source::SnapshotSource;

/// One directory entry produced by [`ShadowVfs::read_dir`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    /// Inode of the entry.
    pub ino: u64,
    /// Entry kind.
    pub kind: FileType,
    /// Entry name.
    pub name: &'static str,
    /// Cursor to pass to resume listing after this entry.
    pub next_cursor: i64,
}

/// Filesystem statistics for the synthetic mount.
///
/// Capacity and inode counts are zero; only the block size carries
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStatistics {
    /// Total data blocks. Always zero.
    pub blocks: u64,
    /// Free blocks. Always zero.
    pub bfree: u64,
    /// Blocks available to unprivileged users. Always zero.
    pub bavail: u64,
    /// Total inodes. Always zero.
    pub files: u64,
    /// Free inodes. Always zero.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

/// The fixed two-entry virtual filesystem over one snapshot source.
pub struct ShadowVfs {
    source: Arc<dyn SnapshotSource>,
    uid: u32,
    gid: u32,
}

impl ShadowVfs {
    /// Create a VFS over a snapshot source.
    ///
    /// # Arguments
    /// * `source` - Positioned-read view of the selected snapshot
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Synthesize attributes for one of the two fixed inodes.
    ///
    /// The image size is re-queried from the source on every call; a
    /// snapshot's reported size may be determined lazily, so it is never
    /// cached here.
    pub fn attributes_of(&self, ino: u64) -> Result<FileAttr, VfsError> {
        match ino {
            ROOT_INO => Ok(self.dir_attr()),
            IMAGE_INO => Ok(self.image_attr()),
            other => Err(VfsError::BadDescriptor(other)),
        }
    }

    /// Look up a name within a directory.
    pub fn lookup(&self, parent: u64, name: &str) -> Result<FileAttr, VfsError> {
        if parent == ROOT_INO && name == IMAGE_NAME {
            Ok(self.image_attr())
        } else {
            Err(VfsError::NotFound)
        }
    }

    /// Open the shadow copy file.
    ///
    /// Write intent is rejected before the inode is even considered;
    /// this filesystem has no mutable state to offer.
    ///
    /// # Arguments
    /// * `ino` - Inode to open
    /// * `flags` - POSIX open flags
    pub fn open_file(&self, ino: u64, flags: i32) -> Result<u64, VfsError> {
        let access: i32 = flags & libc::O_ACCMODE;
        if access != libc::O_RDONLY || flags & (libc::O_APPEND | libc::O_TRUNC) != 0 {
            return Err(VfsError::ReadOnly);
        }
        if ino != IMAGE_INO {
            return Err(VfsError::NotFound);
        }
        Ok(FILE_HANDLE)
    }

    /// Read reconstructed snapshot content.
    ///
    /// Returns `min(length, size - offset)` bytes; an offset at or beyond
    /// the end of the stream yields an empty buffer, never an error.
    ///
    /// # Arguments
    /// * `fh` - Handle returned by [`Self::open_file`]
    /// * `offset` - Byte offset within the stream
    /// * `length` - Maximum number of bytes to return
    pub fn read(&self, fh: u64, offset: i64, length: u32) -> Result<Vec<u8>, VfsError> {
        if fh != FILE_HANDLE {
            return Err(VfsError::BadDescriptor(fh));
        }
        if offset < 0 {
            return Err(VfsError::BadArgument);
        }
        self.source.read_at(offset as u64, length as usize)
    }

    /// Release a file handle. Nothing to do: handles carry no state.
    pub fn release(&self, _fh: u64) {}

    /// Open the root directory.
    pub fn open_dir(&self, ino: u64) -> Result<u64, VfsError> {
        if ino == ROOT_INO {
            Ok(DIR_HANDLE)
        } else {
            Err(VfsError::NotFound)
        }
    }

    /// List directory entries from `cursor`.
    ///
    /// Cursor 0 yields the single image entry; any nonzero cursor means
    /// the listing has already been fully produced and yields nothing.
    /// Both cases are idempotent across repeated calls.
    pub fn read_dir(&self, fh: u64, cursor: i64) -> Result<Vec<DirEntry>, VfsError> {
        if fh != DIR_HANDLE {
            return Err(VfsError::BadDescriptor(fh));
        }
        if cursor != 0 {
            return Ok(Vec::new());
        }
        Ok(vec![DirEntry {
            ino: IMAGE_INO,
            kind: FileType::RegularFile,
            name: IMAGE_NAME,
            next_cursor: 1,
        }])
    }

    /// Release a directory handle. Nothing to do.
    pub fn release_dir(&self, _fh: u64) {}

    /// Filesystem statistics: block size only, zero capacity.
    pub fn statistics(&self) -> FsStatistics {
        FsStatistics {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: ATTR_BLOCK_SIZE,
            namelen: 255,
            frsize: ATTR_BLOCK_SIZE,
        }
    }

    fn image_attr(&self) -> FileAttr {
        let size: u64 = self.source.size();
        FileAttr {
            ino: IMAGE_INO,
            size,
            blocks: (size + 511) / 512,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind: FileType::RegularFile,
            perm: 0o444,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: ATTR_BLOCK_SIZE,
            flags: 0,
        }
    }

    fn dir_attr(&self) -> FileAttr {
        FileAttr {
            ino: ROOT_INO,
            size: 0,
            blocks: 0,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind: FileType::Directory,
            perm: 0o555,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: ATTR_BLOCK_SIZE,
            flags: 0,
        }
    }
}
