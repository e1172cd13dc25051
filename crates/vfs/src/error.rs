//! Error types for VFS operations.

use thiserror::Error;

/// Per-request failures returned by VFS operations.
///
/// Every variant maps to exactly one errno at the FUSE boundary; nothing is
/// retried and no partial result is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Lookup or open against a name or inode outside the fixed two-entry
    /// namespace.
    #[error("No such entry")]
    NotFound,

    /// Operation against an inode or handle value outside the fixed known
    /// set.
    #[error("Unknown inode or handle {0}")]
    BadDescriptor(u64),

    /// Operation that would mutate the namespace or content, or an open
    /// carrying write intent.
    #[error("Filesystem is read-only")]
    ReadOnly,

    /// Negative or overflowing offset, or similar malformed argument.
    #[error("Invalid argument")]
    BadArgument,

    /// Backing-store I/O failure during a read.
    #[error("Snapshot read failed: {0}")]
    Io(String),
}

impl VfsError {
    /// The errno reported to the kernel for this error.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::NotFound => libc::ENOENT,
            VfsError::BadDescriptor(_) => libc::EBADF,
            VfsError::ReadOnly => libc::EROFS,
            VfsError::BadArgument => libc::EINVAL,
            VfsError::Io(_) => libc::EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(VfsError::NotFound.errno(), libc::ENOENT);
        assert_eq!(VfsError::BadDescriptor(42).errno(), libc::EBADF);
        assert_eq!(VfsError::ReadOnly.errno(), libc::EROFS);
        assert_eq!(VfsError::BadArgument.errno(), libc::EINVAL);
        assert_eq!(VfsError::Io("boom".into()).errno(), libc::EIO);
    }
}
