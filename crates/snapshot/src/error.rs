//! Error types for snapshot volume access.

use thiserror::Error;

/// Errors that can occur while opening a volume or reading a shadow copy.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The volume carries no snapshot header at all.
    #[error("Snapshots are disabled on this volume")]
    SnapshotsDisabled,

    /// The volume header or catalog is not in the expected format.
    #[error("Invalid volume format: {reason}")]
    InvalidVolumeFormat {
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// The requested stack position does not exist on this volume.
    #[error("No snapshot at stack position {position} ({available} available)")]
    NoSuchSnapshot {
        /// The stack position that was requested (1-based).
        position: usize,
        /// Number of snapshots present on the volume.
        available: usize,
    },

    /// A read offset outside the addressable range.
    #[error("Read offset {offset} is out of addressable range")]
    BadOffset {
        /// The offending offset.
        offset: u64,
    },

    /// I/O failure against the backing volume file.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the volume access was doing when it failed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Create an `Io` error with context.
    ///
    /// # Arguments
    /// * `context` - What was being done when the error occurred
    /// * `source` - The underlying I/O error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an `InvalidVolumeFormat` error.
    ///
    /// # Arguments
    /// * `reason` - Description of the format violation
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidVolumeFormat {
            reason: reason.into(),
        }
    }
}
