//! Configuration options for a shadow copy mount.

use std::time::Duration;

use shadowmount_snapshot::FillMode;

/// Options controlling mount behavior.
///
/// The namespace never changes while mounted, so the kernel cache
/// timeouts default to a generous day.
///
/// # Example
///
/// ```ignore
/// let options = MountOptions::default()
///     .with_fill(FillMode::Alternate)
///     .with_attr_ttl_secs(3600);
/// ```
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Materialization policy for blocks the snapshot never saved.
    pub fill: FillMode,
    /// Attribute cache timeout in seconds.
    pub attr_ttl_secs: u64,
    /// Directory entry cache timeout in seconds.
    pub entry_ttl_secs: u64,
    /// Filesystem name shown in mount tables.
    pub fsname: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fill: FillMode::Default,
            attr_ttl_secs: 86400,
            entry_ttl_secs: 86400,
            fsname: "shadowmount".to_string(),
        }
    }
}

impl MountOptions {
    /// Set the fill mode.
    ///
    /// # Arguments
    /// * `fill` - Fill mode forwarded to every snapshot read
    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    /// Set the attribute cache timeout.
    ///
    /// # Arguments
    /// * `secs` - Timeout in seconds
    pub fn with_attr_ttl_secs(mut self, secs: u64) -> Self {
        self.attr_ttl_secs = secs;
        self
    }

    /// Set the entry cache timeout.
    ///
    /// # Arguments
    /// * `secs` - Timeout in seconds
    pub fn with_entry_ttl_secs(mut self, secs: u64) -> Self {
        self.entry_ttl_secs = secs;
        self
    }

    /// Set the filesystem name.
    ///
    /// # Arguments
    /// * `fsname` - Name shown in mount tables
    pub fn with_fsname(mut self, fsname: impl Into<String>) -> Self {
        self.fsname = fsname.into();
        self
    }

    /// Attribute cache timeout as a [`Duration`].
    pub fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.attr_ttl_secs)
    }

    /// Entry cache timeout as a [`Duration`].
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs)
    }
}
