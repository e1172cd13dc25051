use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mount one volume shadow copy as a single read-only file.
#[derive(Parser, Debug)]
#[command(name = "shadowmount", version, about = "Expose a volume shadow copy as a synthetic read-only file")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Mount a snapshot; unsaved regions read from the live volume
    Mount {
        /// Backing volume file
        volume: PathBuf,
        /// Byte offset of the volume within the file
        volume_offset: u64,
        /// Snapshot to expose (1-based stack position)
        stack_position: usize,
        /// Existing directory to mount on
        mountpoint: PathBuf,
    },
    /// Mount a snapshot; unsaved regions are filled with a marker pattern
    MountAltfill {
        /// Backing volume file
        volume: PathBuf,
        /// Byte offset of the volume within the file
        volume_offset: u64,
        /// Snapshot to expose (1-based stack position)
        stack_position: usize,
        /// Existing directory to mount on
        mountpoint: PathBuf,
    },
    /// List the snapshots present on a volume
    List {
        /// Backing volume file
        volume: PathBuf,
        /// Byte offset of the volume within the file
        volume_offset: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount() {
        let cli = Cli::try_parse_from(["shadowmount", "mount", "vol.img", "0", "2", "/mnt/shadow"])
            .unwrap();
        match cli.cmd {
            Cmd::Mount {
                volume,
                volume_offset,
                stack_position,
                mountpoint,
            } => {
                assert_eq!(volume, PathBuf::from("vol.img"));
                assert_eq!(volume_offset, 0);
                assert_eq!(stack_position, 2);
                assert_eq!(mountpoint, PathBuf::from("/mnt/shadow"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_mount_altfill() {
        let cli = Cli::try_parse_from([
            "shadowmount",
            "mount-altfill",
            "vol.img",
            "4096",
            "1",
            "/mnt/shadow",
        ])
        .unwrap();
        assert!(matches!(cli.cmd, Cmd::MountAltfill { volume_offset: 4096, .. }));
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["shadowmount", "list", "vol.img", "0"]).unwrap();
        assert!(matches!(cli.cmd, Cmd::List { .. }));
    }

    #[test]
    fn test_missing_arguments_fail_parsing() {
        assert!(Cli::try_parse_from(["shadowmount"]).is_err());
        assert!(Cli::try_parse_from(["shadowmount", "mount", "vol.img"]).is_err());
        assert!(Cli::try_parse_from(["shadowmount", "list"]).is_err());
    }
}
