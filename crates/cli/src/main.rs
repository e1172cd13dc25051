use clap::Parser;
use shadowmount_snapshot::FillMode;

mod cli;
mod cmd_list;
mod cmd_mount;

/// Exit code for operational failures (missing volume, bad mountpoint,
/// nonexistent snapshot).
const EXIT_FAILURE: i32 = 255;

fn main() {
    env_logger::init();

    // Missing or malformed arguments (and --help/--version) print usage
    // and exit cleanly.
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(0);
        }
    };

    let result = match cli.cmd {
        cli::Cmd::Mount {
            volume,
            volume_offset,
            stack_position,
            mountpoint,
        } => cmd_mount::exec(
            volume,
            volume_offset,
            stack_position,
            mountpoint,
            FillMode::Default,
        ),

        cli::Cmd::MountAltfill {
            volume,
            volume_offset,
            stack_position,
            mountpoint,
        } => cmd_mount::exec(
            volume,
            volume_offset,
            stack_position,
            mountpoint,
            FillMode::Alternate,
        ),

        cli::Cmd::List {
            volume,
            volume_offset,
        } => cmd_list::exec(volume, volume_offset),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}
