pub mod dashboard;
pub mod detach;
pub mod report;
pub mod track;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use detach::{detach, Detached};
use report::{process_report_command, ReportCommand};
use tracing::{error, level_filters::LevelFilter};

use crate::{
    tracker::{
        config::{TrackerConfig, DEFAULT_FLUSH_INTERVAL},
        lock::DEFAULT_LOCK_PORT,
        Tracker,
    },
    utils::{dir::resolve_log_dir, logging::enable_logging, runtime::multi_thread_runtime},
};

/// Printed after every usage error.
pub const HELP_GUIDANCE: &str = "Please type (keeptrack help) to see available commands.";

#[derive(Parser, Debug)]
#[command(name = "keeptrack", version, disable_help_subcommand = true)]
#[command(
    about = "Logs keyboard, mouse and focused app activity into a CSV file",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(
        short,
        long,
        global = true,
        help = "Directory of log.csv and the logs folder. Defaults to the current directory"
    )]
    dir: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        help = "Verbose logging to the console, and a note after every logged interval"
    )]
    log: bool,
}

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct TrackingArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_FLUSH_INTERVAL,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two logged rows"
    )]
    interval: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_LOCK_PORT,
        help = "Local port held while tracking to keep a second tracker out"
    )]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start tracking in this terminal")]
    Start {
        #[command(flatten)]
        tracking: TrackingArgs,
        #[arg(long, help = "Keep tracking in the background after the terminal closes")]
        detach: bool,
    },
    #[command(about = "Start tracking with a live dashboard")]
    Tui {
        #[command(flatten)]
        tracking: TrackingArgs,
    },
    #[command(about = "Summarize the logged activity")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Print help for keeptrack or one of its commands")]
    Help { command: Option<String> },
}

fn tracker_config(dir: PathBuf, tracking: TrackingArgs, notify: bool) -> TrackerConfig {
    TrackerConfig {
        flush_interval: tracking.interval,
        lock_port: tracking.port,
        notify,
        ..TrackerConfig::new(dir)
    }
}

/// Entry point of the binary. Usage errors are answered with a pointer to `help` and a clean
/// exit, anything else failing ends with status 1.
pub fn run_cli() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => return usage_error(e),
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast::<clap::Error>() {
            Ok(e) => usage_error(e),
            Err(e) => {
                error!("Command failed {e:?}");
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn usage_error(e: clap::Error) -> ExitCode {
    let _ = e.print();
    if !matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        println!("{HELP_GUIDANCE}");
    }
    ExitCode::SUCCESS
}

fn logging_level(log: bool) -> Option<LevelFilter> {
    if log {
        Some(LevelFilter::TRACE)
    } else {
        None
    }
}

fn run(args: Args) -> Result<()> {
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Help { command } => print_help(command),
        Commands::Start {
            tracking,
            detach: background,
        } => process_start(resolve_log_dir(args.dir)?, tracking, background, args.log),
        Commands::Tui { tracking } => {
            let dir = resolve_log_dir(args.dir)?;
            enable_logging(&dir.join("logs"), logging_level(args.log), false)?;
            let config = tracker_config(dir, tracking, false);
            multi_thread_runtime()?.block_on(dashboard::run_dashboard(config))
        }
        Commands::Report { command } => {
            let dir = resolve_log_dir(args.dir)?;
            enable_logging(&dir.join("logs"), logging_level(args.log), args.log)?;
            multi_thread_runtime()?.block_on(process_report_command(command, &dir))
        }
    }
}

/// Takes the instance lock in the calling process, so a second `start` is refused on the
/// terminal even with `--detach`.
fn process_start(
    dir: PathBuf,
    tracking: TrackingArgs,
    background: bool,
    log: bool,
) -> Result<()> {
    let config = tracker_config(dir.clone(), tracking, log);
    let tracker = Tracker::acquire(config)?;
    let tracker = if background {
        match detach(tracker)? {
            Detached::Parent => return Ok(()),
            Detached::Child(tracker) => tracker,
        }
    } else {
        tracker
    };
    // Logging threads don't survive the fork, so it starts on the tracking side.
    enable_logging(&dir.join("logs"), logging_level(log), log)?;
    multi_thread_runtime()?.block_on(track::process_start_command(tracker))
}

fn print_help(command: Option<String>) -> Result<()> {
    let mut root = Args::command();
    let Some(name) = command else {
        root.print_help()?;
        return Ok(());
    };
    match root.find_subcommand_mut(&name) {
        Some(subcommand) => {
            subcommand.print_help()?;
            Ok(())
        }
        None => Err(root
            .error(
                ErrorKind::InvalidSubcommand,
                format!("unrecognized command '{name}'"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::tracker::lock::LockError;

    use super::*;

    #[test]
    fn interval_must_be_positive() {
        let error = Args::try_parse_from(["keeptrack", "start", "--interval", "0"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn global_options_follow_subcommands() {
        let args =
            Args::try_parse_from(["keeptrack", "tui", "-d", "/tmp/activity", "--log"]).unwrap();

        assert_eq!(args.dir, Some(PathBuf::from("/tmp/activity")));
        assert!(args.log);
        let Some(Commands::Tui { tracking }) = args.command else {
            panic!("expected tui");
        };
        assert_eq!(tracking.interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(tracking.port, DEFAULT_LOCK_PORT);
    }

    #[test]
    fn start_flags() {
        let args =
            Args::try_parse_from(["keeptrack", "start", "--interval", "60", "--detach"]).unwrap();

        let Some(Commands::Start { tracking, detach }) = args.command else {
            panic!("expected start");
        };
        assert_eq!(tracking.interval, 60);
        assert!(detach);
    }

    #[test]
    fn unknown_commands_are_usage_errors() {
        let error = Args::try_parse_from(["keeptrack", "track"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn help_accepts_a_command_name() {
        let args = Args::try_parse_from(["keeptrack", "help", "report"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Help { command: Some(ref c) }) if c == "report"
        ));
        assert!(print_help(Some("report".into())).is_ok());
        let error = print_help(Some("nope".into())).unwrap_err();
        assert!(error.downcast_ref::<clap::Error>().is_some());
    }

    #[test]
    fn busy_lock_refuses_start_before_detaching() {
        let dir = tempfile::tempdir().unwrap();
        let held = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = held.local_addr().unwrap().port();
        let tracking = TrackingArgs {
            interval: DEFAULT_FLUSH_INTERVAL,
            port,
        };

        let error = process_start(dir.path().to_path_buf(), tracking, true, false).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<LockError>(),
            Some(LockError::AlreadyRunning { port: p }) if *p == port
        ));
        assert!(!dir.path().join("log.csv").exists());
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
