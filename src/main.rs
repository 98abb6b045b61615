use std::process::ExitCode;

use keeptrack::cli::run_cli;

fn main() -> ExitCode {
    run_cli()
}
