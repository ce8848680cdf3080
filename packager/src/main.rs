//! S32DS packager CLI entrypoint.
//!
//! Reports go to stdout; logs and errors go to stderr.

use clap::Parser;
use s32ds_packager::cli::Cli;
use s32ds_packager::commands;
use s32ds_packager::error::{PackagerError, Result, error_chain};
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout().lock();
    let run_result = commands::run(&cli, &mut stdout);
    let mut stderr = std::io::stderr();
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over `-v`/`-q`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter_directive()));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        // A subscriber is already installed; keep it.
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}", render_error(&err)));
            1
        }
    }
}

fn render_error(err: &PackagerError) -> String {
    if err.is_user_error() {
        err.to_string()
    } else {
        error_chain(err)
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
