//! Sitepipe - command-line asset pipeline for static sites

use std::process::ExitCode;

use sitepipe::cli;

fn main() -> ExitCode {
    cli::run()
}
