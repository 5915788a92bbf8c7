//! `sitepipe scaffold`.

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::console::timestamp;
use crate::scaffold::{scaffold_project, ScaffoldError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run_scaffold(path: Option<&Path>, name: Option<&str>) -> ExitCode {
    let root: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(err) => {
                eprintln!("Failed to resolve current directory: {}", err);
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };

    let name = match name {
        Some(name) => name.to_string(),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "site".to_string()),
    };

    match scaffold_project(&root, &name) {
        Ok(report) => {
            for path in &report.created {
                println!("[{}] created {}", timestamp(), path.display());
            }
            for path in &report.skipped {
                println!("[{}] exists, skipped {}", timestamp(), path.display());
            }
            println!(
                "[{}] Project '{}' ready. Run `sitepipe dev` to start.",
                timestamp(),
                name
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err @ ScaffoldError::InvalidName(_)) => {
            eprintln!("{}", err);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
