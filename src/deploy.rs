//! Publishing the distribution tree.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Deploy error.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The distribution tree is missing; run a build first
    #[error("Distribution tree not found at {} (run `sitepipe build` first)", .0.display())]
    MissingDist(PathBuf),
    /// No publish destination configured
    #[error("No publish directory configured (set [deploy] publish_dir or pass --to)")]
    NoDestination,
    /// Filesystem failure
    #[error("{context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Destination seam for publishing a built distribution tree.
pub trait Publisher {
    /// Publish the tree, returning the number of files delivered.
    fn publish(&mut self, dist_dir: &Path) -> Result<usize, DeployError>;
}

/// Publishes by mirroring the tree into a local directory.
pub struct DirPublisher {
    dest: PathBuf,
}

impl DirPublisher {
    /// Publisher targeting a local directory.
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl Publisher for DirPublisher {
    fn publish(&mut self, dist_dir: &Path) -> Result<usize, DeployError> {
        if !dist_dir.is_dir() {
            return Err(DeployError::MissingDist(dist_dir.to_path_buf()));
        }
        copy_dir(dist_dir, &self.dest)
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<usize, DeployError> {
    fs::create_dir_all(to).map_err(|source| DeployError::Io {
        context: format!("creating {}", to.display()),
        source,
    })?;

    let entries = fs::read_dir(from).map_err(|source| DeployError::Io {
        context: format!("reading {}", from.display()),
        source,
    })?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|source| DeployError::Io {
            context: format!("reading {}", from.display()),
            source,
        })?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        if src.is_dir() {
            count += copy_dir(&src, &dest)?;
        } else {
            fs::copy(&src, &dest).map_err(|source| DeployError::Io {
                context: format!("copying {}", src.display()),
                source,
            })?;
            count += 1;
        }
    }
    Ok(count)
}
