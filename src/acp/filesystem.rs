//! Local file access on behalf of the agent
//!
//! Paths must be absolute; nothing is resolved against a working directory.
//! Reads return file content unmodified unless the agent asked for a line
//! window.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::trace;

#[derive(Debug, Error)]
pub enum FsAccessError {
    #[error("path must be absolute: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsAccessError {
    /// Faults caused by the request itself rather than the filesystem
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::NotFound(_))
    }
}

fn require_absolute(path: &Path) -> Result<(), FsAccessError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(FsAccessError::InvalidPath(path.to_path_buf()))
    }
}

/// Read and write text files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAccessPolicy;

impl FileAccessPolicy {
    /// Full content of `path`, or the `limit` lines starting at 1-based `line`
    pub async fn read_text_file(
        &self,
        path: &Path,
        line: Option<u32>,
        limit: Option<u32>,
    ) -> Result<String, FsAccessError> {
        require_absolute(path)?;

        let content = fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FsAccessError::NotFound(path.to_path_buf())
            } else {
                FsAccessError::Io {
                    action: "read",
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        trace!(path = %path.display(), bytes = content.len(), "read file for agent");
        Ok(line_window(content, line, limit))
    }

    /// Overwrite `path`, creating missing parent directories
    pub async fn write_text_file(&self, path: &Path, content: &str) -> Result<(), FsAccessError> {
        require_absolute(path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FsAccessError::Io {
                    action: "create directory for",
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        fs::write(path, content)
            .await
            .map_err(|source| FsAccessError::Io {
                action: "write",
                path: path.to_path_buf(),
                source,
            })?;

        trace!(path = %path.display(), bytes = content.len(), "wrote file for agent");
        Ok(())
    }
}

fn line_window(content: String, line: Option<u32>, limit: Option<u32>) -> String {
    if line.is_none() && limit.is_none() {
        return content;
    }
    let skip = line.map_or(0, |line| line.saturating_sub(1) as usize);
    let take = limit.map_or(usize::MAX, |limit| limit as usize);
    content.split_inclusive('\n').skip(skip).take(take).collect()
}
