//! Directory traversal with an explicit work stack.
//!
//! No call-stack recursion: pathologically deep trees cost heap, not stack.
//! Unreadable directories and entries are logged and skipped; symlinks are
//! not followed.

use crate::error::ScanError;
use crate::scanner::ScanCancelToken;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) fn walk_files(
    root: &Path,
    cancel: Option<&ScanCancelToken>,
) -> Result<Vec<(PathBuf, Metadata)>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidArgument(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let mut stack = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable directory, skipping");
                continue;
            }
        };

        for entry in entries {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "unreadable entry, skipping");
                    continue;
                }
            };
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(md) => files.push((entry.path(), md)),
                    Err(e) => {
                        debug!(path = %entry.path().display(), error = %e, "stat failed, skipping");
                    }
                }
            }
        }
    }

    Ok(files)
}
