//! Containment check for files served out of the download root.
//!
//! # Design
//! - The root is canonicalised once when the gate is opened.
//! - Requests are first normalised lexically so `..` escapes are rejected
//!   before touching the filesystem, whether or not the target exists.
//! - Existing targets are then canonicalised (resolving symlinks) and must
//!   still be descendants of the root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use lodestone_core::JobId;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Resolves requested download paths strictly inside the configured root.
#[derive(Debug, Clone)]
pub struct DownloadGate {
    root: PathBuf,
}

impl DownloadGate {
    /// Create the root directory if needed and open a gate over it.
    ///
    /// # Errors
    ///
    /// Returns `FsOpsError::Io` when the root cannot be created or canonicalised.
    pub async fn open(root: impl AsRef<Path>) -> FsOpsResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .await
            .map_err(|source| FsOpsError::Io {
                operation: "create_download_root",
                path: root.to_path_buf(),
                source,
            })?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|source| FsOpsError::Io {
                operation: "canonicalize_download_root",
                path: root.to_path_buf(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Canonical download root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` for `job` into an absolute, symlink-free path inside the root.
    ///
    /// # Errors
    ///
    /// - `Forbidden` when the path escapes the root (checked before existence).
    /// - `NotFound` when the contained path does not exist.
    /// - `Io` for any other filesystem failure.
    pub async fn resolve(&self, job: &JobId, relative: &str) -> FsOpsResult<PathBuf> {
        let Some(candidate) = lexical_join(&self.root, relative) else {
            warn!(job_id = %job, requested = relative, "download path escapes root");
            return Err(FsOpsError::Forbidden {
                requested: relative.to_string(),
            });
        };

        let resolved = match fs::canonicalize(&candidate).await {
            Ok(resolved) => resolved,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsOpsError::NotFound {
                    requested: relative.to_string(),
                });
            }
            Err(source) => {
                return Err(FsOpsError::Io {
                    operation: "canonicalize_download",
                    path: candidate,
                    source,
                });
            }
        };

        if !resolved.starts_with(&self.root) {
            warn!(
                job_id = %job,
                requested = relative,
                resolved = %resolved.display(),
                "download path resolves outside root"
            );
            return Err(FsOpsError::Forbidden {
                requested: relative.to_string(),
            });
        }
        debug!(job_id = %job, resolved = %resolved.display(), "download path admitted");
        Ok(resolved)
    }

    /// Whether the root is currently a writable directory.
    pub async fn root_writable(&self) -> bool {
        match fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }
}

/// Join `relative` onto `root` without consulting the filesystem. Returns
/// `None` when the path is absolute or climbs above `root`.
fn lexical_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    let mut depth = 0_usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                joined.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_join_rejects_escapes() {
        let root = Path::new("/data");
        assert_eq!(
            lexical_join(root, "a/./b/../c.iso"),
            Some(PathBuf::from("/data/a/c.iso"))
        );
        assert!(lexical_join(root, "../../secret").is_none());
        assert!(lexical_join(root, "a/../../secret").is_none());
        assert!(lexical_join(root, "/etc/passwd").is_none());
    }
}
