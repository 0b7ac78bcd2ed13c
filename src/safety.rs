use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Largest file the engine will agree to edit. Documents are held in memory
/// in full, and edit requests targeting anything bigger than this are almost
/// certainly a mistake.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Sandbox checks to keep every edit inside the configured base directory.
///
/// All target paths in a request are resolved against the base directory and
/// must canonicalize to somewhere underneath it; symlinks pointing out of the
/// sandbox are rejected, as are a handful of directories no text-editing
/// tool has business touching.
#[derive(Debug, Clone)]
pub struct SandboxGuard {
    /// Absolute, canonical path to the sandbox base directory
    base_dir: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
    /// Upper bound on the size of a file accepted for editing
    max_file_size: u64,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path is outside the sandbox: {path} (base: {base})")]
    OutsideSandbox { path: PathBuf, base: PathBuf },

    #[error("path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("path exists but is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("file size {size} bytes exceeds maximum allowed size {limit} bytes: {path}")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl SandboxGuard {
    /// Create a new guard rooted at the given base directory.
    ///
    /// The base directory will be canonicalized to handle symlinks
    /// correctly.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let base_dir = base_dir.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();

        // Version-control metadata within the sandbox
        if let Ok(git_dir) = base_dir.join(".git").canonicalize() {
            forbidden_paths.push(git_dir);
        }

        // Key material, in case the sandbox is rooted near a home directory
        if let Some(home) = home::home_dir() {
            if let Ok(ssh_dir) = home.join(".ssh").canonicalize() {
                forbidden_paths.push(ssh_dir);
            }
            if let Ok(gnupg_dir) = home.join(".gnupg").canonicalize() {
                forbidden_paths.push(gnupg_dir);
            }
        }

        Ok(Self {
            base_dir,
            forbidden_paths,
            max_file_size: MAX_FILE_SIZE,
        })
    }

    /// Check that an existing file is safe to edit.
    ///
    /// Returns the canonicalized absolute path if it is a regular file
    /// inside the sandbox and under the size ceiling.
    ///
    /// Note: canonicalization happens at validation time. Callers should
    /// call [`SandboxGuard::revalidate`] immediately before the write to
    /// narrow the TOCTOU window.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let canonical = absolute.canonicalize()?;
        self.check_canonical(&canonical)?;

        let metadata = fs::metadata(&canonical)?;
        if !metadata.is_file() {
            return Err(SafetyError::NotAFile(canonical));
        }
        if metadata.len() > self.max_file_size {
            return Err(SafetyError::FileTooLarge {
                path: canonical,
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        Ok(canonical)
    }

    /// Like [`SandboxGuard::validate_path`], but creates the file (and its
    /// parent directories) when it does not exist yet.
    ///
    /// The containment check runs lexically *before* anything is created,
    /// so a traversal in the request can never cause directories to appear
    /// outside the sandbox; the canonical re-check afterwards still catches
    /// symlinked parents.
    pub fn validate_or_create(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let normalized = lexical_normalize(&absolute);
        if !normalized.starts_with(&self.base_dir) {
            return Err(SafetyError::OutsideSandbox {
                path: normalized,
                base: self.base_dir.clone(),
            });
        }

        if !normalized.exists() {
            if let Some(parent) = normalized.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::File::create(&normalized)?;
        }

        let canonical = normalized.canonicalize()?;
        self.check_canonical(&canonical)?;

        if !fs::metadata(&canonical)?.is_file() {
            return Err(SafetyError::NotAFile(canonical));
        }

        Ok(canonical)
    }

    /// Re-validate a previously-validated canonical path.
    ///
    /// Call this immediately before the write: the path is re-canonicalized
    /// and re-checked against the sandbox and forbidden boundaries.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = path.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.base_dir) {
            return Err(SafetyError::OutsideSandbox {
                path: canonical.to_path_buf(),
                base: self.base_dir.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the sandbox base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a guard with custom forbidden paths and size limit (for testing).
    #[cfg(test)]
    pub fn with_limits(
        base_dir: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
        max_file_size: u64,
    ) -> Result<Self, SafetyError> {
        let base_dir = base_dir.as_ref().canonicalize()?;
        Ok(Self {
            base_dir,
            forbidden_paths: forbidden,
            max_file_size,
        })
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn validate_path_inside_sandbox() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path();
        let guard = SandboxGuard::new(base).unwrap();

        let file = base.join("notes/todo.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"todo\n").unwrap();

        assert!(guard.validate_path(&file).is_ok());
    }

    #[test]
    fn validate_path_outside_sandbox() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path().join("sandbox");
        fs::create_dir_all(&base).unwrap();
        let guard = SandboxGuard::new(&base).unwrap();

        let outside = temp_dir.path().join("outside.txt");
        fs::write(&outside, b"").unwrap();

        let result = guard.validate_path(&outside);
        assert!(matches!(result, Err(SafetyError::OutsideSandbox { .. })));
    }

    #[test]
    fn validate_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = SandboxGuard::new(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("file.txt"), b"x").unwrap();

        assert!(guard.validate_path("file.txt").is_ok());
    }

    #[test]
    fn validate_path_rejects_forbidden_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path();
        let forbidden = base.join("secrets");
        fs::create_dir_all(&forbidden).unwrap();

        let guard =
            SandboxGuard::with_limits(base, vec![forbidden.canonicalize().unwrap()], MAX_FILE_SIZE)
                .unwrap();

        let file = forbidden.join("key.pem");
        fs::write(&file, b"").unwrap();

        let result = guard.validate_path(&file);
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn validate_path_rejects_directory_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path();
        let guard = SandboxGuard::new(base).unwrap();

        let dir = base.join("subdir");
        fs::create_dir_all(&dir).unwrap();

        let result = guard.validate_path(&dir);
        assert!(matches!(result, Err(SafetyError::NotAFile(_))));
    }

    #[test]
    fn validate_path_rejects_oversized_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path();
        let guard = SandboxGuard::with_limits(base, Vec::new(), 16).unwrap();

        let file = base.join("big.txt");
        fs::write(&file, b"this is more than sixteen bytes\n").unwrap();

        let result = guard.validate_path(&file);
        assert!(matches!(result, Err(SafetyError::FileTooLarge { .. })));
    }

    #[test]
    fn validate_or_create_creates_parents_and_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = SandboxGuard::new(temp_dir.path()).unwrap();

        let created = guard.validate_or_create("logs/2026/august.log").unwrap();
        assert!(created.is_file());
        assert!(created.starts_with(guard.base_dir()));
    }

    #[test]
    fn validate_or_create_rejects_traversal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path().join("sandbox");
        fs::create_dir_all(&base).unwrap();
        let guard = SandboxGuard::new(&base).unwrap();

        let result = guard.validate_or_create("../escape.txt");
        assert!(matches!(result, Err(SafetyError::OutsideSandbox { .. })));
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path().join("sandbox");
        fs::create_dir_all(&base).unwrap();

        let outside = temp_dir.path().join("outside.txt");
        fs::write(&outside, b"").unwrap();

        let link = base.join("escape.txt");
        symlink(&outside, &link).unwrap();

        let guard = SandboxGuard::new(&base).unwrap();
        let result = guard.validate_path(&link);

        // Rejected because the canonical path is outside the sandbox
        assert!(matches!(result, Err(SafetyError::OutsideSandbox { .. })));
    }
}
