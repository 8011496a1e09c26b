//! Scoped temporary storage for intermediate artifacts.
//!
//! A [`Workspace`] owns a uniquely named temporary directory. The directory
//! is removed when the workspace is released or dropped, so every exit path
//! of a pipeline run (success, stage failure, cancellation, panic unwinding)
//! cleans up.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "vidtool-";

/// Exclusively owned temporary directory for one operation.
///
/// # Example
///
/// ```no_run
/// use vidtool_av::Workspace;
///
/// let workspace = Workspace::acquire(None)?;
/// let mix = workspace.temp_file("mix.wav");
/// // ... run stages writing to `mix` ...
/// workspace.release();
/// # Ok::<(), vidtool_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace, under `root` if given or the system temp
    /// directory otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Setup`] if the directory cannot be created.
    pub fn acquire(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let temp_dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(Error::Setup)?;

        let path = temp_dir.path().to_path_buf();
        tracing::debug!("Acquired workspace {}", path.display());

        Ok(Self {
            temp_dir: Some(temp_dir),
            path,
        })
    }

    /// Path to the temporary directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a path for a named temporary file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it.
    ///
    /// Removal failure is logged, never returned: it must not mask the
    /// outcome of the operation that used the workspace.
    pub fn release(mut self) {
        self.remove();
    }

    /// Keep the directory on disk and return its path.
    pub fn retain(mut self) -> PathBuf {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.keep();
            tracing::warn!("Workspace retained at {}", path.display());
            return path;
        }
        self.path.clone()
    }

    fn remove(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            match temp_dir.close() {
                Ok(()) => tracing::debug!("Released workspace {}", self.path.display()),
                Err(e) => tracing::warn!(
                    "Failed to remove workspace {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_temp_file_inside_workspace() {
        let ws = Workspace::acquire(None).unwrap();
        let tf = ws.temp_file("mix.wav");
        assert!(tf.starts_with(ws.path()));
        assert_eq!(tf.file_name().unwrap(), "mix.wav");
    }

    #[test]
    fn test_release_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        let path = ws.path().to_path_buf();
        fs::create_dir(path.join("nested")).unwrap();
        fs::write(path.join("nested/mix.wav"), b"RIFF").unwrap();

        ws.release();
        assert!(!path.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let path = {
            let ws = Workspace::acquire(None).unwrap();
            fs::write(ws.temp_file("a.aac"), b"data").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_unwinding_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let _ws = Workspace::acquire(Some(&root_path)).unwrap();
            panic!("stage blew up");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_names_are_unique() {
        let a = Workspace::acquire(None).unwrap();
        let b = Workspace::acquire(None).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PREFIX));
    }

    #[test]
    fn test_retain_keeps_directory() {
        let ws = Workspace::acquire(None).unwrap();
        fs::write(ws.temp_file("out.mkv"), b"data").unwrap();
        let kept = ws.retain();
        assert!(kept.join("out.mkv").exists());
        fs::remove_dir_all(kept).unwrap();
    }

    #[test]
    fn test_unwritable_root_is_setup_error() {
        let err = Workspace::acquire(Some(Path::new("/nonexistent/vidtool/root"))).unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
        assert_eq!(err.exit_code(), 7);
    }
}
