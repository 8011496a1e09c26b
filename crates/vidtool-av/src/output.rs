//! Promotion of finished artifacts to their user-visible destination.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Enforces the no-clobber contract for final output paths.
///
/// Nothing is ever written to a destination in place: the artifact either
/// arrives whole via rename or hard link, or the destination is left as
/// it was.
#[derive(Debug, Clone, Copy)]
pub struct OutputGuard {
    force: bool,
}

impl OutputGuard {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    /// Fail early with [`Error::OutputExists`] if `final_path` would be
    /// clobbered without force. Performs no filesystem mutation.
    pub fn check(&self, final_path: &Path) -> Result<()> {
        if !self.force && exists(final_path) {
            return Err(Error::output_exists(final_path));
        }
        Ok(())
    }

    /// Move `candidate` to `final_path`.
    ///
    /// On failure the candidate is left where it was so the caller can
    /// salvage it.
    pub fn commit(&self, candidate: &Path, final_path: &Path) -> Result<PathBuf> {
        self.check(final_path)?;

        let write_failed = |source: io::Error| Error::OutputWriteFailed {
            path: final_path.to_path_buf(),
            preserved: None,
            source,
        };

        if self.force && final_path.is_dir() {
            return Err(write_failed(io::Error::other("destination is a directory")));
        }

        self.promote(candidate, final_path).map_err(|e| match e {
            PromoteError::Exists => Error::output_exists(final_path),
            PromoteError::Io(source) => write_failed(source),
        })?;

        tracing::info!("Wrote {}", final_path.display());
        Ok(final_path.to_path_buf())
    }

    /// Place `candidate` at `final_path` without consulting [`check`].
    ///
    /// Without force the destination is created by hard link, so one that
    /// appeared since the check is reported as existing, never replaced.
    ///
    /// [`check`]: OutputGuard::check
    fn promote(&self, candidate: &Path, final_path: &Path) -> std::result::Result<(), PromoteError> {
        let placed = if self.force {
            fs::rename(candidate, final_path)
        } else {
            fs::hard_link(candidate, final_path)
        };

        match placed {
            Ok(()) => {
                if !self.force {
                    remove_candidate(candidate);
                }
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(PromoteError::Exists),
            Err(e) => {
                tracing::debug!(
                    "moving {} -> {} failed ({}), copying instead",
                    candidate.display(),
                    final_path.display(),
                    e
                );
            }
        }

        self.copy_into_place(candidate, final_path)?;
        remove_candidate(candidate);
        Ok(())
    }

    /// Copy into a temporary sibling of `final_path`, then rename it over.
    /// The temporary file is deleted on every failure path.
    fn copy_into_place(&self, candidate: &Path, final_path: &Path) -> std::result::Result<(), PromoteError> {
        let parent = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        let mut staged = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(parent)?;

        let mut source = fs::File::open(candidate)?;
        io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        let persisted = if self.force {
            staged.persist(final_path)
        } else {
            staged.persist_noclobber(final_path)
        };

        match persisted {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Err(PromoteError::Exists),
            Err(e) => Err(PromoteError::Io(e.error)),
        }
    }
}

enum PromoteError {
    Exists,
    Io(io::Error),
}

impl From<io::Error> for PromoteError {
    fn from(e: io::Error) -> Self {
        PromoteError::Io(e)
    }
}

fn remove_candidate(candidate: &Path) {
    if let Err(e) = fs::remove_file(candidate) {
        tracing::debug!("Could not remove {}: {}", candidate.display(), e);
    }
}

/// True if anything, including a dangling symlink, occupies `path`.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
