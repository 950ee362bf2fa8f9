//! Credential installer: find the key, copy it into place, lock it down, validate it.
//!
//! A run is a single sequential pass:
//! 1. An existing destination file short-circuits with success and is left
//!    untouched. Anything else at the destination (a directory left behind by a
//!    bind mount, for one) is an error.
//! 2. Otherwise the first existing candidate, in list order, is copied into a
//!    `0600` temp file beside the destination, whose parent directory is
//!    created on demand, and renamed into place.
//! 3. The copy must parse as a JSON object, or the run fails.
//!
//! Every step writes one human-readable status line to the caller's sink.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::InstallPaths;
use crate::key::{self, KeyError};
use crate::permissions::enforce_private_file_permissions;

/// Installer failures. Each one ends the run with a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// None of the candidate paths holds the key.
    #[error("credentials file not found; copy it manually to {}", destination.display())]
    NotFound {
        /// Where the key is expected.
        destination: PathBuf,
        /// Every path that was checked, in order.
        searched: Vec<PathBuf>,
    },
    /// Something other than a regular file occupies the destination.
    #[error("{} exists but is not a regular file; remove it and run again", path.display())]
    NotAFile {
        /// The occupied destination.
        path: PathBuf,
    },
    /// The copied file is not a JSON object.
    #[error("installed credentials at {} are invalid: {reason}", path.display())]
    Invalid {
        /// The installed file.
        path: PathBuf,
        /// Why validation failed.
        reason: String,
    },
    /// Unexpected filesystem failure.
    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A file was already present; nothing was touched.
    AlreadyInstalled {
        /// The existing destination.
        destination: PathBuf,
    },
    /// A candidate was copied into place.
    Installed {
        /// The candidate that was copied.
        source: PathBuf,
        /// The new destination file.
        destination: PathBuf,
    },
}

/// Installs the key from the first matching candidate into a fixed destination.
#[derive(Debug, Clone)]
pub struct Installer {
    destination: PathBuf,
    candidates: Vec<PathBuf>,
}

impl From<InstallPaths> for Installer {
    fn from(paths: InstallPaths) -> Self {
        Self::new(paths.destination, paths.candidates)
    }
}

impl Installer {
    /// Create an installer for `destination` searching `candidates` in order.
    pub fn new(destination: PathBuf, candidates: Vec<PathBuf>) -> Self {
        Self {
            destination,
            candidates,
        }
    }

    /// First candidate that exists as a regular file, writing one status
    /// line per candidate checked.
    pub fn find_candidate(&self, out: &mut dyn Write) -> Option<&Path> {
        status(out, format_args!("Searching for credentials file..."));
        for candidate in &self.candidates {
            if candidate.is_file() {
                status(out, format_args!("  found: {}", candidate.display()));
                return Some(candidate.as_path());
            }
            debug!(candidate = %candidate.display(), "candidate absent");
            status(out, format_args!("  not found: {}", candidate.display()));
        }
        None
    }

    /// Run the install procedure, writing status lines to `out`.
    ///
    /// Status output is best effort; a failing sink does not fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NotAFile`] when something other than a regular
    /// file occupies the destination, [`InstallError::NotFound`] when no
    /// candidate exists, [`InstallError::Invalid`] when the copied file is not
    /// a JSON object, and [`InstallError::Io`] for any other filesystem failure.
    pub fn install(&self, out: &mut dyn Write) -> Result<InstallOutcome, InstallError> {
        if self.destination.is_file() {
            status(
                out,
                format_args!(
                    "Credentials already installed at {}",
                    self.destination.display()
                ),
            );
            info!(destination = %self.destination.display(), "destination exists, skipping install");
            return Ok(InstallOutcome::AlreadyInstalled {
                destination: self.destination.clone(),
            });
        }
        if self.destination.exists() {
            status(
                out,
                format_args!(
                    "{} exists but is not a regular file; remove it and run again",
                    self.destination.display()
                ),
            );
            return Err(InstallError::NotAFile {
                path: self.destination.clone(),
            });
        }

        let Some(source) = self.find_candidate(out) else {
            status(
                out,
                format_args!(
                    "No credentials file found. Copy it manually to: {}",
                    self.destination.display()
                ),
            );
            warn!(destination = %self.destination.display(), "no candidate credentials file exists");
            return Err(InstallError::NotFound {
                destination: self.destination.clone(),
                searched: self.candidates.clone(),
            });
        };

        self.copy_into_place(source, out)?;
        self.validate(out)?;

        info!(
            source = %source.display(),
            destination = %self.destination.display(),
            "credentials installed"
        );
        Ok(InstallOutcome::Installed {
            source: source.to_path_buf(),
            destination: self.destination.clone(),
        })
    }

    /// Copy into a temp file beside the destination, restrict it, then rename
    /// it into place. The destination only ever appears complete and `0600`.
    fn copy_into_place(&self, source: &Path, out: &mut dyn Write) -> Result<(), InstallError> {
        let parent = self
            .destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.is_dir() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
            status(out, format_args!("Created directory {}", parent.display()));
        }

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| InstallError::io(parent, e))?;
        enforce_private_file_permissions(temp.path()).map_err(|e| InstallError::io(temp.path(), e))?;

        let mut reader = File::open(source).map_err(|e| InstallError::io(source, e))?;
        std::io::copy(&mut reader, temp.as_file_mut()).map_err(|e| InstallError::io(source, e))?;
        temp.as_file_mut()
            .flush()
            .map_err(|e| InstallError::io(temp.path(), e))?;
        if let Err(e) = temp.as_file().sync_all() {
            debug!(error = %e, "failed to sync temp file");
        }

        temp.persist_noclobber(&self.destination)
            .map_err(|e| InstallError::io(&self.destination, e.error))?;
        status(
            out,
            format_args!(
                "Copied {} -> {}",
                source.display(),
                self.destination.display()
            ),
        );
        status(out, format_args!("Permissions set to owner read/write (600)"));
        Ok(())
    }

    fn validate(&self, out: &mut dyn Write) -> Result<(), InstallError> {
        match key::parse_document(&self.destination) {
            Ok(_) => {
                status(out, format_args!("Credentials file is valid JSON"));
                Ok(())
            }
            Err(KeyError::Read { path, source }) => Err(InstallError::Io { path, source }),
            Err(err) => {
                status(out, format_args!("Credentials file is NOT valid JSON: {err}"));
                Err(InstallError::Invalid {
                    path: self.destination.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

fn status(out: &mut dyn Write, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        debug!(error = %e, "failed to write status line");
    }
}
