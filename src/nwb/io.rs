//! Writing container graphs to disk
//!
//! Output goes to `<path>.partial` first and is renamed into place once fully
//! written and synced. [`PartialFile`] removes the partial file when dropped
//! uncommitted, so a failed write never leaves a truncated `.nwb` behind.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::NwbFile;
use crate::{Error, Result};

/// NWB schema version the container layout follows.
pub const NWB_VERSION: &str = "2.5.0";

/// Serializer for assembled NWB files.
pub trait NwbWriter {
    /// Write `file` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailure`] if the file cannot be written.
    fn write(&self, file: &NwbFile, path: &Path) -> Result<()>;
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    nwb_version: &'a str,
    root: &'a NwbFile,
}

#[derive(Deserialize)]
struct Document {
    nwb_version: String,
    root: NwbFile,
}

/// JSON rendition of the NWB container hierarchy.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNwbWriter {
    pretty: bool,
}

impl JsonNwbWriter {
    /// Compact writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Load a file written by this writer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] if `path` does not exist and
    /// [`Error::SerializationFailure`] if it cannot be decoded.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<NwbFile> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let reader = BufReader::new(File::open(path)?);
        let document: Document = serde_json::from_reader(reader)
            .map_err(|e| Error::SerializationFailure(format!("{}: {e}", path.display())))?;
        if document.nwb_version != NWB_VERSION {
            warn!(
                path = %path.display(),
                found = %document.nwb_version,
                expected = NWB_VERSION,
                "NWB version differs"
            );
        }
        Ok(document.root)
    }

    fn write_to(&self, file: &NwbFile, partial: &Path) -> Result<()> {
        let failure = |e: &dyn std::fmt::Display| {
            Error::SerializationFailure(format!("{}: {e}", partial.display()))
        };

        let handle = File::create(partial).map_err(|e| failure(&e))?;
        let mut out = BufWriter::new(handle);
        let document = DocumentRef {
            nwb_version: NWB_VERSION,
            root: file,
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut out, &document).map_err(|e| failure(&e))?;
        } else {
            serde_json::to_writer(&mut out, &document).map_err(|e| failure(&e))?;
        }
        out.flush().map_err(|e| failure(&e))?;
        let handle = out.into_inner().map_err(|e| failure(e.error()))?;
        handle.sync_all().map_err(|e| failure(&e))
    }
}

impl NwbWriter for JsonNwbWriter {
    fn write(&self, file: &NwbFile, path: &Path) -> Result<()> {
        let partial = PartialFile::new(path);
        self.write_to(file, partial.path())?;
        partial.commit()?;
        debug!(path = %path.display(), "wrote NWB file");
        Ok(())
    }
}

/// Sibling file that is removed on drop unless committed.
#[derive(Debug)]
pub struct PartialFile {
    partial: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PartialFile {
    /// Reserve `<target>.partial` for writing.
    #[must_use]
    pub fn new(target: &Path) -> Self {
        let mut name = OsString::from(target.as_os_str());
        name.push(".partial");
        Self {
            partial: PathBuf::from(name),
            target: target.to_path_buf(),
            committed: false,
        }
    }

    /// Path to write to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.partial
    }

    /// Move the partial file onto the target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailure`] if the rename fails; the
    /// partial file is then removed on drop.
    pub fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.partial, &self.target).map_err(|e| {
            Error::SerializationFailure(format!(
                "rename {} -> {}: {e}",
                self.partial.display(),
                self.target.display()
            ))
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.partial.exists() {
            if let Err(e) = std::fs::remove_file(&self.partial) {
                warn!(path = %self.partial.display(), error = %e, "failed to remove partial file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.nwb");
        let file = NwbFile::builder("session", "Imaging session", Utc::now())
            .institution("Lab")
            .build();

        JsonNwbWriter::new().write(&file, &path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("session.nwb.partial").exists());
        assert_eq!(JsonNwbWriter::read(&path).unwrap(), file);
    }

    #[test]
    fn test_uncommitted_partial_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.nwb");
        let partial_path = {
            let partial = PartialFile::new(&target);
            std::fs::write(partial.path(), b"half").unwrap();
            partial.path().to_path_buf()
        };
        assert!(!partial_path.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.nwb");
        let file = NwbFile::builder("x", "y", Utc::now()).build();

        let result = JsonNwbWriter::new().write(&file, &path);
        assert!(matches!(result, Err(Error::SerializationFailure(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_missing_file() {
        let result = JsonNwbWriter::read("/no/such/file.nwb");
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }
}
