use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Atomically write bytes to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Destination for payloads that were accepted as unique.
pub trait PayloadSink: Send + Sync {
    fn store(&self, name: &str, payload: &[u8]) -> Result<PathBuf, PersistError>;

    /// Removes a stored payload. Returns `false` if nothing was stored under `name`.
    fn remove(&self, name: &str) -> Result<bool, PersistError>;
}

/// Writes each payload as a file in one directory.
pub struct DirectorySink {
    writer: AtomicFileWriter,
}

impl DirectorySink {
    /// Creates the directory if needed and checks that it is writable.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        let unusable = |err: io::Error| PersistError::OutputDir(format!("{}: {}", dir.display(), err));

        match fs::metadata(&dir) {
            Ok(meta) if !meta.is_dir() => {
                return Err(PersistError::OutputDir(format!(
                    "{} is not a directory",
                    dir.display()
                )))
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&dir).map_err(unusable)?;
            }
            Err(err) => return Err(unusable(err)),
        }
        // Dropping the temp file removes it again.
        NamedTempFile::new_in(&dir).map_err(unusable)?;

        Ok(Self {
            writer: AtomicFileWriter::new(dir),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }
}

impl PayloadSink for DirectorySink {
    fn store(&self, name: &str, payload: &[u8]) -> Result<PathBuf, PersistError> {
        self.writer.write_bytes(name, payload)
    }

    fn remove(&self, name: &str) -> Result<bool, PersistError> {
        match fs::remove_file(self.dir().join(name)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
