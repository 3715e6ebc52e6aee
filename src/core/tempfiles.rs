use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempPath};

/// Hands out uniquely-named temp files inside one directory. Handles delete
/// their file on drop, so release happens on every exit path of a pipeline
/// run, including error unwinds. Names are randomized by the tempfile crate,
/// which keeps concurrent runs from colliding.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the upload bytes to a fresh temp file and verifies the file is
    /// actually there afterwards. The handle lives for the whole run.
    pub fn acquire_source(&self, hint: &str, bytes: &[u8]) -> io::Result<SourceHandle> {
        let mut file = Builder::new()
            .prefix(&format!("upload-{}-", sanitize(hint)))
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        if !file.path().exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "staged source file missing after write",
            ));
        }

        tracing::debug!("staged source at {:?} ({} bytes)", file.path(), bytes.len());
        Ok(SourceHandle { inner: file })
    }

    /// Reserves a unique output path for the converter to write into. The file
    /// is created empty; the converter overwrites it in place.
    pub fn acquire_output_slot(&self, hint: &str) -> io::Result<OutputSlot> {
        let file = Builder::new()
            .prefix(&format!("webp-{}-", sanitize(hint)))
            .suffix(".webp")
            .tempfile_in(&self.dir)?;
        Ok(OutputSlot {
            path: file.into_temp_path(),
        })
    }
}

/// Staged copy of the upload. Deleted on drop.
pub struct SourceHandle {
    inner: NamedTempFile,
}

impl SourceHandle {
    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

/// Reserved converter output path. Deleted on drop; deleting an already
/// missing file is not an error.
pub struct OutputSlot {
    path: TempPath,
}

impl OutputSlot {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Upload names feed into temp file prefixes; strip anything the filesystem
/// could choke on.
fn sanitize(hint: &str) -> String {
    hint.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
