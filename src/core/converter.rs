use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::core::dimensions::Dimensions;
use crate::core::error::ConversionError;

/// Bound on one converter invocation.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(4);

/// Runs the external converter once per variant:
/// `<bin> -q <quality> [-resize <w> <h>] <source> -o <output>`.
///
/// The invocation is a black-box CLI contract; the converter writes the
/// encoded image to the output path and exits zero on success.
#[derive(Debug, Clone)]
pub struct ConversionExecutor {
    bin: PathBuf,
    deadline: Duration,
}

impl ConversionExecutor {
    pub fn new(bin: impl Into<PathBuf>, deadline: Duration) -> Self {
        Self {
            bin: bin.into(),
            deadline,
        }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Converts the staged source into `output`, optionally resizing, and
    /// returns the produced bytes. The child is killed if the deadline
    /// elapses; a zero exit with an empty or absent output file is surfaced
    /// as `OutputMissing` rather than read back as success.
    pub async fn convert(
        &self,
        source: &Path,
        output: &Path,
        quality: i32,
        resize: Option<Dimensions>,
    ) -> Result<Vec<u8>, ConversionError> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-q").arg(quality.to_string());
        if let Some(dims) = resize {
            cmd.arg("-resize")
                .arg(dims.width.to_string())
                .arg(dims.height.to_string());
        }
        cmd.arg(source).arg("-o").arg(output);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("invoking converter: {:?}", cmd.as_std());

        let child = cmd.spawn().map_err(|source| ConversionError::LaunchFailed {
            bin: self.bin.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child handle, which
        // kills the stuck process (kill_on_drop above).
        let out = match timeout(self.deadline, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "converter exceeded {}ms deadline, killed",
                    self.deadline.as_millis()
                );
                return Err(ConversionError::Timeout {
                    deadline: self.deadline,
                });
            }
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            return Err(ConversionError::Failed {
                code: out.status.code(),
                stderr,
            });
        }

        let produced = tokio::fs::metadata(output)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(ConversionError::OutputMissing {
                path: output.to_path_buf(),
            });
        }

        Ok(tokio::fs::read(output).await?)
    }
}
