//! Predictor backed by an external process
//!
//! The child is invoked as `[interpreter] <script> <port>`. Stdout and
//! stderr are captured separately and each is capped. The whole run is
//! bounded by a timeout; on expiry, on cap overflow, or if the calling
//! future is dropped (client disconnect), the child is killed.

use super::{ExecutionError, Predictor, PredictorOutput};
use async_trait::async_trait;
use flexlingo_common::config::PredictorConfig;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessPredictor {
    interpreter: Option<String>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessPredictor {
    pub fn new(interpreter: Option<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            interpreter,
            timeout,
            max_output_bytes,
        }
    }

    pub fn from_config(config: &PredictorConfig) -> Self {
        Self::new(
            config.interpreter().map(str::to_string),
            config.timeout(),
            config.max_output_bytes,
        )
    }

    fn command(&self, script: &Path, port: &str) -> Command {
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut c = Command::new(interpreter);
                c.arg(script);
                c
            }
            None => Command::new(script),
        };
        command
            .arg(port)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn program(&self, script: &Path) -> String {
        match &self.interpreter {
            Some(interpreter) => format!("{} {}", interpreter, script.display()),
            None => script.display().to_string(),
        }
    }
}

#[async_trait]
impl Predictor for ProcessPredictor {
    async fn run(&self, script: &Path, port: &str) -> Result<PredictorOutput, ExecutionError> {
        let program = self.program(script);
        debug!(program = %program, port, "Spawning predictor");

        let mut child = self
            .command(script, port)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("predictor stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("predictor stderr not captured"))?;

        let outcome = tokio::time::timeout(
            self.timeout,
            collect(&mut child, stdout, stderr, self.max_output_bytes),
        )
        .await;

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e @ ExecutionError::Exited { .. })) => Err(e),
            Ok(Err(e)) => {
                terminate(&mut child).await;
                Err(e)
            }
            Err(_) => {
                warn!(program = %program, port, timeout = ?self.timeout, "Predictor timed out, killing");
                terminate(&mut child).await;
                Err(ExecutionError::Timeout(self.timeout))
            }
        }
    }
}

async fn collect(
    child: &mut Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    limit: usize,
) -> Result<PredictorOutput, ExecutionError> {
    let (out, err) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
    let status = child.wait().await?;

    let stdout = String::from_utf8_lossy(&out).into_owned();
    let stderr = String::from_utf8_lossy(&err).into_owned();

    if !status.success() {
        return Err(ExecutionError::Exited {
            status: status.to_string(),
            stderr,
        });
    }

    Ok(PredictorOutput { stdout, stderr })
}

/// Read a stream to EOF, failing once it passes `limit` bytes
async fn read_capped<R>(reader: R, limit: usize) -> Result<Vec<u8>, ExecutionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(ExecutionError::OutputTooLarge { limit });
    }
    Ok(buf)
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Predictor already gone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_capped_within_limit() {
        let data: &[u8] = b"hello";
        assert_eq!(read_capped(data, 5).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_read_capped_over_limit() {
        let data: &[u8] = b"hello!";
        let err = read_capped(data, 5).await.unwrap_err();
        assert!(matches!(err, ExecutionError::OutputTooLarge { limit: 5 }));
    }

    #[test]
    fn test_program_description() {
        let with = ProcessPredictor::new(Some("python".into()), Duration::from_secs(1), 16);
        assert_eq!(with.program(Path::new("server/predict_rf.py")), "python server/predict_rf.py");

        let without = ProcessPredictor::new(None, Duration::from_secs(1), 16);
        assert_eq!(without.program(Path::new("/opt/predict")), "/opt/predict");
    }
}
