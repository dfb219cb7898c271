//! External predictor boundary
//!
//! The dispatcher only sees [`Predictor`]; [`ProcessPredictor`] is the real
//! implementation that spawns the configured script.

mod process;

pub use process::ProcessPredictor;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Captured output of a successful predictor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictorOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Predictor run failure
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Process ran but exited unsuccessfully
    #[error("Predictor exited with {status}")]
    Exited { status: String, stderr: String },

    #[error("Predictor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Predictor output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("IO error while running predictor: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionError {
    /// Stderr captured before the failure, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecutionError::Exited { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Runs one prediction for a device
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Run `script` against the serial port named `port`, returning its
    /// captured output
    ///
    /// `port` is the name as enumerated (e.g. `/dev/ttyACM0`), not the
    /// uppercased id used for matching. Implementations must not return
    /// until the process has finished or been killed.
    async fn run(&self, script: &Path, port: &str) -> Result<PredictorOutput, ExecutionError>;
}

/// Text printed when the predictor produced no usable line
pub const NO_OUTPUT: &str = "No output";

/// Last non-empty trimmed line of `stdout`
///
/// Predictors print diagnostics before the final label, so only the last
/// line counts.
pub fn extract_label(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or(NO_OUTPUT)
        .to_string()
}
