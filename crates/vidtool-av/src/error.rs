//! Error types for vidtool-av.

use std::fmt;
use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a media operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter was malformed or out of range. Raised before any
    /// workspace is created or process launched.
    #[error("invalid {param}: {message}")]
    Validation { param: String, message: String },

    /// The scoped workspace could not be created.
    #[error("workspace setup failed: {0}")]
    Setup(#[source] std::io::Error),

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool exited non-zero or produced no usable output.
    #[error("{tool} failed ({}){}", exit_label(*exit_code), diagnostics_suffix(diagnostics))]
    ToolFailure {
        tool: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    /// The destination already exists and overwriting was not requested.
    #[error("{} already exists. Use -f to overwrite", path.display())]
    OutputExists { path: PathBuf },

    /// Promoting the finished artifact to its destination failed.
    #[error(
        "failed to write {}: {source}{}",
        path.display(),
        preserved_suffix(preserved.as_ref())
    )]
    OutputWriteFailed {
        path: PathBuf,
        preserved: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// One or more independent per-track stages failed.
    #[error("{} of {attempted} track(s) failed: {}", failures.len(), list_failures(failures))]
    TracksFailed {
        attempted: usize,
        failures: Vec<TrackFailure>,
    },

    /// The run was interrupted before completion.
    #[error("operation cancelled")]
    Cancelled,
}

/// A failed track within a multi-track extraction.
#[derive(Debug)]
pub struct TrackFailure {
    pub track: u32,
    pub error: Error,
}

impl fmt::Display for TrackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {}: {}", self.track, self.error)
    }
}

impl Error {
    /// Create a validation error naming the offending parameter.
    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool failure error.
    pub fn tool_failure(
        tool: impl Into<String>,
        exit_code: Option<i32>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::ToolFailure {
            tool: tool.into(),
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Create an output exists error.
    pub fn output_exists(path: impl Into<PathBuf>) -> Self {
        Self::OutputExists { path: path.into() }
    }

    /// Process exit code reported by the command-line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Validation { .. } => 3,
            Error::OutputExists { .. } => 4,
            Error::ToolNotFound { .. } => 5,
            Error::ToolFailure { .. } => 6,
            Error::Setup(_) => 7,
            Error::OutputWriteFailed { .. } => 8,
            Error::Cancelled => 130,
            Error::TracksFailed { failures, .. } => failures
                .iter()
                .map(|f| f.error.exit_code())
                .find(|code| *code != 6)
                .unwrap_or(6),
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated".to_string(),
    }
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

fn preserved_suffix(preserved: Option<&PathBuf>) -> String {
    match preserved {
        Some(path) => format!(" (intermediate kept at {})", path.display()),
        None => String::new(),
    }
}

fn list_failures(failures: &[TrackFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_parameter() {
        let err = Error::validation("gate", "must be <= compress (-40)");
        assert_eq!(err.to_string(), "invalid gate: must be <= compress (-40)");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_tool_failure_surfaces_diagnostics() {
        let err = Error::tool_failure("ffmpeg", Some(1), "Stream map '0:a:5' matches no streams.\n");
        let msg = err.to_string();
        assert!(msg.starts_with("ffmpeg failed (exit code 1)"));
        assert!(msg.ends_with("Stream map '0:a:5' matches no streams."));
    }

    #[test]
    fn test_tracks_failed_exit_code() {
        let err = Error::TracksFailed {
            attempted: 2,
            failures: vec![TrackFailure {
                track: 5,
                error: Error::tool_failure("ffmpeg", Some(1), ""),
            }],
        };
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("track 5"));

        let err = Error::TracksFailed {
            attempted: 1,
            failures: vec![TrackFailure {
                track: 0,
                error: Error::tool_not_found("ffmpeg"),
            }],
        };
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_output_exists_message() {
        let err = Error::output_exists("/tmp/out.wav");
        assert_eq!(err.to_string(), "/tmp/out.wav already exists. Use -f to overwrite");
        assert_eq!(err.exit_code(), 4);
    }
}
