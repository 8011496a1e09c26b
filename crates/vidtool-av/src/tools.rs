//! External tool detection and resolution.

use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// External programs a pipeline stage may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Mixing, remuxing, scaling and decoding.
    Ffmpeg,
    /// AAC encoding.
    Fdkaac,
    /// Dynamics processing.
    Sox,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Ffmpeg, Tool::Fdkaac, Tool::Sox];

    /// Executable name looked up on `PATH`.
    pub fn executable(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Fdkaac => "fdkaac",
            Tool::Sox => "sox",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "-version",
            Tool::Fdkaac | Tool::Sox => "--version",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Configured executable locations, falling back to `PATH`.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    ffmpeg: Option<PathBuf>,
    fdkaac: Option<PathBuf>,
    sox: Option<PathBuf>,
}

impl Toolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit executable for `tool`.
    pub fn with_path(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        let path = Some(path.into());
        match tool {
            Tool::Ffmpeg => self.ffmpeg = path,
            Tool::Fdkaac => self.fdkaac = path,
            Tool::Sox => self.sox = path,
        }
        self
    }

    pub fn configured(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Ffmpeg => self.ffmpeg.as_deref(),
            Tool::Fdkaac => self.fdkaac.as_deref(),
            Tool::Sox => self.sox.as_deref(),
        }
    }

    /// Locate the executable for `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if neither the configured path nor a
    /// `PATH` lookup yields an executable.
    pub fn resolve(&self, tool: Tool) -> Result<PathBuf> {
        get_tool_path(tool.executable(), self.configured(tool))
    }

    /// Report availability of every tool.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        Tool::ALL
            .iter()
            .map(|tool| match self.resolve(*tool) {
                Ok(path) => check_tool_at(tool.executable(), &path, tool.version_arg()),
                Err(_) => unavailable(tool.executable()),
            })
            .collect()
    }
}

fn check_tool_at(name: &str, path: &Path, version_arg: &str) -> ToolInfo {
    // fdkaac prints its banner to stderr and exits non-zero for --version,
    // so any successful spawn counts as available.
    match Command::new(path).arg(version_arg).output() {
        Ok(output) => {
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            ToolInfo {
                name: name.to_string(),
                available: true,
                version: text.lines().next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                path: Some(path.to_path_buf()),
            }
        }
        Err(_) => unavailable(name),
    }
}

fn unavailable(name: &str) -> ToolInfo {
    ToolInfo {
        name: name.to_string(),
        available: false,
        version: None,
        path: None,
    }
}

/// Require that a tool is available on `PATH`, returning its path.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured path for {} does not exist: {}, falling back to PATH",
            name,
            path.display()
        );
    }

    require_tool(name)
}
