//! A single external tool invocation inside a pipeline.

use crate::tools::Tool;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One tool invocation with its declared artifact wiring.
///
/// `output` is the file the tool is expected to write; the runner checks
/// it exists and is non-empty after a zero exit.
#[derive(Debug, Clone)]
pub struct Stage {
    name: &'static str,
    tool: Tool,
    args: Vec<OsString>,
    inputs: Vec<PathBuf>,
    output: PathBuf,
}

impl Stage {
    pub fn new(
        name: &'static str,
        tool: Tool,
        args: Vec<OsString>,
        inputs: Vec<PathBuf>,
        output: PathBuf,
    ) -> Self {
        Self {
            name,
            tool,
            args,
            inputs,
            output,
        }
    }

    /// Human-readable step name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// True when this stage reads the artifact `earlier` produced.
    pub fn consumes(&self, earlier: &Stage) -> bool {
        self.inputs.iter().any(|p| p == earlier.output())
    }
}
