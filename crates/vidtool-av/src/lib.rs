//! # vidtool-av
//!
//! Orchestration of external media tools (ffmpeg, fdkaac, sox) into
//! single logical operations.
//!
//! This crate provides:
//! - Translation of seconds, decibels, track indices and frame sizes into
//!   tool argument vectors ([`translate`])
//! - Scoped temporary workspaces that are always cleaned up ([`Workspace`])
//! - A stage runner that classifies tool outcomes ([`StageRunner`])
//! - Fixed multi-stage recipes such as mix → encode → remux ([`Pipeline`])
//! - No-clobber, atomic promotion of results ([`OutputGuard`])
//!
//! ## Example
//!
//! ```no_run
//! use vidtool_av::{MediaOperation, Pipeline, StageRunner, Toolchain};
//! use vidtool_av::translate::AacMode;
//!
//! # async fn example() -> vidtool_av::Result<()> {
//! let op = MediaOperation::audio_mix(
//!     "movie.mkv".into(),
//!     vec!["dialog.wav".into(), "music.wav".into()],
//!     "movie-mixed.mkv".into(),
//!     AacMode::default(),
//! )?;
//! Pipeline::new(StageRunner::new(Toolchain::new())).execute(op).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod operation;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod stage;
pub mod tools;
pub mod translate;
pub mod workspace;

// Re-exports
pub use error::{Error, Result, TrackFailure};
pub use operation::{MediaOperation, OperationKind};
pub use output::OutputGuard;
pub use pipeline::Pipeline;
pub use runner::{StageOutcome, StageRunner};
pub use stage::Stage;
pub use tools::{Tool, ToolInfo, Toolchain};
pub use workspace::Workspace;
