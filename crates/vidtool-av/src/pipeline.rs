//! Pipeline executor: turns a [`MediaOperation`] into ordered stages, runs
//! them inside a scoped workspace and promotes the result.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::TrackFailure;
use crate::operation::{MediaOperation, OperationKind};
use crate::output::OutputGuard;
use crate::runner::StageRunner;
use crate::stage::Stage;
use crate::tools::Tool;
use crate::translate::{self, TrackIndex};
use crate::workspace::Workspace;
use crate::{Error, Result};

/// Runs media operations one at a time.
///
/// # Example
///
/// ```no_run
/// use vidtool_av::{MediaOperation, Pipeline, StageRunner, Toolchain};
///
/// # async fn example() -> vidtool_av::Result<()> {
/// let pipeline = Pipeline::new(StageRunner::new(Toolchain::new()));
/// let op = MediaOperation::mixdown(
///     vec!["a.wav".into(), "b.wav".into()],
///     "mix.wav".into(),
/// )?;
/// pipeline.execute(op).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    runner: StageRunner,
    workspace_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(runner: StageRunner) -> Self {
        Self {
            runner,
            workspace_root: None,
        }
    }

    /// Create workspaces under `root` instead of the system temp directory.
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    /// Execute `op`, returning the destination paths written.
    ///
    /// Validation and overwrite checks happen before a workspace exists. The
    /// workspace is removed on every return path, except after an
    /// [`Error::OutputWriteFailed`], where it is kept so the finished
    /// artifact is not lost.
    pub async fn execute(&self, op: MediaOperation) -> Result<Vec<PathBuf>> {
        let guard = OutputGuard::new(op.force());
        preflight(&op, &guard)?;

        let workspace = Workspace::acquire(self.workspace_root.as_deref())?;
        tracing::info!("Running {}", op.kind().name());

        let result = match op.kind() {
            OperationKind::DecodeAudio {
                tracks,
                number_outputs,
            } => {
                self.execute_tracks(&op, tracks, *number_outputs, &guard, &workspace)
                    .await
            }
            _ => self.execute_chain(&op, &guard, &workspace).await,
        };

        match &result {
            Err(err) if needs_salvage(err) => {
                workspace.retain();
            }
            _ => workspace.release(),
        }

        result
    }

    /// Strictly sequential stages; the first failure aborts the rest.
    async fn execute_chain(
        &self,
        op: &MediaOperation,
        guard: &OutputGuard,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        let stages = plan_stages(op, workspace.path())?;
        let total = stages.len();

        let mut artifact = None;
        for (i, stage) in stages.iter().enumerate() {
            let progress = (i as f32 / total as f32) * 100.0;
            tracing::info!("[{:.0}%] {}", progress, stage.name());

            let outcome = self.runner.run(stage, workspace.path()).await;
            artifact = Some(outcome.into_result(stage).inspect_err(|e| {
                tracing::error!("Stage '{}' failed: {}", stage.name(), e);
            })?);
        }

        tracing::info!("[100%] Finalizing");
        let candidate = artifact.ok_or_else(|| Error::validation("operation", "produced no stages"))?;
        let dest = commit(guard, &candidate, op.output())?;
        Ok(vec![dest])
    }

    /// Independent per-track stages. Failures are collected rather than
    /// aborting, and each finished track is committed as soon as it is done.
    async fn execute_tracks(
        &self,
        op: &MediaOperation,
        tracks: &[TrackIndex],
        number_outputs: bool,
        guard: &OutputGuard,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        let input = single_input(op)?;
        let mut written = Vec::new();
        let mut failures = Vec::new();

        for &track in tracks {
            let dest = if number_outputs {
                crate::operation::numbered_path(op.output(), track)
            } else {
                op.output().to_path_buf()
            };
            let candidate = workspace.temp_file(&candidate_name(&format!("track{track}"), &dest));
            let stage = Stage::new(
                "Decoding audio track",
                Tool::Ffmpeg,
                translate::decode_args(input, track, &candidate),
                vec![input.to_path_buf()],
                candidate,
            );

            tracing::info!("[track {}] {}", track, stage.name());
            let result = self
                .runner
                .run(&stage, workspace.path())
                .await
                .into_result(&stage)
                .and_then(|artifact| commit(guard, &artifact, &dest));

            match result {
                Ok(path) => written.push(path),
                Err(e @ (Error::Cancelled | Error::ToolNotFound { .. })) => return Err(e),
                Err(error) => {
                    tracing::error!("Track {} failed: {}", track, error);
                    failures.push(TrackFailure {
                        track: track.get(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(written);
        }
        if tracks.len() == 1 {
            if let Some(failure) = failures.pop() {
                return Err(failure.error);
            }
        }
        Err(Error::TracksFailed {
            attempted: tracks.len(),
            failures,
        })
    }
}

/// Checks that need no workspace: inputs exist and no destination would be
/// clobbered without force.
fn preflight(op: &MediaOperation, guard: &OutputGuard) -> Result<()> {
    for input in op.inputs() {
        if !input.exists() {
            return Err(Error::validation(
                "input",
                format!("{} does not exist", input.display()),
            ));
        }
    }
    for dest in op.destinations() {
        if op.inputs().iter().any(|input| input == &dest) {
            return Err(Error::validation(
                "output",
                format!("{} is also an input", dest.display()),
            ));
        }
        guard.check(&dest)?;
    }
    Ok(())
}

fn commit(guard: &OutputGuard, candidate: &Path, dest: &Path) -> Result<PathBuf> {
    guard.commit(candidate, dest).map_err(|e| match e {
        Error::OutputWriteFailed { path, source, .. } => Error::OutputWriteFailed {
            path,
            preserved: Some(candidate.to_path_buf()),
            source,
        },
        other => other,
    })
}

fn needs_salvage(err: &Error) -> bool {
    match err {
        Error::OutputWriteFailed { .. } => true,
        Error::TracksFailed { failures, .. } => failures.iter().any(|f| needs_salvage(&f.error)),
        _ => false,
    }
}

fn single_input(op: &MediaOperation) -> Result<&Path> {
    match op.inputs() {
        [input] => Ok(input),
        other => Err(Error::validation(
            "input",
            format!("expected one input file, got {}", other.len()),
        )),
    }
}

/// Workspace file name for an artifact headed to `dest`; keeps the
/// extension so tools can pick the container from it.
fn candidate_name(stem: &str, dest: &Path) -> String {
    match dest.extension().and_then(OsStr::to_str) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    }
}

/// Build the ordered stages for every operation except decode-extract.
///
/// Intermediate and final candidates live in `workspace`; stage *i+1*
/// reads what stage *i* declared as its output.
pub fn plan_stages(op: &MediaOperation, workspace: &Path) -> Result<Vec<Stage>> {
    let candidate = workspace.join(candidate_name("output", op.output()));
    let inputs = op.inputs();

    let stages = match op.kind() {
        OperationKind::Mixdown => vec![Stage::new(
            "Combining audio files",
            Tool::Ffmpeg,
            translate::mixdown_args(inputs, &candidate)?,
            inputs.to_vec(),
            candidate,
        )],
        OperationKind::AacEncode { mode } => {
            let input = single_input(op)?;
            vec![Stage::new(
                "Encoding audio",
                Tool::Fdkaac,
                translate::aac_args(input, &candidate, *mode),
                vec![input.to_path_buf()],
                candidate,
            )]
        }
        OperationKind::Remux => {
            let [video, audio] = inputs else {
                return Err(Error::validation("input", "remux needs a video and an audio file"));
            };
            vec![Stage::new(
                "Remuxing video",
                Tool::Ffmpeg,
                translate::remux_args(video, audio, &candidate),
                vec![video.clone(), audio.clone()],
                candidate,
            )]
        }
        OperationKind::AudioMix { mode } => {
            let [video, audio @ ..] = inputs else {
                return Err(Error::validation("input", "audiomix needs a video file"));
            };
            let mix = workspace.join("mix.wav");
            let encoded = workspace.join("mix.m4a");
            vec![
                Stage::new(
                    "Combining audio files",
                    Tool::Ffmpeg,
                    translate::mixdown_args(audio, &mix)?,
                    audio.to_vec(),
                    mix.clone(),
                ),
                Stage::new(
                    "Encoding audio",
                    Tool::Fdkaac,
                    translate::aac_args(&mix, &encoded, *mode),
                    vec![mix],
                    encoded.clone(),
                ),
                Stage::new(
                    "Remuxing video",
                    Tool::Ffmpeg,
                    translate::remux_args(video, &encoded, &candidate),
                    vec![video.clone(), encoded],
                    candidate,
                ),
            ]
        }
        OperationKind::Scale {
            size,
            audio_codec,
            audio_bitrate,
        } => {
            let input = single_input(op)?;
            vec![Stage::new(
                "Scaling video",
                Tool::Ffmpeg,
                translate::scale_args(input, size, audio_codec, audio_bitrate, &candidate),
                vec![input.to_path_buf()],
                candidate,
            )]
        }
        OperationKind::ExtractAudio { track } => {
            let input = single_input(op)?;
            vec![Stage::new(
                "Extracting audio track",
                Tool::Ffmpeg,
                translate::extract_args(input, *track, &candidate),
                vec![input.to_path_buf()],
                candidate,
            )]
        }
        OperationKind::CompGate { curve } => {
            let input = single_input(op)?;
            vec![Stage::new(
                "Compressing and gating audio",
                Tool::Sox,
                translate::compand_args(input, &candidate, curve)?,
                vec![input.to_path_buf()],
                candidate,
            )]
        }
        OperationKind::DecodeAudio { .. } => {
            return Err(Error::validation(
                "operation",
                "decaudio runs independent per-track stages",
            ))
        }
    };

    debug_assert!(stages.windows(2).all(|w| w[1].consumes(&w[0])));
    Ok(stages)
}
