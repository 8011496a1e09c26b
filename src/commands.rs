//! Translation of parsed command lines into media operations.

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use vidtool_av::translate::{AacMode, CompanderCurve};
use vidtool_av::{MediaOperation, Pipeline, StageRunner};

/// A media command, independent of how it was parsed.
#[derive(Debug, Clone)]
pub enum Request {
    Mixdown {
        inputs: Vec<PathBuf>,
        output: PathBuf,
    },
    AacEncode {
        input: PathBuf,
        output: Option<PathBuf>,
        mode: Option<u8>,
    },
    Remux {
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
    },
    AudioMix {
        video: PathBuf,
        audio: Vec<PathBuf>,
        output: PathBuf,
        mode: Option<u8>,
    },
    Scale {
        input: PathBuf,
        size: String,
        output: PathBuf,
    },
    ExtractAudio {
        input: PathBuf,
        output: PathBuf,
        track: i64,
    },
    DecodeAudio {
        input: PathBuf,
        output: PathBuf,
        tracks: Vec<i64>,
        number: bool,
    },
    CompGate {
        input: PathBuf,
        output: PathBuf,
        curve: CompanderCurve,
    },
}

/// Validate `request` against `config` and build the operation.
pub fn build_operation(request: Request, force: bool, config: &Config) -> vidtool_av::Result<MediaOperation> {
    let aac_mode = |mode: Option<u8>| match mode {
        Some(m) => AacMode::new(m),
        None => AacMode::new(config.encode.aac_mode),
    };

    let op = match request {
        Request::Mixdown { inputs, output } => MediaOperation::mixdown(inputs, output)?,
        Request::AacEncode { input, output, mode } => {
            MediaOperation::aac_encode(input, output, aac_mode(mode)?)?
        }
        Request::Remux { video, audio, output } => MediaOperation::remux(video, audio, output)?,
        Request::AudioMix {
            video,
            audio,
            output,
            mode,
        } => MediaOperation::audio_mix(video, audio, output, aac_mode(mode)?)?,
        Request::Scale { input, size, output } => MediaOperation::scale(
            input,
            &size,
            output,
            config.scale.audio_codec.clone(),
            config.scale.audio_bitrate.clone(),
        )?,
        Request::ExtractAudio { input, output, track } => {
            MediaOperation::extract_audio(input, output, track)?
        }
        Request::DecodeAudio {
            input,
            output,
            tracks,
            number,
        } => MediaOperation::decode_audio(input, output, &tracks, number)?,
        Request::CompGate { input, output, curve } => {
            MediaOperation::comp_gate(input, output, curve)?
        }
    };

    Ok(op.with_force(force))
}

/// Build the pipeline described by `config`.
pub fn pipeline(config: &Config, cancellation: CancellationToken) -> Pipeline {
    let runner = StageRunner::new(config.toolchain())
        .with_timeout(config.stage_timeout())
        .with_cancellation(cancellation);
    Pipeline::new(runner).with_workspace_root(config.workspace.root.clone())
}

/// Validate and run one media command, reporting written files on stdout.
pub async fn run(request: Request, force: bool, config: &Config, cancellation: CancellationToken) -> Result<()> {
    let op = build_operation(request, force, config)?;
    let name = op.kind().name();

    let written = pipeline(config, cancellation)
        .execute(op)
        .await
        .with_context(|| format!("{name} failed"))?;

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

/// Print availability of every external tool.
pub fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = config.toolchain().check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all commands.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidtool_av::{Error, OperationKind};

    #[test]
    fn test_config_supplies_encoder_mode() {
        let mut config = Config::default();
        config.encode.aac_mode = 2;

        let op = build_operation(
            Request::AacEncode {
                input: "mix.wav".into(),
                output: None,
                mode: None,
            },
            false,
            &config,
        )
        .unwrap();
        assert_eq!(
            op.kind(),
            &OperationKind::AacEncode {
                mode: AacMode::new(2).unwrap()
            }
        );

        let op = build_operation(
            Request::AacEncode {
                input: "mix.wav".into(),
                output: None,
                mode: Some(4),
            },
            true,
            &config,
        )
        .unwrap();
        assert!(op.force());
        assert_eq!(op.kind(), &OperationKind::AacEncode { mode: AacMode::new(4).unwrap() });
    }

    #[test]
    fn test_scale_uses_configured_audio() {
        let mut config = Config::default();
        config.scale.audio_codec = "aac".into();
        config.scale.audio_bitrate = "96k".into();

        let op = build_operation(
            Request::Scale {
                input: "in.mp4".into(),
                size: "640:360".into(),
                output: "o.mp4".into(),
            },
            false,
            &config,
        )
        .unwrap();
        match op.kind() {
            OperationKind::Scale {
                audio_codec,
                audio_bitrate,
                size,
            } => {
                assert_eq!(audio_codec, "aac");
                assert_eq!(audio_bitrate, "96k");
                assert_eq!(size.as_str(), "640:360");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_gate_above_compress_is_validation_error() {
        let curve = CompanderCurve {
            gate: -20.0,
            compress: -40.0,
            ..CompanderCurve::default()
        };
        let err = build_operation(
            Request::CompGate {
                input: "in.wav".into(),
                output: "out.wav".into(),
                curve,
            },
            false,
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref param, .. } if param == "gate"));
    }
}
