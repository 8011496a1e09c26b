//! Requests for a single composite or simple media operation.

use crate::translate::{AacMode, CompanderCurve, Resolution, TrackIndex};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Operation-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Mix every input into one file.
    Mixdown,
    /// Encode the single input to AAC.
    AacEncode { mode: AacMode },
    /// Combine `inputs[0]`'s video with `inputs[1]`'s audio.
    Remux,
    /// Mix `inputs[1..]`, encode to AAC, and mux under `inputs[0]`'s video.
    AudioMix { mode: AacMode },
    /// Rescale the input video.
    Scale {
        size: Resolution,
        audio_codec: String,
        audio_bitrate: String,
    },
    /// Copy one audio track out without transcoding.
    ExtractAudio { track: TrackIndex },
    /// Decode one or more audio tracks to independent files.
    DecodeAudio {
        tracks: Vec<TrackIndex>,
        number_outputs: bool,
    },
    /// Compress and noise-gate an audio file.
    CompGate { curve: CompanderCurve },
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Mixdown => "mixdown",
            OperationKind::AacEncode { .. } => "aacenc",
            OperationKind::Remux => "remux",
            OperationKind::AudioMix { .. } => "audiomix",
            OperationKind::Scale { .. } => "scale",
            OperationKind::ExtractAudio { .. } => "extaudio",
            OperationKind::DecodeAudio { .. } => "decaudio",
            OperationKind::CompGate { .. } => "compgate",
        }
    }
}

/// One request to produce output artifact(s) from input artifacts.
///
/// Constructors validate arity and parameters, so a constructed operation
/// is always well formed.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaOperation {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    force: bool,
    kind: OperationKind,
}

impl MediaOperation {
    pub fn mixdown(inputs: Vec<PathBuf>, output: PathBuf) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::validation("input", "at least one audio file is required"));
        }
        Ok(Self::build(inputs, output, OperationKind::Mixdown))
    }

    /// Without an explicit output the result lands beside the input as `.m4a`.
    pub fn aac_encode(input: PathBuf, output: Option<PathBuf>, mode: AacMode) -> Result<Self> {
        let output = output.unwrap_or_else(|| input.with_extension("m4a"));
        if output == input {
            return Err(Error::validation("output", "must differ from the input file"));
        }
        Ok(Self::build(vec![input], output, OperationKind::AacEncode { mode }))
    }

    pub fn remux(video: PathBuf, audio: PathBuf, output: PathBuf) -> Result<Self> {
        Ok(Self::build(vec![video, audio], output, OperationKind::Remux))
    }

    pub fn audio_mix(video: PathBuf, audio: Vec<PathBuf>, output: PathBuf, mode: AacMode) -> Result<Self> {
        if audio.is_empty() {
            return Err(Error::validation("audio", "at least one audio file is required"));
        }
        let mut inputs = Vec::with_capacity(audio.len() + 1);
        inputs.push(video);
        inputs.extend(audio);
        Ok(Self::build(inputs, output, OperationKind::AudioMix { mode }))
    }

    pub fn scale(
        input: PathBuf,
        size: &str,
        output: PathBuf,
        audio_codec: impl Into<String>,
        audio_bitrate: impl Into<String>,
    ) -> Result<Self> {
        let size: Resolution = size.parse()?;
        let audio_codec = audio_codec.into();
        let audio_bitrate = audio_bitrate.into();
        if audio_codec.trim().is_empty() {
            return Err(Error::validation("audio codec", "cannot be empty"));
        }
        if audio_bitrate.trim().is_empty() {
            return Err(Error::validation("audio bitrate", "cannot be empty"));
        }
        Ok(Self::build(
            vec![input],
            output,
            OperationKind::Scale {
                size,
                audio_codec,
                audio_bitrate,
            },
        ))
    }

    pub fn extract_audio(input: PathBuf, output: PathBuf, track: i64) -> Result<Self> {
        let track = TrackIndex::try_from(track)?;
        Ok(Self::build(vec![input], output, OperationKind::ExtractAudio { track }))
    }

    /// Tracks default to `[0]`. More than one track always numbers outputs.
    pub fn decode_audio(input: PathBuf, output: PathBuf, tracks: &[i64], number_outputs: bool) -> Result<Self> {
        let mut parsed = Vec::with_capacity(tracks.len().max(1));
        for &track in tracks {
            let track = TrackIndex::try_from(track)?;
            if parsed.contains(&track) {
                return Err(Error::validation("track", format!("{track} requested more than once")));
            }
            parsed.push(track);
        }
        if parsed.is_empty() {
            parsed.push(TrackIndex::new(0));
        }
        let number_outputs = number_outputs || parsed.len() > 1;
        Ok(Self::build(
            vec![input],
            output,
            OperationKind::DecodeAudio {
                tracks: parsed,
                number_outputs,
            },
        ))
    }

    pub fn comp_gate(input: PathBuf, output: PathBuf, curve: CompanderCurve) -> Result<Self> {
        curve.validate()?;
        Ok(Self::build(vec![input], output, OperationKind::CompGate { curve }))
    }

    fn build(inputs: Vec<PathBuf>, output: PathBuf, kind: OperationKind) -> Self {
        Self {
            inputs,
            output,
            force: false,
            kind,
        }
    }

    /// Allow existing destinations to be replaced.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Every user-visible path this operation will write, in order.
    pub fn destinations(&self) -> Vec<PathBuf> {
        match &self.kind {
            OperationKind::DecodeAudio {
                tracks,
                number_outputs: true,
            } => tracks
                .iter()
                .map(|t| numbered_path(&self.output, *t))
                .collect(),
            _ => vec![self.output.clone()],
        }
    }
}

/// `dir/name.ext` becomes `dir/name<track>.ext`.
pub fn numbered_path(path: &Path, track: TrackIndex) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{track}.{}", ext.to_string_lossy()),
        None => format!("{stem}{track}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_defaults_to_first_track() {
        let op = MediaOperation::decode_audio("in.mkv".into(), "out.wav".into(), &[], false).unwrap();
        assert_eq!(op.destinations(), vec![PathBuf::from("out.wav")]);
    }

    #[test]
    fn test_multiple_tracks_number_outputs() {
        let op = MediaOperation::decode_audio("in.mkv".into(), "/music/out.wav".into(), &[0, 5], false).unwrap();
        assert_eq!(
            op.destinations(),
            vec![PathBuf::from("/music/out0.wav"), PathBuf::from("/music/out5.wav")]
        );

        let op = MediaOperation::decode_audio("in.mkv".into(), "out.flac".into(), &[2], true).unwrap();
        assert_eq!(op.destinations(), vec![PathBuf::from("out2.flac")]);
    }

    #[test]
    fn test_negative_or_duplicate_tracks_rejected() {
        assert!(matches!(
            MediaOperation::decode_audio("in.mkv".into(), "o.wav".into(), &[-1], false),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            MediaOperation::decode_audio("in.mkv".into(), "o.wav".into(), &[1, 1], false),
            Err(Error::Validation { .. })
        ));
        assert!(MediaOperation::extract_audio("in.mkv".into(), "o.ac3".into(), -2).is_err());
    }

    #[test]
    fn test_scale_rejects_wrong_separator() {
        let err = MediaOperation::scale("in.mp4".into(), "1280x720", "out.mp4".into(), "mp3", "64k").unwrap_err();
        assert!(matches!(err, Error::Validation { ref param, .. } if param == "size"));
    }

    #[test]
    fn test_aac_default_output() {
        let op = MediaOperation::aac_encode("/a/mix.wav".into(), None, AacMode::default()).unwrap();
        assert_eq!(op.output(), Path::new("/a/mix.m4a"));
        assert!(MediaOperation::aac_encode("/a/mix.m4a".into(), None, AacMode::default()).is_err());
    }

    #[test]
    fn test_audio_mix_orders_video_first() {
        let op = MediaOperation::audio_mix(
            "v.mkv".into(),
            vec!["a.wav".into(), "b.wav".into()],
            "o.mkv".into(),
            AacMode::default(),
        )
        .unwrap()
        .with_force(true);
        assert_eq!(op.inputs()[0], PathBuf::from("v.mkv"));
        assert_eq!(op.inputs().len(), 3);
        assert!(op.force());
        assert_eq!(op.kind().name(), "audiomix");
    }

    #[test]
    fn test_comp_gate_validates_curve() {
        let curve = CompanderCurve {
            gate: -10.0,
            compress: -40.0,
            ..Default::default()
        };
        assert!(MediaOperation::comp_gate("in.wav".into(), "out.wav".into(), curve).is_err());
    }

    #[test]
    fn test_numbered_path_without_extension() {
        assert_eq!(numbered_path(Path::new("dir/out"), TrackIndex::new(3)), PathBuf::from("dir/out3"));
    }
}
