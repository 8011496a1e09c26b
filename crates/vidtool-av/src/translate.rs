//! Translation of domain parameters into tool argument vectors.
//!
//! Everything here is pure: values are validated and rendered into
//! discrete argument tokens, never into a shell string.

use crate::{Error, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Offset below the gate threshold where the transfer function starts
/// rising out of silence.
const GATE_RAMP_DB: f64 = 0.1;

/// Render a duration in seconds with millisecond resolution.
pub fn render_seconds(param: &str, seconds: f64) -> Result<String> {
    if !seconds.is_finite() {
        return Err(Error::validation(param, "must be a finite number of seconds"));
    }
    if seconds < 0.0 {
        return Err(Error::validation(
            param,
            format!("duration cannot be negative ({seconds})"),
        ));
    }
    Ok(format!("{seconds:.3}"))
}

/// Render a decibel value with 0.01 dB resolution.
fn render_db(param: &str, db: f64) -> Result<String> {
    if !db.is_finite() {
        return Err(Error::validation(param, "must be a finite decibel value"));
    }
    // Avoid printing "-0.00" for values that round to zero.
    let rounded = (db * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    Ok(format!("{rounded:.2}"))
}

/// Render an absolute level, which must not be above 0 dBFS.
pub fn render_level(param: &str, db: f64) -> Result<String> {
    let rendered = render_db(param, db)?;
    if db > 0.0 {
        return Err(Error::validation(
            param,
            format!("level must be 0 dB or below ({db})"),
        ));
    }
    Ok(rendered)
}

/// Render a relative gain, which may take either sign.
pub fn render_gain(param: &str, db: f64) -> Result<String> {
    render_db(param, db)
}

/// Zero-based audio track index within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackIndex(u32);

impl TrackIndex {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// ffmpeg stream specifier selecting this audio track of the first input.
    pub fn stream_spec(self) -> String {
        format!("0:a:{}", self.0)
    }
}

impl TryFrom<i64> for TrackIndex {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(TrackIndex)
            .map_err(|_| Error::validation("track", format!("must be a non-negative integer ({value})")))
    }
}

impl fmt::Display for TrackIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `WIDTH:HEIGHT` frame size, kept in the exact text the user supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    raw: String,
}

impl Resolution {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::validation(
                "size",
                format!("expected WIDTH:HEIGHT with positive integers, got {s:?}"),
            )
        };

        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        if !is_dimension(w) || !is_dimension(h) {
            return Err(invalid());
        }

        Ok(Self { raw: s.to_string() })
    }
}

fn is_dimension(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && s.parse::<u32>().is_ok_and(|v| v > 0)
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// fdkaac VBR mode (1 = lowest, 5 = highest quality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacMode(u8);

impl AacMode {
    pub const HIGHEST: AacMode = AacMode(5);

    pub fn new(mode: u8) -> Result<Self> {
        if (1..=5).contains(&mode) {
            Ok(Self(mode))
        } else {
            Err(Error::validation("mode", format!("must be between 1 and 5 ({mode})")))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for AacMode {
    fn default() -> Self {
        Self::HIGHEST
    }
}

/// Parameters of a combined compressor/expander/noise gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanderCurve {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Look-ahead delay in seconds.
    pub delay: f64,
    /// Soft-knee width in dB.
    pub soft_knee: f64,
    /// Post-processing gain in dB.
    pub gain: f64,
    /// Assumed initial level in dB.
    pub initial_volume: f64,
    /// Level below which the signal is muted.
    pub gate: f64,
    /// Level above which the signal is raised toward `target`.
    pub compress: f64,
    /// Output level for input at `compress`.
    pub target: f64,
}

impl Default for CompanderCurve {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.2,
            delay: 0.2,
            soft_knee: 6.0,
            gain: -5.0,
            initial_volume: -90.0,
            gate: -48.0,
            compress: -40.0,
            target: -20.0,
        }
    }
}

impl CompanderCurve {
    /// Check every parameter, including the gate/compress ordering.
    pub fn validate(&self) -> Result<()> {
        self.render().map(|_| ())
    }

    /// Arguments for sox's `compand` effect, starting with the effect name.
    pub fn render(&self) -> Result<Vec<String>> {
        let attack = render_seconds("attack", self.attack)?;
        let decay = render_seconds("decay", self.decay)?;
        let delay = render_seconds("delay", self.delay)?;

        let soft_knee = render_db("soft-knee", self.soft_knee)?;
        if self.soft_knee < 0.0 {
            return Err(Error::validation(
                "soft-knee",
                format!("width cannot be negative ({})", self.soft_knee),
            ));
        }
        let gain = render_gain("gain", self.gain)?;
        let initial = render_level("initial-volume", self.initial_volume)?;
        let gate = render_level("gate", self.gate)?;
        let compress = render_level("compress", self.compress)?;
        let target = render_level("target", self.target)?;

        if self.gate > self.compress {
            return Err(Error::validation(
                "gate",
                format!(
                    "threshold {} cannot exceed the compress threshold {}",
                    self.gate, self.compress
                ),
            ));
        }

        let ramp = render_db("gate", self.gate - GATE_RAMP_DB)?;
        let transfer = format!("{soft_knee}:-inf,{ramp},-inf,{gate},{gate},{compress},{target}");

        Ok(vec![
            "compand".to_string(),
            format!("{attack},{decay}"),
            transfer,
            gain,
            initial,
            delay,
        ])
    }
}

fn push_input(args: &mut Vec<OsString>, path: &Path) {
    args.push("-i".into());
    args.push(path.as_os_str().to_owned());
}

/// Leading ffmpeg options shared by every invocation. Outputs always land
/// in a private workspace, so `-y` never clobbers anything user-visible.
fn ffmpeg_prelude() -> Vec<OsString> {
    ["-hide_banner", "-nostdin", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

/// ffmpeg: mix N inputs into one, truncated to the first input's length.
pub fn mixdown_args(inputs: &[impl AsRef<Path>], output: &Path) -> Result<Vec<OsString>> {
    if inputs.is_empty() {
        return Err(Error::validation("input", "at least one audio file is required"));
    }

    let mut args = ffmpeg_prelude();
    for input in inputs {
        push_input(&mut args, input.as_ref());
    }
    args.push("-filter_complex".into());
    args.push(format!("amix=inputs={}:duration=first", inputs.len()).into());
    args.push(output.as_os_str().to_owned());
    Ok(args)
}

/// fdkaac: encode a wav file.
pub fn aac_args(input: &Path, output: &Path, mode: AacMode) -> Vec<OsString> {
    vec![
        "-m".into(),
        mode.get().to_string().into(),
        input.as_os_str().to_owned(),
        "-o".into(),
        output.as_os_str().to_owned(),
    ]
}

/// ffmpeg: first video stream of `video` plus first audio stream of `audio`.
pub fn remux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args = ffmpeg_prelude();
    push_input(&mut args, video);
    push_input(&mut args, audio);
    for token in ["-c", "copy", "-map", "0:v:0", "-map", "1:a:0"] {
        args.push(token.into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

/// ffmpeg: rescale video, re-encoding audio with the given codec and bitrate.
pub fn scale_args(
    input: &Path,
    size: &Resolution,
    audio_codec: &str,
    audio_bitrate: &str,
    output: &Path,
) -> Vec<OsString> {
    let mut args = ffmpeg_prelude();
    push_input(&mut args, input);
    args.push("-vf".into());
    args.push(format!("scale={size}").into());
    args.push("-acodec".into());
    args.push(audio_codec.into());
    args.push("-b:a".into());
    args.push(audio_bitrate.into());
    args.push(output.as_os_str().to_owned());
    args
}

/// ffmpeg: copy one audio track out without transcoding.
pub fn extract_args(input: &Path, track: TrackIndex, output: &Path) -> Vec<OsString> {
    let mut args = ffmpeg_prelude();
    push_input(&mut args, input);
    for token in ["-acodec".to_string(), "copy".to_string(), "-map".to_string(), track.stream_spec()] {
        args.push(token.into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

/// ffmpeg: decode one audio track; the output extension picks the codec.
pub fn decode_args(input: &Path, track: TrackIndex, output: &Path) -> Vec<OsString> {
    let mut args = ffmpeg_prelude();
    push_input(&mut args, input);
    args.push("-map".into());
    args.push(track.stream_spec().into());
    args.push(output.as_os_str().to_owned());
    args
}

/// sox: run the compander effect.
pub fn compand_args(input: &Path, output: &Path, curve: &CompanderCurve) -> Result<Vec<OsString>> {
    let effect = curve.render()?;
    let mut args: Vec<OsString> = vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()];
    args.extend(effect.into_iter().map(OsString::from));
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    /// Parsed form of a sox compand invocation, read back from argv.
    #[derive(Debug)]
    struct ParsedCompand {
        attack: f64,
        decay: f64,
        soft_knee: f64,
        points: Vec<(f64, f64)>,
        gain: f64,
        initial: f64,
        delay: f64,
    }

    fn parse_level(s: &str) -> f64 {
        if s == "-inf" {
            f64::NEG_INFINITY
        } else {
            s.parse().unwrap()
        }
    }

    fn parse_compand(args: &[String]) -> ParsedCompand {
        assert_eq!(args[0], "compand");
        let (attack, decay) = args[1].split_once(',').unwrap();
        let (knee, points) = args[2].split_once(':').unwrap();
        let values: Vec<f64> = points.split(',').map(parse_level).collect();
        // in-dB1[,out-dB1][,in-dB2,out-dB2]...: an odd count means the
        // first point has no explicit output and maps to itself.
        let (lead, pairs) = if values.len() % 2 == 1 {
            (Some((values[0], values[0])), &values[1..])
        } else {
            (None, &values[..])
        };
        ParsedCompand {
            attack: attack.parse().unwrap(),
            decay: decay.parse().unwrap(),
            soft_knee: knee.parse().unwrap(),
            points: lead
                .into_iter()
                .chain(pairs.chunks(2).map(|p| (p[0], p[1])))
                .collect(),
            gain: args[3].parse().unwrap(),
            initial: args[4].parse().unwrap(),
            delay: args[5].parse().unwrap(),
        }
    }

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    fn same_level(a: f64, b: f64) -> bool {
        if b == f64::NEG_INFINITY {
            a == f64::NEG_INFINITY
        } else {
            close(a, b, 0.01)
        }
    }

    #[test]
    fn test_default_curve_matches_sox_grammar() {
        let args = CompanderCurve::default().render().unwrap();
        assert_eq!(
            args,
            vec![
                "compand",
                "0.100,0.200",
                "6.00:-inf,-48.10,-inf,-48.00,-48.00,-40.00,-20.00",
                "-5.00",
                "-90.00",
                "0.200",
            ]
        );
    }

    #[test]
    fn test_curves_round_trip_through_parser() {
        let gates = [-90.0, -48.0, -40.5, -12.345, 0.0];
        let compresses = [-40.0, -12.345, -3.0, 0.0];
        let durations = [0.0, 0.001, 0.1234, 2.5];

        for &gate in &gates {
            for &compress in &compresses {
                if gate > compress {
                    continue;
                }
                for &attack in &durations {
                    let curve = CompanderCurve {
                        attack,
                        decay: attack * 2.0,
                        delay: 0.05,
                        soft_knee: 4.25,
                        gain: 3.5,
                        initial_volume: -70.0,
                        gate,
                        compress,
                        target: -20.0,
                    };
                    let parsed = parse_compand(&curve.render().unwrap());

                    assert!(close(parsed.attack, attack, 0.001), "{curve:?}");
                    assert!(close(parsed.decay, attack * 2.0, 0.001));
                    assert!(close(parsed.delay, 0.05, 0.001));
                    assert!(close(parsed.soft_knee, 4.25, 0.1));
                    assert!(close(parsed.gain, 3.5, 0.1));
                    assert!(close(parsed.initial, -70.0, 0.1));

                    let expected = [
                        (f64::NEG_INFINITY, f64::NEG_INFINITY),
                        (gate - 0.1, f64::NEG_INFINITY),
                        (gate, gate),
                        (compress, -20.0),
                    ];
                    assert_eq!(parsed.points.len(), expected.len(), "{curve:?}");
                    for (got, want) in parsed.points.iter().zip(expected) {
                        assert!(same_level(got.0, want.0), "{curve:?}: {got:?} vs {want:?}");
                        assert!(same_level(got.1, want.1), "{curve:?}: {got:?} vs {want:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_gate_above_compress_is_rejected() {
        let curve = CompanderCurve {
            gate: -30.0,
            compress: -40.0,
            ..CompanderCurve::default()
        };
        match curve.render() {
            Err(Error::Validation { param, .. }) => assert_eq!(param, "gate"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_positive_levels_are_rejected() {
        for (param, curve) in [
            ("gate", CompanderCurve { gate: 1.0, compress: 2.0, ..Default::default() }),
            ("compress", CompanderCurve { compress: 0.5, ..Default::default() }),
            ("initial-volume", CompanderCurve { initial_volume: 3.0, ..Default::default() }),
            ("target", CompanderCurve { target: 0.1, ..Default::default() }),
        ] {
            match curve.validate() {
                Err(Error::Validation { param: p, .. }) => assert_eq!(p, param),
                other => panic!("expected validation error for {param}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_gain_and_knee_may_be_non_negative() {
        let curve = CompanderCurve {
            gain: 6.0,
            soft_knee: 0.0,
            ..Default::default()
        };
        assert!(curve.validate().is_ok());

        let curve = CompanderCurve {
            soft_knee: -1.0,
            ..Default::default()
        };
        assert!(matches!(curve.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_durations() {
        assert_eq!(render_seconds("attack", 0.0005).unwrap(), "0.001");
        assert_eq!(render_seconds("attack", 1.0).unwrap(), "1.000");
        assert!(render_seconds("attack", -0.1).is_err());
        assert!(render_seconds("attack", f64::NAN).is_err());
        assert!(render_seconds("decay", f64::INFINITY).is_err());
    }

    #[test]
    fn test_negative_zero_renders_plainly() {
        assert_eq!(render_level("gate", -0.001).unwrap(), "0.00");
        assert_eq!(render_gain("gain", -0.0).unwrap(), "0.00");
    }

    #[test]
    fn test_resolution_parsing() {
        let size: Resolution = "1280:720".parse().unwrap();
        assert_eq!(size.as_str(), "1280:720");
        assert_eq!(size.to_string(), "1280:720");

        // Kept verbatim, not reformatted.
        assert_eq!("0640:0360".parse::<Resolution>().unwrap().as_str(), "0640:0360");

        for bad in ["1280x720", "1280:", ":720", "0:720", "1280:0", "-1:720", "+1280:720", "1280:720:1", " 1280:720", ""] {
            assert!(
                matches!(bad.parse::<Resolution>(), Err(Error::Validation { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_track_index() {
        assert_eq!(TrackIndex::try_from(3).unwrap().stream_spec(), "0:a:3");
        assert!(TrackIndex::try_from(-1).is_err());
        assert!(TrackIndex::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_aac_mode_bounds() {
        assert!(AacMode::new(0).is_err());
        assert!(AacMode::new(6).is_err());
        assert_eq!(AacMode::new(3).unwrap().get(), 3);
        assert_eq!(AacMode::default().get(), 5);
    }

    #[test]
    fn test_mixdown_args() {
        let inputs = [PathBuf::from("a.wav"), PathBuf::from("b.wav")];
        let args = mixdown_args(&inputs, Path::new("/ws/mix.wav")).unwrap();
        assert_eq!(
            strings(&args),
            vec![
                "-hide_banner", "-nostdin", "-y", "-i", "a.wav", "-i", "b.wav",
                "-filter_complex", "amix=inputs=2:duration=first", "/ws/mix.wav",
            ]
        );

        let none: [PathBuf; 0] = [];
        assert!(mixdown_args(&none, Path::new("x.wav")).is_err());
    }

    #[test]
    fn test_paths_stay_single_tokens() {
        let input = Path::new("my movie; rm -rf ~.mkv");
        let args = decode_args(input, TrackIndex::new(1), Path::new("/ws/out track.wav"));
        let args = strings(&args);
        assert!(args.contains(&"my movie; rm -rf ~.mkv".to_string()));
        assert_eq!(args.last().unwrap(), "/ws/out track.wav");
        assert!(args.contains(&"0:a:1".to_string()));
    }

    #[test]
    fn test_remux_scale_extract_aac_args() {
        let remux = strings(&remux_args(Path::new("v.mkv"), Path::new("a.m4a"), Path::new("o.mkv")));
        assert_eq!(
            &remux[3..],
            ["-i", "v.mkv", "-i", "a.m4a", "-c", "copy", "-map", "0:v:0", "-map", "1:a:0", "o.mkv"]
        );

        let size: Resolution = "640:360".parse().unwrap();
        let scale = strings(&scale_args(Path::new("in.mp4"), &size, "mp3", "64k", Path::new("o.mp4")));
        assert_eq!(
            &scale[3..],
            ["-i", "in.mp4", "-vf", "scale=640:360", "-acodec", "mp3", "-b:a", "64k", "o.mp4"]
        );

        let extract = strings(&extract_args(Path::new("in.mkv"), TrackIndex::new(2), Path::new("o.ac3")));
        assert_eq!(&extract[3..], ["-i", "in.mkv", "-acodec", "copy", "-map", "0:a:2", "o.ac3"]);

        let aac = strings(&aac_args(Path::new("mix.wav"), Path::new("mix.m4a"), AacMode::default()));
        assert_eq!(aac, ["-m", "5", "mix.wav", "-o", "mix.m4a"]);
    }

    #[test]
    fn test_compand_args_lead_with_files() {
        let args = compand_args(Path::new("in.wav"), Path::new("out.wav"), &CompanderCurve::default()).unwrap();
        let args = strings(&args);
        assert_eq!(args[0], "in.wav");
        assert_eq!(args[1], "out.wav");
        assert_eq!(args[2], "compand");
    }
}
