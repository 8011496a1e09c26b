use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vidtool_av::translate::CompanderCurve;

#[derive(Parser)]
#[command(name = "vidtool")]
#[command(author, version, about = "A frontend for various video/audio fixes")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ForceArg {
    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mix multiple audio files into a single file
    Mixdown {
        /// Input files to mix
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// File to save to
        output: PathBuf,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Encode an audio file to AAC
    Aacenc {
        /// Input file
        input: PathBuf,

        /// Output file (default: input with an .m4a extension)
        output: Option<PathBuf>,

        /// Encoder VBR mode, 1-5 (default from config, otherwise 5)
        #[arg(short, long)]
        mode: Option<u8>,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Remux a video file and audio file into a new file
    Remux {
        /// Input video file. (Any audio tracks are ignored)
        video: PathBuf,

        /// Input audio file. Should be appropriately encoded.
        audio: PathBuf,

        /// Output video file
        output: PathBuf,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Mix a video file with external audio tracks into a new file
    ///
    /// Combines the `mixdown`, `aacenc` and `remux` commands into one.
    /// Intermediate files live in a temporary directory that is removed
    /// when the command finishes, whether or not it succeeded.
    Audiomix {
        /// Input video file. (Any audio tracks are ignored)
        video: PathBuf,

        /// Input audio files, in WAV format
        #[arg(required = true)]
        audio: Vec<PathBuf>,

        /// Output video file
        output: PathBuf,

        /// Encoder VBR mode, 1-5 (default from config, otherwise 5)
        #[arg(short, long)]
        mode: Option<u8>,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Scale a video down to a smaller size
    Scale {
        /// Input video file
        input: PathBuf,

        /// Size to rescale to, in WIDTH:HEIGHT format
        size: String,

        /// Output video file
        output: PathBuf,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Extract an audio track from a file
    Extaudio {
        /// Input video file
        input: PathBuf,

        /// Output audio file. Will be extracted from the original without any transcoding.
        output: PathBuf,

        /// Number of audio track to extract, zero-based
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        track: i64,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Extract and decode audio tracks from a video
    Decaudio {
        /// Input video file
        input: PathBuf,

        /// Output audio file. Will be transcoded into a format appropriate to the given filename.
        output: PathBuf,

        /// Number of audio track(s) to extract, zero-based. May be specified more than once. (Default 0)
        #[arg(short, long = "track", allow_negative_numbers = true)]
        tracks: Vec<i64>,

        /// Append track number to filename. Automatically enabled if multiple tracks specified.
        #[arg(short, long)]
        number: bool,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Compress and noise gate an audio file
    Compgate {
        /// Input audio file
        input: PathBuf,

        /// Output audio file
        output: PathBuf,

        #[command(flatten)]
        curve: CurveArgs,

        #[command(flatten)]
        force: ForceArg,
    },

    /// Check that required external tools are available
    CheckTools,
}

#[derive(Args, Debug, Clone)]
pub struct CurveArgs {
    /// Attack time in seconds
    #[arg(short, long, default_value_t = 0.1, allow_negative_numbers = true)]
    pub attack: f64,

    /// Decay time in seconds
    #[arg(short, long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub decay: f64,

    /// Soft knee in dB
    #[arg(short, long, default_value_t = 6.0, allow_negative_numbers = true)]
    pub soft_knee: f64,

    /// Gain in dB
    #[arg(short, long, default_value_t = -5.0, allow_negative_numbers = true)]
    pub gain: f64,

    /// Initial volume in dB
    #[arg(short, long, default_value_t = -90.0, allow_negative_numbers = true)]
    pub initial_volume: f64,

    /// Delay time in seconds
    #[arg(short = 'l', long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub delay: f64,

    /// Gate threshold in dB
    #[arg(short = 'G', long, default_value_t = -48.0, allow_negative_numbers = true)]
    pub gate: f64,

    /// Compression threshold in dB
    #[arg(short = 'C', long, default_value_t = -40.0, allow_negative_numbers = true)]
    pub compress: f64,

    /// Compression target in dB
    #[arg(short = 'T', long, default_value_t = -20.0, allow_negative_numbers = true)]
    pub target: f64,
}

impl From<CurveArgs> for CompanderCurve {
    fn from(args: CurveArgs) -> Self {
        CompanderCurve {
            attack: args.attack,
            decay: args.decay,
            delay: args.delay,
            soft_knee: args.soft_knee,
            gain: args.gain,
            initial_volume: args.initial_volume,
            gate: args.gate,
            compress: args.compress,
            target: args.target,
        }
    }
}
