use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub encode: EncodeConfig,

    #[serde(default)]
    pub scale: ScaleConfig,

    #[serde(default)]
    pub stages: StagesConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub fdkaac_path: Option<PathBuf>,

    #[serde(default)]
    pub sox_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Parent directory for per-operation workspaces (default: system temp)
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodeConfig {
    /// fdkaac VBR mode, 1 (smallest) to 5 (best)
    #[serde(default = "default_aac_mode")]
    pub aac_mode: u8,
}

fn default_aac_mode() -> u8 {
    5
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            aac_mode: default_aac_mode(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScaleConfig {
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_bitrate() -> String {
    "64k".to_string()
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StagesConfig {
    /// Kill a stage after this many seconds (0 disables the limit)
    #[serde(default)]
    pub timeout_secs: u64,
}
