mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use vidtool_av::translate::AacMode;
use vidtool_av::{Tool, Toolchain};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./vidtool.toml",
        "~/.config/vidtool/config.toml",
        "/etc/vidtool/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    AacMode::new(config.encode.aac_mode).context("Invalid [encode] aac_mode")?;

    if config.scale.audio_codec.trim().is_empty() {
        anyhow::bail!("[scale] audio_codec cannot be empty");
    }
    if config.scale.audio_bitrate.trim().is_empty() {
        anyhow::bail!("[scale] audio_bitrate cannot be empty");
    }

    for (name, path) in [
        ("ffmpeg_path", &config.tools.ffmpeg_path),
        ("fdkaac_path", &config.tools.fdkaac_path),
        ("sox_path", &config.tools.sox_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("[tools] {} does not exist: {:?}", name, path);
            }
        }
    }

    if let Some(root) = &config.workspace.root {
        if !root.is_dir() {
            tracing::warn!("[workspace] root is not a directory: {:?}", root);
        }
    }

    Ok(())
}

impl Config {
    /// Executable locations for the stage runner.
    pub fn toolchain(&self) -> Toolchain {
        let mut tools = Toolchain::new();
        for (tool, path) in [
            (Tool::Ffmpeg, &self.tools.ffmpeg_path),
            (Tool::Fdkaac, &self.tools.fdkaac_path),
            (Tool::Sox, &self.tools.sox_path),
        ] {
            if let Some(path) = path {
                tools = tools.with_path(tool, path.clone());
            }
        }
        tools
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        match self.stages.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
