mod cli;

use vidtool::commands::{self, Request};
use vidtool::config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidtool=debug,vidtool_av=debug".to_string()
        } else {
            "vidtool=info,vidtool_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<vidtool_av::Error>()
                .map(vidtool_av::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config_or_default(cli.config.as_deref())?;

    let (request, force) = match cli.command {
        Commands::CheckTools => return commands::check_tools(&config),
        Commands::Mixdown {
            input,
            output,
            force,
        } => (
            Request::Mixdown {
                inputs: input,
                output,
            },
            force.force,
        ),
        Commands::Aacenc {
            input,
            output,
            mode,
            force,
        } => (Request::AacEncode { input, output, mode }, force.force),
        Commands::Remux {
            video,
            audio,
            output,
            force,
        } => (Request::Remux { video, audio, output }, force.force),
        Commands::Audiomix {
            video,
            audio,
            output,
            mode,
            force,
        } => (
            Request::AudioMix {
                video,
                audio,
                output,
                mode,
            },
            force.force,
        ),
        Commands::Scale {
            input,
            size,
            output,
            force,
        } => (Request::Scale { input, size, output }, force.force),
        Commands::Extaudio {
            input,
            output,
            track,
            force,
        } => (Request::ExtractAudio { input, output, track }, force.force),
        Commands::Decaudio {
            input,
            output,
            tracks,
            number,
            force,
        } => (
            Request::DecodeAudio {
                input,
                output,
                tracks,
                number,
            },
            force.force,
        ),
        Commands::Compgate {
            input,
            output,
            curve,
            force,
        } => (
            Request::CompGate {
                input,
                output,
                curve: curve.into(),
            },
            force.force,
        ),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let cancellation = CancellationToken::new();
        let interrupt = cancellation.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::warn!("Interrupt received, stopping");
                    interrupt.cancel();
                }
                Err(e) => tracing::error!("Failed to install Ctrl+C handler: {}", e),
            }
        });

        commands::run(request, force, &config, cancellation).await
    })
}
