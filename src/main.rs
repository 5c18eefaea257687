use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use face_swap::orchestrator::DEFAULT_RESULT_FILE;
use face_swap::utils::logging;
use face_swap::{App, Config, FaceSwapStatus, SwapRequest};
use tracing::info;

#[derive(Parser)]
#[command(name = "face_swap", version, about = "Face swap gateway and terminal client")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarding gateway
    Serve {
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Swap the face from IMAGE1 onto IMAGE2
    Swap {
        /// Image containing the face
        image1: PathBuf,
        /// Target image
        image2: PathBuf,
        /// Where to save the result
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Save the result as face-swap-result.jpg in the current directory
        #[arg(long, conflicts_with = "output")]
        download: bool,
        /// Override the gateway URL
        #[arg(long)]
        gateway: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 先加载配置，日志级别由 --verbose 和 verbose_logging 共同决定
    let mut config = load_config(&cli)?;
    logging::init(config.verbose_logging);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            App::new(config).serve().await?;
        }
        Commands::Swap {
            image1,
            image2,
            output,
            download,
            gateway,
        } => {
            if let Some(gateway) = gateway {
                config.gateway_url = gateway;
                config.validate()?;
            }

            let output = output.or_else(|| download.then(|| PathBuf::from(DEFAULT_RESULT_FILE)));
            let outcome = App::new(config)
                .swap(SwapRequest {
                    face: image1,
                    target: image2,
                    output,
                })
                .await?;

            if outcome.status != FaceSwapStatus::Completed {
                bail!(
                    "换脸未完成 ({}): {}",
                    outcome.status,
                    outcome.error.unwrap_or_default()
                );
            }

            if let Some(url) = outcome.result_url {
                info!("✅ 换脸完成: {}", url);
            }
        }
    }

    Ok(())
}

/// 加载配置，命令行 `--verbose` 只能打开详细日志，不能关掉
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.verbose_logging |= cli.verbose;
    Ok(config)
}
