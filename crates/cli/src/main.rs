mod config_commands;
mod download_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "folio", about = "Folio: batch gallery downloads as JPEG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/folio/).
    #[arg(long, global = true, env = "FOLIO_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every item of a manifest into the output directory.
    Download(download_commands::DownloadArgs),
    /// Convert a single image (path or URL) to JPEG.
    Normalize(download_commands::NormalizeArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "folio starting");

    if let Some(ref dir) = cli.config_dir {
        folio_config::set_config_dir(dir.clone());
    }

    match cli.command {
        Commands::Download(args) => {
            let config = folio_config::discover_and_load();
            download_commands::handle_download(args, config).await
        },
        Commands::Normalize(args) => {
            let config = folio_config::discover_and_load();
            download_commands::handle_normalize(args, &config).await
        },
        Commands::Config { action } => config_commands::handle_config(action),
    }
}
