mod collect;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "trendscout-cli")]
#[command(about = "Collect trending content across platforms")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect trends and print the report as JSON
    Collect {
        /// Platform tag to collect; repeat for several. Defaults to every
        /// enabled roster platform.
        #[arg(long = "platform", value_name = "TAG")]
        platforms: Vec<String>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },
    /// List roster platforms and how each would be collected
    Platforms,
    /// Open and close one remote browser session
    CheckBrowser,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendscout_core::load_app_config()?;

    // Logs go to stderr so stdout stays machine-readable.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Collect { platforms, pretty }) => {
            collect::run_collect(&config, &platforms, pretty).await
        }
        Some(Commands::Platforms) => collect::run_platforms(&config),
        Some(Commands::CheckBrowser) => collect::run_check_browser(&config).await,
        None => {
            println!("trendscout-cli: run with --help for available commands");
            Ok(())
        }
    }
}
