use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxsync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch the configured currencies and store new rates
    Sync,
    /// Show the latest stored rate for a currency
    Latest {
        /// 3-letter currency code, e.g. AUD
        code: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show all stored rates for a currency
    History {
        /// 3-letter currency code, e.g. AUD
        code: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl From<Commands> for fxsync::AppCommand {
    fn from(cmd: Commands) -> fxsync::AppCommand {
        match cmd {
            Commands::Sync => fxsync::AppCommand::Sync,
            Commands::Latest { code, json } => fxsync::AppCommand::Latest { code, json },
            Commands::History { code, json } => fxsync::AppCommand::History { code, json },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fxsync::cli::setup::setup_at_path(path),
            None => fxsync::cli::setup::setup(),
        },
        Some(cmd) => fxsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
