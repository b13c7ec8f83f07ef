use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribeflow::{AppState, ConfigLoader, Database};

#[derive(Parser)]
#[command(name = "scribeflow")]
#[command(version, about = "Writing-assistant SaaS backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        #[arg(long, help = "Bind address override")]
        host: Option<String>,
        #[arg(long, short, help = "Bind port override")]
        port: Option<u16>,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create the database schema (idempotent)
    Init,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Write a default configuration file
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
    /// Show the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = ConfigLoader::load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let db = Arc::new(Database::open(&config.database.path)?);
            db.initialize()?;

            let state = AppState::new(config, db)?;
            scribeflow::serve(state).await?;
        }
        Commands::Db { action } => match action {
            DbAction::Init => {
                let config = ConfigLoader::load()?;
                let db = Database::open(&config.database.path)?;
                db.initialize()?;
                println!("Database ready: {}", config.database.path.display());
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                ConfigLoader::show_config(format == "json")?;
            }
            ConfigAction::Init { force } => {
                let path = ConfigLoader::init(force)?;
                println!("Created config: {}", path.display());
            }
            ConfigAction::Path => {
                println!("{}", ConfigLoader::config_path().display());
            }
        },
    }

    Ok(())
}
