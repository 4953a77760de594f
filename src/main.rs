use clap::{Parser, Subcommand};
use tracing::info;

use chatvault::config::AppConfig;
use chatvault::logging::init_logging;
use chatvault::metrics::MetricsCollector;
use chatvault::server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web application
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8361
        #[arg(short, long)]
        listen: Option<String>,

        /// Path to the SQLite database file
        #[arg(short, long)]
        database: Option<String>,

        /// Root directory for extracted media
        #[arg(short, long)]
        storage: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let mut config = AppConfig::load()?;

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            database,
            storage,
        } => {
            if let Some(listen) = listen {
                config.server.listen_addr = listen;
            }
            if let Some(database) = database {
                config.database.path = database;
            }
            if let Some(storage) = storage {
                config.storage.root = storage;
            }
            config.validate()?;

            // The guard keeps the background log writer alive until exit.
            let _guard = init_logging(
                &config.get_log_level(),
                config.logging.file_path.as_deref().map(std::path::Path::new),
            )?;
            MetricsCollector::init();

            info!("Starting chatvault");
            server::serve(&config).await?;
        }
    }

    Ok(())
}
