//! # xiVIEW data CLI (`xiview`)
//!
//! ## Usage
//!
//! ```bash
//! xiview --config ./config/xiview.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `xiview init` | Create the schema in an empty SQLite file |
//! | `xiview network <project> [--file <name>]` | Print a project's network data as JSON |
//! | `xiview peaklist <id> <sd_ref> <upload_id>` | Print one decoded peaklist as JSON |
//! | `xiview serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use xiview_data::{config, network, peaklist, schema, server};

/// xiVIEW data service: serves cross-linking identification results
/// stored by the mzIdentML converter.
#[derive(Parser)]
#[command(name = "xiview", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/xiview.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables the service reads. Idempotent.
    Init,

    /// Assemble a project's network data and print it as JSON.
    Network {
        /// Dataset accession the uploads are filed under.
        project: String,

        /// Restrict to the latest upload of this identification file.
        #[arg(long)]
        file: Option<String>,
    },

    /// Decode one spectrum's peaklist and print it as JSON.
    Peaklist {
        /// Spectrum id within the spectra data file.
        id: String,

        /// Spectra data reference.
        sd_ref: String,

        /// Upload the spectrum belongs to.
        upload_id: i64,
    },

    /// Start the HTTP server.
    Serve,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg.logging.filter);

    match cli.command {
        Commands::Init => {
            schema::run_init(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Network { project, file } => {
            network::run_network(&cfg, &project, file.as_deref()).await?;
        }
        Commands::Peaklist {
            id,
            sd_ref,
            upload_id,
        } => {
            peaklist::run_peaklist(&cfg, &id, &sd_ref, upload_id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
