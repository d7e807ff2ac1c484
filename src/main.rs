//! # Focusia CLI (`focusia`)
//!
//! ## Usage
//!
//! ```bash
//! focusia --config ./config/focusia.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `focusia index` | Build the index from the corpus, or load the existing one |
//! | `focusia index --rebuild` | Clear the index and build it again |
//! | `focusia ask "<query>"` | Answer one query and list the sources used |
//! | `focusia serve` | Start the JSON HTTP server |
//! | `focusia completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! export HF_TOKEN=hf_...
//! focusia index
//! focusia ask "Sürekli telefona bakıyorum, başladığım işi bitiremiyorum"
//! focusia ask "odaklanamıyorum" --json
//! focusia serve
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use focusia::config::{self, DEFAULT_CONFIG_PATH};
use focusia::{ask, index_cmd, logging, server};

/// Focusia: short, grounded focus advice from a curated tip corpus.
#[derive(Parser)]
#[command(
    name = "focusia",
    about = "Focusia: a retrieval-augmented focus coach",
    version,
    long_about = "Focusia retrieves related tips from a small JSON corpus with MMR search \
    and asks a hosted language model for three short suggestions plus one micro-exercise."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/focusia.toml`; when that file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from the corpus, or load it if one exists.
    ///
    /// An existing index is reused as-is, even if the corpus changed
    /// since it was built. Use `--rebuild` to pick up corpus edits.
    Index {
        /// Clear the existing index first.
        #[arg(long)]
        rebuild: bool,
    },

    /// Answer a single query.
    Ask {
        /// What is getting in the way of your focus.
        query: String,

        /// Also print a short passage from each source.
        #[arg(long)]
        snippets: bool,

        /// Print `{"text", "sources"}` as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print a shell completion script to stdout.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "focusia", &mut std::io::stdout());
        return Ok(());
    }

    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cfg = config::load_config_or_default(&config_path, explicit)?;
    logging::init_logging(&cfg.logging.level)?;

    match cli.command {
        Commands::Index { rebuild } => {
            index_cmd::run_index(&cfg, rebuild).await?;
        }
        Commands::Ask {
            query,
            snippets,
            json,
        } => {
            ask::run_ask(&cfg, &query, snippets, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
