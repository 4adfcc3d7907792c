//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Quick Start:
  $ docrag init                          # Create .docrag/settings.toml and documents/
  $ cp contracts/*.pdf documents/
  $ docrag index                         # Check that every document indexes
  $ docrag search \"termination notice\"   # Ranked chunks
  $ docrag ask \"Who pays for repairs?\"   # Answer from retrieved context
  $ docrag serve                         # HTTP API";

/// Document retrieval and question answering
#[derive(Parser)]
#[command(
    name = "docrag",
    version = env!("CARGO_PKG_VERSION"),
    about = "Document retrieval and question answering",
    long_about = "Extract, chunk and embed documents, then answer questions from the most similar chunks.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up .docrag directory and an empty corpus
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// List documents in the corpus
    Documents {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the index from the corpus and report per-document results
    Index {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank corpus chunks by similarity to a query
    Search {
        /// Query text
        query: String,

        /// Number of chunks to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Drop hits below this similarity
        #[arg(long)]
        threshold: Option<f32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the corpus
    Ask {
        /// Question text
        query: String,

        /// Number of context chunks
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assess the legal risk of one corpus document
    Risk {
        /// Document name as listed by `docrag documents`
        document: String,

        /// Output the full assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API
    #[cfg(feature = "http-server")]
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Skip building the index at startup
        #[arg(long)]
        no_index: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_arguments() {
        let cli = Cli::try_parse_from(["docrag", "search", "notice period", "-l", "7", "--json"])
            .unwrap();
        match cli.command {
            Commands::Search {
                query, limit, json, ..
            } => {
                assert_eq!(query, "notice period");
                assert_eq!(limit, Some(7));
                assert!(json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["docrag", "ask", "who pays?", "--config", "alt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }
}
