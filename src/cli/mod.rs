//! Command-line interface: argument parsing and command dispatch.

pub mod args;
pub mod commands;
pub mod tables;

pub use args::{Cli, Commands};

use crate::config::Settings;

/// Run a parsed command against loaded settings.
pub fn dispatch(command: Commands, settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Documents { json } => commands::documents::run(&settings, json),
        Commands::Index { json } => commands::index::run(&settings, json),
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => commands::search::run(&settings, &query, limit, threshold, json),
        Commands::Ask { query, top_k, json } => commands::ask::run(&settings, &query, top_k, json),
        Commands::Risk { document, json } => commands::ask::run_risk(&settings, &document, json),
        #[cfg(feature = "http-server")]
        Commands::Serve { bind, no_index } => commands::serve::run(settings, bind, no_index),
    }
}
