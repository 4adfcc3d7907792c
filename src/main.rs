use clap::Parser;

use docrag::Settings;
use docrag::cli::{self, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // `init` must work even when the current settings are unusable.
    if !matches!(cli.command, Commands::Init { .. }) {
        if let Err(e) = settings.validate() {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    }

    docrag::logging::init_with_config(&settings.logging);

    if let Err(e) = cli::dispatch(cli.command, settings) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
