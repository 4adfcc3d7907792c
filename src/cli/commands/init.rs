//! Init and Config commands.

use anyhow::{Context, anyhow};

use crate::config::Settings;

/// Create `.docrag/settings.toml` and the corpus directory in the current
/// directory.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let root = std::env::current_dir().context("failed to read current directory")?;

    let path = Settings::init_config_file(&root, force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!(
        "Put documents in {}/ and run 'docrag index'.",
        Settings::default().corpus_path.display()
    );
    Ok(())
}

/// Print the effective configuration as TOML.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(settings).context("failed to render settings")?;
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{rendered}");
    Ok(())
}
