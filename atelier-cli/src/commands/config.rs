use anyhow::Context;
use atelier_core::AtelierConfig;
use clap::Subcommand;
use colored::Colorize;

use super::{is_json, print_json};
use crate::config::{ensure_config_dir, mask_password, user_config_file, CliConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Show the effective configuration")]
    Show,

    #[command(about = "Print the location of the user configuration file")]
    Path,

    #[command(about = "Write a default configuration file to the user config directory")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

pub async fn handle_config_command(
    cmd: Option<ConfigCommand>,
    format: &str,
) -> anyhow::Result<()> {
    match cmd.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_config_show(format),
        ConfigCommand::Path => cmd_config_path(),
        ConfigCommand::Init { force } => cmd_config_init(force),
    }
}

fn cmd_config_show(format: &str) -> anyhow::Result<()> {
    let mut settings = CliConfig::load()?.into_settings();
    settings.database.url = mask_password(&settings.database.url);

    if is_json(format) {
        return print_json(&settings);
    }

    println!("{}", "Effective Configuration".cyan().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

fn cmd_config_path() -> anyhow::Result<()> {
    match user_config_file() {
        Some(path) => {
            let state = if path.exists() {
                "exists".green()
            } else {
                "not created".yellow()
            };
            println!("{} ({})", path.display(), state);
        }
        None => println!("{}", "Could not determine config directory".yellow()),
    }
    Ok(())
}

fn cmd_config_init(force: bool) -> anyhow::Result<()> {
    let path = ensure_config_dir()?.join("config.toml");

    if path.exists() && !force {
        println!(
            "  {} {} already exists (use --force to overwrite)",
            "!".yellow(),
            path.display()
        );
        return Ok(());
    }

    let contents = toml::to_string_pretty(&AtelierConfig::default())?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Wrote default configuration to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes_every_section() {
        let rendered = toml::to_string_pretty(&AtelierConfig::default()).unwrap();
        for section in ["[database]", "[logging]", "[workflow]", "[hooks]", "[inbox]"] {
            assert!(rendered.contains(section), "missing {}", section);
        }

        let parsed: AtelierConfig = toml::from_str(&rendered).unwrap();
        assert!(parsed.workflow.enforce_transitions);
    }
}
