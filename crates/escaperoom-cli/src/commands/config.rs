use std::path::Path;

use clap::Subcommand;
use escaperoom_core::Config;

use super::{load_config, resolve_config_path};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
    /// Get a config value
    Get {
        /// Config key (e.g. "duration_minutes", "sectors.0.answer")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// Write the default configuration to disk
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration without starting a session
    Validate,
}

pub fn run(action: ConfigAction, explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", resolve_config_path(explicit)?.display());
        }
        ConfigAction::Get { key } => {
            let config = load_config(explicit)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let path = resolve_config_path(explicit)?;
            let mut config = Config::load_from(&path)?;
            config.set(&key, &value)?;
            config.validate()?;
            config.save_to(&path)?;
            println!("ok");
        }
        ConfigAction::Init { force } => {
            let path = resolve_config_path(explicit)?;
            if path.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            Config::default().save_to(&path)?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Validate => {
            let config = load_config(explicit)?;
            config.validate()?;
            println!("ok");
        }
    }
    Ok(())
}
