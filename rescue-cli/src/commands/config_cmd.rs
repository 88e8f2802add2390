use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use super::request::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# rescue configuration

# Path to SQLite database (default: platform data dir, rescuesync/rescue.db)
# database_path: rescue.db

# Signed-in user
user:
  id: local
  name: ""
  phone: ""
  role: citizen   # citizen | volunteer | admin

# Optional classification endpoint used for new requests while online
# classifier_url: http://localhost:9000/classify

sync:
  # server_url: http://localhost:8080
  auto_sync: true
  submit_timeout_secs: 10
  interval_secs: 30
  on_rejection: retry   # retry | dead-letter
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("user.id: {}", config.user.id.value);
                        println!("  source: {}", config.user.id.source);
                        println!("user.role: {}", config.user.role.value);
                        println!("  source: {}", config.user.role.source);
                        println!();

                        println!(
                            "classifier_url: {}",
                            config.classifier_url.as_deref().unwrap_or("(none)")
                        );
                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(none)")
                        );
                        println!("sync.auto_sync: {}", config.sync.auto_sync);
                        println!(
                            "sync.submit_timeout_secs: {}",
                            config.sync.submit_timeout_secs
                        );
                        println!("sync.interval_secs: {}", config.sync.interval_secs);
                        println!("sync.on_rejection: {}", config.sync.on_rejection);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'rescue config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
