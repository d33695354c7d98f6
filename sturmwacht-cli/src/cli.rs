use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use std::net::SocketAddr;
use sturmwacht_core::{Config, ProviderId, WeatherService};

use crate::{render, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "sturmwacht", version, about = "Storm alerts and AI endpoints for tree crews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select a weather provider and store its credentials.
    Configure {
        /// Provider short name, "open-meteo" or "openweather".
        provider: String,

        /// API key; prompted for interactively when the provider needs one.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show the current weather banner.
    Show {
        /// Print the raw report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the API handlers and the weather report over HTTP.
    Serve {
        /// Listen address; defaults to `server.bind` from the config file.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure { provider, api_key } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(&mut config, id, api_key)?;
                config.save()?;
                println!(
                    "Default provider set to {id}. Config written to {}",
                    Config::config_file_path()?.display()
                );
            }
            Command::Show { json } => {
                let service = WeatherService::from_config(&config)?;
                let report = service
                    .get_weather_data()
                    .await
                    .context("Could not fetch current weather")?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", render::banner(&report));
                }
            }
            Command::Serve { bind } => {
                let addr = match bind {
                    Some(addr) => addr,
                    None => config
                        .server
                        .bind
                        .parse()
                        .with_context(|| format!("Invalid server.bind '{}'", config.server.bind))?,
                };
                server::run(&config, addr).await?;
            }
        }

        Ok(())
    }
}

fn configure(config: &mut Config, id: ProviderId, api_key: Option<String>) -> anyhow::Result<()> {
    if id.requires_api_key() {
        let key = match api_key {
            Some(key) => key,
            None => Password::new(&format!("API key for {id}:"))
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?,
        };
        let key = key.trim().to_string();
        anyhow::ensure!(!key.is_empty(), "API key for {id} must not be empty");
        config.upsert_provider_api_key(id, key);
    }

    config.set_default_provider(id);
    Ok(())
}
