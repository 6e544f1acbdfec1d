use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use itinerary_weather_core::{Config, ForecastService, ProviderId, packing};
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "itinerary-weather",
    version,
    about = "Weather forecasts and packing advice for travel itineraries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show the forecast for a destination.
    Show {
        /// City or place name, e.g. "Santa Barbara, CA".
        location: String,

        /// Number of days to show.
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
        days: u8,

        /// Print the normalized forecast as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Suggest what to pack for a destination.
    Pack {
        /// City or place name.
        location: String,

        /// Number of days the trip covers.
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
        days: u8,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { location, days, json } => {
                let service = build_service()?;
                let forecast = service.get_forecast(&location, usize::from(days)).await;

                if json {
                    let out = serde_json::to_string_pretty(&forecast)
                        .context("Failed to serialize forecast")?;
                    println!("{out}");
                } else {
                    print!("{}", render::forecast(&forecast));
                    print!("{}", render::suggestions(&packing::suggest(&forecast)));
                }
                Ok(())
            }
            Command::Pack { location, days } => {
                let service = build_service()?;
                let forecast = service.get_forecast(&location, usize::from(days)).await;
                if forecast.is_fallback() {
                    eprintln!("{}", render::FALLBACK_NOTICE);
                }
                print!("{}", render::suggestions(&packing::suggest(&forecast)));
                Ok(())
            }
        }
    }
}

fn build_service() -> anyhow::Result<ForecastService> {
    let config = Config::load()?;
    let settings = config.service_config()?;
    debug!(?settings, "Resolved service settings");
    ForecastService::new(settings)
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);

    let current_default = config.default_provider_id()?;
    if current_default != id {
        let make_default = Confirm::new(&format!(
            "Use {id} instead of {current_default} as the default provider?"
        ))
        .with_default(false)
        .prompt()
        .context("Failed to read answer")?;

        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    println!(
        "Saved credentials for {id} to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
