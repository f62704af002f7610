use std::env;

use crate::prelude::*;

pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "hr"];

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub discord_token: String,
  pub discord_api: String,
  pub default_prefix: String,
  pub sweep_interval: Duration,
  pub port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:licensy.db?mode=rwc"),
      discord_token: String::new(),
      discord_api: String::from("https://discord.com/api/v10"),
      default_prefix: String::from("."),
      sweep_interval: Duration::from_secs(60),
      port: 3000,
    }
  }
}

impl Config {
  /// Reads the configuration from the environment, `.env` included.
  pub fn from_env() -> anyhow::Result<Self> {
    dotenvy::dotenv().ok();

    let defaults = Self::default();

    let sweep_interval = match env::var("SWEEP_INTERVAL") {
      Ok(raw) => humantime::parse_duration(&raw)
        .with_context(|| format!("Invalid SWEEP_INTERVAL `{raw}`"))?,
      Err(_) => defaults.sweep_interval,
    };

    let port = match env::var("PORT") {
      Ok(raw) => raw.parse().with_context(|| format!("Invalid PORT `{raw}`"))?,
      Err(_) => defaults.port,
    };

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      discord_token: env::var("DISCORD_TOKEN")
        .context("DISCORD_TOKEN not set")?,
      discord_api: env::var("DISCORD_API").unwrap_or(defaults.discord_api),
      default_prefix: env::var("DEFAULT_PREFIX")
        .unwrap_or(defaults.default_prefix),
      sweep_interval,
      port,
    })
  }
}
