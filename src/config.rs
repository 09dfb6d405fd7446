use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

use crate::ratings::DEFAULT_RATINGS_URL;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
	#[error("{0} is not set")]
	Missing(&'static str),

	#[error("invalid {key} value {value:?}: {reason}")]
	Invalid {
		key: &'static str,
		value: String,
		reason: String,
	},
}

#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub port: u16,
	pub session_dir: PathBuf,
	pub session_max_age: Duration,
	pub static_dir: PathBuf,
	pub ratings_url: String,
	pub ratings_key: String,
}

impl Config {
	/// Reads the process environment, after pulling in `.env` if there is one.
	pub fn load() -> Result<Self, ConfigError> {
		if let Err(e) = dotenvy::dotenv() {
			info!("No .env loaded: {e}");
		}
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let database_url = lookup("DATABASE_URL")
			.filter(|url| !url.trim().is_empty())
			.ok_or(ConfigError::Missing("DATABASE_URL"))?;

		let ratings_key = lookup("RATINGS_API_KEY").unwrap_or_else(|| {
			warn!("RATINGS_API_KEY not set, ratings requests will be anonymous");
			String::new()
		});

		Ok(Config {
			database_url,
			port: try_load(&lookup, "PORT", "8080")?,
			session_dir: try_load(&lookup, "SESSION_DIR", "sessions")?,
			session_max_age: Duration::from_secs(try_load(&lookup, "SESSION_MAX_AGE", "604800")?),
			static_dir: try_load(&lookup, "STATIC_DIR", "static")?,
			ratings_url: try_load(&lookup, "RATINGS_URL", DEFAULT_RATINGS_URL)?,
			ratings_key,
		})
	}
}

fn try_load<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &'static str,
	default: &str,
) -> Result<T, ConfigError>
where
	T::Err: Display,
{
	let value = lookup(key).unwrap_or_else(|| {
		info!("{key} not set, using default: {default}");
		default.to_string()
	});

	value.parse().map_err(|e: T::Err| ConfigError::Invalid {
		key,
		reason: e.to_string(),
		value,
	})
}
