// relay-config/src/lib.rs

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RELAY_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.clone()));
		}

		let content = tokio::fs::read_to_string(file_path).await?;
		let config = self.parse(&content)?;

		tracing::debug!(path = %file_path, relay = %config.relay.name, "Loaded configuration");
		Ok(config)
	}

	/// Substitutes, parses, overrides and validates configuration text.
	pub fn parse(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted_content = self.substitute_env_vars(content)?;

		let mut config: Config = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		self.validate_config(&config)?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(confirmations) = env::var(format!("{}CONFIRMATIONS", self.env_prefix)) {
			config.relay.confirmations = confirmations.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid confirmations: {}", e))
			})?;
		}

		if let Ok(pre_verify) = env::var(format!("{}PRE_VERIFY", self.env_prefix)) {
			config.relay.pre_verify = pre_verify.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid pre-verify flag: {}", e))
			})?;
		}

		Ok(())
	}

	fn validate_config(&self, config: &Config) -> Result<(), ConfigError> {
		if config.relay.name.trim().is_empty() {
			return Err(ConfigError::ValidationError(
				"Relay name must not be empty".to_string(),
			));
		}

		if config.relay.confirmations == 0 {
			return Err(ConfigError::ValidationError(
				"At least one confirmation is required".to_string(),
			));
		}

		if config.relay.confirmation_timeout_secs == 0 {
			return Err(ConfigError::ValidationError(
				"Confirmation timeout must be positive".to_string(),
			));
		}

		if config.relay.event_capacity == 0 {
			return Err(ConfigError::ValidationError(
				"Event capacity must be positive".to_string(),
			));
		}

		if config.request.ttl_seconds == 0 {
			return Err(ConfigError::ValidationError(
				"Request TTL must be at least one second".to_string(),
			));
		}

		if config.request.gas == 0 {
			return Err(ConfigError::ValidationError(
				"Request gas budget must be positive".to_string(),
			));
		}

		// 10^77 is the largest power of ten that fits in a uint256
		if config.request.token_decimals > 77 {
			return Err(ConfigError::ValidationError(format!(
				"Token decimals {} out of range",
				config.request.token_decimals
			)));
		}

		if config.contracts.forwarder == config.contracts.recipient {
			return Err(ConfigError::ValidationError(
				"Forwarder and recipient must be different contracts".to_string(),
			));
		}

		if config.accounts.is_empty() {
			return Err(ConfigError::ValidationError(
				"At least one account must be configured".to_string(),
			));
		}

		if config.delivery.provider.trim().is_empty() {
			return Err(ConfigError::ValidationError(
				"Delivery provider must be named".to_string(),
			));
		}

		Ok(())
	}
}
