//! Configuration types for the relay.

use alloy::primitives::Address;
use relay_types::ExecutionParams;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Complete relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Relay behaviour
	pub relay: RelaySettings,
	/// Defaults for newly built forward requests
	#[serde(default)]
	pub request: RequestSettings,
	/// Forwarder and recipient deployments
	pub contracts: ContractsConfig,
	/// Gas and fee overrides for relayed transactions
	#[serde(default)]
	pub execution: ExecutionConfig,
	/// Network provider bound to the relayer identity
	pub delivery: ImplementationConfig,
	/// Named signing identities, keyed by name
	pub accounts: HashMap<String, ImplementationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
	/// Relay name for logging
	pub name: String,
	/// Block confirmations to wait for after submission
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Run the forwarder's `verify` before spending gas
	#[serde(default = "default_pre_verify")]
	pub pre_verify: bool,
	/// Upper bound on the confirmation wait
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	/// Buffered relay events per subscriber
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

impl RelaySettings {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_secs)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestSettings {
	/// Lifetime of a request, added to the current time to form the deadline
	#[serde(default = "default_ttl_seconds")]
	pub ttl_seconds: u64,
	/// Gas budget forwarded to the inner call
	#[serde(default = "default_gas")]
	pub gas: u64,
	/// Decimals of the recipient token
	#[serde(default = "default_token_decimals")]
	pub token_decimals: u8,
}

impl Default for RequestSettings {
	fn default() -> Self {
		Self {
			ttl_seconds: default_ttl_seconds(),
			gas: default_gas(),
			token_decimals: default_token_decimals(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
	/// Trusted forwarder
	pub forwarder: Address,
	/// ERC-2771 recipient token
	pub recipient: Address,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionConfig {
	pub gas_limit: Option<u64>,
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
}

impl ExecutionConfig {
	pub fn params(&self) -> ExecutionParams {
		ExecutionParams {
			gas_limit: self.gas_limit,
			max_fee_per_gas: self.max_fee_per_gas,
			max_priority_fee_per_gas: self.max_priority_fee_per_gas,
		}
	}
}

/// A pluggable implementation: its factory name and its own config table.
#[derive(Debug, Clone, Deserialize)]
pub struct ImplementationConfig {
	pub provider: String,
	pub config: toml::Value,
}

fn default_confirmations() -> u64 {
	1
}

fn default_pre_verify() -> bool {
	true
}

fn default_confirmation_timeout_secs() -> u64 {
	300
}

fn default_event_capacity() -> usize {
	256
}

fn default_ttl_seconds() -> u64 {
	3600
}

fn default_gas() -> u64 {
	50_000
}

fn default_token_decimals() -> u8 {
	18
}
