//! Forward request construction.
//!
//! The builder turns a recipient call into an unsigned [`ForwardRequest`]
//! with a fresh nonce and a deadline derived from the clock. Every field is
//! fixed here; nothing downstream may change it once signed.

use alloy::primitives::{aliases::U48, Address, U256};
use async_trait::async_trait;
use relay_types::ForwardRequest;
use std::sync::Arc;
use thiserror::Error;

pub mod call;
pub mod clock;

pub use call::{parse_amount, RecipientCall};
pub use clock::{Clock, ManualClock, SystemClock};

/// Default request lifetime in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default gas budget for the inner call.
pub const DEFAULT_GAS: u64 = 50_000;

/// Largest deadline a `uint48` can hold.
const MAX_DEADLINE: u64 = (1 << 48) - 1;

#[derive(Debug, Error)]
pub enum RequestError {
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid request parameter: {0}")]
	InvalidParameter(String),
	#[error("Nonce unavailable: {0}")]
	NonceUnavailable(String),
}

/// Reads the forwarder's current nonce for an address.
#[async_trait]
pub trait NonceSource: Send + Sync {
	async fn current_nonce(&self, from: Address) -> Result<U256, RequestError>;
}

/// Parameters of a request before the nonce and deadline are known.
#[derive(Debug, Clone)]
pub struct RequestSpec {
	/// Party authorizing the call.
	pub from: Address,
	/// Recipient contract.
	pub to: Address,
	pub call: RecipientCall,
	/// Native value forwarded with the call.
	pub value: U256,
	/// Gas budget, the builder default when unset.
	pub gas: Option<u64>,
	/// Lifetime, the builder default when unset.
	pub ttl_seconds: Option<u64>,
}

impl RequestSpec {
	pub fn new(from: Address, to: Address, call: RecipientCall) -> Self {
		Self {
			from,
			to,
			call,
			value: U256::ZERO,
			gas: None,
			ttl_seconds: None,
		}
	}

	pub fn with_gas(mut self, gas: u64) -> Self {
		self.gas = Some(gas);
		self
	}

	pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
		self.ttl_seconds = Some(ttl_seconds);
		self
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

pub struct RequestBuilder {
	clock: Arc<dyn Clock>,
	default_gas: u64,
	default_ttl: u64,
}

impl RequestBuilder {
	pub fn new(clock: Arc<dyn Clock>) -> Self {
		Self {
			clock,
			default_gas: DEFAULT_GAS,
			default_ttl: DEFAULT_TTL_SECONDS,
		}
	}

	pub fn with_defaults(mut self, gas: u64, ttl_seconds: u64) -> Self {
		self.default_gas = gas;
		self.default_ttl = ttl_seconds;
		self
	}

	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Builds an unsigned request.
	///
	/// The nonce is read last so it is as fresh as possible when the request
	/// is handed to the signer.
	pub async fn build(
		&self,
		spec: &RequestSpec,
		nonce_source: &dyn NonceSource,
	) -> Result<ForwardRequest, RequestError> {
		let data = spec.call.encode()?;

		let gas = spec.gas.unwrap_or(self.default_gas);
		if gas == 0 {
			return Err(RequestError::InvalidParameter(
				"gas budget must be positive".to_string(),
			));
		}

		let ttl = spec.ttl_seconds.unwrap_or(self.default_ttl);
		if ttl == 0 {
			return Err(RequestError::InvalidParameter(
				"ttl must be at least one second".to_string(),
			));
		}

		let nonce = nonce_source.current_nonce(spec.from).await?;

		let deadline = self
			.clock
			.now()
			.checked_add(ttl)
			.filter(|deadline| *deadline <= MAX_DEADLINE)
			.ok_or_else(|| {
				RequestError::InvalidParameter(format!("ttl {} overflows a uint48 deadline", ttl))
			})?;

		tracing::debug!(
			from = %spec.from,
			to = %spec.to,
			nonce = %nonce,
			deadline,
			gas,
			"Built forward request"
		);

		Ok(ForwardRequest {
			from: spec.from,
			to: spec.to,
			value: spec.value,
			gas: U256::from(gas),
			nonce,
			deadline: U48::from(deadline),
			data,
		})
	}
}
