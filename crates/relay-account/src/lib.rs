//! Signing identities for the relay.
//!
//! An identity is a capability: it reports its address and signs typed data
//! on request. Key material never leaves the implementation.

use alloy::primitives::{Address, Signature};
use alloy::sol_types::Eip712Domain;
use async_trait::async_trait;
use relay_types::ForwardRequest;
use thiserror::Error;

pub mod signer;

pub mod implementations {
	pub mod local;
}

pub use signer::{recover_signer, sign_request, signing_hash, verify_locally};

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address controlled by this identity.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs `request` as EIP-712 typed data under `domain`.
	async fn sign_typed_data(
		&self,
		domain: &Eip712Domain,
		request: &ForwardRequest,
	) -> Result<Signature, AccountError>;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.provider.address().await
	}

	pub async fn sign_typed_data(
		&self,
		domain: &Eip712Domain,
		request: &ForwardRequest,
	) -> Result<Signature, AccountError> {
		self.provider.sign_typed_data(domain, request).await
	}
}
