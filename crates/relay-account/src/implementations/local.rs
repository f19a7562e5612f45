//! Local private key identity.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, Signature};
use alloy::signers::{local::PrivateKeySigner, Signer};
use alloy::sol_types::{Eip712Domain, SolStruct};
use async_trait::async_trait;
use relay_types::{ConfigSchema, Field, ForwardRequest, Schema};

/// Local wallet implementation using Alloy's signer.
///
/// Suitable for development and test networks where the key can live in the
/// configuration file or an environment variable.
pub struct LocalWallet {
	/// The underlying Alloy signer that handles cryptographic operations.
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key.
	///
	/// The private key should be provided as a hex string (with or without 0x prefix).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

/// Configuration schema for LocalWallet.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), relay_types::ValidationError> {
		let schema = Schema::new(vec![Field::private_key("private_key")], vec![]);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_typed_data(
		&self,
		domain: &Eip712Domain,
		request: &ForwardRequest,
	) -> Result<Signature, AccountError> {
		let hash = request.eip712_signing_hash(domain);

		self.signer
			.sign_hash(&hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign request: {}", e)))
	}
}

/// Factory function to create a local wallet from its config table.
///
/// Required configuration parameters:
/// - `private_key`: 32-byte hex key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}
