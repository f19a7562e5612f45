//! Alloy-backed delivery over HTTP JSON-RPC.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{
	utils::truncate_hash, ConfigSchema, Field, FieldType, Schema, Transaction, TransactionHash,
	TransactionReceipt,
};
use std::time::Duration;

/// Alloy-based EVM delivery implementation.
///
/// The provider carries the relayer wallet, so every submitted transaction
/// is signed by and paid for by the relayer. Nonce, gas and fee fields left
/// empty by the caller are filled by alloy's recommended fillers.
pub struct AlloyDelivery {
	/// The Alloy provider for blockchain interaction.
	provider: DynProvider,
	/// Relayer address derived from the wallet key.
	relayer: Address,
	/// The chain ID this delivery service is configured for.
	chain_id: u64,
	/// Interval between receipt polls while waiting for confirmations.
	poll_interval: Duration,
}

impl AlloyDelivery {
	/// Creates a new AlloyDelivery instance.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: PrivateKeySigner,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let relayer = signer.address();
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self {
			provider,
			relayer,
			chain_id,
			poll_interval,
		})
	}

	fn request(&self, tx: &Transaction) -> TransactionRequest {
		let mut request: TransactionRequest = tx.clone().into();
		request.from = Some(self.relayer);
		request
	}

	fn convert_receipt(receipt: alloy::rpc::types::TransactionReceipt) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			gas_used: receipt.gas_used,
			logs: receipt
				.inner
				.logs()
				.iter()
				.map(|log| log.inner.clone())
				.collect(),
		}
	}
}

/// Configuration schema for Alloy delivery provider.
pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), relay_types::ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					let url = value.as_str().unwrap_or_default();
					if url.starts_with("http://") || url.starts_with("https://") {
						Ok(())
					} else {
						Err("RPC URL must start with http:// or https://".to_string())
					}
				}),
				Field::private_key("private_key"),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			// Optional fields
			vec![Field::new(
				"poll_interval_ms",
				FieldType::Integer {
					min: Some(1),
					max: Some(60_000),
				},
			)],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn address(&self) -> Address {
		self.relayer
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest {
			to: Some(TxKind::Call(to)),
			input: TransactionInput::new(data),
			..Default::default()
		};

		self.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::CallReverted(format!("eth_call to {} failed: {}", to, e)))
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		self.provider
			.estimate_gas(self.request(tx))
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to estimate gas: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request = self.request(&tx);

		// Send transaction - the provider's wallet will handle signing
		let pending_tx =
			self.provider.send_transaction(request).await.map_err(|e| {
				DeliveryError::Network(format!("Failed to send transaction: {}", e))
			})?;

		Ok(TransactionHash(*pending_tx.tx_hash()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		tracing::info!(
			tx_hash = %truncate_hash(&hash.to_string()),
			"Waiting for {} confirmations",
			confirmations
		);

		loop {
			let receipt = match self.provider.get_transaction_receipt(hash.0).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					// Transaction not yet mined, wait and retry
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			// The inclusion block counts as the first confirmation
			let tx_block = receipt.block_number.unwrap_or(current_block);
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;

			if current_confirmations >= confirmations {
				return Ok(Self::convert_receipt(receipt));
			}

			tracing::debug!(
				"Waiting for {} more confirmations...",
				confirmations.saturating_sub(current_confirmations)
			);

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?
			.ok_or_else(|| DeliveryError::Network("Transaction not found".to_string()))?;

		Ok(Self::convert_receipt(receipt))
	}
}

/// Factory function to create an HTTP-based delivery provider from configuration.
///
/// Required configuration parameters:
/// - `rpc_url`: The HTTP RPC endpoint URL
/// - `chain_id`: The blockchain network chain ID
/// - `private_key`: The relayer's private key
///
/// Optional:
/// - `poll_interval_ms`: receipt polling interval, 1000 by default
pub fn create_http_delivery(
	config: &toml::Value,
) -> Result<Box<dyn crate::DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("rpc_url is required".to_string()))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| DeliveryError::InvalidConfig("chain_id is required".to_string()))?
		as u64;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("private_key is required".to_string()))?;

	let poll_interval_ms = config
		.get("poll_interval_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(1000) as u64;

	let signer: PrivateKeySigner = private_key
		.parse()
		.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid private key: {}", e)))?;

	let delivery = AlloyDelivery::new(
		rpc_url,
		chain_id,
		signer,
		Duration::from_millis(poll_interval_ms),
	)?;

	Ok(Box::new(delivery))
}
