//! Network access for the relay.
//!
//! A delivery provider is bound to the relayer identity: it reads chain
//! state, signs and broadcasts the relayer's transactions and watches them
//! until they are confirmed. The relayer pays for every transaction sent
//! through it.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use relay_types::{
	utils::truncate_hash, Transaction, TransactionHash, TransactionReceipt,
};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Call reverted: {0}")]
	CallReverted(String),
	#[error("Timeout waiting for {confirmations} confirmations after {seconds} seconds")]
	Timeout { confirmations: u64, seconds: u64 },
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Address of the relayer identity that signs and pays for transactions.
	fn address(&self) -> Address;

	/// Chain this provider submits to.
	fn chain_id(&self) -> u64;

	/// Read-only call against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError>;

	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Native currency balance.
	async fn balance(&self, address: Address) -> Result<U256, DeliveryError>;

	/// Signs with the relayer identity and broadcasts.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction is mined and buried under `confirmations` blocks.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	async fn get_receipt(&self, hash: &TransactionHash)
		-> Result<TransactionReceipt, DeliveryError>;
}

/// Delivery provider plus the confirmation policy applied to every transaction.
pub struct DeliveryService {
	provider: Box<dyn DeliveryInterface>,
	confirmations: u64,
	confirmation_timeout: Duration,
}

impl DeliveryService {
	pub fn new(
		provider: Box<dyn DeliveryInterface>,
		confirmations: u64,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			provider,
			confirmations: confirmations.max(1),
			confirmation_timeout,
		}
	}

	pub fn relayer(&self) -> Address {
		self.provider.address()
	}

	pub fn chain_id(&self) -> u64 {
		self.provider.chain_id()
	}

	pub fn confirmations(&self) -> u64 {
		self.confirmations
	}

	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		self.provider.call(to, data).await
	}

	pub async fn balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.provider.balance(address).await
	}

	/// Broadcasts without waiting. Unset gas and fee fields are left to the provider.
	pub async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let to = tx.to;
		let hash = self.provider.submit(tx).await?;
		tracing::info!(
			tx_hash = %truncate_hash(&hash.to_string()),
			to = %to,
			"Submitted transaction"
		);
		Ok(hash)
	}

	/// Waits for the configured confirmation depth, bounded by the timeout.
	pub async fn confirm(&self, hash: &TransactionHash) -> Result<TransactionReceipt, DeliveryError> {
		let wait = self
			.provider
			.wait_for_confirmation(hash, self.confirmations);

		match tokio::time::timeout(self.confirmation_timeout, wait).await {
			Ok(result) => result,
			Err(_) => Err(DeliveryError::Timeout {
				confirmations: self.confirmations,
				seconds: self.confirmation_timeout.as_secs(),
			}),
		}
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.provider.get_receipt(hash).await
	}

	/// Sends a plain relayer transaction and waits for it.
	///
	/// The gas limit is estimated and the gas price read from the network
	/// when the transaction does not carry them.
	pub async fn deliver(&self, mut tx: Transaction) -> Result<TransactionReceipt, DeliveryError> {
		if tx.gas_limit.is_none() {
			tx.gas_limit = Some(self.provider.estimate_gas(&tx).await?);
		}
		if tx.gas_price.is_none() && tx.max_fee_per_gas.is_none() {
			tx.gas_price = Some(self.provider.gas_price().await?);
		}

		let hash = self.submit(tx).await?;
		let receipt = self.confirm(&hash).await?;

		tracing::info!(
			tx_hash = %truncate_hash(&hash.to_string()),
			block = receipt.block_number,
			success = receipt.success,
			"Transaction confirmed"
		);
		Ok(receipt)
	}
}
