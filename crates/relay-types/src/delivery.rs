//! Transaction types shared by the delivery layer and its callers.

use alloy::primitives::{Address, Bytes, Log, TxKind, B256, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use std::fmt;

/// Transaction to be signed and broadcast by the relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	/// Contract being called.
	pub to: Address,
	/// Calldata.
	pub data: Bytes,
	/// Native value attached to the call.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Gas limit (estimated by the provider when unset).
	pub gas_limit: Option<u64>,
	/// Legacy gas price (for non-EIP-1559 transactions).
	pub gas_price: Option<u128>,
	/// Maximum fee per gas (EIP-1559).
	pub max_fee_per_gas: Option<u128>,
	/// Maximum priority fee per gas (EIP-1559).
	pub max_priority_fee_per_gas: Option<u128>,
}

impl Transaction {
	/// A plain call with every fee parameter left to the provider.
	pub fn call(to: Address, data: Bytes, chain_id: u64) -> Self {
		Self {
			to,
			data,
			value: U256::ZERO,
			chain_id,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// Applies caller-supplied execution parameters, keeping unset ones empty.
	pub fn with_params(mut self, params: &ExecutionParams) -> Self {
		self.gas_limit = params.gas_limit;
		self.max_fee_per_gas = params.max_fee_per_gas;
		self.max_priority_fee_per_gas = params.max_priority_fee_per_gas;
		self
	}
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			chain_id: Some(tx.chain_id),
			value: Some(tx.value),
			to: Some(TxKind::Call(tx.to)),
			gas: tx.gas_limit,
			gas_price: tx.gas_price,
			max_fee_per_gas: tx.max_fee_per_gas,
			max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
			input: TransactionInput::new(tx.data),
			..Default::default()
		}
	}
}

/// Gas and fee parameters for a relayed transaction.
///
/// Every field is optional. Missing values are filled in by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionParams {
	pub gas_limit: Option<u64>,
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
}

/// Hash of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Gas consumed by the whole transaction.
	pub gas_used: u64,
	/// Logs emitted, in order.
	pub logs: Vec<Log>,
}

impl TransactionReceipt {
	/// Logs emitted by one contract.
	pub fn logs_from(&self, emitter: Address) -> impl Iterator<Item = &Log> {
		self.logs.iter().filter(move |log| log.address == emitter)
	}
}
