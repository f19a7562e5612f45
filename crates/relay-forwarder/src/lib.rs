//! Client for the trusted forwarder.
//!
//! Reads the EIP-712 domain and per-signer nonces, verifies signed requests
//! with the forwarder's own `verify`, and has the relayer submit `execute`.
//! Receipts are interpreted into executed, reverted or rejected results by
//! looking at the forwarder's `ExecutedForwardRequest` event and, when the
//! whole transaction failed, at the signer's nonce after the fact.

use alloy::primitives::{Address, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use relay_delivery::{DeliveryError, DeliveryService};
use relay_request::{NonceSource, RequestError};
use relay_types::{
	utils::truncate_hash, Domain, ExecutionParams, IERC2771Forwarder, SignedForwardRequest,
	Transaction, TransactionHash, TransactionReceipt,
};
use std::sync::Arc;
use thiserror::Error;

mod domain;

#[derive(Debug, Error)]
pub enum ForwarderError {
	#[error("Domain unavailable: {0}")]
	DomainUnavailable(String),
	#[error("Forwarder rejected the request")]
	VerificationFailed { receipt: Option<TransactionReceipt> },
	#[error("Forwarded call reverted (nonce consumed: {nonce_consumed})")]
	ExecutionReverted {
		receipt: TransactionReceipt,
		nonce_consumed: bool,
	},
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Unexpected forwarder response: {0}")]
	InvalidResponse(String),
	/// `execute` was broadcast but its result could not be observed.
	///
	/// `nonce_consumed` is the signer nonce compared against the value seen
	/// before broadcast, `None` when it could not be read either.
	#[error("Outcome of {tx_hash} unknown: {reason}")]
	Unconfirmed {
		tx_hash: TransactionHash,
		reason: String,
		nonce_consumed: Option<bool>,
	},
}

/// A broadcast `execute` awaiting confirmation.
#[derive(Debug, Clone)]
pub struct PendingExecution {
	pub hash: TransactionHash,
	pub request: SignedForwardRequest,
	/// Signer nonce observed right before broadcast.
	pub nonce_before: U256,
}

pub struct ForwarderClient {
	address: Address,
	delivery: Arc<DeliveryService>,
}

impl ForwarderClient {
	pub fn new(address: Address, delivery: Arc<DeliveryService>) -> Self {
		Self { address, delivery }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Reads and validates the forwarder's EIP-712 domain.
	///
	/// Not cached: every call performs one `eip712Domain()` read.
	pub async fn resolve_domain(&self) -> Result<Domain, ForwarderError> {
		let data = self
			.delivery
			.call(self.address, IERC2771Forwarder::eip712DomainCall {}.abi_encode().into())
			.await
			.map_err(|e| ForwarderError::DomainUnavailable(e.to_string()))?;

		let returns = IERC2771Forwarder::eip712DomainCall::abi_decode_returns(&data)
			.map_err(|e| ForwarderError::DomainUnavailable(format!("malformed response: {}", e)))?;

		domain::domain_from_returns(returns, self.address, self.delivery.chain_id())
	}

	/// Current nonce of `from`, the one the next request must carry.
	pub async fn nonce(&self, from: Address) -> Result<U256, ForwarderError> {
		let data = self
			.delivery
			.call(
				self.address,
				IERC2771Forwarder::noncesCall { owner: from }.abi_encode().into(),
			)
			.await?;

		IERC2771Forwarder::noncesCall::abi_decode_returns(&data)
			.map_err(|e| ForwarderError::InvalidResponse(format!("nonces: {}", e)))
	}

	/// Asks the forwarder whether it would accept the request right now.
	pub async fn verify(&self, signed: &SignedForwardRequest) -> Result<bool, ForwarderError> {
		let call = IERC2771Forwarder::verifyCall {
			request: signed.to_request_data(),
		};
		let data = self
			.delivery
			.call(self.address, call.abi_encode().into())
			.await?;

		IERC2771Forwarder::verifyCall::abi_decode_returns(&data)
			.map_err(|e| ForwarderError::InvalidResponse(format!("verify: {}", e)))
	}

	/// Broadcasts `execute` from the relayer with `msg.value = request.value`.
	pub async fn submit(
		&self,
		signed: &SignedForwardRequest,
		params: &ExecutionParams,
	) -> Result<PendingExecution, ForwarderError> {
		let nonce_before = self.nonce(signed.from()).await?;

		let call = IERC2771Forwarder::executeCall {
			request: signed.to_request_data(),
		};
		let tx = Transaction::call(self.address, call.abi_encode().into(), self.delivery.chain_id())
			.with_value(signed.request.value)
			.with_params(params);

		let hash = match self.delivery.submit(tx).await {
			Ok(hash) => hash,
			Err(e) => {
				// Gas estimation reverts when the forwarder would reject the request
				if let Ok(false) = self.verify(signed).await {
					tracing::warn!(from = %signed.from(), error = %e, "Submission refused, request no longer verifies");
					return Err(ForwarderError::VerificationFailed { receipt: None });
				}
				return Err(e.into());
			}
		};

		Ok(PendingExecution {
			hash,
			request: signed.clone(),
			nonce_before,
		})
	}

	/// Waits for the `execute` transaction and interprets its receipt.
	///
	/// Failures to observe the result never surface as plain delivery
	/// errors: the transaction is already out, so they become
	/// [`ForwarderError::Unconfirmed`] with the nonce re-read from chain.
	pub async fn confirm(
		&self,
		pending: &PendingExecution,
	) -> Result<TransactionReceipt, ForwarderError> {
		match self.interpret(pending).await {
			Err(ForwarderError::Delivery(e)) => Err(self.unconfirmed(pending, e.to_string()).await),
			Err(ForwarderError::InvalidResponse(reason)) => {
				Err(self.unconfirmed(pending, reason).await)
			}
			result => result,
		}
	}

	async fn unconfirmed(&self, pending: &PendingExecution, reason: String) -> ForwarderError {
		let from = pending.request.from();
		let nonce_consumed = match self.nonce(from).await {
			Ok(nonce) => Some(nonce > pending.nonce_before),
			Err(e) => {
				tracing::warn!(from = %from, error = %e, "Could not re-read nonce after broadcast");
				None
			}
		};

		tracing::warn!(
			tx_hash = %truncate_hash(&pending.hash.to_string()),
			from = %from,
			reason = %reason,
			nonce_consumed = ?nonce_consumed,
			"Execute broadcast but outcome unknown"
		);
		ForwarderError::Unconfirmed {
			tx_hash: pending.hash,
			reason,
			nonce_consumed,
		}
	}

	async fn interpret(
		&self,
		pending: &PendingExecution,
	) -> Result<TransactionReceipt, ForwarderError> {
		let receipt = self.delivery.confirm(&pending.hash).await?;
		let from = pending.request.from();
		let tx_hash = truncate_hash(&pending.hash.to_string());

		if receipt.success {
			let executed = self
				.executed_event(&receipt, from)
				.ok_or_else(|| {
					ForwarderError::InvalidResponse(
						"execute succeeded without an ExecutedForwardRequest event".to_string(),
					)
				})?;

			if executed.success {
				tracing::info!(tx_hash = %tx_hash, from = %from, nonce = %executed.nonce, "Forward request executed");
				return Ok(receipt);
			}

			tracing::warn!(tx_hash = %tx_hash, from = %from, nonce = %executed.nonce, "Forwarded call reverted");
			return Err(ForwarderError::ExecutionReverted {
				receipt,
				nonce_consumed: true,
			});
		}

		// The whole transaction reverted, observe what happened to the nonce
		let nonce_after = self.nonce(from).await?;
		if nonce_after > pending.nonce_before {
			tracing::warn!(tx_hash = %tx_hash, from = %from, "Execute reverted after consuming the nonce");
			return Err(ForwarderError::ExecutionReverted {
				receipt,
				nonce_consumed: true,
			});
		}

		if !self.verify(&pending.request).await? {
			tracing::warn!(tx_hash = %tx_hash, from = %from, "Forwarder rejected the request on-chain");
			return Err(ForwarderError::VerificationFailed {
				receipt: Some(receipt),
			});
		}

		tracing::warn!(tx_hash = %tx_hash, from = %from, "Execute reverted, nonce untouched");
		Err(ForwarderError::ExecutionReverted {
			receipt,
			nonce_consumed: false,
		})
	}

	/// Submits and confirms in one step.
	pub async fn execute(
		&self,
		signed: &SignedForwardRequest,
		params: &ExecutionParams,
	) -> Result<TransactionReceipt, ForwarderError> {
		let pending = self.submit(signed, params).await?;
		self.confirm(&pending).await
	}

	fn executed_event(
		&self,
		receipt: &TransactionReceipt,
		signer: Address,
	) -> Option<IERC2771Forwarder::ExecutedForwardRequest> {
		receipt
			.logs_from(self.address)
			.filter_map(|log| {
				IERC2771Forwarder::ExecutedForwardRequest::decode_log_data(&log.data).ok()
			})
			.find(|event| event.signer == signer)
	}
}

#[async_trait]
impl NonceSource for ForwarderClient {
	async fn current_nonce(&self, from: Address) -> Result<U256, RequestError> {
		self.nonce(from)
			.await
			.map_err(|e| RequestError::NonceUnavailable(e.to_string()))
	}
}
