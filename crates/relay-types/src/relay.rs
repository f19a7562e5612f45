//! Relay attempt states and outcomes.

use crate::delivery::{TransactionHash, TransactionReceipt};
use std::fmt;

/// State of a single relay attempt.
///
/// ```text
/// Built -> Signed -> PreVerified -> Submitted -> Confirmed
///             |            |             |-----> Reverted
///             |            |             |-----> Failed
///             |            `-> VerificationFailed
///             `-> Submitted (pre-verification disabled)
/// Built -> SigningFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayState {
	Built,
	Signed,
	PreVerified,
	Submitted,
	Confirmed,
	Reverted,
	Failed,
	SigningFailed,
	VerificationFailed,
}

impl RelayState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Self::Confirmed
				| Self::Reverted
				| Self::Failed
				| Self::SigningFailed
				| Self::VerificationFailed
		)
	}
}

impl fmt::Display for RelayState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Built => write!(f, "Built"),
			Self::Signed => write!(f, "Signed"),
			Self::PreVerified => write!(f, "PreVerified"),
			Self::Submitted => write!(f, "Submitted"),
			Self::Confirmed => write!(f, "Confirmed"),
			Self::Reverted => write!(f, "Reverted"),
			Self::Failed => write!(f, "Failed"),
			Self::SigningFailed => write!(f, "SigningFailed"),
			Self::VerificationFailed => write!(f, "VerificationFailed"),
		}
	}
}

/// Pipeline step an error or outcome originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayStage {
	Domain,
	Build,
	Sign,
	PreVerify,
	Submit,
	Confirm,
}

impl fmt::Display for RelayStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Domain => write!(f, "domain"),
			Self::Build => write!(f, "build"),
			Self::Sign => write!(f, "sign"),
			Self::PreVerify => write!(f, "pre-verify"),
			Self::Submit => write!(f, "submit"),
			Self::Confirm => write!(f, "confirm"),
		}
	}
}

/// Terminal result of a relay attempt once a signed request exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
	/// Verified on-chain and the inner call succeeded.
	Executed { receipt: TransactionReceipt },
	/// The forwarder rejected the request: stale nonce, expired deadline,
	/// wrong domain or a signature that does not match `from`.
	///
	/// `receipt` is set when the rejection happened on-chain.
	VerificationFailed {
		stage: RelayStage,
		receipt: Option<TransactionReceipt>,
	},
	/// The forwarder accepted the request but the inner call failed.
	ExecutionReverted {
		receipt: TransactionReceipt,
		nonce_consumed: bool,
	},
	/// Nothing was broadcast: the provider failed before or during submission.
	SubmissionError { stage: RelayStage, reason: String },
	/// `execute` was broadcast but its result was not observed.
	///
	/// `nonce_consumed` is what the chain showed afterwards, `None` when the
	/// nonce could not be read. The transaction may still be mined later.
	Unconfirmed {
		tx_hash: TransactionHash,
		reason: String,
		nonce_consumed: Option<bool>,
	},
}

impl RelayOutcome {
	/// State the attempt ends in.
	pub fn state(&self) -> RelayState {
		match self {
			Self::Executed { .. } => RelayState::Confirmed,
			Self::VerificationFailed { .. } => RelayState::VerificationFailed,
			Self::ExecutionReverted { .. } => RelayState::Reverted,
			Self::SubmissionError { .. } | Self::Unconfirmed { .. } => RelayState::Failed,
		}
	}

	pub fn is_executed(&self) -> bool {
		matches!(self, Self::Executed { .. })
	}

	/// Whether the request's nonce was spent.
	///
	/// When true the request can never be replayed and a new one has to be
	/// built. An unconfirmed broadcast whose nonce could not be read counts
	/// as spent. When the nonce was seen unspent, resubmitting the same
	/// signed request is safe: the forwarder executes it at most once.
	pub fn nonce_consumed(&self) -> bool {
		match self {
			Self::Executed { .. } => true,
			Self::ExecutionReverted { nonce_consumed, .. } => *nonce_consumed,
			Self::Unconfirmed { nonce_consumed, .. } => nonce_consumed.unwrap_or(true),
			Self::VerificationFailed { .. } | Self::SubmissionError { .. } => false,
		}
	}

	pub fn receipt(&self) -> Option<&TransactionReceipt> {
		match self {
			Self::Executed { receipt } | Self::ExecutionReverted { receipt, .. } => Some(receipt),
			Self::VerificationFailed { receipt, .. } => receipt.as_ref(),
			Self::SubmissionError { .. } | Self::Unconfirmed { .. } => None,
		}
	}

	/// Hash of the broadcast `execute`, when there was one.
	pub fn tx_hash(&self) -> Option<TransactionHash> {
		match self {
			Self::Unconfirmed { tx_hash, .. } => Some(*tx_hash),
			other => other.receipt().map(|receipt| receipt.hash),
		}
	}
}

impl fmt::Display for RelayOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Executed { receipt } => {
				write!(f, "executed in block {} ({})", receipt.block_number, receipt.hash)
			}
			Self::VerificationFailed { stage, .. } => {
				write!(f, "verification failed at {} stage", stage)
			}
			Self::ExecutionReverted {
				receipt,
				nonce_consumed,
			} => write!(
				f,
				"inner call reverted in block {} ({}, nonce consumed: {})",
				receipt.block_number, receipt.hash, nonce_consumed
			),
			Self::SubmissionError { stage, reason } => {
				write!(f, "submission error at {} stage: {}", stage, reason)
			}
			Self::Unconfirmed {
				tx_hash, reason, ..
			} => write!(f, "broadcast {} but outcome unknown: {}", tx_hash, reason),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::B256;

	fn receipt(success: bool) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(B256::repeat_byte(0xab)),
			block_number: 12,
			success,
			gas_used: 80_000,
			logs: vec![],
		}
	}

	#[test]
	fn test_outcome_states() {
		let executed = RelayOutcome::Executed {
			receipt: receipt(true),
		};
		assert_eq!(executed.state(), RelayState::Confirmed);
		assert!(executed.nonce_consumed());
		assert!(executed.receipt().is_some());

		let reverted = RelayOutcome::ExecutionReverted {
			receipt: receipt(true),
			nonce_consumed: true,
		};
		assert_eq!(reverted.state(), RelayState::Reverted);
		assert!(reverted.nonce_consumed());

		let rejected = RelayOutcome::VerificationFailed {
			stage: RelayStage::PreVerify,
			receipt: None,
		};
		assert_eq!(rejected.state(), RelayState::VerificationFailed);
		assert!(!rejected.nonce_consumed());
		assert!(rejected.receipt().is_none());

		let failed = RelayOutcome::SubmissionError {
			stage: RelayStage::Submit,
			reason: "connection refused".to_string(),
		};
		assert_eq!(failed.state(), RelayState::Failed);
		assert!(!failed.nonce_consumed());
		assert!(failed.tx_hash().is_none());

		let hash = TransactionHash(B256::repeat_byte(0xcd));
		let unknown = RelayOutcome::Unconfirmed {
			tx_hash: hash,
			reason: "timeout".to_string(),
			nonce_consumed: None,
		};
		assert_eq!(unknown.state(), RelayState::Failed);
		assert!(unknown.nonce_consumed());
		assert_eq!(unknown.tx_hash(), Some(hash));

		let pending = RelayOutcome::Unconfirmed {
			tx_hash: hash,
			reason: "timeout".to_string(),
			nonce_consumed: Some(false),
		};
		assert!(!pending.nonce_consumed());
	}

	#[test]
	fn test_terminal_states() {
		assert!(!RelayState::Built.is_terminal());
		assert!(!RelayState::Submitted.is_terminal());
		assert!(RelayState::SigningFailed.is_terminal());
		assert!(RelayState::Reverted.is_terminal());
	}
}
