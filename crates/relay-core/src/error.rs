// relay-core/src/error.rs

use relay_types::{RelayStage, RelayState, TransactionReceipt};
use thiserror::Error;

/// Failures that leave no signed request behind.
///
/// Once a request is signed the engine reports a `RelayOutcome` instead.
#[derive(Error, Debug)]
pub enum RelayError {
	#[error("Domain unavailable: {0}")]
	DomainUnavailable(String),

	#[error("Invalid amount: {0}")]
	InvalidAmount(String),

	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	#[error("Signing failed: {0}")]
	SigningFailed(String),

	#[error("Unknown account: {0}")]
	UnknownAccount(String),

	#[error("Network error during {stage}: {reason}")]
	Network { stage: RelayStage, reason: String },

	#[error("Chain read failed: {0}")]
	Read(String),

	#[error("Transaction {} reverted", .0.hash)]
	Reverted(TransactionReceipt),

	#[error("Invalid state transition from {from:?} to {to}")]
	InvalidTransition {
		from: Option<RelayState>,
		to: RelayState,
	},

	#[error("Configuration error: {0}")]
	Config(String),
}

impl RelayError {
	/// Pipeline stage the error was raised in, when it belongs to one.
	pub fn stage(&self) -> Option<RelayStage> {
		match self {
			Self::DomainUnavailable(_) => Some(RelayStage::Domain),
			Self::InvalidAmount(_) | Self::InvalidRequest(_) => Some(RelayStage::Build),
			Self::SigningFailed(_) => Some(RelayStage::Sign),
			Self::Network { stage, .. } => Some(*stage),
			Self::Reverted(_) => Some(RelayStage::Confirm),
			Self::UnknownAccount(_)
			| Self::Read(_)
			| Self::InvalidTransition { .. }
			| Self::Config(_) => None,
		}
	}
}
