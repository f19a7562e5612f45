use alloy::primitives::Address;
use uuid::Uuid;

use crate::{RelayOutcome, RelayStage, RelayState, TransactionHash, TransactionReceipt};

#[derive(Debug, Clone)]
pub enum RelayEvent {
	Attempt(AttemptEvent),
	Delivery(DeliveryEvent),
}

#[derive(Debug, Clone)]
pub enum AttemptEvent {
	StateChanged {
		attempt_id: Uuid,
		from: Address,
		previous: Option<RelayState>,
		state: RelayState,
	},
	Rejected {
		attempt_id: Uuid,
		from: Address,
		stage: RelayStage,
		reason: String,
	},
	Finished {
		attempt_id: Uuid,
		from: Address,
		outcome: RelayOutcome,
	},
}

#[derive(Debug, Clone)]
pub enum DeliveryEvent {
	TransactionPending {
		attempt_id: Option<Uuid>,
		tx_hash: TransactionHash,
	},
	TransactionConfirmed {
		attempt_id: Option<Uuid>,
		receipt: TransactionReceipt,
	},
}
