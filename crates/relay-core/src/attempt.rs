// relay-core/src/attempt.rs

use crate::error::RelayError;
use crate::event_bus::EventBus;
use alloy::primitives::Address;
use relay_types::{AttemptEvent, RelayEvent, RelayState};
use tracing::info;
use uuid::Uuid;

/// State machine of a single relay attempt.
///
/// Created per attempt and dropped once the outcome is reported. Every
/// accepted transition is recorded and published on the event bus.
pub struct RelayAttempt {
	id: Uuid,
	from: Address,
	state: Option<RelayState>,
	history: Vec<RelayState>,
	event_bus: EventBus,
}

impl RelayAttempt {
	pub fn new(from: Address, event_bus: EventBus) -> Self {
		Self {
			id: Uuid::new_v4(),
			from,
			state: None,
			history: Vec::new(),
			event_bus,
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn from(&self) -> Address {
		self.from
	}

	pub fn state(&self) -> Option<RelayState> {
		self.state
	}

	pub fn history(&self) -> &[RelayState] {
		&self.history
	}

	pub fn transition(&mut self, next: RelayState) -> Result<(), RelayError> {
		let previous = self.state;

		if !Self::is_valid_transition(previous, next) {
			return Err(RelayError::InvalidTransition {
				from: previous,
				to: next,
			});
		}

		self.state = Some(next);
		self.history.push(next);

		match previous {
			Some(previous) => info!(attempt = %self.id, from = %self.from, "Relay state changed: {} -> {}", previous, next),
			None => info!(attempt = %self.id, from = %self.from, "Relay state: {}", next),
		}

		self.event_bus
			.publish(RelayEvent::Attempt(AttemptEvent::StateChanged {
				attempt_id: self.id,
				from: self.from,
				previous,
				state: next,
			}))
			.ok();

		Ok(())
	}

	fn is_valid_transition(from: Option<RelayState>, to: RelayState) -> bool {
		use RelayState::*;

		match (from, to) {
			(None, Built) => true,
			(Some(Built), Signed | SigningFailed) => true,
			(Some(Signed), PreVerified | Submitted | VerificationFailed | Failed) => true,
			(Some(PreVerified), Submitted | VerificationFailed | Failed) => true,
			(Some(Submitted), Confirmed | Reverted | Failed | VerificationFailed) => true,
			_ => false,
		}
	}
}
