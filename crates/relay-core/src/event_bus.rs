//! Event bus for relay progress.
//!
//! Every state transition of a relay attempt is published here so CLI or UI
//! layers can render progress without polling the engine.

use relay_types::RelayEvent;
use tokio::sync::broadcast;

/// Event bus for broadcasting relay events to multiple subscribers.
pub struct EventBus {
	/// The broadcast sender used to publish events.
	sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// Slow subscribers lose the oldest events once `capacity` is exceeded.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber to receive events from this bus.
	///
	/// Each subscriber receives its own copy of all events published
	/// after the subscription is created.
	pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers.
	pub fn publish(&self, event: RelayEvent) -> Result<(), broadcast::error::SendError<RelayEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
