//! Broadcast channel carrying committed depot events.

use depot_types::DepotEvent;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of committed events to every subscriber.
///
/// Publishing with no subscribers is not an error for callers; the engine
/// ignores the send result.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DepotEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DepotEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: DepotEvent,
	) -> Result<usize, broadcast::error::SendError<DepotEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
