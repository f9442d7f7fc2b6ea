//! Event delivery for host-reported lifecycle events.
//!
//! - [`EventBus`] - dispatcher combining a broadcast channel with one-shot listeners
//! - [`EventStream`] - wrapper around [`broadcast::Receiver`] with lag handling
//!
//! One-shot listeners are how the navigation coordinator waits for "the next
//! load finished": the listener is removed from the bus before it runs, so it
//! fires at most once, and the [`Subscription`] returned at registration lets
//! the owner detach it early when the navigation is superseded.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::handlers::{HandlerId, Subscription, next_handler_id};

type OnceListener<E> = Box<dyn FnOnce(&E) + Send>;

type ListenerMap<E> = Arc<Mutex<IndexMap<HandlerId, OnceListener<E>>>>;

/// Dispatcher combining broadcast subscribers with one-shot listeners.
///
/// Listeners run first during [`emit`](Self::emit), so a waiter never misses an
/// event because a broadcast receiver lagged.
pub(crate) struct EventBus<E: Clone + Send + 'static> {
	tx: broadcast::Sender<E>,
	listeners: ListenerMap<E>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
	/// Creates a new [`EventBus`] with the specified broadcast channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self {
			tx,
			listeners: Arc::new(Mutex::new(IndexMap::new())),
		}
	}

	/// Emits an event to all one-shot listeners, then to stream subscribers.
	///
	/// Listeners are detached before they are invoked, under the lock, so a
	/// listener registered while this runs only sees the next event.
	pub fn emit(&self, event: E) {
		let fired: Vec<OnceListener<E>> = {
			let mut listeners = self.listeners.lock();
			listeners.drain(..).map(|(_, listener)| listener).collect()
		};
		for listener in fired {
			listener(&event);
		}
		let _ = self.tx.send(event);
	}

	/// Registers a listener for the next emitted event.
	pub fn once<F>(&self, listener: F) -> Subscription
	where
		F: FnOnce(&E) + Send + 'static,
	{
		let id = next_handler_id();
		self.listeners.lock().insert(id, Box::new(listener));
		Subscription::from_map(id, &self.listeners)
	}

	/// Subscribes to the event stream.
	///
	/// Events emitted before subscription are not received.
	pub fn subscribe(&self) -> EventStream<E> {
		EventStream::new(self.tx.subscribe())
	}

	/// Detaches every pending listener without running it.
	pub fn clear(&self) {
		self.listeners.lock().clear();
	}

	#[cfg(test)]
	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
	fn default() -> Self {
		Self::new(64)
	}
}

/// Wrapper around [`broadcast::Receiver`] with automatic lag handling.
///
/// [`RecvError::Lagged`] is logged and skipped instead of breaking the loop.
///
/// [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver
/// [`RecvError::Lagged`]: tokio::sync::broadcast::error::RecvError::Lagged
pub struct EventStream<E: Clone + Send + 'static> {
	rx: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> EventStream<E> {
	pub(crate) fn new(rx: broadcast::Receiver<E>) -> Self {
		Self { rx }
	}

	/// Receives the next event.
	///
	/// Returns `None` once the bridge that owns the bus is dropped.
	pub async fn recv(&mut self) -> Option<E> {
		loop {
			match self.rx.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Event stream lagged, dropped events");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Returns the next event if one is immediately available.
	pub fn try_recv(&mut self) -> Option<E> {
		loop {
			match self.rx.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Event stream lagged, dropped events");
				}
				Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => return None,
			}
		}
	}
}
