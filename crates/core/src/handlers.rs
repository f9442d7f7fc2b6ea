//! Generic event handler infrastructure.
//!
//! Handlers live in an [`IndexMap`] keyed by [`HandlerId`] for O(1) removal
//! with stable insertion order, and are unregistered through RAII
//! [`Subscription`] handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for event handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Handler function receiving a mutable event so it can veto it.
pub type HandlerFn<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// Event handler entry.
pub struct HandlerEntry<E> {
	pub id: HandlerId,
	pub handler: HandlerFn<E>,
}

impl<E> Clone for HandlerEntry<E> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			handler: Arc::clone(&self.handler),
		}
	}
}

/// Handler storage: [`IndexMap`] for O(1) removal with stable insertion order.
pub type HandlerMap<E> = Arc<Mutex<IndexMap<HandlerId, HandlerEntry<E>>>>;

/// Creates an empty handler map.
pub fn handler_map<E>() -> HandlerMap<E> {
	Arc::new(Mutex::new(IndexMap::new()))
}

/// Registers `handler` in `map`, returning the subscription that removes it.
pub fn register<E, F>(map: &HandlerMap<E>, handler: F) -> Subscription
where
	E: Send + 'static,
	F: Fn(&mut E) + Send + Sync + 'static,
{
	let id = next_handler_id();
	map.lock().insert(
		id,
		HandlerEntry {
			id,
			handler: Arc::new(handler),
		},
	);
	Subscription::from_map(id, map)
}

/// Invokes every handler in registration order.
///
/// Handlers are cloned out of the map first, so a handler may drop its own
/// subscription without deadlocking.
pub fn raise<E>(map: &HandlerMap<E>, event: &mut E) {
	let handlers: Vec<_> = map.lock().values().cloned().collect();
	for entry in handlers {
		(entry.handler)(event);
	}
}

/// RAII handle that unregisters an event handler on drop.
///
/// Holds a weak reference to the handler map, so dropping after the owning
/// bridge is disposed is safe (becomes a no-op).
pub struct Subscription {
	id: HandlerId,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	/// Creates a subscription removing `id` from `map` through a weak reference.
	pub fn from_map<V>(id: HandlerId, map: &Arc<Mutex<IndexMap<HandlerId, V>>>) -> Self
	where
		V: Send + 'static,
	{
		let weak: Weak<Mutex<IndexMap<HandlerId, V>>> = Arc::downgrade(map);
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(map) = weak.upgrade() {
				map.lock().shift_remove(&id);
			}
		});
		Self::new(id, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, AtomicUsize};

	use super::*;

	#[test]
	fn test_handler_id_increments() {
		let id1 = next_handler_id();
		let id2 = next_handler_id();
		let id3 = next_handler_id();
		assert!(id2 > id1);
		assert!(id3 > id2);
	}

	#[test]
	fn test_subscription_unsubscribe() {
		let called = Arc::new(AtomicBool::new(false));
		let called_clone = Arc::clone(&called);

		let dropper = Arc::new(move |_id: HandlerId| {
			called_clone.store(true, Ordering::SeqCst);
		});

		let sub = Subscription::new(1, dropper);
		assert!(!called.load(Ordering::SeqCst));

		sub.unsubscribe();
		assert!(called.load(Ordering::SeqCst));
	}

	#[test]
	fn test_subscription_drop_removes_handler() {
		let map: HandlerMap<u32> = handler_map();
		{
			let _sub = register(&map, |_: &mut u32| {});
			assert_eq!(map.lock().len(), 1);
		}
		assert_eq!(map.lock().len(), 0);
	}

	#[test]
	fn test_subscription_weak_reference() {
		let map: HandlerMap<u32> = handler_map();
		let sub = register(&map, |_: &mut u32| {});

		drop(map);

		// Dropping subscription should not panic (weak ref is dead)
		drop(sub);
	}

	#[test]
	fn test_raise_runs_handlers_in_order() {
		let map: HandlerMap<Vec<u32>> = handler_map();
		let _a = register(&map, |seen: &mut Vec<u32>| seen.push(1));
		let _b = register(&map, |seen: &mut Vec<u32>| seen.push(2));

		let mut seen = Vec::new();
		raise(&map, &mut seen);
		assert_eq!(seen, vec![1, 2]);
	}

	#[test]
	fn test_raise_after_unsubscribe_skips_handler() {
		let map: HandlerMap<()> = handler_map();
		let count = Arc::new(AtomicUsize::new(0));
		let count_clone = Arc::clone(&count);
		let sub = register(&map, move |_: &mut ()| {
			count_clone.fetch_add(1, Ordering::SeqCst);
		});

		raise(&map, &mut ());
		sub.unsubscribe();
		raise(&map, &mut ());
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}
}
