//! Correlation of promise-correlated evaluations with their completions.
//!
//! # Flow
//!
//! 1. The evaluator calls [`CorrelationTable::register`] and gets a fresh
//!    [`CallId`] plus a [`PendingCall`] future
//! 2. The id is embedded in the script sent to the hosted runtime
//! 3. The runtime later reports `OnJsPromiseFinished(id, ...)`, which ends up
//!    in [`CorrelationTable::complete`]
//! 4. The matching [`PendingCall`] resolves
//!
//! Dropping a [`PendingCall`] (e.g. on timeout) removes its record, so a late
//! completion finds nothing and is discarded.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Identifier of one outstanding promise-correlated call.
///
/// Issued by a per-table counter, so ids never collide while the table lives.
/// Crosses the wire as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
	/// Returns the id as a quoted script string literal.
	pub fn to_js_literal(self) -> String {
		format!("\"{}\"", self.0)
	}
}

impl fmt::Display for CallId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for CallId {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		s.trim()
			.trim_matches('"')
			.parse::<u64>()
			.map(CallId)
			.map_err(|_| Error::InvalidArgument(format!("invalid call id '{s}'")))
	}
}

type PendingMap = Arc<DashMap<CallId, oneshot::Sender<Result<Value>>>>;

/// RAII guard ensuring record cleanup when a [`PendingCall`] is dropped.
struct CancelGuard {
	id: CallId,
	pending: PendingMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: CallId, pending: PendingMap) -> Self {
		Self {
			id,
			pending,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.pending.remove(&self.id).is_some() {
			tracing::debug!(id = %self.id, "CancelGuard: removed abandoned call");
		}
	}
}

/// Future resolving when the hosted runtime reports completion of a call.
pub struct PendingCall {
	id: CallId,
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl PendingCall {
	pub fn id(&self) -> CallId {
		self.id
	}
}

impl Future for PendingCall {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl fmt::Debug for PendingCall {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingCall").field("id", &self.id).finish()
	}
}

/// Thread-safe table of pending promise-correlated calls.
pub struct CorrelationTable {
	last_id: AtomicU64,
	pending: PendingMap,
}

impl Default for CorrelationTable {
	fn default() -> Self {
		Self::new()
	}
}

impl CorrelationTable {
	pub fn new() -> Self {
		Self {
			last_id: AtomicU64::new(0),
			pending: Arc::new(DashMap::new()),
		}
	}

	/// Registers a new pending call and returns the future awaiting it.
	pub fn register(&self) -> PendingCall {
		let id = CallId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
		let (tx, rx) = oneshot::channel();
		self.pending.insert(id, tx);
		tracing::debug!(%id, "Registered pending call");

		PendingCall {
			id,
			rx,
			guard: CancelGuard::new(id, Arc::clone(&self.pending)),
		}
	}

	/// Completes the call `id`. Returns `false` if no such call is outstanding.
	pub fn complete(&self, id: CallId, result: Result<Value>) -> bool {
		let Some((_, tx)) = self.pending.remove(&id) else {
			tracing::debug!(%id, "Discarding completion for unknown or abandoned call");
			return false;
		};

		if tx.send(result).is_err() {
			tracing::debug!(%id, "Pending call receiver already dropped");
			return false;
		}
		true
	}

	pub fn resolve(&self, id: CallId, value: Value) -> bool {
		self.complete(id, Ok(value))
	}

	pub fn reject(&self, id: CallId, error: Error) -> bool {
		self.complete(id, Err(error))
	}

	/// Fails every outstanding call, returning how many were failed.
	pub fn fail_all(&self, mut make_error: impl FnMut() -> Error) -> usize {
		let ids: Vec<CallId> = self.pending.iter().map(|entry| *entry.key()).collect();
		let mut failed = 0;
		for id in ids {
			if let Some((_, tx)) = self.pending.remove(&id) {
				let _ = tx.send(Err(make_error()));
				failed += 1;
			}
		}
		if failed > 0 {
			tracing::debug!(failed, "Failed outstanding calls");
		}
		failed
	}

	pub fn contains(&self, id: CallId) -> bool {
		self.pending.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}

impl fmt::Debug for CorrelationTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CorrelationTable")
			.field("last_id", &self.last_id.load(Ordering::SeqCst))
			.field("pending", &self.pending.len())
			.finish()
	}
}
