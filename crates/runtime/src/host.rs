//! Capability surface required from the browser embedding.
//!
//! The bridge never talks to a concrete browser control. Everything it needs
//! is expressed by [`WebViewHost`]: two ways of running script, the
//! navigation commands, and history capability checks. Thread affinity is the
//! implementor's concern; every method may be called from any Tokio worker.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Boxed future returned by asynchronous host operations.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Operations a browser embedding exposes to the bridge.
///
/// Implementations forward to the native control on its UI thread. Script
/// passed to [`evaluate_with_result`](Self::evaluate_with_result) must have its
/// completion value returned as a string (hosts typically wrap it in
/// `JSON.stringify`). [`execute`](Self::execute) must run script even when the
/// page has no script context yet, since resolve/reject callbacks may target a
/// page that is mid-navigation.
pub trait WebViewHost: Send + Sync {
	/// Short name of the embedding, used in logs.
	fn name(&self) -> &str {
		"webview"
	}

	/// Evaluates script and returns its stringified completion value.
	fn evaluate_with_result(&self, script: &str, timeout: Option<Duration>) -> HostFuture<'_, String>;

	/// Runs script without waiting for a result.
	fn execute(&self, script: &str, timeout: Option<Duration>) -> Result<()>;

	/// Stops any in-progress load. Must be a no-op when idle.
	fn stop_loading(&self);

	/// Starts loading `url` in the main frame.
	fn start_load(&self, url: &str) -> Result<()>;

	/// Starts loading an HTML document with the given base URL.
	fn start_load_html(&self, html: &str, base_url: &str) -> Result<()>;

	/// Reloads the current page.
	fn reload(&self) -> Result<()> {
		self.execute("document.location.reload(true);", None)
	}

	/// Navigates one entry back in history.
	fn go_back(&self) -> Result<()> {
		self.execute("window.history.back();", None)
	}

	/// Navigates one entry forward in history.
	fn go_forward(&self) -> Result<()> {
		self.execute("window.history.forward();", None)
	}

	/// Whether there is a history entry to go back to.
	fn can_go_back(&self) -> bool;

	/// Whether there is a history entry to go forward to.
	fn can_go_forward(&self) -> bool;
}

/// Shared, detachable reference to the host.
///
/// After [`detach`](Self::detach) every lookup fails with [`Error::Disposed`].
pub struct HostSlot {
	host: RwLock<Option<Arc<dyn WebViewHost>>>,
}

impl HostSlot {
	pub fn new(host: Arc<dyn WebViewHost>) -> Self {
		Self {
			host: RwLock::new(Some(host)),
		}
	}

	/// Returns the host, or [`Error::Disposed`] once detached.
	pub fn get(&self) -> Result<Arc<dyn WebViewHost>> {
		self.host.read().clone().ok_or(Error::Disposed)
	}

	/// Removes the host, returning it if it was still attached.
	pub fn detach(&self) -> Option<Arc<dyn WebViewHost>> {
		self.host.write().take()
	}

	pub fn is_attached(&self) -> bool {
		self.host.read().is_some()
	}
}

impl std::fmt::Debug for HostSlot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let host = self.host.read();
		f.debug_struct("HostSlot")
			.field("host", &host.as_ref().map(|h| h.name().to_string()))
			.finish()
	}
}
