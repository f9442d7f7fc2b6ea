//! [`XWebView`]: script bridge and navigation synchronizer for one browser view.

mod binding;
mod eval;
mod host_events;
mod lifecycle;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use xwv_runtime::{Error, HostSlot, Result, WebViewHost};

use crate::config::BridgeConfig;
use crate::dispatcher::InboundDispatcher;
use crate::evaluator::ScriptEvaluator;
use crate::handlers::{HandlerMap, Subscription, handler_map, raise, register};
use crate::navigation::NavigationCoordinator;
use crate::registry::MethodRegistry;
use crate::script::ScriptSynthesizer;

/// Bidirectional bridge between native code and the page in a browser view.
///
/// Cheap to clone; clones share state. The embedding forwards host events
/// to the `handle_*` methods and calls [`dispose`](Self::dispose) when the
/// view is destroyed.
///
/// # Example
///
/// ```ignore
/// let view = XWebView::new(host, BridgeConfig::default());
/// view.bind("Native", "Inc", |n: i64| n + 1)?;
/// view.load_url("https://example.com").await?;
/// let doubled: i64 = view.evaluate_promise("return JsDouble(21);").await?;
/// ```
#[derive(Clone)]
pub struct XWebView {
	inner: Arc<Inner>,
}

struct Inner {
	config: BridgeConfig,
	host: Arc<HostSlot>,
	registry: Arc<MethodRegistry>,
	synthesizer: ScriptSynthesizer,
	evaluator: ScriptEvaluator,
	dispatcher: InboundDispatcher,
	navigation: NavigationCoordinator,
	disposed: AtomicBool,
	disposing_handlers: HandlerMap<()>,
	disposed_handlers: HandlerMap<()>,
}

impl XWebView {
	/// Wires a bridge to `host`.
	pub fn new(host: Arc<dyn WebViewHost>, config: BridgeConfig) -> Self {
		let host = Arc::new(HostSlot::new(host));
		let registry = Arc::new(MethodRegistry::new());
		let inner = Inner {
			synthesizer: ScriptSynthesizer::new(Arc::clone(&registry)),
			evaluator: ScriptEvaluator::new(Arc::clone(&host), &config),
			dispatcher: InboundDispatcher::new(Arc::clone(&registry), Arc::clone(&host)),
			navigation: NavigationCoordinator::new(Arc::clone(&host), &config),
			config,
			host,
			registry,
			disposed: AtomicBool::new(false),
			disposing_handlers: handler_map(),
			disposed_handlers: handler_map(),
		};
		Self { inner: Arc::new(inner) }
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.inner.config
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.load(Ordering::SeqCst)
	}

	/// Tears the bridge down.
	///
	/// Raises [`on_disposing`](Self::on_disposing) handlers, releases the host,
	/// fails outstanding evaluations and the pending navigation with
	/// [`Error::Disposed`], drops handlers and bindings, then raises
	/// [`on_disposed`](Self::on_disposed) handlers. Later operations fail with
	/// [`Error::Disposed`] and later host events are ignored. Calling this
	/// twice is a no-op.
	pub fn dispose(&self) {
		if self.inner.disposed.swap(true, Ordering::SeqCst) {
			return;
		}
		raise(&self.inner.disposing_handlers, &mut ());
		let host = self.inner.host.detach();
		let failed = self.inner.evaluator.fail_pending(|| Error::Disposed);
		self.inner.navigation.dispose();
		self.inner.registry.unbind_all();
		tracing::debug!(
			failed,
			host = ?host.as_ref().map(|h| h.name().to_string()),
			"Disposed bridge"
		);
		drop(host);
		raise(&self.inner.disposed_handlers, &mut ());
		self.inner.disposing_handlers.lock().clear();
		self.inner.disposed_handlers.lock().clear();
	}

	/// Registers a handler run when [`dispose`](Self::dispose) starts, before
	/// pending work is failed.
	pub fn on_disposing<F>(&self, handler: F) -> Subscription
	where
		F: Fn() + Send + Sync + 'static,
	{
		register(&self.inner.disposing_handlers, move |_: &mut ()| handler())
	}

	/// Registers a handler run once [`dispose`](Self::dispose) has released the host.
	pub fn on_disposed<F>(&self, handler: F) -> Subscription
	where
		F: Fn() + Send + Sync + 'static,
	{
		register(&self.inner.disposed_handlers, move |_: &mut ()| handler())
	}

	fn ensure_alive(&self) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		Ok(())
	}
}

impl std::fmt::Debug for XWebView {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("XWebView")
			.field("host", &self.inner.host)
			.field("registry", &self.inner.registry)
			.field("busy", &self.inner.navigation.is_busy())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}
