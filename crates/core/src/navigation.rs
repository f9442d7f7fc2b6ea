//! Single-in-flight navigation tracking.
//!
//! Host navigation commands return immediately; completion arrives later as a
//! [`LoadFinished`] event. [`NavigationCoordinator`] turns that into a future
//! per navigation, with at most one outstanding at a time.
//!
//! # Starting a navigation
//!
//! Under the slot lock:
//!
//! 1. `stop_loading` on the host
//! 2. The current navigation, if still pending, is cancelled
//! 3. A new [`NavigationSlot`] is installed together with a one-shot
//!    load-finished listener
//!
//! The host command is then issued with the lock released. Hosts may report
//! events synchronously from inside the command, and handlers reached that
//! way may start another navigation. If the command fails, the slot is only
//! cleared when it still holds the navigation that issued it.
//!
//! The load-finished listener never takes the slot lock.
//!
//! Navigation state lives in a [`watch`] channel, so any number of waiters
//! observe the same terminal state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use xwv_protocol::{LoadFinished, LoadStarted};
use xwv_runtime::{Error, HostSlot, Result, WebViewHost};

use crate::config::BridgeConfig;
use crate::events::{EventBus, EventStream};
use crate::handlers::{HandlerMap, Subscription, handler_map, raise, register};

/// What started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
	LoadUrl,
	LoadHtml,
	Reload,
	GoBack,
	GoForward,
	/// Started by the page or the user, reported through `LoadStarted`.
	Browse,
}

/// Cancellable notice of an upcoming navigation.
///
/// Raised before history navigations (with `can_navigate` taken from the
/// host) and for every host-reported load start. Set `cancel` to veto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
	pub kind: NavigationKind,
	pub url: Option<String>,
	pub can_navigate: bool,
	pub cancel: bool,
}

impl NavigationRequest {
	/// A history request, cancelled by default when there is nowhere to go.
	pub fn history(kind: NavigationKind, can_navigate: bool) -> Self {
		Self {
			kind,
			url: None,
			can_navigate,
			cancel: !can_navigate,
		}
	}

	/// A host-reported load of `url`.
	pub fn browse(url: impl Into<String>) -> Self {
		Self {
			kind: NavigationKind::Browse,
			url: Some(url.into()),
			can_navigate: true,
			cancel: false,
		}
	}
}

#[derive(Debug, Clone)]
enum NavigationState {
	Pending,
	Completed(LoadFinished),
	Failed(LoadFinished),
	Cancelled(String),
	Disposed,
}

impl NavigationState {
	fn from_event(event: &LoadFinished) -> Self {
		if event.is_error {
			NavigationState::Failed(event.clone())
		} else if event.was_cancelled {
			NavigationState::Cancelled(format!("load of '{}' was cancelled", event.url))
		} else {
			NavigationState::Completed(event.clone())
		}
	}

	fn is_pending(&self) -> bool {
		matches!(self, NavigationState::Pending)
	}

	fn into_result(self) -> Result<LoadFinished> {
		match self {
			NavigationState::Completed(event) => Ok(event),
			NavigationState::Failed(event) => {
				tracing::debug!(url = %event.url, "Load exception");
				Err(Error::NavigationFailed {
					url: event.url,
					error_type: event.error_type,
					description: event.error_description.unwrap_or_else(|| "unknown load error".to_string()),
				})
			}
			NavigationState::Cancelled(reason) => Err(Error::NavigationCancelled(reason)),
			NavigationState::Disposed => Err(Error::Disposed),
			NavigationState::Pending => Err(Error::NavigationCancelled("navigation abandoned".to_string())),
		}
	}
}

type StateSender = Arc<watch::Sender<NavigationState>>;

/// Moves a pending navigation to its terminal state. Later calls are no-ops.
fn settle(state: &watch::Sender<NavigationState>, next: NavigationState) -> bool {
	state.send_if_modified(|current| {
		if current.is_pending() {
			*current = next;
			true
		} else {
			false
		}
	})
}

/// The navigation currently being tracked.
struct NavigationSlot {
	id: u64,
	kind: NavigationKind,
	state: StateSender,
	_listener: Subscription,
}

impl NavigationSlot {
	fn is_pending(&self) -> bool {
		self.state.borrow().is_pending()
	}
}

/// Future resolving when the navigation it was created for finishes.
///
/// The navigation is started when the future is created, not when it is
/// first polled.
#[must_use = "dropping the future does not cancel the navigation, but its outcome is lost"]
pub struct NavigationFuture {
	inner: BoxFuture<'static, Result<LoadFinished>>,
}

impl NavigationFuture {
	fn new(inner: impl Future<Output = Result<LoadFinished>> + Send + 'static) -> Self {
		Self { inner: Box::pin(inner) }
	}

	fn ready(result: Result<LoadFinished>) -> Self {
		Self::new(future::ready(result))
	}
}

impl Future for NavigationFuture {
	type Output = Result<LoadFinished>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.inner.poll_unpin(cx)
	}
}

impl std::fmt::Debug for NavigationFuture {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("NavigationFuture")
	}
}

async fn await_state(mut rx: watch::Receiver<NavigationState>, timeout: Option<Duration>) -> Result<LoadFinished> {
	let settled = async move {
		rx.wait_for(|state| !state.is_pending())
			.await
			.map(|state| state.clone())
			.unwrap_or(NavigationState::Pending)
	};
	let state = match timeout {
		Some(limit) => tokio::time::timeout(limit, settled)
			.await
			.map_err(|_| Error::NavigationTimeout {
				timeout_ms: limit.as_millis() as u64,
			})?,
		None => settled.await,
	};
	state.into_result()
}

/// Coordinates navigations of one browser view.
pub struct NavigationCoordinator {
	host: Arc<HostSlot>,
	slot: Mutex<Option<NavigationSlot>>,
	next_id: AtomicU64,
	busy: AtomicBool,
	disposed: AtomicBool,
	url: RwLock<String>,
	timeout: Option<Duration>,
	load_finished: EventBus<LoadFinished>,
	load_started_handlers: HandlerMap<NavigationRequest>,
	go_back_handlers: HandlerMap<NavigationRequest>,
	go_forward_handlers: HandlerMap<NavigationRequest>,
}

impl NavigationCoordinator {
	pub fn new(host: Arc<HostSlot>, config: &BridgeConfig) -> Self {
		Self {
			host,
			slot: Mutex::new(None),
			next_id: AtomicU64::new(1),
			busy: AtomicBool::new(false),
			disposed: AtomicBool::new(false),
			url: RwLock::new(String::from("about:blank")),
			timeout: config.navigation_timeout(),
			load_finished: EventBus::new(config.event_capacity),
			load_started_handlers: handler_map(),
			go_back_handlers: handler_map(),
			go_forward_handlers: handler_map(),
		}
	}

	pub fn load_url(&self, url: &str) -> NavigationFuture {
		let url = url.to_string();
		self.begin(NavigationKind::LoadUrl, move |host| host.start_load(&url))
	}

	pub fn load_html(&self, html: &str, base_url: &str) -> NavigationFuture {
		let html = html.to_string();
		let base_url = base_url.to_string();
		self.begin(NavigationKind::LoadHtml, move |host| host.start_load_html(&html, &base_url))
	}

	pub fn reload(&self) -> NavigationFuture {
		self.begin(NavigationKind::Reload, |host| host.reload())
	}

	pub fn go_back(&self) -> NavigationFuture {
		self.history(NavigationKind::GoBack)
	}

	pub fn go_forward(&self) -> NavigationFuture {
		self.history(NavigationKind::GoForward)
	}

	fn history(&self, kind: NavigationKind) -> NavigationFuture {
		let host = match self.host.get() {
			Ok(host) => host,
			Err(err) => return NavigationFuture::ready(Err(err)),
		};
		let (can_navigate, handlers, label) = match kind {
			NavigationKind::GoForward => (host.can_go_forward(), &self.go_forward_handlers, "go forward"),
			_ => (host.can_go_back(), &self.go_back_handlers, "go back"),
		};
		drop(host);

		let mut request = NavigationRequest::history(kind, can_navigate);
		raise(handlers, &mut request);
		if request.cancel {
			tracing::debug!(?kind, can_navigate, "History navigation cancelled");
			return NavigationFuture::ready(Err(Error::NavigationCancelled(format!("{label} cancelled"))));
		}

		match kind {
			NavigationKind::GoForward => self.begin(kind, |host| host.go_forward()),
			_ => self.begin(kind, |host| host.go_back()),
		}
	}

	fn begin<F>(&self, kind: NavigationKind, command: F) -> NavigationFuture
	where
		F: FnOnce(&dyn WebViewHost) -> Result<()>,
	{
		if self.disposed.load(Ordering::SeqCst) {
			return NavigationFuture::ready(Err(Error::Disposed));
		}
		let host = match self.host.get() {
			Ok(host) => host,
			Err(err) => return NavigationFuture::ready(Err(err)),
		};

		let (id, state, rx) = {
			let mut slot = self.slot.lock();
			if self.disposed.load(Ordering::SeqCst) {
				return NavigationFuture::ready(Err(Error::Disposed));
			}
			host.stop_loading();
			if let Some(previous) = slot.take() {
				if settle(&previous.state, NavigationState::Cancelled("superseded by a new navigation".to_string())) {
					tracing::debug!(id = previous.id, kind = ?previous.kind, "Cancelled superseded navigation");
				}
			}
			let installed = self.install(&mut slot, kind);
			self.busy.store(true, Ordering::SeqCst);
			installed
		};
		tracing::debug!(id, ?kind, "Starting navigation");

		if let Err(err) = command(host.as_ref()) {
			tracing::warn!(id, ?kind, error = %err, "Host refused navigation command");
			settle(&state, NavigationState::Cancelled(err.to_string()));
			let mut slot = self.slot.lock();
			if slot.as_ref().is_some_and(|current| current.id == id) {
				*slot = None;
				self.busy.store(false, Ordering::SeqCst);
			}
			return NavigationFuture::ready(Err(err));
		}

		NavigationFuture::new(await_state(rx, self.timeout))
	}

	/// Installs a fresh pending slot whose listener settles on the next load finished.
	fn install(
		&self,
		slot: &mut Option<NavigationSlot>,
		kind: NavigationKind,
	) -> (u64, StateSender, watch::Receiver<NavigationState>) {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = watch::channel(NavigationState::Pending);
		let state: StateSender = Arc::new(tx);

		let listener_state = Arc::clone(&state);
		let listener = self.load_finished.once(move |event: &LoadFinished| {
			settle(&listener_state, NavigationState::from_event(event));
		});

		*slot = Some(NavigationSlot {
			id,
			kind,
			state: Arc::clone(&state),
			_listener: listener,
		});
		(id, state, rx)
	}

	/// Waits for the current page load to finish.
	///
	/// Resolves to `None` immediately when nothing is loading. Otherwise waits
	/// on the pending navigation, or for a load the host started on its own,
	/// without stopping it.
	pub fn wait_while_busy(&self) -> BoxFuture<'static, Result<Option<LoadFinished>>> {
		if self.disposed.load(Ordering::SeqCst) {
			return future::ready(Err(Error::Disposed)).boxed();
		}

		let rx = {
			let mut slot = self.slot.lock();
			if self.disposed.load(Ordering::SeqCst) {
				return future::ready(Err(Error::Disposed)).boxed();
			}
			let pending = slot
				.as_ref()
				.filter(|current| current.is_pending())
				.map(|current| current.state.subscribe());
			match pending {
				Some(rx) => rx,
				None if self.busy.load(Ordering::SeqCst) => {
					tracing::debug!("Waiting on host-initiated load");
					self.install(&mut slot, NavigationKind::Browse).2
				}
				None => return future::ready(Ok(None)).boxed(),
			}
		};

		let timeout = self.timeout;
		async move { await_state(rx, timeout).await.map(Some) }.boxed()
	}

	/// Raises load-started handlers. Returns `false` if one of them vetoed the load.
	pub fn handle_load_started(&self, event: &LoadStarted) -> bool {
		let mut request = NavigationRequest::browse(event.url.clone());
		raise(&self.load_started_handlers, &mut request);
		if request.cancel {
			tracing::debug!(url = %event.url, "Load vetoed by handler");
			return false;
		}
		self.busy.store(true, Ordering::SeqCst);
		true
	}

	/// Records a finished load and settles the pending navigation.
	pub fn handle_load_finished(&self, event: LoadFinished) {
		if !event.is_error && !event.was_cancelled {
			*self.url.write() = event.url.clone();
		}
		self.busy.store(false, Ordering::SeqCst);
		tracing::debug!(url = %event.url, is_error = event.is_error, cancelled = event.was_cancelled, "Load finished");
		self.load_finished.emit(event);
	}

	pub fn on_load_started<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		register(&self.load_started_handlers, handler)
	}

	pub fn on_go_back_requested<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		register(&self.go_back_handlers, handler)
	}

	pub fn on_go_forward_requested<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		register(&self.go_forward_handlers, handler)
	}

	/// Stream of every [`LoadFinished`] reported after subscription.
	pub fn load_finished_events(&self) -> EventStream<LoadFinished> {
		self.load_finished.subscribe()
	}

	/// URL of the last successfully finished load.
	pub fn url(&self) -> String {
		self.url.read().clone()
	}

	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::SeqCst)
	}

	/// Whether a navigation future is waiting for completion.
	pub fn has_pending(&self) -> bool {
		self.slot.lock().as_ref().is_some_and(NavigationSlot::is_pending)
	}

	/// Fails the pending navigation with [`Error::Disposed`] and drops all handlers.
	pub fn dispose(&self) {
		self.disposed.store(true, Ordering::SeqCst);
		let previous = self.slot.lock().take();
		if let Some(previous) = previous {
			settle(&previous.state, NavigationState::Disposed);
		}
		self.load_finished.clear();
		self.load_started_handlers.lock().clear();
		self.go_back_handlers.lock().clear();
		self.go_forward_handlers.lock().clear();
		self.busy.store(false, Ordering::SeqCst);
	}
}
