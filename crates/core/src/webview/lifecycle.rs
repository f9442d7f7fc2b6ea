//! Navigation methods for [`XWebView`].

use futures_util::future::BoxFuture;
use xwv_protocol::LoadFinished;
use xwv_runtime::Result;

use super::XWebView;
use crate::events::EventStream;
use crate::handlers::Subscription;
use crate::navigation::{NavigationFuture, NavigationRequest};

impl XWebView {
	/// Navigates to `url`. Any navigation still in progress is cancelled.
	pub fn load_url(&self, url: &str) -> NavigationFuture {
		self.inner.navigation.load_url(url)
	}

	/// Loads an HTML document. `base_url` defaults to `about:blank`.
	pub fn load_html(&self, html: &str, base_url: Option<&str>) -> NavigationFuture {
		self.inner.navigation.load_html(html, base_url.unwrap_or("about:blank"))
	}

	pub fn reload(&self) -> NavigationFuture {
		self.inner.navigation.reload()
	}

	/// Navigates back in history.
	///
	/// Handlers registered with [`on_go_back_requested`](Self::on_go_back_requested)
	/// run first. The request starts cancelled when there is no history entry.
	pub fn go_back(&self) -> NavigationFuture {
		self.inner.navigation.go_back()
	}

	pub fn go_forward(&self) -> NavigationFuture {
		self.inner.navigation.go_forward()
	}

	/// Waits for the current load, if any. `None` means the view was idle.
	pub fn wait_while_busy(&self) -> BoxFuture<'static, Result<Option<LoadFinished>>> {
		self.inner.navigation.wait_while_busy()
	}

	/// URL of the last successfully loaded page.
	pub fn url(&self) -> String {
		self.inner.navigation.url()
	}

	pub fn is_busy(&self) -> bool {
		self.inner.navigation.is_busy()
	}

	pub fn on_go_back_requested<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		self.inner.navigation.on_go_back_requested(handler)
	}

	pub fn on_go_forward_requested<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		self.inner.navigation.on_go_forward_requested(handler)
	}

	/// Registers a handler that may veto loads the host reports as starting.
	pub fn on_load_started<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&mut NavigationRequest) + Send + Sync + 'static,
	{
		self.inner.navigation.on_load_started(handler)
	}

	pub fn load_finished_events(&self) -> EventStream<LoadFinished> {
		self.inner.navigation.load_finished_events()
	}
}
