//! Entry points the browser embedding calls into.

use xwv_protocol::{JsCall, LoadFinished, LoadStarted};

use super::XWebView;

impl XWebView {
	/// Reports that the host is about to load a page.
	///
	/// Returns `false` if a handler vetoed the load; the host should then
	/// cancel it.
	pub fn handle_load_started(&self, event: &LoadStarted) -> bool {
		if self.is_disposed() {
			return false;
		}
		self.inner.navigation.handle_load_started(event)
	}

	/// Reports that a load finished, failed, or was cancelled.
	///
	/// With `auto_attach_bridge`, the bridge is injected before the pending
	/// navigation completes, so awaiting a navigation yields a page with the
	/// bridge in place.
	pub fn handle_load_finished(&self, event: LoadFinished) {
		if self.is_disposed() {
			tracing::debug!(url = %event.url, "Ignoring load finished after dispose");
			return;
		}
		if self.inner.config.auto_attach_bridge && !event.is_error && !event.was_cancelled {
			let script = self.bridge_script();
			if let Err(err) = self.inner.evaluator.execute(&script, None) {
				tracing::warn!(url = %event.url, error = %err, "Failed to inject bridge");
			}
		}
		self.inner.navigation.handle_load_finished(event);
	}

	/// Handles `NativeBridge.OnJsCall` from the page.
	pub fn handle_js_call(&self, call: &JsCall) {
		if self.is_disposed() {
			tracing::debug!(object = %call.object, function = %call.function, "Ignoring call after dispose");
			return;
		}
		self.inner.dispatcher.dispatch(call);
	}

	/// Handles `NativeBridge.OnJsPromiseFinished` from the page.
	///
	/// Returns `false` if no evaluation was waiting on `call_id`.
	pub fn handle_js_promise_finished(&self, call_id: &str, is_error: bool, result_json: &str) -> bool {
		if self.is_disposed() {
			return false;
		}
		self.inner.evaluator.complete(call_id, is_error, result_json)
	}
}
