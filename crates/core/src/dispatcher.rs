//! Handling of calls made from the hosted runtime into native code.
//!
//! The page calls `NativeBridge.OnJsCall(object, function, paramsJson,
//! resolveName, rejectName)`; the host forwards that to
//! [`InboundDispatcher::dispatch`]. Every outcome is reported back to the page
//! by executing `resolveName(<json>)` or `rejectName(<message>)`. Nothing is
//! ever returned to the host and no failure escapes as a panic.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use xwv_protocol::JsCall;
use xwv_runtime::{Error, HostSlot, Result};

use crate::registry::{BindingKey, Invocation, MethodRegistry};
use crate::script::{is_js_identifier, js_string_literal};

/// Routes inbound calls to bound native methods.
pub struct InboundDispatcher {
	registry: Arc<MethodRegistry>,
	host: Arc<HostSlot>,
}

impl InboundDispatcher {
	pub fn new(registry: Arc<MethodRegistry>, host: Arc<HostSlot>) -> Self {
		Self { registry, host }
	}

	/// Invokes the method named by `call` and settles the script-side promise.
	///
	/// Synchronous results are delivered before this returns. Deferred results
	/// are awaited on a spawned Tokio task.
	pub fn dispatch(&self, call: &JsCall) {
		if !is_js_identifier(&call.resolve) || !is_js_identifier(&call.reject) {
			tracing::error!(
				object = %call.object,
				function = %call.function,
				resolve = %call.resolve,
				reject = %call.reject,
				"Dropping inbound call with invalid callback names"
			);
			return;
		}

		let key = BindingKey::new(&call.object, call.function.clone());
		tracing::debug!(%key, "Inbound call");

		match self.invoke(&key, call) {
			Ok(Invocation::Ready(value)) => {
				resolve(&self.host, &call.resolve, &value);
			}
			Ok(Invocation::Deferred(fut)) => {
				let Ok(handle) = tokio::runtime::Handle::try_current() else {
					tracing::error!(%key, "No Tokio runtime to await deferred result");
					reject(&self.host, &call.reject, "No async runtime available to complete the call");
					return;
				};
				let host = Arc::clone(&self.host);
				let resolve_name = call.resolve.clone();
				let reject_name = call.reject.clone();
				handle.spawn(async move {
					match AssertUnwindSafe(fut).catch_unwind().await {
						Ok(Ok(value)) => resolve(&host, &resolve_name, &value),
						Ok(Err(err)) => {
							tracing::warn!(%key, error = %err, "Deferred native call failed");
							reject(&host, &reject_name, &err.to_string());
						}
						Err(payload) => {
							let err = Error::Invocation(panic_message(payload.as_ref()));
							tracing::error!(%key, error = %err, "Deferred native call panicked");
							reject(&host, &reject_name, &err.to_string());
						}
					}
				});
			}
			Err(err) => {
				tracing::error!(%key, error = %err, "Inbound call failed");
				reject(&self.host, &call.reject, &err.to_string());
			}
		}
	}

	fn invoke(&self, key: &BindingKey, call: &JsCall) -> Result<Invocation> {
		let method = self.registry.resolve(key)?;
		let args = call.arguments().map_err(|err| Error::ArgumentCoercion(err.to_string()))?;
		match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(&args))) {
			Ok(result) => result,
			Err(payload) => Err(Error::Invocation(panic_message(payload.as_ref()))),
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"native method panicked".to_string()
	}
}

fn resolve(host: &HostSlot, callback: &str, value: &Value) {
	let json = value.to_string().replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
	deliver(host, callback, &json);
}

fn reject(host: &HostSlot, callback: &str, message: &str) {
	deliver(host, callback, &js_string_literal(message));
}

/// Executes `callback(payload)` in the page, swallowing host failures.
fn deliver(host: &HostSlot, callback: &str, payload: &str) {
	let host = match host.get() {
		Ok(host) => host,
		Err(_) => {
			tracing::debug!(callback, "Bridge disposed, dropping call result");
			return;
		}
	};
	let script = format!("{callback}({payload});");
	if let Err(err) = host.execute(&script, None) {
		tracing::warn!(callback, error = %err, "Failed to deliver call result to page");
	}
}
