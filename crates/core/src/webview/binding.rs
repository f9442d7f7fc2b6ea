//! Native method binding and bridge injection for [`XWebView`].

use std::sync::Arc;

use serde_json::Value;
use xwv_runtime::Result;

use super::XWebView;
use crate::registry::{AsyncHandler, BindingKey, BoundMethod, SyncHandler};
use crate::script::is_attached_script;

impl XWebView {
	/// Exposes a synchronous closure to the page as `window[object][function]`.
	///
	/// Arguments are decoded leniently: a value that does not fit its
	/// parameter type is replaced with the type's default. The page sees the
	/// new method after the next bridge injection.
	pub fn bind<H, Args>(&self, object: &str, function: &str, handler: H) -> Result<()>
	where
		H: SyncHandler<Args>,
		Args: 'static,
	{
		self.ensure_alive()?;
		self.inner.registry.bind(object, function, handler)
	}

	/// Exposes an asynchronous closure. The page-side promise settles with it.
	pub fn bind_async<H, Args>(&self, object: &str, function: &str, handler: H) -> Result<()>
	where
		H: AsyncHandler<Args>,
		Args: 'static,
	{
		self.ensure_alive()?;
		self.inner.registry.bind_async(object, function, handler)
	}

	/// Exposes a custom [`BoundMethod`].
	pub fn bind_method(&self, key: BindingKey, method: Arc<dyn BoundMethod>) -> Result<()> {
		self.ensure_alive()?;
		self.inner.registry.bind_method(key, method)
	}

	/// Removes a binding. Returns `false` if it did not exist.
	pub fn unbind(&self, object: &str, function: &str) -> bool {
		self.inner.registry.unbind(&BindingKey::new(object, function))
	}

	pub fn unbind_all(&self) {
		self.inner.registry.unbind_all();
	}

	/// Currently bound identities, sorted.
	pub fn bindings(&self) -> Vec<BindingKey> {
		self.inner.registry.keys()
	}

	/// Script installing the bridge and one stub per bound method.
	pub fn bridge_script(&self) -> Arc<str> {
		self.inner.synthesizer.script()
	}

	/// Injects the bridge script into the current page.
	pub async fn attach_bridge(&self) -> Result<()> {
		self.ensure_alive()?;
		let script = self.bridge_script();
		self.inner.evaluator.evaluate_raw(&script, None).await?;
		tracing::debug!("Bridge attached");
		Ok(())
	}

	/// Whether the current page has a fully installed bridge.
	pub async fn is_bridge_attached(&self) -> Result<bool> {
		self.ensure_alive()?;
		let output = self.inner.evaluator.evaluate_raw(&is_attached_script(), None).await?;
		Ok(match serde_json::from_str::<Value>(output.trim()) {
			Ok(Value::Bool(attached)) => attached,
			Ok(Value::String(text)) => text.trim() == "true",
			_ => false,
		})
	}
}
