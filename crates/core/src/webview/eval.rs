//! Script evaluation methods for [`XWebView`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use xwv_runtime::Result;

use super::XWebView;
use crate::evaluator::EvalOptions;

impl XWebView {
	/// Evaluates a function body and deserializes its return value.
	///
	/// The body uses `return` to produce a value. A `null` or `undefined`
	/// result yields `T::default()`.
	///
	/// # Errors
	///
	/// Returns [`Error::ScriptExecution`](xwv_runtime::Error::ScriptExecution)
	/// if the script throws, or
	/// [`Error::EvaluationTimeout`](xwv_runtime::Error::EvaluationTimeout) if the
	/// configured default timeout elapses.
	pub async fn evaluate<T>(&self, body: &str) -> Result<T>
	where
		T: DeserializeOwned + Default,
	{
		self.evaluate_with(body, EvalOptions::direct()).await
	}

	/// Evaluates a function body and awaits the promise it returns.
	pub async fn evaluate_promise<T>(&self, body: &str) -> Result<T>
	where
		T: DeserializeOwned + Default,
	{
		self.evaluate_with(body, EvalOptions::promise()).await
	}

	pub async fn evaluate_with<T>(&self, body: &str, options: EvalOptions) -> Result<T>
	where
		T: DeserializeOwned + Default,
	{
		self.ensure_alive()?;
		self.inner.evaluator.evaluate(body, options).await
	}

	/// Evaluates a function body and returns [`serde_json::Value`].
	pub async fn evaluate_json(&self, body: &str, options: EvalOptions) -> Result<Value> {
		self.ensure_alive()?;
		self.inner.evaluator.evaluate_json(body, options).await
	}

	/// Evaluates `script` without any wrapping and returns the host's output.
	pub async fn evaluate_raw(&self, script: &str, timeout: Option<Duration>) -> Result<String> {
		self.ensure_alive()?;
		self.inner.evaluator.evaluate_raw(script, timeout).await
	}

	/// Runs `script` without waiting for a result.
	pub fn execute(&self, script: &str) -> Result<()> {
		self.ensure_alive()?;
		self.inner.evaluator.execute(script, None)
	}
}
