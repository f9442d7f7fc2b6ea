//! Native-initiated script evaluation.
//!
//! Two strategies, selected per call with [`EvalOptions`]:
//!
//! - **Direct**: the body is wrapped so its return value (or thrown error) is
//!   captured in an `{isError, result}` envelope, which the host hands back as
//!   the completion value of `evaluate_with_result`.
//! - **Promise-correlated**: a [`CallId`] is registered in the
//!   [`CorrelationTable`] and embedded in the wrapper, which is fired with
//!   `execute`. The page reports back through `OnJsPromiseFinished`, which
//!   the host forwards to [`ScriptEvaluator::complete`].
//!
//! Timeouts are enforced here for both strategies. An elapsed timeout drops
//! the pending record, so a late completion is discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use xwv_protocol::ExecutionResult;
use xwv_runtime::{CallId, CorrelationTable, Error, HostSlot, Result};

use crate::config::BridgeConfig;
use crate::script::{direct_eval_script, promise_eval_script};

/// Options for [`XWebView::evaluate_with`](crate::XWebView::evaluate_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
	/// Await a returned thenable through the correlation path.
	pub promise: bool,
	/// Overrides [`BridgeConfig::default_eval_timeout`].
	pub timeout: Option<Duration>,
}

impl EvalOptions {
	/// Direct mode without a timeout override.
	pub fn direct() -> Self {
		Self::default()
	}

	/// Promise-correlated mode without a timeout override.
	pub fn promise() -> Self {
		Self {
			promise: true,
			timeout: None,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}
}

/// Runs scripts in the hosted runtime and decodes their results.
pub struct ScriptEvaluator {
	host: Arc<HostSlot>,
	calls: CorrelationTable,
	default_timeout: Option<Duration>,
	unsafe_eval: bool,
}

impl ScriptEvaluator {
	pub fn new(host: Arc<HostSlot>, config: &BridgeConfig) -> Self {
		Self {
			host,
			calls: CorrelationTable::new(),
			default_timeout: config.default_eval_timeout(),
			unsafe_eval: config.unsafe_eval,
		}
	}

	/// Evaluates a function body and deserializes its return value.
	///
	/// A `null` or `undefined` result yields `T::default()`.
	pub async fn evaluate<T>(&self, body: &str, options: EvalOptions) -> Result<T>
	where
		T: DeserializeOwned + Default,
	{
		let value = self.evaluate_json(body, options).await?;
		if value.is_null() {
			return Ok(T::default());
		}
		Ok(serde_json::from_value(value)?)
	}

	/// Evaluates a function body and returns its result as JSON.
	pub async fn evaluate_json(&self, body: &str, options: EvalOptions) -> Result<Value> {
		let timeout = options.timeout.or(self.default_timeout);
		if options.promise {
			self.evaluate_promise(body, timeout).await
		} else {
			self.evaluate_direct(body, timeout).await
		}
	}

	async fn evaluate_direct(&self, body: &str, timeout: Option<Duration>) -> Result<Value> {
		let script = direct_eval_script(body, self.unsafe_eval);
		let output = self.evaluate_raw(&script, timeout).await?;
		let envelope = ExecutionResult::from_host_output(&output)?;
		if envelope.is_error {
			return Err(Error::ScriptExecution(envelope.message()));
		}
		Ok(envelope.value())
	}

	async fn evaluate_promise(&self, body: &str, timeout: Option<Duration>) -> Result<Value> {
		let pending = self.calls.register();
		let script = promise_eval_script(pending.id(), body, self.unsafe_eval);
		self.host.get()?.execute(&script, timeout)?;
		with_timeout(timeout, pending).await
	}

	/// Evaluates `script` verbatim and returns the host's string output.
	pub async fn evaluate_raw(&self, script: &str, timeout: Option<Duration>) -> Result<String> {
		let timeout = timeout.or(self.default_timeout);
		let host = self.host.get()?;
		with_timeout(timeout, host.evaluate_with_result(script, timeout)).await
	}

	/// Runs `script` verbatim without waiting for a result.
	pub fn execute(&self, script: &str, timeout: Option<Duration>) -> Result<()> {
		self.host.get()?.execute(script, timeout)
	}

	/// Completes a promise-correlated evaluation.
	///
	/// Returns `false` if `call_id` is malformed, unknown, or already settled.
	pub fn complete(&self, call_id: &str, is_error: bool, result_json: &str) -> bool {
		let id: CallId = match call_id.parse() {
			Ok(id) => id,
			Err(err) => {
				tracing::debug!(call_id, error = %err, "Ignoring completion with malformed call id");
				return false;
			}
		};
		let envelope = ExecutionResult::from_completion(is_error, result_json);
		if envelope.is_error {
			self.calls.reject(id, Error::ScriptExecution(envelope.message()))
		} else {
			self.calls.resolve(id, envelope.value())
		}
	}

	/// Fails every outstanding promise-correlated evaluation.
	pub fn fail_pending(&self, make_error: impl FnMut() -> Error) -> usize {
		self.calls.fail_all(make_error)
	}

	/// Number of promise-correlated evaluations awaiting completion.
	pub fn pending_count(&self) -> usize {
		self.calls.len()
	}
}

async fn with_timeout<T>(timeout: Option<Duration>, fut: impl Future<Output = Result<T>>) -> Result<T> {
	match timeout {
		Some(limit) => tokio::time::timeout(limit, fut)
			.await
			.map_err(|_| Error::EvaluationTimeout {
				timeout_ms: limit.as_millis() as u64,
			})?,
		None => fut.await,
	}
}
