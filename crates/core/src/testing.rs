//! Testing infrastructure for code built on the bridge.
//!
//! [`MockHost`] implements [`WebViewHost`] without a browser: it records every
//! script and navigation command, answers `evaluate_with_result` through a
//! configurable responder, and can run a hook on executed scripts to play the
//! part of the page.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xwv::testing::{HostCommand, MockHost};
//! use xwv::protocol::LoadFinished;
//! use xwv::{BridgeConfig, XWebView};
//!
//! #[tokio::test]
//! async fn loads_url() {
//!     let host = Arc::new(MockHost::new());
//!     let view = XWebView::new(host.clone(), BridgeConfig::default());
//!     let nav = view.load_url("https://example.com");
//!     assert_eq!(host.commands().last(), Some(&HostCommand::Load("https://example.com".into())));
//!     view.handle_load_finished(LoadFinished::ok("https://example.com"));
//!     nav.await.unwrap();
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use xwv_runtime::{Error, HostFuture, Result, WebViewHost};

type Responder = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;
type ExecuteHook = Arc<dyn Fn(&str) + Send + Sync>;
type CommandHook = Arc<dyn Fn(&HostCommand) + Send + Sync>;

/// Navigation command recorded by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
	Stop,
	Load(String),
	LoadHtml { html: String, base_url: String },
	Reload,
	Back,
	Forward,
}

/// Scripted [`WebViewHost`] for tests.
pub struct MockHost {
	executed: Mutex<Vec<String>>,
	evaluated: Mutex<Vec<String>>,
	commands: Mutex<Vec<HostCommand>>,
	responder: Mutex<Option<Responder>>,
	execute_hook: Mutex<Option<ExecuteHook>>,
	command_hook: Mutex<Option<CommandHook>>,
	eval_delay: Mutex<Option<Duration>>,
	can_go_back: AtomicBool,
	can_go_forward: AtomicBool,
	fail_commands: AtomicBool,
	fail_execute: AtomicBool,
	changed: Notify,
}

impl Default for MockHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MockHost {
	/// Creates a host that answers every evaluation with `null`.
	pub fn new() -> Self {
		Self {
			executed: Mutex::new(Vec::new()),
			evaluated: Mutex::new(Vec::new()),
			commands: Mutex::new(Vec::new()),
			responder: Mutex::new(None),
			execute_hook: Mutex::new(None),
			command_hook: Mutex::new(None),
			eval_delay: Mutex::new(None),
			can_go_back: AtomicBool::new(false),
			can_go_forward: AtomicBool::new(false),
			fail_commands: AtomicBool::new(false),
			fail_execute: AtomicBool::new(false),
			changed: Notify::new(),
		}
	}

	/// Sets the function producing `evaluate_with_result` output.
	pub fn set_responder<F>(&self, responder: F)
	where
		F: Fn(&str) -> Result<String> + Send + Sync + 'static,
	{
		*self.responder.lock() = Some(Arc::new(responder));
	}

	/// Sets a hook run, outside any lock, for every executed script.
	pub fn on_execute<F>(&self, hook: F)
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		*self.execute_hook.lock() = Some(Arc::new(hook));
	}

	/// Sets a hook run, outside any lock, for every accepted navigation command.
	///
	/// The hook runs synchronously inside the command, the way hosts that
	/// report load events from their navigation call behave.
	pub fn on_command<F>(&self, hook: F)
	where
		F: Fn(&HostCommand) + Send + Sync + 'static,
	{
		*self.command_hook.lock() = Some(Arc::new(hook));
	}

	/// Delays every `evaluate_with_result` answer.
	pub fn set_eval_delay(&self, delay: Duration) {
		*self.eval_delay.lock() = Some(delay);
	}

	pub fn set_can_go_back(&self, value: bool) {
		self.can_go_back.store(value, Ordering::SeqCst);
	}

	pub fn set_can_go_forward(&self, value: bool) {
		self.can_go_forward.store(value, Ordering::SeqCst);
	}

	/// Makes navigation commands fail with [`Error::Host`].
	pub fn set_fail_commands(&self, value: bool) {
		self.fail_commands.store(value, Ordering::SeqCst);
	}

	/// Makes `execute` fail with [`Error::Host`].
	pub fn set_fail_execute(&self, value: bool) {
		self.fail_execute.store(value, Ordering::SeqCst);
	}

	/// Scripts passed to `execute`, in order.
	pub fn executed(&self) -> Vec<String> {
		self.executed.lock().clone()
	}

	/// Scripts passed to `evaluate_with_result`, in order.
	pub fn evaluated(&self) -> Vec<String> {
		self.evaluated.lock().clone()
	}

	/// Navigation commands received, in order.
	pub fn commands(&self) -> Vec<HostCommand> {
		self.commands.lock().clone()
	}

	/// Waits until an executed script contains `pattern` and returns it.
	pub async fn wait_for_executed(&self, pattern: &str) -> String {
		loop {
			let notified = self.changed.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			let found = self.executed.lock().iter().find(|s| s.contains(pattern)).cloned();
			if let Some(script) = found {
				return script;
			}
			notified.await;
		}
	}

	fn record_command(&self, command: HostCommand) -> Result<()> {
		if command != HostCommand::Stop && self.fail_commands.load(Ordering::SeqCst) {
			return Err(Error::Host(format!("mock refused {command:?}")));
		}
		self.commands.lock().push(command.clone());
		let hook = self.command_hook.lock().clone();
		if let Some(hook) = hook {
			hook(&command);
		}
		Ok(())
	}
}

/// Extracts the call id embedded in a promise-correlated evaluation script.
pub fn promise_call_id(script: &str) -> Option<String> {
	const MARKER: &str = "var callId = \"";
	let start = script.find(MARKER)? + MARKER.len();
	let len = script[start..].find('"')?;
	Some(script[start..start + len].to_string())
}

impl WebViewHost for MockHost {
	fn name(&self) -> &str {
		"mock"
	}

	fn evaluate_with_result(&self, script: &str, _timeout: Option<Duration>) -> HostFuture<'_, String> {
		self.evaluated.lock().push(script.to_string());
		let responder = self.responder.lock().clone();
		let delay = *self.eval_delay.lock();
		let script = script.to_string();
		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}
			match responder {
				Some(responder) => responder(&script),
				None => Ok("null".to_string()),
			}
		})
	}

	fn execute(&self, script: &str, _timeout: Option<Duration>) -> Result<()> {
		if self.fail_execute.load(Ordering::SeqCst) {
			return Err(Error::Host("mock refused script".into()));
		}
		self.executed.lock().push(script.to_string());
		self.changed.notify_waiters();
		let hook = self.execute_hook.lock().clone();
		if let Some(hook) = hook {
			hook(script);
		}
		Ok(())
	}

	fn stop_loading(&self) {
		let _ = self.record_command(HostCommand::Stop);
	}

	fn start_load(&self, url: &str) -> Result<()> {
		self.record_command(HostCommand::Load(url.to_string()))
	}

	fn start_load_html(&self, html: &str, base_url: &str) -> Result<()> {
		self.record_command(HostCommand::LoadHtml {
			html: html.to_string(),
			base_url: base_url.to_string(),
		})
	}

	fn reload(&self) -> Result<()> {
		self.record_command(HostCommand::Reload)
	}

	fn go_back(&self) -> Result<()> {
		self.record_command(HostCommand::Back)
	}

	fn go_forward(&self) -> Result<()> {
		self.record_command(HostCommand::Forward)
	}

	fn can_go_back(&self) -> bool {
		self.can_go_back.load(Ordering::SeqCst)
	}

	fn can_go_forward(&self) -> bool {
		self.can_go_forward.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_promise_call_id() {
		assert_eq!(promise_call_id("(function(){\n\tvar callId = \"12\";"), Some("12".into()));
		assert_eq!(promise_call_id("1 + 1"), None);
	}

	#[test]
	fn records_commands_and_refusals() {
		let host = MockHost::new();
		host.start_load("https://example.com").unwrap();
		host.set_fail_commands(true);
		host.stop_loading();
		assert!(host.reload().is_err());
		assert_eq!(host.commands(), vec![HostCommand::Load("https://example.com".into()), HostCommand::Stop]);
	}

	#[tokio::test]
	async fn responder_answers_evaluations() {
		let host = MockHost::new();
		assert_eq!(host.evaluate_with_result("x", None).await.unwrap(), "null");
		host.set_responder(|script| Ok(format!("\"{script}\"")));
		assert_eq!(host.evaluate_with_result("y", None).await.unwrap(), "\"y\"");
		assert_eq!(host.evaluated(), vec!["x", "y"]);
	}

	#[tokio::test]
	async fn waits_for_matching_script() {
		let host = Arc::new(MockHost::new());
		let waiter = {
			let host = Arc::clone(&host);
			tokio::spawn(async move { host.wait_for_executed("resolve").await })
		};
		tokio::task::yield_now().await;
		host.execute("other();", None).unwrap();
		host.execute("resolve(1);", None).unwrap();
		assert_eq!(waiter.await.unwrap(), "resolve(1);");
	}
}
