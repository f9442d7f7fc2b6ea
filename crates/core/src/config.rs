//! Bridge configuration: [`BridgeConfig`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xwv_runtime::Result;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tunables for one [`XWebView`](crate::XWebView).
///
/// Loaded from JSON with every field optional:
///
/// ```json
/// { "defaultEvalTimeoutMs": 5000, "unsafeEval": false, "autoAttachBridge": true }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
	/// Timeout applied to evaluations that do not specify one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_eval_timeout_ms: Option<u64>,
	/// Fails navigation waiters if the host never reports completion.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub navigation_timeout_ms: Option<u64>,
	/// Splice evaluated bodies directly instead of routing through `window.eval`.
	pub unsafe_eval: bool,
	/// Re-inject the bridge script after every successful load.
	pub auto_attach_bridge: bool,
	/// Capacity of the load-finished broadcast channel.
	pub event_capacity: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			default_eval_timeout_ms: None,
			navigation_timeout_ms: None,
			unsafe_eval: false,
			auto_attach_bridge: true,
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}
}

impl BridgeConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a config from JSON text.
	pub fn from_json_str(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	/// Reads and parses a JSON config file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let text = std::fs::read_to_string(path.as_ref())?;
		Self::from_json_str(&text)
	}

	pub fn default_eval_timeout(&self) -> Option<Duration> {
		self.default_eval_timeout_ms.map(Duration::from_millis)
	}

	pub fn navigation_timeout(&self) -> Option<Duration> {
		self.navigation_timeout_ms.map(Duration::from_millis)
	}

	pub fn with_default_eval_timeout(mut self, timeout: Duration) -> Self {
		self.default_eval_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}

	pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
		self.navigation_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}

	pub fn with_unsafe_eval(mut self, unsafe_eval: bool) -> Self {
		self.unsafe_eval = unsafe_eval;
		self
	}

	pub fn with_auto_attach_bridge(mut self, auto_attach: bool) -> Self {
		self.auto_attach_bridge = auto_attach;
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;
	use xwv_runtime::Error;

	use super::*;

	#[test]
	fn defaults() {
		let config = BridgeConfig::default();
		assert!(config.auto_attach_bridge);
		assert!(!config.unsafe_eval);
		assert_eq!(config.event_capacity, 256);
		assert_eq!(config.default_eval_timeout(), None);
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let config = BridgeConfig::from_json_str(r#"{"defaultEvalTimeoutMs": 1500, "unsafeEval": true}"#).unwrap();
		assert_eq!(config.default_eval_timeout(), Some(Duration::from_millis(1500)));
		assert!(config.unsafe_eval);
		assert!(config.auto_attach_bridge);
		assert_eq!(config.navigation_timeout(), None);
	}

	#[test]
	fn builders_round_trip_through_json() {
		let config = BridgeConfig::new()
			.with_navigation_timeout(Duration::from_secs(30))
			.with_auto_attach_bridge(false)
			.with_event_capacity(8);
		let json = serde_json::to_string(&config).unwrap();
		assert!(json.contains(r#""navigationTimeoutMs":30000"#));
		assert!(!json.contains("defaultEvalTimeoutMs"));
		assert_eq!(BridgeConfig::from_json_str(&json).unwrap(), config);
	}

	#[test]
	fn loads_from_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("bridge.json");
		fs::write(&path, r#"{ "autoAttachBridge": false }"#).unwrap();

		let config = BridgeConfig::from_path(&path).unwrap();
		assert!(!config.auto_attach_bridge);
	}

	#[test]
	fn missing_file_is_io_error() {
		let err = BridgeConfig::from_path("/definitely/missing/bridge.json").unwrap_err();
		assert!(matches!(err, Error::Io(_)));
	}

	#[test]
	fn invalid_json_is_json_error() {
		let err = BridgeConfig::from_json_str("{ nope").unwrap_err();
		assert!(matches!(err, Error::Json(_)));
	}
}
