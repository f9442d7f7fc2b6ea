//! Payloads flowing from the host into the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call from the hosted runtime into a bound native method.
///
/// Produced by the injected proxy: the arguments arrive as one JSON-encoded
/// array and the callbacks are the names of two globals that exist in the
/// page for this call only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsCall {
	/// Script-side namespace object (e.g. `"Native"`).
	pub object: String,
	/// Function name on that object (e.g. `"Inc"`).
	pub function: String,
	/// JSON-encoded argument array.
	pub params_json: String,
	/// Global resolve function to call with the JSON result.
	pub resolve: String,
	/// Global reject function to call with the error message.
	pub reject: String,
}

impl JsCall {
	/// Creates a call description.
	pub fn new(
		object: impl Into<String>,
		function: impl Into<String>,
		params_json: impl Into<String>,
		resolve: impl Into<String>,
		reject: impl Into<String>,
	) -> Self {
		Self {
			object: object.into(),
			function: function.into(),
			params_json: params_json.into(),
			resolve: resolve.into(),
			reject: reject.into(),
		}
	}

	/// Decodes the argument array.
	///
	/// A lone non-array value is treated as a single argument.
	pub fn arguments(&self) -> serde_json::Result<Vec<Value>> {
		if self.params_json.trim().is_empty() {
			return Ok(Vec::new());
		}
		match serde_json::from_str::<Value>(&self.params_json)? {
			Value::Array(items) => Ok(items),
			Value::Null => Ok(Vec::new()),
			other => Ok(vec![other]),
		}
	}
}

/// Reported by the host when the main frame begins loading a URL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadStarted {
	pub url: String,
}

impl LoadStarted {
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}
}

/// Reported by the host when a main-frame load ends, successfully or not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFinished {
	/// URL that finished (or failed) loading.
	pub url: String,
	/// Whether the load failed.
	#[serde(default)]
	pub is_error: bool,
	/// Host-specific error code name (e.g. `"NameNotResolved"`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_type: Option<String>,
	/// Human-readable error description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_description: Option<String>,
	/// Whether the load was aborted before completion.
	#[serde(default)]
	pub was_cancelled: bool,
}

impl LoadFinished {
	/// A successful load of `url`.
	pub fn ok(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Self::default()
		}
	}

	/// A failed load of `url`.
	pub fn error(url: impl Into<String>, error_type: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			is_error: true,
			error_type: Some(error_type.into()),
			error_description: Some(description.into()),
			was_cancelled: false,
		}
	}

	/// An aborted load of `url`.
	pub fn cancelled(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			was_cancelled: true,
			..Self::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn js_call_decodes_array_arguments() {
		let call = JsCall::new("Native", "Add", "[1, \"two\", null]", "rs", "rj");
		let args = call.arguments().unwrap();
		assert_eq!(args.len(), 3);
		assert_eq!(args[1], serde_json::json!("two"));
	}

	#[test]
	fn js_call_wraps_scalar_argument() {
		let call = JsCall::new("Native", "Inc", "41", "rs", "rj");
		assert_eq!(call.arguments().unwrap(), vec![serde_json::json!(41)]);
	}

	#[test]
	fn js_call_empty_params_is_empty_array() {
		let call = JsCall::new("Native", "Ping", "", "rs", "rj");
		assert!(call.arguments().unwrap().is_empty());
	}

	#[test]
	fn js_call_rejects_malformed_json() {
		let call = JsCall::new("Native", "Inc", "[1,", "rs", "rj");
		assert!(call.arguments().is_err());
	}

	#[test]
	fn load_finished_deserializes_with_defaults() {
		let ev: LoadFinished = serde_json::from_str(r#"{"url":"https://example.com"}"#).unwrap();
		assert_eq!(ev, LoadFinished::ok("https://example.com"));
	}

	#[test]
	fn load_finished_error_serializes_camel_case() {
		let ev = LoadFinished::error("https://bad.invalid", "NameNotResolved", "DNS lookup failed");
		let json = serde_json::to_string(&ev).unwrap();
		assert!(json.contains(r#""isError":true"#));
		assert!(json.contains(r#""errorDescription":"DNS lookup failed""#));
	}
}
