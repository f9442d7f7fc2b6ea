//! The `{isError, result}` envelope produced by wrapped evaluations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a script evaluation as reported by the hosted runtime.
///
/// On success `result` holds the `JSON.stringify` text of the value (absent
/// when the script produced `undefined`). On failure it holds the error
/// message. The script side is not consistent about casing across host
/// generations, so both `isError`/`result` and `IsError`/`Result` are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
	#[serde(rename = "isError", alias = "IsError", default)]
	pub is_error: bool,
	#[serde(alias = "Result", default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
}

impl ExecutionResult {
	/// Successful result carrying the JSON text of a value.
	pub fn success(json: impl Into<String>) -> Self {
		Self {
			is_error: false,
			result: Some(Value::String(json.into())),
		}
	}

	/// Failed result carrying an error message.
	pub fn failure(message: impl Into<String>) -> Self {
		Self {
			is_error: true,
			result: Some(Value::String(message.into())),
		}
	}

	/// Builds a result from the arguments of an `OnJsPromiseFinished` call.
	pub fn from_completion(is_error: bool, result_json: &str) -> Self {
		if is_error { Self::failure(result_json) } else { Self::success(result_json) }
	}

	/// Parses the string a host returned from `evaluate_with_result`.
	///
	/// Hosts stringify the completion value themselves, so the envelope may
	/// arrive either as a JSON object or as a JSON string containing one. A
	/// bare `null` is read as a successful evaluation without a value.
	pub fn from_host_output(output: &str) -> serde_json::Result<Self> {
		match serde_json::from_str::<Value>(output)? {
			Value::Null => Ok(Self {
				is_error: false,
				result: None,
			}),
			Value::String(inner) => serde_json::from_str(&inner),
			value => serde_json::from_value(value),
		}
	}

	/// Returns the decoded value of a successful evaluation.
	///
	/// `undefined`/`null` and empty text decode to [`Value::Null`]. Text that is
	/// not valid JSON is returned verbatim as a string.
	pub fn value(&self) -> Value {
		match &self.result {
			None | Some(Value::Null) => Value::Null,
			Some(Value::String(text)) if text.trim().is_empty() => Value::Null,
			Some(Value::String(text)) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())),
			Some(other) => other.clone(),
		}
	}

	/// Returns the error message of a failed evaluation.
	pub fn message(&self) -> String {
		match &self.result {
			None | Some(Value::Null) => "unknown script error".to_string(),
			Some(Value::String(text)) => text.clone(),
			Some(other) => other.to_string(),
		}
	}

	/// Serializes the envelope to a JSON string.
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).unwrap_or_else(|_| r#"{"isError":true}"#.to_string())
	}
}
