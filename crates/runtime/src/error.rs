//! Error types for the script bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while calling across the native ⇄ script boundary
/// or while waiting on navigation.
#[derive(Debug, Error)]
pub enum Error {
	/// Inbound call referenced an identity nothing is bound to.
	#[error("No native method bound as '{object}.{function}'")]
	UnknownBinding { object: String, function: String },

	/// Call arguments could not be decoded at all.
	#[error("Argument coercion failed: {0}")]
	ArgumentCoercion(String),

	/// The script threw, or a promise rejected.
	#[error("Error in js: '{0}'")]
	ScriptExecution(String),

	/// The native-side watchdog elapsed before the script reported back.
	#[error("Js evaluation timeout after {timeout_ms}ms")]
	EvaluationTimeout { timeout_ms: u64 },

	/// The navigation was superseded, vetoed, or aborted.
	#[error("Navigation cancelled: {0}")]
	NavigationCancelled(String),

	/// The host reported a load error.
	#[error("Load exception for '{url}': {description}{}", error_type.as_ref().map(|t| format!(" ({t})")).unwrap_or_default())]
	NavigationFailed {
		url: String,
		error_type: Option<String>,
		description: String,
	},

	/// The host never reported completion of a navigation.
	#[error("Navigation timeout after {timeout_ms}ms")]
	NavigationTimeout { timeout_ms: u64 },

	/// A bound native method failed or panicked.
	#[error("Native invocation failed: {0}")]
	Invocation(String),

	/// The browser host refused or failed an operation.
	#[error("Host error: {0}")]
	Host(String),

	/// The bridge was disposed while the operation was pending.
	#[error("Bridge disposed")]
	Disposed,

	/// Invalid argument provided to method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::EvaluationTimeout { .. } | Error::NavigationTimeout { .. })
	}

	/// Returns true if the operation was cancelled rather than failed.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::NavigationCancelled(_) | Error::Disposed)
	}

	/// Returns true if the error originated inside the hosted runtime.
	pub fn is_script_error(&self) -> bool {
		matches!(self, Error::ScriptExecution(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timeout_predicates() {
		assert!(Error::EvaluationTimeout { timeout_ms: 10 }.is_timeout());
		assert!(Error::NavigationTimeout { timeout_ms: 10 }.is_timeout());
		assert!(!Error::Disposed.is_timeout());
	}

	#[test]
	fn cancellation_predicates() {
		assert!(Error::NavigationCancelled("superseded".into()).is_cancelled());
		assert!(Error::Disposed.is_cancelled());
		assert!(!Error::ScriptExecution("x".into()).is_cancelled());
	}

	#[test]
	fn navigation_failed_message_includes_type() {
		let err = Error::NavigationFailed {
			url: "https://bad.invalid".into(),
			error_type: Some("NameNotResolved".into()),
			description: "DNS lookup failed".into(),
		};
		assert_eq!(err.to_string(), "Load exception for 'https://bad.invalid': DNS lookup failed (NameNotResolved)");
	}

	#[test]
	fn unknown_binding_message() {
		let err = Error::UnknownBinding {
			object: "Native".into(),
			function: "Missing".into(),
		};
		assert_eq!(err.to_string(), "No native method bound as 'Native.Missing'");
	}
}
