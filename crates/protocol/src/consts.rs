//! Global names shared by the script synthesizer and the inbound dispatcher.
//!
//! Renaming any of these is a breaking wire-format change: pages that were
//! injected with an older script would call entry points that no longer exist.

/// Global object the host registers its native entry points on.
pub const BRIDGE_OBJECT_NAME: &str = "NativeBridge";

/// Entry point invoked by the script proxy for every script → native call.
///
/// Signature on the script side:
/// `OnJsCall(objectName, functionName, parametersJson, resolveName, rejectName)`.
pub const ON_JS_CALL: &str = "OnJsCall";

/// Entry point reporting completion of a promise-correlated evaluation.
///
/// Signature on the script side: `OnJsPromiseFinished(callId, isError, resultJson)`.
pub const ON_JS_PROMISE_FINISHED: &str = "OnJsPromiseFinished";

/// Set once the full bridge (proxy and stubs) has been installed on a page.
pub const BRIDGE_INITIALIZED_FLAG: &str = "NativeBridgeInitialized";

/// Set as soon as initialization begins; guards against double injection.
pub const BRIDGE_INIT_STARTED_FLAG: &str = "NativeBridgeInitStarted";

/// Name of the function wrapping the whole initialization script.
pub const BRIDGE_INIT_FUNCTION: &str = "NativeBridgeFullInit";

/// Prefix of the per-call resolve functions installed by the proxy.
pub const RESOLVE_FUNCTION_PREFIX: &str = "__xwvResolve_";

/// Prefix of the per-call reject functions installed by the proxy.
pub const REJECT_FUNCTION_PREFIX: &str = "__xwvReject_";

/// Name of the script-side call proxy.
pub const CALL_PROXY_FUNCTION: &str = "ac";
