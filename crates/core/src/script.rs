//! Generation of the script injected into every page.
//!
//! The bridge script is a pure function of the registry contents. It installs:
//!
//! 1. `window.NativeBridge` with warning stubs for entry points the host did
//!    not register
//! 2. The call proxy `NativeBridge.ac(object, function, args)`, guarded by an
//!    init flag so re-injection keeps the existing proxy and its id counter
//! 3. One forwarding stub per bound method at `window[object][function]`
//! 4. The initialized flag checked by [`is_attached_script`]
//!
//! Stubs are registered outside the guard, so injecting again after binding
//! more methods adds the new stubs to a page that already has the proxy.

use std::sync::Arc;

use parking_lot::Mutex;
use xwv_protocol::consts::{
	BRIDGE_INIT_FUNCTION, BRIDGE_INIT_STARTED_FLAG, BRIDGE_INITIALIZED_FLAG, BRIDGE_OBJECT_NAME, CALL_PROXY_FUNCTION,
	ON_JS_CALL, ON_JS_PROMISE_FINISHED, REJECT_FUNCTION_PREFIX, RESOLVE_FUNCTION_PREFIX,
};
use xwv_runtime::CallId;

use crate::registry::{BindingKey, MethodRegistry};

const BRIDGE_PRELUDE: &str = r#"(function %INIT%() {
	var jsBr = window["%BRIDGE%"];
	if (!jsBr) {
		jsBr = {};
		window["%BRIDGE%"] = jsBr;
	}
	if (typeof jsBr.%ON_CALL% !== "function") {
		jsBr.%ON_CALL% = function () {
			console.warn("%BRIDGE%.%ON_CALL% was not registered by the native host.");
		};
	}
	if (typeof jsBr.%ON_FINISHED% !== "function") {
		jsBr.%ON_FINISHED% = function () {
			console.warn("%BRIDGE%.%ON_FINISHED% was not registered by the native host.");
		};
	}
	if (!window.%INIT_STARTED%) {
		window.%INIT_STARTED% = true;
		var seq = 0;
		jsBr.%PROXY% = function (objectName, functionName, args) {
			seq += 1;
			var resolveName = "%RESOLVE%" + seq;
			var rejectName = "%REJECT%" + seq;
			return new Promise(function (resolve, reject) {
				var cleanup = function () {
					delete window[resolveName];
					delete window[rejectName];
				};
				window[resolveName] = function (value) {
					cleanup();
					resolve(value);
				};
				window[rejectName] = function (reason) {
					cleanup();
					reject(reason);
				};
				try {
					jsBr.%ON_CALL%(objectName, functionName, JSON.stringify(args || []), resolveName, rejectName);
				} catch (e) {
					cleanup();
					reject(e);
				}
			});
		};
	}
	var rm = function (objectName, functionName) {
		var target = window[objectName];
		if (!target) {
			target = {};
			window[objectName] = target;
		}
		target[functionName] = function () {
			return jsBr.%PROXY%(objectName, functionName, Array.prototype.slice.call(arguments));
		};
	};
"#;

const BRIDGE_EPILOGUE: &str = "\twindow.%INITIALIZED% = true;\n})();\n";

fn fill(template: &str) -> String {
	template
		.replace("%INIT_STARTED%", BRIDGE_INIT_STARTED_FLAG)
		.replace("%INITIALIZED%", BRIDGE_INITIALIZED_FLAG)
		.replace("%INIT%", BRIDGE_INIT_FUNCTION)
		.replace("%BRIDGE%", BRIDGE_OBJECT_NAME)
		.replace("%ON_CALL%", ON_JS_CALL)
		.replace("%ON_FINISHED%", ON_JS_PROMISE_FINISHED)
		.replace("%PROXY%", CALL_PROXY_FUNCTION)
		.replace("%RESOLVE%", RESOLVE_FUNCTION_PREFIX)
		.replace("%REJECT%", REJECT_FUNCTION_PREFIX)
}

/// Builds the bridge script for `keys`.
pub fn synthesize(keys: &[BindingKey]) -> String {
	let mut script = fill(BRIDGE_PRELUDE);
	for key in keys {
		script.push_str("\trm(");
		script.push_str(&js_string_literal(&key.object));
		script.push_str(", ");
		script.push_str(&js_string_literal(&key.function));
		script.push_str(");\n");
	}
	script.push_str(&fill(BRIDGE_EPILOGUE));
	script
}

/// Script whose completion value tells whether the bridge is installed.
pub fn is_attached_script() -> String {
	format!("window[\"{BRIDGE_INITIALIZED_FLAG}\"] === true;")
}

/// Caches the bridge script until the registry changes.
pub struct ScriptSynthesizer {
	registry: Arc<MethodRegistry>,
	cache: Mutex<Option<(u64, Arc<str>)>>,
}

impl ScriptSynthesizer {
	pub fn new(registry: Arc<MethodRegistry>) -> Self {
		Self {
			registry,
			cache: Mutex::new(None),
		}
	}

	/// Returns the bridge script for the current registry contents.
	///
	/// Consecutive calls without an intervening mutation return the same
	/// allocation.
	pub fn script(&self) -> Arc<str> {
		let generation = self.registry.generation();
		let mut cache = self.cache.lock();
		if let Some((cached_generation, script)) = cache.as_ref() {
			if *cached_generation == generation {
				return Arc::clone(script);
			}
		}

		let script: Arc<str> = Arc::from(synthesize(&self.registry.keys()));
		tracing::debug!(generation, methods = self.registry.len(), "Regenerated bridge script");
		*cache = Some((generation, Arc::clone(&script)));
		script
	}
}

/// Encodes `text` as a double-quoted script string literal.
///
/// JSON string syntax is valid script syntax except for the U+2028 and
/// U+2029 separators, which older engines treat as line terminators.
pub fn js_string_literal(text: &str) -> String {
	let json = serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""));
	json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

/// Whether `name` can be called as a plain global function.
pub fn is_js_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Wraps a function body as an expression evaluating to its return value.
///
/// With `unsafe_eval` the body is spliced in directly. Otherwise it is passed
/// to `window.eval` as a string literal, so a syntax error in the body is
/// raised as a catchable exception instead of breaking the wrapper.
pub fn eval_expression(body: &str, unsafe_eval: bool) -> String {
	let function = format!("(function(){{\n{body}\n}})()");
	if unsafe_eval {
		function
	} else {
		format!("window.eval({})", js_string_literal(&function))
	}
}

/// Wraps `body` for direct mode.
///
/// The completion value is a JSON `{isError, result}` envelope where `result`
/// is the `JSON.stringify` text of the body's return value.
pub fn direct_eval_script(body: &str, unsafe_eval: bool) -> String {
	format!(
		r#"(function(){{
	try {{
		var evalRes = {expr};
		return JSON.stringify({{ isError: false, result: evalRes === undefined ? null : JSON.stringify(evalRes) }});
	}} catch (ex) {{
		return JSON.stringify({{ isError: true, result: String(ex) }});
	}}
}})();"#,
		expr = eval_expression(body, unsafe_eval)
	)
}

/// Wraps `body` for promise-correlated mode.
///
/// The wrapper reports back through `OnJsPromiseFinished` with `call_id`,
/// immediately for plain values and on settlement for thenables.
pub fn promise_eval_script(call_id: CallId, body: &str, unsafe_eval: bool) -> String {
	format!(
		r#"(function(){{
	var callId = {id};
	var report = function (isError, text) {{
		try {{
			window["{bridge}"].{finished}(callId, isError, text);
		}} catch (e) {{
			console.warn("Unable to report evaluation " + callId + ": " + String(e));
		}}
	}};
	var serialize = function (value) {{
		return value === undefined ? null : JSON.stringify(value);
	}};
	try {{
		var evalRes = {expr};
		if (evalRes && typeof evalRes.then === "function") {{
			evalRes.then(
				function (value) {{ report(false, serialize(value)); }},
				function (err) {{ report(true, String(err)); }}
			);
		}} else {{
			report(false, serialize(evalRes));
		}}
	}} catch (e) {{
		report(true, 'Evaluation error: ' + String(e));
	}}
}})();"#,
		id = call_id.to_js_literal(),
		bridge = BRIDGE_OBJECT_NAME,
		finished = ON_JS_PROMISE_FINISHED,
		expr = eval_expression(body, unsafe_eval)
	)
}
