// Round trips across the bridge in both directions, driven through a mock host.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::setup;
use parking_lot::Mutex;
use xwv::testing::promise_call_id;
use xwv::{BridgeConfig, EvalOptions, Error, JsCall};

/// Plays the part of the injected proxy: what `Native.Inc(5)` sends to `OnJsCall`.
fn stub_call(object: &str, function: &str, args: serde_json::Value, seq: u32) -> JsCall {
	JsCall::new(
		object,
		function,
		serde_json::to_string(&args).unwrap(),
		format!("__xwvResolve_{seq}"),
		format!("__xwvReject_{seq}"),
	)
}

#[tokio::test]
async fn inbound_call_resolves_with_incremented_value() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind("Native", "Inc", |n: i64| n + 1).unwrap();

	view.handle_js_call(&stub_call("Native", "Inc", serde_json::json!([41]), 1));
	assert_eq!(host.executed(), vec!["__xwvResolve_1(42);"]);
}

#[tokio::test]
async fn bridge_script_registers_stub_and_call_resolves() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind("Native", "Inc", |n: i64| n + 1).unwrap();

	let script = view.bridge_script();
	assert!(script.contains(r#"rm("Native", "Inc");"#));
	assert!(script.contains("jsBr.OnJsCall(objectName, functionName, JSON.stringify(args || []), resolveName, rejectName)"));

	view.handle_js_call(&stub_call("Native", "Inc", serde_json::json!([5]), 3));
	assert_eq!(host.wait_for_executed("__xwvResolve_3").await, "__xwvResolve_3(6);");
}

#[tokio::test]
async fn async_binding_resolves_after_await() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind_async("Native", "Fetch", |key: String| async move {
		tokio::time::sleep(Duration::from_millis(5)).await;
		Ok::<_, std::io::Error>(format!("value-of-{key}"))
	})
	.unwrap();

	view.handle_js_call(&stub_call("Native", "Fetch", serde_json::json!(["a"]), 9));
	assert_eq!(host.wait_for_executed("__xwvResolve_9").await, r#"__xwvResolve_9("value-of-a");"#);
}

#[tokio::test]
async fn malformed_second_parameter_still_invokes() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind("Native", "Join", |a: String, b: i32| format!("{a}:{b}")).unwrap();

	view.handle_js_call(&JsCall::new("Native", "Join", r#"["x", "seven"]"#, "ok", "fail"));
	assert_eq!(host.executed(), vec![r#"ok("x:0");"#]);
}

#[tokio::test]
async fn unknown_binding_rejects_instead_of_failing() {
	let (host, view) = setup(BridgeConfig::default());
	view.handle_js_call(&stub_call("Native", "Missing", serde_json::json!([]), 2));
	let executed = host.executed();
	assert_eq!(executed.len(), 1);
	assert!(executed[0].starts_with("__xwvReject_2(\"No native method bound as 'Native.Missing'"));
}

#[tokio::test]
async fn native_calls_script_function_through_promise() {
	let (host, view) = setup(BridgeConfig::default());
	let page = view.clone();
	host.on_execute(move |script| {
		if !script.contains("return JsInc(5);") {
			return;
		}
		if let Some(id) = promise_call_id(script) {
			page.handle_js_promise_finished(&id, false, "6");
		}
	});

	let result: i64 = view.evaluate_promise("return JsInc(5);").await.unwrap();
	assert_eq!(result, 6);
	view.dispose();
}

#[tokio::test]
async fn promise_resolving_before_timeout_returns_value() {
	let (host, view) = setup(BridgeConfig::default());
	let page = view.clone();
	host.on_execute(move |script| {
		if let Some(id) = promise_call_id(script) {
			let page = page.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(10)).await;
				page.handle_js_promise_finished(&id, false, r#"{"done":true}"#);
			});
		}
	});

	let value = view
		.evaluate_json("return later();", EvalOptions::promise().with_timeout(Duration::from_millis(500)))
		.await
		.unwrap();
	assert_eq!(value, serde_json::json!({"done": true}));
	view.dispose();
}

#[tokio::test]
async fn promise_timeout_ignores_late_resolution() {
	let (host, view) = setup(BridgeConfig::default());
	let late_accepted = Arc::new(AtomicBool::new(true));
	let (done_tx, done_rx) = tokio::sync::oneshot::channel();
	let done_tx = parking_lot::Mutex::new(Some(done_tx));

	let page = view.clone();
	let accepted = Arc::clone(&late_accepted);
	host.on_execute(move |script| {
		let Some(id) = promise_call_id(script) else {
			return;
		};
		let page = page.clone();
		let accepted = Arc::clone(&accepted);
		let done = done_tx.lock().take();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(60)).await;
			accepted.store(page.handle_js_promise_finished(&id, false, "1"), Ordering::SeqCst);
			if let Some(done) = done {
				let _ = done.send(());
			}
		});
	});

	let err = view
		.evaluate_json("return later();", EvalOptions::promise().with_timeout(Duration::from_millis(10)))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::EvaluationTimeout { timeout_ms: 10 }));

	done_rx.await.unwrap();
	assert!(!late_accepted.load(Ordering::SeqCst));
	view.dispose();
}

#[tokio::test]
async fn direct_evaluation_reports_script_errors() {
	let (host, view) = setup(BridgeConfig::default());
	host.set_responder(|script| {
		if script.contains("throw") {
			Ok(r#"{"isError":true,"result":"Error: bad"}"#.to_string())
		} else {
			Ok(serde_json::to_string(r#"{"isError":false,"result":"[1,2,3]"}"#).unwrap())
		}
	});

	let numbers: Vec<u8> = view.evaluate("return [1, 2, 3];").await.unwrap();
	assert_eq!(numbers, vec![1, 2, 3]);

	let err = view.evaluate::<i32>("throw new Error('bad');").await.unwrap_err();
	assert!(matches!(err, Error::ScriptExecution(ref msg) if msg == "Error: bad"));
}

#[tokio::test]
async fn script_tracks_bindings_and_is_cached() {
	let (_host, view) = setup(BridgeConfig::default());
	let stubs = |script: &str| script.matches("\trm(").count();

	view.bind("Native", "A", || 1).unwrap();
	view.bind("Native", "B", || 2).unwrap();
	view.bind("Other", "A", || 3).unwrap();
	let first = view.bridge_script();
	assert_eq!(stubs(&first), 3);
	assert!(Arc::ptr_eq(&first, &view.bridge_script()));

	assert!(view.unbind("Native", "B"));
	assert!(!view.unbind("Native", "B"));
	let second = view.bridge_script();
	assert_eq!(stubs(&second), 2);
	assert!(!second.contains(r#""B""#));
	assert_ne!(&*first, &*second);

	view.unbind_all();
	assert_eq!(stubs(&view.bridge_script()), 0);
	assert!(view.bindings().is_empty());
}

#[tokio::test]
async fn attach_then_detect_bridge() {
	let (host, view) = setup(BridgeConfig::default());
	let attached = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&attached);
	host.set_responder(move |script| {
		if script.starts_with("(function NativeBridgeFullInit()") {
			flag.store(true, Ordering::SeqCst);
			Ok("null".into())
		} else {
			Ok(flag.load(Ordering::SeqCst).to_string())
		}
	});

	assert!(!view.is_bridge_attached().await.unwrap());
	view.attach_bridge().await.unwrap();
	assert!(view.is_bridge_attached().await.unwrap());
}

#[tokio::test]
async fn dispose_fails_outstanding_work() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind("Native", "Inc", |n: i64| n + 1).unwrap();

	let pending = {
		let view = view.clone();
		tokio::spawn(async move { view.evaluate_json("return never();", EvalOptions::promise()).await })
	};
	host.wait_for_executed("var callId").await;

	view.dispose();
	view.dispose();
	assert!(matches!(pending.await.unwrap(), Err(Error::Disposed)));
	assert!(view.is_disposed());
	assert!(view.bindings().is_empty());
	assert!(matches!(view.bind("Native", "Inc", |n: i64| n + 1), Err(Error::Disposed)));
	assert!(matches!(view.evaluate::<i64>("return 1;").await, Err(Error::Disposed)));

	let before = host.executed().len();
	view.handle_js_call(&stub_call("Native", "Inc", serde_json::json!([1]), 1));
	assert!(!view.handle_js_promise_finished("1", false, "1"));
	assert_eq!(host.executed().len(), before);
}

#[tokio::test]
async fn dispose_raises_disposing_then_disposed_once() {
	let (_host, view) = setup(BridgeConfig::default());
	let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();

	let _disposing = {
		let log = Arc::clone(&log);
		view.on_disposing(move || log.lock().push("disposing"))
	};
	let _disposed = {
		let log = Arc::clone(&log);
		view.on_disposed(move || log.lock().push("disposed"))
	};

	view.dispose();
	view.dispose();
	assert_eq!(*log.lock(), vec!["disposing", "disposed"]);
}

#[tokio::test]
async fn dropped_dispose_subscription_is_not_raised() {
	let (_host, view) = setup(BridgeConfig::default());
	let raised = Arc::new(AtomicBool::new(false));
	let sub = {
		let raised = Arc::clone(&raised);
		view.on_disposed(move || raised.store(true, Ordering::SeqCst))
	};
	drop(sub);

	view.dispose();
	assert!(!raised.load(Ordering::SeqCst));
}
