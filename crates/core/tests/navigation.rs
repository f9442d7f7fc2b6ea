// Navigation lifecycle through the public facade, driven through a mock host.

mod common;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common::setup;
use parking_lot::Mutex;
use xwv::testing::HostCommand;
use xwv::{BridgeConfig, Error, LoadFinished, LoadStarted, NavigationFuture, XWebView};

#[tokio::test]
async fn second_navigation_cancels_first() {
	let (_host, view) = setup(BridgeConfig::default());
	let a = view.load_url("https://a.example");
	let b = view.load_url("https://b.example");

	view.handle_load_finished(LoadFinished::ok("https://b.example"));

	let err = a.await.unwrap_err();
	assert!(matches!(err, Error::NavigationCancelled(_)), "unexpected: {err:?}");
	assert_eq!(b.await.unwrap().url, "https://b.example");
}

#[tokio::test]
async fn late_completion_of_superseded_load_does_not_complete_it() {
	let (_host, view) = setup(BridgeConfig::default());
	let a = view.load_url("https://a.example");
	let _b = view.load_url("https://b.example");

	// The host reports A finishing after B was issued.
	view.handle_load_finished(LoadFinished::ok("https://a.example"));
	assert!(a.await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn idle_wait_creates_nothing() {
	let (host, view) = setup(BridgeConfig::default());
	assert!(!view.is_busy());
	assert_eq!(view.wait_while_busy().await.unwrap(), None);
	assert!(host.commands().is_empty());
	assert!(host.executed().is_empty());
}

#[tokio::test]
async fn load_stops_previous_then_issues_command() {
	let (host, view) = setup(BridgeConfig::default());
	let nav = view.load_html("<h1>hi</h1>", None);
	assert_eq!(
		host.commands(),
		vec![
			HostCommand::Stop,
			HostCommand::LoadHtml {
				html: "<h1>hi</h1>".into(),
				base_url: "about:blank".into(),
			},
		]
	);
	view.handle_load_finished(LoadFinished::ok("about:blank"));
	nav.await.unwrap();
}

#[tokio::test]
async fn bridge_is_injected_before_navigation_completes() {
	let (host, view) = setup(BridgeConfig::default());
	view.bind("Native", "Inc", |n: i64| n + 1).unwrap();

	let nav = view.load_url("https://example.com");
	assert!(host.executed().is_empty());
	view.handle_load_finished(LoadFinished::ok("https://example.com"));

	let executed = host.executed();
	assert_eq!(executed.len(), 1);
	assert_eq!(executed[0], &*view.bridge_script());
	assert_eq!(nav.await.unwrap().url, "https://example.com");
	assert_eq!(view.url(), "https://example.com");
}

#[tokio::test]
async fn failed_load_skips_injection() {
	let (host, view) = setup(BridgeConfig::default());
	let nav = view.load_url("https://bad.invalid");
	view.handle_load_finished(LoadFinished::error("https://bad.invalid", "NameNotResolved", "DNS lookup failed"));

	let err = nav.await.unwrap_err();
	assert_eq!(
		err.to_string(),
		"Load exception for 'https://bad.invalid': DNS lookup failed (NameNotResolved)"
	);
	assert!(host.executed().is_empty());
}

#[tokio::test]
async fn auto_attach_can_be_disabled() {
	let (host, view) = setup(BridgeConfig::default().with_auto_attach_bridge(false));
	let nav = view.reload();
	assert_eq!(host.commands().last(), Some(&HostCommand::Reload));
	view.handle_load_finished(LoadFinished::ok("https://example.com"));
	nav.await.unwrap();
	assert!(host.executed().is_empty());
}

#[tokio::test]
async fn host_initiated_load_can_be_awaited_or_vetoed() {
	let (host, view) = setup(BridgeConfig::default());
	let _veto = view.on_load_started(|req| {
		if req.url.as_deref() == Some("https://ads.example") {
			req.cancel = true;
		}
	});

	assert!(!view.handle_load_started(&LoadStarted::new("https://ads.example")));
	assert!(!view.is_busy());

	assert!(view.handle_load_started(&LoadStarted::new("https://link.example")));
	let waiter = view.wait_while_busy();
	view.handle_load_finished(LoadFinished::ok("https://link.example"));
	assert_eq!(waiter.await.unwrap().map(|e| e.url).as_deref(), Some("https://link.example"));
	assert!(!host.commands().contains(&HostCommand::Stop));
}

#[tokio::test]
async fn load_started_handler_can_redirect_during_host_command() {
	let (host, view) = setup(BridgeConfig::default());
	let reporter: Arc<OnceLock<XWebView>> = Arc::default();
	{
		let reporter = Arc::clone(&reporter);
		host.on_command(move |command| {
			if let (HostCommand::Load(url), Some(view)) = (command, reporter.get()) {
				view.handle_load_started(&LoadStarted::new(url.clone()));
			}
		});
	}
	let _ = reporter.set(view.clone());

	let redirected: Arc<Mutex<Option<NavigationFuture>>> = Arc::default();
	let _redirect = {
		let redirect_view = view.clone();
		let redirected = Arc::clone(&redirected);
		view.on_load_started(move |req| {
			if req.url.as_deref() != Some("https://blocked.example") {
				return;
			}
			req.cancel = true;
			let fut = redirect_view.load_url("https://safe.example");
			*redirected.lock() = Some(fut);
		})
	};

	let blocked = view.load_url("https://blocked.example");
	assert!(blocked.await.unwrap_err().is_cancelled());
	assert_eq!(
		host.commands().last(),
		Some(&HostCommand::Load("https://safe.example".into()))
	);

	let redirect = redirected.lock().take().expect("redirect started");
	view.handle_load_finished(LoadFinished::ok("https://safe.example"));
	assert_eq!(redirect.await.unwrap().url, "https://safe.example");
	assert_eq!(view.url(), "https://safe.example");
	view.dispose();
}

#[tokio::test]
async fn history_navigation_respects_capability_and_handlers() {
	let (host, view) = setup(BridgeConfig::default());
	assert!(view.go_back().await.unwrap_err().is_cancelled());
	assert!(host.commands().is_empty());

	host.set_can_go_back(true);
	let nav = view.go_back();
	assert_eq!(host.commands().last(), Some(&HostCommand::Back));
	view.handle_load_finished(LoadFinished::ok("https://prev.example"));
	nav.await.unwrap();

	host.set_can_go_forward(true);
	let _sub = view.on_go_forward_requested(|req| req.cancel = true);
	let err = view.go_forward().await.unwrap_err();
	assert!(matches!(err, Error::NavigationCancelled(ref msg) if msg == "go forward cancelled"));
	assert_ne!(host.commands().last(), Some(&HostCommand::Forward));
}

#[tokio::test]
async fn load_finished_events_are_broadcast() {
	let (_host, view) = setup(BridgeConfig::default());
	let mut events = view.load_finished_events();
	let nav = view.load_url("https://example.com");
	view.handle_load_finished(LoadFinished::ok("https://example.com"));
	nav.await.unwrap();

	let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
	assert_eq!(event.url, "https://example.com");
}

#[tokio::test]
async fn navigation_timeout_from_config() {
	let (_host, view) = setup(BridgeConfig::default().with_navigation_timeout(Duration::from_millis(15)));
	let err = view.load_url("https://hang.example").await.unwrap_err();
	assert!(err.is_timeout());
}

#[tokio::test]
async fn dispose_fails_navigation_and_ignores_host_events() {
	let (host, view) = setup(BridgeConfig::default());
	let nav = view.load_url("https://example.com");
	let waiter = view.wait_while_busy();

	view.dispose();
	assert!(matches!(nav.await, Err(Error::Disposed)));
	assert!(matches!(waiter.await, Err(Error::Disposed)));

	view.handle_load_finished(LoadFinished::ok("https://example.com"));
	assert!(host.executed().is_empty());
	assert!(!view.handle_load_started(&LoadStarted::new("https://example.com")));
	assert!(matches!(view.load_url("https://other.example").await, Err(Error::Disposed)));
}
