#![allow(dead_code)]

use std::sync::{Arc, Once};

use tracing_subscriber::EnvFilter;
use xwv::testing::MockHost;
use xwv::{BridgeConfig, XWebView};

static LOGGING: Once = Once::new();

/// Installs a test-writer subscriber honoring `RUST_LOG` (default `warn,xwv=debug`).
pub fn init_logging() {
	LOGGING.call_once(|| {
		let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,xwv=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(env_filter)
			.with_test_writer()
			.with_target(true)
			.compact()
			.try_init();
	});
}

pub fn setup(config: BridgeConfig) -> (Arc<MockHost>, XWebView) {
	init_logging();
	let host = Arc::new(MockHost::new());
	let view = XWebView::new(host.clone(), config);
	(host, view)
}
