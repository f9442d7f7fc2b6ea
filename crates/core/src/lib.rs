//! xwv: bidirectional native ⇄ script bridge for embedded browser views.
//!
//! Lets native code and the script running in a browser view call each other
//! as async functions, on top of the narrow "run script, get a string back"
//! primitive browser controls expose, and turns unordered load callbacks into
//! one awaitable future per navigation.
//!
//! # Architecture
//!
//! - [`MethodRegistry`] - native methods callable from the page
//! - [`ScriptSynthesizer`] - the injected bridge script, cached per registry generation
//! - [`InboundDispatcher`] - page → native calls, settled through resolve/reject callbacks
//! - [`ScriptEvaluator`] - native → page evaluation, direct or promise-correlated
//! - [`NavigationCoordinator`] - at most one in-flight navigation future
//! - [`XWebView`] - owns all of the above for one browser view
//!
//! The browser control itself is abstracted by [`WebViewHost`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xwv::{BridgeConfig, XWebView};
//!
//! async fn run(host: Arc<dyn xwv::WebViewHost>) -> xwv::Result<()> {
//!     let view = XWebView::new(host, BridgeConfig::default());
//!     view.bind("Native", "Inc", |n: i64| n + 1)?;
//!
//!     // The bridge is injected when the load finishes.
//!     view.load_url("https://example.com").await?;
//!
//!     // Page code can now `await Native.Inc(5)`.
//!     let title: String = view.evaluate("return document.title;").await?;
//!     println!("{title}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod evaluator;
pub mod events;
pub mod handlers;
pub mod navigation;
pub mod registry;
pub mod script;
pub mod testing;
mod webview;

pub use config::BridgeConfig;
pub use dispatcher::InboundDispatcher;
pub use evaluator::{EvalOptions, ScriptEvaluator};
pub use events::EventStream;
pub use handlers::Subscription;
pub use navigation::{NavigationCoordinator, NavigationFuture, NavigationKind, NavigationRequest};
pub use registry::{
	AsyncHandler, BindingKey, BoundMethod, BoundMethodDescriptor, Invocation, MethodRegistry, SyncHandler,
};
pub use script::ScriptSynthesizer;
pub use webview::XWebView;
pub use xwv_protocol as protocol;
pub use xwv_protocol::{ExecutionResult, JsCall, LoadFinished, LoadStarted};
pub use xwv_runtime as runtime;
pub use xwv_runtime::{Error, HostFuture, Result, WebViewHost};
