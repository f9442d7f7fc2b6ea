//! Runtime plumbing underneath the script bridge.
//!
//! - **Host capability**: [`WebViewHost`], the narrow surface a browser
//!   embedding must provide, and [`HostSlot`], which lets the bridge drop its
//!   reference to the host at disposal
//! - **Correlation**: [`CorrelationTable`] matching promise completions to the
//!   native futures awaiting them
//! - **Errors**: the shared [`Error`] taxonomy
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │     xwv      │  Registry, dispatcher, evaluator, navigation
//! └──────┬───────┘
//!        │ calls through WebViewHost
//! ┌──────▼───────┐
//! │ xwv-runtime  │  This crate
//! │  ┌────────┐  │
//! │  │ Host   │  │  Capability trait + slot
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Corr   │  │  Call id → pending result
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod correlation;
pub mod error;
pub mod host;

pub use correlation::{CallId, CorrelationTable, PendingCall};
pub use error::{Error, Result};
pub use host::{HostFuture, HostSlot, WebViewHost};
