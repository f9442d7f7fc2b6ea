//! Wire types shared by the native bridge and the script it injects.
//!
//! Everything in this crate crosses the native ⇄ script boundary as plain
//! strings, so the types here are the single source of truth for the
//! format:
//!
//! - [`consts`] - well-known global names used by the injected script
//! - [`ExecutionResult`] - the `{isError, result}` envelope returned by evaluations
//! - [`JsCall`] - a call originating from the hosted runtime
//! - [`LoadStarted`] / [`LoadFinished`] - navigation lifecycle payloads reported by the host

pub mod consts;
pub mod envelope;
pub mod messages;

pub use envelope::ExecutionResult;
pub use messages::{JsCall, LoadFinished, LoadStarted};
