//! # HYVA Client
//!
//! Client-side pipeline for the hypothesis-validation event stream:
//! - `parser` - extracts statistical findings from progress message text
//! - `state` - lifecycle state machine over server status labels
//! - `accumulator` - folds findings and the terminal payload into the
//!   canonical `ValidationResult`
//! - `fallback` - deterministic local approximation used when the live
//!   stream cannot be established or breaks
//! - `sse` - incremental SSE frame decoding
//! - `session` - owns the live transport and drives the fold loop
//! - `controller` - the `start`/`clear`/snapshot surface consumed by
//!   rendering and persistence layers

pub mod accumulator;
pub mod controller;
pub mod fallback;
pub mod parser;
pub mod session;
pub mod sse;
pub mod state;

pub use controller::{ControllerSnapshot, StatusSnapshot, ValidationController};
pub use session::SessionHandle;
