//! # HYVA Common Library
//!
//! Shared code for the HYVA hypothesis-validation client:
//! - Wire event types for the validation event stream
//! - Result/domain types (findings, evidence, validation results)
//! - Terminal payload normalization
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod types;

pub use error::{Error, Result};
