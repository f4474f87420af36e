//! Core functionality module
//!
//! Data model and business rules of the capture workflow, independent of
//! any image source or presentation layer.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases
//! - `session` - Capture session state and phase rules
//! - `report` - Analysis result payload and report view model
//! - `history` - Scan history and dashboard figures

pub mod config;
pub mod error;
pub mod history;
pub mod report;
pub mod session;
