//! skinscan Library
//!
//! Drives a skin photo from capture (camera still or gallery upload) through
//! a timed, simulated analysis to a result screen.
//!
//! # Architecture
//!
//! - [`core`] - Session state machine, result types, history, configuration
//!   and errors
//! - [`source`] - Image source providers (terminal prompts, files)
//! - [`ui`] - The capture controller, its phase sequencer and events
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Mock image source and scripted workflow scenarios
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use skinscan::core::config::Config;
//! use skinscan::source::FileImageSource;
//! use skinscan::ui::{CaptureController, CaptureEvent, UiEvent};
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load_default().unwrap_or_default();
//! let source = FileImageSource::new().with_gallery_image("mole.jpg");
//! let controller = CaptureController::from_config(source, &config);
//!
//! if controller.start_capture_from_upload().await?.is_some() {
//!     loop {
//!         if let Some(UiEvent::Capture(CaptureEvent::Completed { result, .. })) =
//!             controller.recv_event_timeout(Duration::from_millis(250)).await
//!         {
//!             println!("{} ({})", result.condition, result.confidence);
//!             controller.complete_handoff();
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing Without a Camera
//!
//! ```rust,no_run
//! use skinscan::testdb::TestRunner;
//!
//! let mut runner = TestRunner::new();
//! let summary = runner.run_quick();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! skinscan::testdb::print_available_scenarios();
//! ```
//!
//! The analysis is simulated: results come from configured templates, not
//! from looking at the image.

pub mod cli;
pub mod core;
pub mod source;
pub mod testdb;
pub mod ui;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
