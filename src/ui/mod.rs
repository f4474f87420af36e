//! UI Support Module
//!
//! Everything a presentation layer needs to drive the capture flow, without
//! tying it to a particular UI framework.
//!
//! - [`controller`] - Capture controller owning the session and its timers
//! - [`sequencer`] - Named, cancellable phase timers
//! - [`events`] - Events the controller emits for rendering
//!
//! # Concurrency Model
//!
//! The controller runs on a tokio runtime. Session state sits behind a
//! mutex that is never held across an `.await`; the phase timers of a
//! session run as one spawned task and re-check the session id before every
//! transition. The UI learns about changes either by polling
//! [`CaptureController::try_recv_event`] or by awaiting
//! [`CaptureController::recv_event_timeout`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use skinscan::source::FileImageSource;
//! use skinscan::ui::{CaptureController, CaptureEvent, ControllerSettings, UiEvent};
//! use std::time::Duration;
//!
//! # async fn run() -> skinscan::core::error::Result<()> {
//! let controller = CaptureController::new(FileImageSource::new(), ControllerSettings::default());
//! controller.refresh_permission().await;
//! controller.start_capture_from_camera().await?;
//!
//! while let Some(event) = controller.recv_event_timeout(Duration::from_secs(10)).await {
//!     if let UiEvent::Capture(CaptureEvent::Completed { result, .. }) = event {
//!         println!("{} ({})", result.condition, result.confidence);
//!         controller.complete_handoff();
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod events;
pub mod sequencer;

pub use controller::{CaptureController, ControllerSettings};
pub use events::{format_duration, AppEvent, CaptureEvent, UiEvent};
pub use sequencer::{analysis_schedule, PhaseSequencer, ScheduledTransition};
