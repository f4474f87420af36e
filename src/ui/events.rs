//! UI Events Module
//!
//! Defines the events the capture controller emits for the presentation
//! layer. Events are sent through a channel and polled from the UI loop.

use std::time::Duration;

use crate::core::error::Notice;
use crate::core::report::AnalysisResult;
use crate::core::session::{
    CameraFacing, CaptureOrigin, ImageRef, PermissionKind, PermissionState, Phase, SessionHandle,
    SessionId,
};

// =============================================================================
// Capture Events
// =============================================================================

/// Events emitted while driving a capture session
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A permission was queried or requested
    PermissionChanged {
        kind: PermissionKind,
        state: PermissionState,
    },

    /// The live preview switched cameras
    FacingChanged { facing: CameraFacing },

    /// A start call is waiting on a permission dialog, camera or picker
    AwaitingSource {
        session: SessionId,
        origin: CaptureOrigin,
    },

    /// An image was acquired and the session entered `Preparing`
    SessionStarted {
        handle: SessionHandle,
        image: ImageRef,
    },

    /// The analysis moved to a new phase
    PhaseChanged {
        session: SessionId,
        phase: Phase,
        progress_percent: u8,
    },

    /// Analysis finished. The presentation layer navigates to the result
    /// and then calls `complete_handoff`.
    Completed {
        session: SessionId,
        result: AnalysisResult,
    },

    /// The result was handed off and the session returned to idle
    HandedOff { session: SessionId },

    /// The session was cancelled or torn down
    Cancelled {
        session: SessionId,
        /// Phase the session was in when cancelled
        phase: Phase,
    },

    /// The user closed the gallery picker without choosing
    PickerCancelled { session: SessionId },

    /// The image source failed; the session silently returned to idle
    Aborted {
        session: SessionId,
        origin: CaptureOrigin,
        reason: String,
    },

    /// Informational notice for the user
    Notice(Notice),
}

impl CaptureEvent {
    /// Session this event concerns, if any
    pub fn session(&self) -> Option<SessionId> {
        match self {
            CaptureEvent::AwaitingSource { session, .. }
            | CaptureEvent::PhaseChanged { session, .. }
            | CaptureEvent::Completed { session, .. }
            | CaptureEvent::HandedOff { session }
            | CaptureEvent::Cancelled { session, .. }
            | CaptureEvent::PickerCancelled { session }
            | CaptureEvent::Aborted { session, .. } => Some(*session),
            CaptureEvent::SessionStarted { handle, .. } => Some(handle.id),
            CaptureEvent::PermissionChanged { .. }
            | CaptureEvent::FacingChanged { .. }
            | CaptureEvent::Notice(_) => None,
        }
    }
}

// =============================================================================
// Application Events
// =============================================================================

/// General application events
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Application is shutting down
    ShuttingDown,
}

// =============================================================================
// Combined Event Type
// =============================================================================

/// All possible events that can be sent to the UI
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Capture-related event
    Capture(CaptureEvent),
    /// Application-related event
    App(AppEvent),
}

impl From<CaptureEvent> for UiEvent {
    fn from(event: CaptureEvent) -> Self {
        UiEvent::Capture(event)
    }
}

impl From<AppEvent> for UiEvent {
    fn from(event: AppEvent) -> Self {
        UiEvent::App(event)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(3500)), "3.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_ui_event_conversions() {
        let capture_event = CaptureEvent::FacingChanged {
            facing: CameraFacing::Front,
        };
        let ui_event: UiEvent = capture_event.into();
        assert!(matches!(ui_event, UiEvent::Capture(_)));

        let ui_event: UiEvent = AppEvent::ShuttingDown.into();
        assert!(matches!(ui_event, UiEvent::App(_)));
    }

    #[test]
    fn test_event_session_lookup() {
        let event = CaptureEvent::PhaseChanged {
            session: SessionId(3),
            phase: Phase::Analyzing,
            progress_percent: 70,
        };
        assert_eq!(event.session(), Some(SessionId(3)));
        assert_eq!(
            CaptureEvent::Notice(Notice::new("t", "m")).session(),
            None
        );
    }
}
