//! Capture Controller Module
//!
//! Owns the single capture session and drives it from image acquisition to
//! a completed analysis result. Permission checks and image acquisition go
//! through an [`ImageSourceProvider`]; the simulated analysis runs as a
//! [`PhaseSequencer`] on the tokio runtime. State changes are reported to
//! the presentation layer through an event channel.
//!
//! Only one session exists at a time. A start call claims the session before
//! it awaits the provider, so a second start made while a permission dialog
//! or picker is open is rejected with [`CaptureError::SessionAlreadyActive`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::core::config::{Config, ResultsConfig, TimingsConfig};
use crate::core::error::{CaptureError, Notice, Result};
use crate::core::report::{AnalysisResult, ImageAttachment, ResultTemplate};
use crate::core::session::{
    CameraFacing, CaptureOrigin, CaptureSession, ImageRef, PermissionKind, PermissionState, Phase,
    SessionHandle, SessionId, SessionSnapshot,
};
use crate::source::traits::{ImageSourceProvider, PickOutcome};
use crate::ui::events::{AppEvent, CaptureEvent, UiEvent};
use crate::ui::sequencer::{analysis_schedule, PhaseSequencer, ScheduledTransition};

// =============================================================================
// Controller Settings
// =============================================================================

/// Settings for a capture controller
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    /// Phase delays per origin
    pub timings: TimingsConfig,
    /// Mocked result values per origin
    pub results: ResultsConfig,
    /// Whether the result payload carries the image
    pub image_attachment: ImageAttachment,
    /// Camera selected when the controller is created
    pub default_facing: CameraFacing,
}

impl ControllerSettings {
    /// Build settings from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            timings: config.timings,
            results: config.results.clone(),
            image_attachment: config.capture.image_attachment,
            default_facing: config.capture.default_facing,
        }
    }

    /// Set phase delays
    pub fn timings(mut self, timings: TimingsConfig) -> Self {
        self.timings = timings;
        self
    }

    /// Set result templates
    pub fn results(mut self, results: ResultsConfig) -> Self {
        self.results = results;
        self
    }

    /// Set image attachment policy
    pub fn image_attachment(mut self, attachment: ImageAttachment) -> Self {
        self.image_attachment = attachment;
        self
    }

    /// Set the initial camera
    pub fn default_facing(mut self, facing: CameraFacing) -> Self {
        self.default_facing = facing;
        self
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct SessionState {
    session: CaptureSession,
    /// Result of the completed session, held until handoff
    result: Option<AnalysisResult>,
}

/// How the result of one session is built when it completes
struct Completion {
    origin: CaptureOrigin,
    template: ResultTemplate,
    attachment: ImageAttachment,
}

impl Completion {
    fn build(&self, image: Option<&ImageRef>) -> AnalysisResult {
        AnalysisResult::from_template(&self.template, self.origin, image, self.attachment)
    }
}

/// State shared between the controller and its running sequencer
struct Shared {
    state: Mutex<SessionState>,
    event_tx: UnboundedSender<UiEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: impl Into<UiEvent>) {
        let _ = self.event_tx.send(event.into());
    }

    /// Apply one fired timer. Returns `false` once the timer's session is
    /// no longer current.
    fn apply_transition(
        &self,
        id: SessionId,
        step: ScheduledTransition,
        completion: &Completion,
    ) -> bool {
        let mut state = self.lock();
        let phase = match state.session.advance(id) {
            Ok(phase) => phase,
            Err(reason) => {
                debug!(
                    "Ignoring timer '{}' for session {}: {:?}",
                    step.name, id, reason
                );
                return false;
            }
        };
        debug_assert_eq!(phase, step.to);

        info!("Session {} entered {}", id, phase);
        self.emit(CaptureEvent::PhaseChanged {
            session: id,
            phase,
            progress_percent: phase.progress_percent(),
        });

        if phase == Phase::Complete {
            let result = completion.build(state.session.image());
            state.result = Some(result.clone());
            info!(
                "Session {} complete: {} ({})",
                id, result.condition, result.confidence
            );
            self.emit(CaptureEvent::Completed {
                session: id,
                result,
            });
        }
        true
    }
}

// =============================================================================
// Capture Controller
// =============================================================================

/// Controller for the capture-to-result workflow
///
/// Must be used from within a tokio runtime: starting a session spawns the
/// phase timers onto it.
pub struct CaptureController<P: ImageSourceProvider> {
    /// Camera, permission dialogs and picker
    provider: P,
    settings: ControllerSettings,
    shared: Arc<Shared>,
    /// Event receiver for the UI
    event_rx: tokio::sync::Mutex<UnboundedReceiver<UiEvent>>,
    /// Timers of the current session
    sequencer: Mutex<Option<PhaseSequencer>>,
    next_id: AtomicU64,
}

impl<P: ImageSourceProvider> CaptureController<P> {
    /// Create a controller around an image source
    pub fn new(provider: P, settings: ControllerSettings) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = CaptureSession::new(settings.default_facing);

        Self {
            provider,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    session,
                    result: None,
                }),
                event_tx,
            }),
            event_rx: tokio::sync::Mutex::new(event_rx),
            sequencer: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a controller from a loaded configuration
    pub fn from_config(provider: P, config: &Config) -> Self {
        Self::new(provider, ControllerSettings::from_config(config))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Copy of the session for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.snapshot()
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.shared.lock().session.phase()
    }

    /// Whether a session is running or a start call is waiting on the source
    pub fn is_active(&self) -> bool {
        let state = self.shared.lock();
        state.session.phase().is_in_flight() || state.session.is_reserved()
    }

    /// Result of the completed session, if it has not been handed off yet
    pub fn current_result(&self) -> Option<AnalysisResult> {
        self.shared.lock().result.clone()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Try to receive the next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<UiEvent> {
        self.event_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub async fn recv_event_timeout(&self, timeout: Duration) -> Option<UiEvent> {
        let mut rx = self.event_rx.lock().await;
        tokio::time::timeout(timeout, rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Drain all pending events
    pub fn drain_events(&self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv_event() {
            events.push(event);
        }
        events
    }

    // -------------------------------------------------------------------------
    // Permissions and camera
    // -------------------------------------------------------------------------

    /// Query camera authorization without prompting
    pub async fn refresh_permission(&self) -> PermissionState {
        let state = self.provider.camera_permission_status().await;
        self.record_permission(PermissionKind::Camera, state);
        state
    }

    /// Prompt for camera access
    pub async fn request_permission(&self) -> PermissionState {
        info!("Requesting camera permission from {}", self.provider.name());
        let state = self.provider.request_camera_permission().await;
        self.record_permission(PermissionKind::Camera, state);
        if !state.is_granted() {
            self.shared
                .emit(CaptureEvent::Notice(Notice::permission_required(
                    PermissionKind::Camera,
                )));
        }
        state
    }

    fn record_permission(&self, kind: PermissionKind, state: PermissionState) {
        self.shared.lock().session.set_permission(kind, state);
        debug!("{} permission is {}", kind.display_name(), state);
        self.shared
            .emit(CaptureEvent::PermissionChanged { kind, state });
    }

    /// Switch between front and back camera. Never touches the session.
    pub fn toggle_facing(&self) -> CameraFacing {
        let facing = self.shared.lock().session.toggle_facing();
        debug!("Camera facing is now {}", facing);
        self.shared.emit(CaptureEvent::FacingChanged { facing });
        facing
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Take a still with the current camera and start the analysis
    pub async fn start_capture_from_camera(&self) -> Result<SessionHandle> {
        let id = self.reserve(CaptureOrigin::Camera)?;
        let facing = self.shared.lock().session.facing();

        debug!("Session {} capturing from {} camera", id, facing);
        let captured = self.provider.capture_still(facing).await;

        self.begin(id, CaptureOrigin::Camera, captured)?
            .ok_or_else(|| {
                CaptureError::ImageSourceUnavailable(
                    "capture was cancelled before the image arrived".to_string(),
                )
            })
    }

    /// Ask for photo library access, let the user pick an image and start
    /// the analysis. Returns `Ok(None)` when the user backs out of the
    /// picker (or the session is cancelled while it is open).
    pub async fn start_capture_from_upload(&self) -> Result<Option<SessionHandle>> {
        let id = self.reserve(CaptureOrigin::Upload)?;

        let gallery = self.provider.request_gallery_permission().await;
        self.record_permission(PermissionKind::Gallery, gallery);
        if !gallery.is_granted() {
            self.shared.lock().session.release(id);
            info!("Photo library access denied, session {} dropped", id);
            self.shared
                .emit(CaptureEvent::Notice(Notice::permission_required(
                    PermissionKind::Gallery,
                )));
            return Err(CaptureError::PermissionDenied(PermissionKind::Gallery));
        }

        if !self.holds_reservation(id) {
            debug!("Session {} cancelled before the picker opened", id);
            return Ok(None);
        }

        match self.provider.pick_from_gallery().await {
            Ok(PickOutcome::Picked(image)) => self.begin(id, CaptureOrigin::Upload, Ok(image)),
            Ok(PickOutcome::Cancelled) => {
                self.shared.lock().session.release(id);
                info!("Picker closed without a selection, session {} dropped", id);
                self.shared
                    .emit(CaptureEvent::PickerCancelled { session: id });
                Ok(None)
            }
            Err(err) => self.begin(id, CaptureOrigin::Upload, Err(err)),
        }
    }

    /// Tear down the current session, including a start call still waiting
    /// on the source. Returns the session that was torn down; `None` (and no
    /// effect) when idle or complete. A finished session is only released by
    /// [`complete_handoff`](Self::complete_handoff).
    pub fn cancel_session(&self) -> Option<SessionId> {
        if self.phase() == Phase::Complete {
            debug!("Cancel ignored: session already complete");
            return None;
        }
        self.stop_sequencer();

        let (torn_down, phase) = {
            let mut state = self.shared.lock();
            let phase = state.session.phase();
            // The last timer may have fired before the abort landed
            if phase == Phase::Complete {
                debug!("Cancel ignored: session completed meanwhile");
                return None;
            }
            state.result = None;
            (state.session.reset(), phase)
        };

        match torn_down {
            Some(id) => {
                info!("Session {} cancelled during {}", id, phase);
                self.shared
                    .emit(CaptureEvent::Cancelled { session: id, phase });
            }
            None => debug!("Cancel requested with no session"),
        }
        torn_down
    }

    /// Hand the completed result to the caller and return to idle.
    /// `None` unless the session is complete.
    pub fn complete_handoff(&self) -> Option<AnalysisResult> {
        let (torn_down, result) = {
            let mut state = self.shared.lock();
            if state.session.phase() != Phase::Complete {
                return None;
            }
            let result = state.result.take();
            (state.session.reset(), result)
        };
        if let Some(id) = torn_down {
            self.stop_sequencer_of(id);
        }

        if let Some(id) = torn_down {
            info!("Session {} handed off", id);
            self.shared.emit(CaptureEvent::HandedOff { session: id });
        }
        result
    }

    /// Shutdown the controller
    pub fn shutdown(&self) {
        self.cancel_session();
        self.shared.emit(AppEvent::ShuttingDown);
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Claim the session for a new start call
    fn reserve(&self, origin: CaptureOrigin) -> Result<SessionId> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut state = self.shared.lock();

        if state.session.is_busy() {
            warn!(
                "Rejected {} capture: session already in {}",
                origin,
                state.session.phase()
            );
            return Err(CaptureError::SessionAlreadyActive);
        }

        if origin == CaptureOrigin::Camera && !state.session.permission().is_granted() {
            info!(
                "Rejected camera capture: permission is {}",
                state.session.permission()
            );
            self.shared
                .emit(CaptureEvent::Notice(Notice::permission_required(
                    PermissionKind::Camera,
                )));
            return Err(CaptureError::PermissionDenied(PermissionKind::Camera));
        }

        state
            .session
            .reserve(id)
            .map_err(|_| CaptureError::SessionAlreadyActive)?;
        self.shared
            .emit(CaptureEvent::AwaitingSource { session: id, origin });
        Ok(id)
    }

    fn holds_reservation(&self, id: SessionId) -> bool {
        self.shared.lock().session.holds_reservation(id)
    }

    /// Enter `Preparing` with the acquired image and start the timers.
    /// `Ok(None)` when the session was cancelled while the image was on its
    /// way.
    fn begin(
        &self,
        id: SessionId,
        origin: CaptureOrigin,
        acquired: Result<ImageRef>,
    ) -> Result<Option<SessionHandle>> {
        let image = match acquired {
            Ok(image) => image,
            Err(err) => {
                self.shared.lock().session.release(id);
                warn!("Session {} aborted, {} source failed: {}", id, origin, err);
                self.shared.emit(CaptureEvent::Aborted {
                    session: id,
                    origin,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let handle = SessionHandle { id, origin };
        {
            let mut state = self.shared.lock();
            if state.session.begin(handle, image.clone()).is_err() {
                info!("Session {} was cancelled before its image arrived", id);
                return Ok(None);
            }
            state.result = None;
        }

        info!("Session {} started from {} with {}", id, origin, image);
        self.shared
            .emit(CaptureEvent::SessionStarted { handle, image });
        self.shared.emit(CaptureEvent::PhaseChanged {
            session: id,
            phase: Phase::Preparing,
            progress_percent: Phase::Preparing.progress_percent(),
        });

        self.schedule(handle);
        Ok(Some(handle))
    }

    fn schedule(&self, handle: SessionHandle) {
        let shared = Arc::clone(&self.shared);
        let completion = Completion {
            origin: handle.origin,
            template: self.settings.results.for_origin(handle.origin).clone(),
            attachment: self.settings.image_attachment,
        };
        let steps = analysis_schedule(&self.settings.timings.for_origin(handle.origin)).to_vec();

        let sequencer = PhaseSequencer::spawn(handle.id, steps, move |id, step| {
            shared.apply_transition(id, step, &completion)
        });

        // Replacing the slot drops (and aborts) any earlier schedule
        *self
            .sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sequencer);
    }

    fn stop_sequencer(&self) {
        let sequencer = self
            .sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sequencer) = sequencer {
            debug!("Stopping timers of session {}", sequencer.session());
            sequencer.cancel();
        }
    }

    /// Stop the timers only if they still belong to `id`; a newer session
    /// may already own the slot.
    fn stop_sequencer_of(&self, id: SessionId) {
        let sequencer = {
            let mut slot = self
                .sequencer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(sequencer) if sequencer.session() == id => slot.take(),
                _ => None,
            }
        };
        if let Some(sequencer) = sequencer {
            debug!("Stopping timers of session {}", id);
            sequencer.cancel();
        }
    }
}

impl<P: ImageSourceProvider> Drop for CaptureController<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::mock_source::{MockImageSource, MockSourceConfig, PickerBehavior};
    use tokio::time::sleep;

    fn controller(source: MockImageSource) -> CaptureController<MockImageSource> {
        CaptureController::new(source, ControllerSettings::default())
    }

    async fn ready(source: MockImageSource) -> CaptureController<MockImageSource> {
        let controller = controller(source);
        controller.refresh_permission().await;
        controller
    }

    fn phases(events: &[UiEvent]) -> Vec<Phase> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Capture(CaptureEvent::PhaseChanged { phase, .. }) => Some(*phase),
                _ => None,
            })
            .collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_session_follows_schedule() {
        let controller = ready(MockImageSource::new()).await;
        let handle = controller.start_capture_from_camera().await.unwrap();
        assert_eq!(handle.origin, CaptureOrigin::Camera);
        assert_eq!(controller.phase(), Phase::Preparing);
        assert!(controller.snapshot().image.is_some());

        sleep(ms(999)).await;
        assert_eq!(controller.phase(), Phase::Preparing);
        sleep(ms(2)).await;
        assert_eq!(controller.phase(), Phase::Analyzing);
        sleep(ms(1500)).await;
        assert_eq!(controller.phase(), Phase::Finalizing);
        sleep(ms(1500)).await;
        assert_eq!(controller.phase(), Phase::Complete);

        let result = controller.current_result().unwrap();
        assert_eq!(result.condition, "Sample Skin Condition");
        assert!(result.confidence.percent() <= 100);
        assert_eq!(result.confidence.percent(), 85);

        let events = controller.drain_events();
        assert_eq!(
            phases(&events),
            vec![
                Phase::Preparing,
                Phase::Analyzing,
                Phase::Finalizing,
                Phase::Complete
            ]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::Capture(CaptureEvent::Completed { session, .. }) if *session == handle.id
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_session_uses_upload_profile() {
        let controller = ready(MockImageSource::new()).await;
        let handle = controller.start_capture_from_upload().await.unwrap().unwrap();
        assert_eq!(handle.origin, CaptureOrigin::Upload);

        sleep(ms(3499)).await;
        assert_eq!(controller.phase(), Phase::Finalizing);
        sleep(ms(2)).await;
        assert_eq!(controller.phase(), Phase::Complete);

        let result = controller.complete_handoff().unwrap();
        assert_eq!(result.confidence.percent(), 78);
        assert_eq!(
            result.image.unwrap().uri(),
            "content://media/external/images/1"
        );
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.snapshot().image.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_present_exactly_when_not_idle() {
        let controller = ready(MockImageSource::new()).await;
        controller.start_capture_from_camera().await.unwrap();

        let mut last = Phase::Idle;
        for _ in 0..50 {
            let snap = controller.snapshot();
            assert_eq!(snap.image.is_some(), snap.phase != Phase::Idle);
            assert!(snap.phase >= last, "phase went backwards");
            last = snap.phase;
            sleep(ms(100)).await;
        }
        assert_eq!(last, Phase::Complete);

        controller.complete_handoff();
        let snap = controller.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.image.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected_without_side_effects() {
        let controller = ready(MockImageSource::new()).await;
        controller.start_capture_from_camera().await.unwrap();
        sleep(ms(1200)).await;

        let before = controller.snapshot();
        let err = controller.start_capture_from_camera().await.unwrap_err();
        assert!(matches!(err, CaptureError::SessionAlreadyActive));
        let err = controller.start_capture_from_upload().await.unwrap_err();
        assert!(matches!(err, CaptureError::SessionAlreadyActive));
        assert_eq!(controller.snapshot(), before);
        assert_eq!(
            controller
                .provider()
                .calls()
                .captures
                .load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_camera_never_captures() {
        let controller = ready(MockImageSource::camera_denied()).await;
        assert_eq!(
            controller.request_permission().await,
            PermissionState::Denied
        );

        let err = controller.start_capture_from_camera().await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::PermissionDenied(PermissionKind::Camera)
        ));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.snapshot().image.is_none());
        assert_eq!(
            controller
                .provider()
                .calls()
                .captures
                .load(Ordering::SeqCst),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unqueried_permission_blocks_capture() {
        let controller = controller(MockImageSource::new());
        assert_eq!(controller.snapshot().permission, PermissionState::Unknown);
        assert!(matches!(
            controller.start_capture_from_camera().await,
            Err(CaptureError::PermissionDenied(PermissionKind::Camera))
        ));

        assert!(controller.request_permission().await.is_granted());
        assert!(controller.start_capture_from_camera().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gallery_denied_stays_idle() {
        let controller = ready(MockImageSource::gallery_denied()).await;
        let err = controller.start_capture_from_upload().await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::PermissionDenied(PermissionKind::Gallery)
        ));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.is_active());
        assert_eq!(
            controller.provider().calls().picks.load(Ordering::SeqCst),
            0
        );

        let events = controller.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::Capture(CaptureEvent::Notice(n)) if n.title == "Permission Required"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_picker_cancel_returns_to_idle() {
        let controller = ready(MockImageSource::with_picker(PickerBehavior::Cancel)).await;
        assert!(controller.start_capture_from_upload().await.unwrap().is_none());
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.is_active());

        // The slot is free again
        assert!(controller.start_capture_from_camera().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_failure_is_silent_abort() {
        let controller = ready(MockImageSource::with_config(MockSourceConfig {
            camera_fails: true,
            ..Default::default()
        }))
        .await;

        let err = controller.start_capture_from_camera().await.unwrap_err();
        assert!(err.is_silent());
        assert!(err.user_notice().is_none());
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.is_active());
        assert!(controller
            .drain_events()
            .iter()
            .any(|e| matches!(e, UiEvent::Capture(CaptureEvent::Aborted { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent_and_stops_timers() {
        let controller = ready(MockImageSource::new()).await;
        let handle = controller.start_capture_from_camera().await.unwrap();
        sleep(ms(1100)).await;
        assert_eq!(controller.phase(), Phase::Analyzing);
        controller.drain_events();

        assert_eq!(controller.cancel_session(), Some(handle.id));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.snapshot().image.is_none());
        assert_eq!(controller.cancel_session(), None);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.phase(), Phase::Idle);
        let events = controller.drain_events();
        assert!(phases(&events).is_empty());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, UiEvent::Capture(CaptureEvent::Cancelled { .. })))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_is_not_advanced_by_old_timers() {
        let controller = ready(MockImageSource::new()).await;
        controller.start_capture_from_camera().await.unwrap();
        sleep(ms(500)).await;
        controller.cancel_session();

        let second = controller.start_capture_from_camera().await.unwrap();
        // first session's timer would have fired at 1000ms
        sleep(ms(600)).await;
        assert_eq!(controller.phase(), Phase::Preparing);
        sleep(ms(401)).await;
        assert_eq!(controller.phase(), Phase::Analyzing);
        assert_eq!(controller.snapshot().session.map(|h| h.id), Some(second.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_facing_leaves_phase_and_image() {
        let controller = ready(MockImageSource::new()).await;
        assert_eq!(controller.toggle_facing(), CameraFacing::Front);
        controller.start_capture_from_camera().await.unwrap();
        sleep(ms(1200)).await;

        let before = controller.snapshot();
        assert!(before.image.as_ref().unwrap().uri().contains("front"));
        assert_eq!(controller.toggle_facing(), CameraFacing::Back);
        let after = controller.snapshot();
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.image, before.image);
        assert_eq!(after.facing, CameraFacing::Back);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_persists_until_handoff() {
        let controller = ready(MockImageSource::new()).await;
        controller.start_capture_from_camera().await.unwrap();
        sleep(Duration::from_secs(30)).await;
        assert_eq!(controller.phase(), Phase::Complete);
        assert!(!controller.is_active());
        assert!(matches!(
            controller.start_capture_from_camera().await,
            Err(CaptureError::SessionAlreadyActive)
        ));

        assert!(controller.complete_handoff().is_some());
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.complete_handoff().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_complete_is_noop() {
        let controller = ready(MockImageSource::new()).await;
        let handle = controller.start_capture_from_camera().await.unwrap();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.phase(), Phase::Complete);
        controller.drain_events();

        assert_eq!(controller.cancel_session(), None);
        assert_eq!(controller.phase(), Phase::Complete);
        assert!(controller.current_result().is_some());
        assert!(controller.drain_events().is_empty());

        let result = controller.complete_handoff().unwrap();
        assert_eq!(result.condition, "Sample Skin Condition");
        assert_eq!(controller.phase(), Phase::Idle);
        let events = controller.drain_events();
        assert!(matches!(
            events.as_slice(),
            [UiEvent::Capture(CaptureEvent::HandedOff { session })] if *session == handle.id
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handoff_leaves_newer_timers_running() {
        let controller = ready(MockImageSource::new()).await;
        let first = controller.start_capture_from_camera().await.unwrap();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.phase(), Phase::Complete);

        // A newer session already owns the timer slot when the old hand-off
        // tears down
        controller.shared.lock().session.reset();
        let second = controller.start_capture_from_camera().await.unwrap();
        assert_ne!(first.id, second.id);
        controller.stop_sequencer_of(first.id);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.phase(), Phase::Complete);
        assert!(controller.complete_handoff().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_during_open_picker_is_rejected() {
        let controller = ready(MockImageSource::with_config(MockSourceConfig {
            dialog_delay: Duration::from_secs(5),
            ..Default::default()
        }))
        .await;

        let (upload, camera) = tokio::join!(controller.start_capture_from_upload(), async {
            sleep(Duration::from_secs(1)).await;
            assert!(controller.snapshot().awaiting_source);
            controller.start_capture_from_camera().await
        });

        assert!(matches!(camera, Err(CaptureError::SessionAlreadyActive)));
        assert!(upload.unwrap().is_some());
        assert_eq!(controller.phase(), Phase::Preparing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_dialog_open() {
        let controller = ready(MockImageSource::with_config(MockSourceConfig {
            dialog_delay: Duration::from_secs(5),
            ..Default::default()
        }))
        .await;

        let (upload, cancelled) = tokio::join!(controller.start_capture_from_upload(), async {
            sleep(Duration::from_secs(1)).await;
            controller.cancel_session()
        });

        assert!(cancelled.is_some());
        assert!(upload.unwrap().is_none());
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.is_active());
        assert_eq!(
            controller.provider().calls().picks.load(Ordering::SeqCst),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_only_attachment_drops_camera_image() {
        let settings = ControllerSettings::default()
            .image_attachment(ImageAttachment::UploadOnly)
            .timings(TimingsConfig::uniform(10));
        let controller = CaptureController::new(MockImageSource::new(), settings);
        controller.refresh_permission().await;
        controller.start_capture_from_camera().await.unwrap();
        sleep(ms(50)).await;

        let result = controller.complete_handoff().unwrap();
        assert!(result.image.is_none());
        assert_eq!(result.origin, CaptureOrigin::Camera);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_can_be_awaited() {
        let controller = ready(MockImageSource::new()).await;
        controller.drain_events();
        controller.toggle_facing();

        let event = controller.recv_event_timeout(ms(10)).await;
        assert!(matches!(
            event,
            Some(UiEvent::Capture(CaptureEvent::FacingChanged { .. }))
        ));
        assert!(controller.recv_event_timeout(ms(10)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_and_notifies() {
        let controller = ready(MockImageSource::new()).await;
        controller.start_capture_from_camera().await.unwrap();
        controller.shutdown();

        assert_eq!(controller.phase(), Phase::Idle);
        let events = controller.drain_events();
        assert!(matches!(
            events.last(),
            Some(UiEvent::App(AppEvent::ShuttingDown))
        ));
    }
}
