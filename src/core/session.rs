//! Capture session data model
//!
//! A [`CaptureSession`] holds everything the presentation layer renders for
//! one capture-and-analyze attempt: permission status, the selected image,
//! the analysis phase and the camera facing. All mutation goes through the
//! methods here so the phase/image invariants hold after every call:
//!
//! - the image is set exactly when the phase is not [`Phase::Idle`]
//! - the phase only moves forward one step at a time, or resets to Idle

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

// =============================================================================
// Permissions
// =============================================================================

/// Authorization status for one OS permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PermissionState {
    /// Not yet queried (still loading)
    #[default]
    Unknown,
    /// The user declined access
    Denied,
    /// Access granted
    Granted,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

impl Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionState::Unknown => "unknown",
            PermissionState::Denied => "denied",
            PermissionState::Granted => "granted",
        };
        write!(f, "{}", s)
    }
}

/// Which OS permission a request concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionKind {
    Camera,
    Gallery,
}

impl PermissionKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "Camera",
            PermissionKind::Gallery => "Photo library",
        }
    }
}

// =============================================================================
// Camera facing
// =============================================================================

/// Which camera the live preview uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    /// The opposite camera
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

impl Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

// =============================================================================
// Phases
// =============================================================================

/// A named stage in the capture-to-result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Preparing,
    Analyzing,
    Finalizing,
    Complete,
}

impl Phase {
    /// Every phase in sequence order
    pub const ALL: [Phase; 5] = [
        Phase::Idle,
        Phase::Preparing,
        Phase::Analyzing,
        Phase::Finalizing,
        Phase::Complete,
    ];

    /// The phase that follows this one, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::Preparing),
            Phase::Preparing => Some(Phase::Analyzing),
            Phase::Analyzing => Some(Phase::Finalizing),
            Phase::Finalizing => Some(Phase::Complete),
            Phase::Complete => None,
        }
    }

    /// Whether timers are still pending for this phase
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Phase::Preparing | Phase::Analyzing | Phase::Finalizing
        )
    }

    /// Progress shown on the analysis screen
    pub fn progress_percent(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Preparing => 25,
            Phase::Analyzing => 70,
            Phase::Finalizing => 95,
            Phase::Complete => 100,
        }
    }

    /// Status line shown under the progress bar
    pub fn status_text(self) -> &'static str {
        match self {
            Phase::Idle => "Ready to scan",
            Phase::Preparing => "Preparing image for analysis...",
            Phase::Analyzing => "AI analyzing skin patterns...",
            Phase::Finalizing => "Generating detailed report...",
            Phase::Complete => "Analysis complete",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Preparing => "Preparing",
            Phase::Analyzing => "Analyzing",
            Phase::Finalizing => "Finalizing",
            Phase::Complete => "Complete",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Images and session identity
// =============================================================================

/// Opaque handle to captured or picked image bytes (a URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one capture session; doubles as the cancellation token
/// of the timers scheduled for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(pub u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a session's image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureOrigin {
    Camera,
    Upload,
}

impl Display for CaptureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureOrigin::Camera => write!(f, "camera"),
            CaptureOrigin::Upload => write!(f, "upload"),
        }
    }
}

/// Handle returned to the caller when a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub origin: CaptureOrigin,
}

// =============================================================================
// Session state
// =============================================================================

/// Reason a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// A session is already in flight (or reserved)
    Busy,
    /// The token does not belong to the current session
    Stale,
    /// The session is already complete
    Terminal,
}

/// State of the one capture session owned by the controller
#[derive(Debug, Clone, Default)]
pub struct CaptureSession {
    permission: PermissionState,
    gallery_permission: PermissionState,
    image: Option<ImageRef>,
    phase: Phase,
    facing: CameraFacing,
    active: Option<SessionHandle>,
    /// Set while a start call waits on the provider, before any image exists
    reserved: Option<SessionId>,
}

impl CaptureSession {
    pub fn new(facing: CameraFacing) -> Self {
        Self {
            facing,
            ..Default::default()
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn gallery_permission(&self) -> PermissionState {
        self.gallery_permission
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn active(&self) -> Option<SessionHandle> {
        self.active
    }

    /// Whether a start call has claimed the session but has no image yet
    pub fn is_reserved(&self) -> bool {
        self.reserved.is_some()
    }

    /// Whether a new capture would be rejected
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle || self.reserved.is_some()
    }

    pub fn set_permission(&mut self, kind: PermissionKind, state: PermissionState) {
        match kind {
            PermissionKind::Camera => self.permission = state,
            PermissionKind::Gallery => self.gallery_permission = state,
        }
    }

    pub fn toggle_facing(&mut self) -> CameraFacing {
        self.facing = self.facing.flipped();
        self.facing
    }

    /// Claim the session slot ahead of the provider round-trip
    pub fn reserve(&mut self, id: SessionId) -> Result<(), TransitionError> {
        if self.is_busy() {
            return Err(TransitionError::Busy);
        }
        self.reserved = Some(id);
        Ok(())
    }

    /// Whether `id` still holds the slot (a cancel clears it)
    pub fn holds_reservation(&self, id: SessionId) -> bool {
        self.reserved == Some(id)
    }

    /// Give back a reservation that never produced an image
    pub fn release(&mut self, id: SessionId) {
        if self.reserved == Some(id) {
            self.reserved = None;
        }
    }

    /// Enter [`Phase::Preparing`] with the acquired image. The caller must
    /// hold the reservation for `handle.id`.
    pub fn begin(&mut self, handle: SessionHandle, image: ImageRef) -> Result<(), TransitionError> {
        if self.reserved != Some(handle.id) {
            return Err(TransitionError::Stale);
        }
        if self.phase != Phase::Idle {
            return Err(TransitionError::Busy);
        }
        self.reserved = None;
        self.active = Some(handle);
        self.image = Some(image);
        self.phase = Phase::Preparing;
        Ok(())
    }

    /// Move one step forward if `id` is still the active session
    pub fn advance(&mut self, id: SessionId) -> Result<Phase, TransitionError> {
        match self.active {
            Some(active) if active.id == id => {}
            _ => return Err(TransitionError::Stale),
        }
        let next = self.phase.next().ok_or(TransitionError::Terminal)?;
        self.phase = next;
        Ok(next)
    }

    /// Return to Idle, dropping the image and any reservation. Returns the
    /// session that was torn down, if there was one.
    pub fn reset(&mut self) -> Option<SessionId> {
        let torn_down = self.active.map(|h| h.id).or(self.reserved);
        self.phase = Phase::Idle;
        self.image = None;
        self.active = None;
        self.reserved = None;
        torn_down
    }

    /// Read-only copy for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            permission: self.permission,
            gallery_permission: self.gallery_permission,
            image: self.image.clone(),
            phase: self.phase,
            facing: self.facing,
            session: self.active,
            awaiting_source: self.reserved.is_some(),
        }
    }
}

/// What the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub permission: PermissionState,
    pub gallery_permission: PermissionState,
    pub image: Option<ImageRef>,
    pub phase: Phase,
    pub facing: CameraFacing,
    pub session: Option<SessionHandle>,
    /// A permission dialog or picker is open
    pub awaiting_source: bool,
}

impl SessionSnapshot {
    pub fn progress_percent(&self) -> u8 {
        self.phase.progress_percent()
    }

    pub fn status_text(&self) -> &'static str {
        self.phase.status_text()
    }

    /// Which screen the presentation layer should show
    pub fn view(&self) -> CaptureView {
        match (self.permission, self.phase) {
            (_, Phase::Complete) => CaptureView::Done,
            (_, phase) if phase.is_in_flight() => CaptureView::Analyzing,
            (PermissionState::Unknown, _) => CaptureView::Loading,
            (PermissionState::Denied, _) => CaptureView::PermissionRequest,
            (PermissionState::Granted, _) => CaptureView::LiveCamera,
        }
    }
}

/// Screen the capture flow is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureView {
    Loading,
    PermissionRequest,
    LiveCamera,
    Analyzing,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> SessionHandle {
        SessionHandle {
            id: SessionId(id),
            origin: CaptureOrigin::Camera,
        }
    }

    fn started(id: u64) -> CaptureSession {
        let mut session = CaptureSession::default();
        session.reserve(SessionId(id)).unwrap();
        session
            .begin(handle(id), ImageRef::new("file:///tmp/a.jpg"))
            .unwrap();
        session
    }

    #[test]
    fn test_phase_sequence_is_linear() {
        let mut seen = vec![Phase::Idle];
        while let Some(next) = seen.last().unwrap().next() {
            seen.push(next);
        }
        assert_eq!(seen, Phase::ALL.to_vec());
    }

    #[test]
    fn test_phase_display_values() {
        assert_eq!(Phase::Preparing.progress_percent(), 25);
        assert_eq!(Phase::Analyzing.progress_percent(), 70);
        assert_eq!(Phase::Finalizing.progress_percent(), 95);
        assert_eq!(
            Phase::Analyzing.status_text(),
            "AI analyzing skin patterns..."
        );
        assert!(!Phase::Idle.is_in_flight());
        assert!(!Phase::Complete.is_in_flight());
    }

    #[test]
    fn test_begin_requires_reservation() {
        let mut session = CaptureSession::default();
        let err = session.begin(handle(1), ImageRef::new("x")).unwrap_err();
        assert_eq!(err, TransitionError::Stale);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.image().is_none());
    }

    #[test]
    fn test_reserve_rejects_when_busy() {
        let mut session = started(1);
        assert_eq!(session.reserve(SessionId(2)), Err(TransitionError::Busy));

        let mut waiting = CaptureSession::default();
        waiting.reserve(SessionId(3)).unwrap();
        assert_eq!(waiting.reserve(SessionId(4)), Err(TransitionError::Busy));
        assert_eq!(waiting.phase(), Phase::Idle);
    }

    #[test]
    fn test_advance_walks_to_complete_then_stops() {
        let mut session = started(7);
        assert_eq!(session.advance(SessionId(7)), Ok(Phase::Analyzing));
        assert_eq!(session.advance(SessionId(7)), Ok(Phase::Finalizing));
        assert_eq!(session.advance(SessionId(7)), Ok(Phase::Complete));
        assert_eq!(session.advance(SessionId(7)), Err(TransitionError::Terminal));
        assert!(session.image().is_some());
    }

    #[test]
    fn test_stale_token_cannot_advance() {
        let mut session = started(1);
        session.reset();
        session.reserve(SessionId(2)).unwrap();
        session.begin(handle(2), ImageRef::new("y")).unwrap();

        assert_eq!(session.advance(SessionId(1)), Err(TransitionError::Stale));
        assert_eq!(session.phase(), Phase::Preparing);
    }

    #[test]
    fn test_reset_clears_image_and_is_idempotent() {
        let mut session = started(5);
        assert_eq!(session.reset(), Some(SessionId(5)));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.image().is_none());
        assert_eq!(session.reset(), None);
    }

    #[test]
    fn test_toggle_facing_leaves_session_alone() {
        let mut session = started(1);
        let before = (session.phase(), session.image().cloned());
        assert_eq!(session.toggle_facing(), CameraFacing::Front);
        assert_eq!(session.toggle_facing(), CameraFacing::Back);
        assert_eq!((session.phase(), session.image().cloned()), before);
    }

    #[test]
    fn test_snapshot_view() {
        let mut session = CaptureSession::default();
        assert_eq!(session.snapshot().view(), CaptureView::Loading);
        session.set_permission(PermissionKind::Camera, PermissionState::Denied);
        assert_eq!(session.snapshot().view(), CaptureView::PermissionRequest);
        session.set_permission(PermissionKind::Camera, PermissionState::Granted);
        assert_eq!(session.snapshot().view(), CaptureView::LiveCamera);

        session.reserve(SessionId(1)).unwrap();
        assert!(session.snapshot().awaiting_source);
        session.begin(handle(1), ImageRef::new("z")).unwrap();
        assert_eq!(session.snapshot().view(), CaptureView::Analyzing);
    }
}
