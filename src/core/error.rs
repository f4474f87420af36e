//! Error types for the capture workflow
//!
//! Every failure in the workflow is terminal for the current session and
//! leaves the controller idle. Nothing is retried automatically.

use crate::core::session::PermissionKind;
use thiserror::Error;

/// Main error type for the capture workflow
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The user declined camera or gallery access
    #[error("{} access was denied", .0.display_name())]
    PermissionDenied(PermissionKind),

    /// A capture was requested while another session is in flight
    #[error("A capture session is already in progress")]
    SessionAlreadyActive,

    /// The image source failed to produce an image
    #[error("Image source unavailable: {0}")]
    ImageSourceUnavailable(String),
}

impl CaptureError {
    /// Whether the presentation layer should swallow this error without
    /// showing anything to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, CaptureError::ImageSourceUnavailable(_))
    }

    /// User-facing notice (title, message) for errors that warrant one
    pub fn user_notice(&self) -> Option<Notice> {
        match self {
            CaptureError::PermissionDenied(kind) => Some(Notice::permission_required(*kind)),
            CaptureError::SessionAlreadyActive => Some(Notice::new(
                "Analysis In Progress",
                "Please wait for the current analysis to finish or cancel it first.",
            )),
            CaptureError::ImageSourceUnavailable(_) => None,
        }
    }
}

/// Informational notice shown by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    /// Create a new notice
    pub fn new(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    /// Notice shown when a permission is declined
    pub fn permission_required(kind: PermissionKind) -> Self {
        match kind {
            PermissionKind::Camera => Self::new(
                "Camera Access Required",
                "We need access to your camera to analyze your skin condition.",
            ),
            PermissionKind::Gallery => Self::new(
                "Permission Required",
                "We need access to your photo library to upload images for analysis.",
            ),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_source_failures_are_silent() {
        assert!(CaptureError::ImageSourceUnavailable("camera busy".into()).is_silent());
        assert!(!CaptureError::SessionAlreadyActive.is_silent());
        assert!(!CaptureError::PermissionDenied(PermissionKind::Camera).is_silent());
    }

    #[test]
    fn test_permission_denied_notice_matches_kind() {
        let notice = CaptureError::PermissionDenied(PermissionKind::Gallery)
            .user_notice()
            .unwrap();
        assert_eq!(notice.title, "Permission Required");
        assert!(notice.message.contains("photo library"));

        let notice = CaptureError::PermissionDenied(PermissionKind::Camera)
            .user_notice()
            .unwrap();
        assert_eq!(notice.title, "Camera Access Required");
    }

    #[test]
    fn test_every_error_is_silent_or_noticed() {
        let errors = [
            CaptureError::PermissionDenied(PermissionKind::Camera),
            CaptureError::PermissionDenied(PermissionKind::Gallery),
            CaptureError::SessionAlreadyActive,
            CaptureError::ImageSourceUnavailable("no frame".into()),
        ];
        for err in errors {
            assert_ne!(err.is_silent(), err.user_notice().is_some(), "{:?}", err);
        }
    }

    #[test]
    fn test_error_display() {
        let err = CaptureError::PermissionDenied(PermissionKind::Camera);
        assert_eq!(err.to_string(), "Camera access was denied");
        assert!(CaptureError::ImageSourceUnavailable("x".into())
            .user_notice()
            .is_none());
    }
}
