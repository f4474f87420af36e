//! Mock image source
//!
//! Simulated camera, permission dialogs and photo picker with configurable
//! behavior, so every workflow path can be exercised without a device or a
//! user at the keyboard.

use crate::core::error::{CaptureError, Result};
use crate::core::session::{CameraFacing, ImageRef, PermissionState};
use crate::source::traits::{ImageSourceProvider, PickOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the simulated gallery picker does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerBehavior {
    /// Return this image URI
    Pick(String),
    /// The user backs out of the picker
    Cancel,
    /// The picker fails to deliver a file
    Fail(String),
}

/// Configuration for mock source behavior
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// Camera status reported before any dialog
    pub initial_camera_status: PermissionState,
    /// Answer given to the camera permission dialog
    pub grant_camera: bool,
    /// Answer given to the photo library permission dialog
    pub grant_gallery: bool,
    /// Gallery picker outcome
    pub picker: PickerBehavior,
    /// Camera hardware fails on capture
    pub camera_fails: bool,
    /// Simulate random capture/pick failures (percentage 0-100)
    pub random_failure_rate: u8,
    /// Time the simulated user spends in each dialog or picker
    pub dialog_delay: Duration,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            initial_camera_status: PermissionState::Granted,
            grant_camera: true,
            grant_gallery: true,
            picker: PickerBehavior::Pick("content://media/external/images/1".to_string()),
            camera_fails: false,
            random_failure_rate: 0,
            dialog_delay: Duration::ZERO,
        }
    }
}

/// Call counters, useful for asserting what the controller asked for
#[derive(Debug, Default)]
pub struct MockCallCounts {
    pub status_queries: AtomicUsize,
    pub camera_requests: AtomicUsize,
    pub captures: AtomicUsize,
    pub gallery_requests: AtomicUsize,
    pub picks: AtomicUsize,
}

impl MockCallCounts {
    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Scriptable [`ImageSourceProvider`]
#[derive(Debug)]
pub struct MockImageSource {
    config: MockSourceConfig,
    camera_status: Mutex<PermissionState>,
    calls: MockCallCounts,
}

impl MockImageSource {
    /// Mock with everything granted and a picker that returns an image
    pub fn new() -> Self {
        Self::with_config(MockSourceConfig::default())
    }

    pub fn with_config(config: MockSourceConfig) -> Self {
        Self {
            camera_status: Mutex::new(config.initial_camera_status),
            config,
            calls: MockCallCounts::default(),
        }
    }

    /// Camera permission already declined and declined again when asked
    pub fn camera_denied() -> Self {
        Self::with_config(MockSourceConfig {
            initial_camera_status: PermissionState::Denied,
            grant_camera: false,
            ..Default::default()
        })
    }

    /// Photo library access declined
    pub fn gallery_denied() -> Self {
        Self::with_config(MockSourceConfig {
            grant_gallery: false,
            ..Default::default()
        })
    }

    pub fn with_picker(picker: PickerBehavior) -> Self {
        Self::with_config(MockSourceConfig {
            picker,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &MockSourceConfig {
        &self.config
    }

    pub fn calls(&self) -> &MockCallCounts {
        &self.calls
    }

    fn current_camera_status(&self) -> PermissionState {
        self.camera_status
            .lock()
            .map(|s| *s)
            .unwrap_or(PermissionState::Unknown)
    }

    async fn user_think_time(&self) {
        if !self.config.dialog_delay.is_zero() {
            tokio::time::sleep(self.config.dialog_delay).await;
        }
    }

    fn roll_failure(&self, what: &str) -> Result<()> {
        if self.config.random_failure_rate > 0 {
            let roll = rand::random::<u8>() % 100;
            if roll < self.config.random_failure_rate {
                return Err(CaptureError::ImageSourceUnavailable(format!(
                    "Random simulated {} failure",
                    what
                )));
            }
        }
        Ok(())
    }
}

impl Default for MockImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSourceProvider for MockImageSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn camera_permission_status(&self) -> PermissionState {
        MockCallCounts::bump(&self.calls.status_queries);
        self.current_camera_status()
    }

    async fn request_camera_permission(&self) -> PermissionState {
        MockCallCounts::bump(&self.calls.camera_requests);
        self.user_think_time().await;
        let state = if self.config.grant_camera {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        if let Ok(mut current) = self.camera_status.lock() {
            *current = state;
        }
        state
    }

    async fn capture_still(&self, facing: CameraFacing) -> Result<ImageRef> {
        let n = MockCallCounts::bump(&self.calls.captures);
        if self.config.camera_fails {
            return Err(CaptureError::ImageSourceUnavailable(
                "Simulated camera fault".to_string(),
            ));
        }
        self.roll_failure("capture")?;
        Ok(ImageRef::new(format!("mock://camera/{}/{}.jpg", facing, n)))
    }

    async fn request_gallery_permission(&self) -> PermissionState {
        MockCallCounts::bump(&self.calls.gallery_requests);
        self.user_think_time().await;
        if self.config.grant_gallery {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn pick_from_gallery(&self) -> Result<PickOutcome> {
        MockCallCounts::bump(&self.calls.picks);
        self.user_think_time().await;
        self.roll_failure("picker")?;
        match &self.config.picker {
            PickerBehavior::Pick(uri) => Ok(PickOutcome::Picked(ImageRef::new(uri.clone()))),
            PickerBehavior::Cancel => Ok(PickOutcome::Cancelled),
            PickerBehavior::Fail(reason) => {
                Err(CaptureError::ImageSourceUnavailable(reason.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_mock_grants_everything() {
        let source = MockImageSource::new();
        assert!(source.camera_permission_status().await.is_granted());
        assert!(source.request_gallery_permission().await.is_granted());
        assert!(matches!(
            source.pick_from_gallery().await.unwrap(),
            PickOutcome::Picked(_)
        ));
    }

    #[tokio::test]
    async fn test_denied_camera_stays_denied() {
        let source = MockImageSource::camera_denied();
        assert_eq!(
            source.camera_permission_status().await,
            PermissionState::Denied
        );
        assert_eq!(
            source.request_camera_permission().await,
            PermissionState::Denied
        );
        assert_eq!(source.calls().camera_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_updates_reported_status() {
        let source = MockImageSource::with_config(MockSourceConfig {
            initial_camera_status: PermissionState::Unknown,
            ..Default::default()
        });
        assert_eq!(
            source.camera_permission_status().await,
            PermissionState::Unknown
        );
        source.request_camera_permission().await;
        assert!(source.camera_permission_status().await.is_granted());
    }

    #[tokio::test]
    async fn test_picker_behaviors() {
        let cancel = MockImageSource::with_picker(PickerBehavior::Cancel);
        assert_eq!(
            cancel.pick_from_gallery().await.unwrap(),
            PickOutcome::Cancelled
        );

        let fail = MockImageSource::with_picker(PickerBehavior::Fail("gone".into()));
        assert!(fail.pick_from_gallery().await.unwrap_err().is_silent());
    }

    #[tokio::test]
    async fn test_captures_are_counted() {
        let source = MockImageSource::new();
        let image = source.capture_still(CameraFacing::Front).await.unwrap();
        assert_eq!(image.uri(), "mock://camera/front/1.jpg");
        assert_eq!(source.calls().captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_total_failure_rate_always_fails() {
        let source = MockImageSource::with_config(MockSourceConfig {
            random_failure_rate: 100,
            ..Default::default()
        });
        assert!(source.capture_still(CameraFacing::Back).await.is_err());
    }
}
