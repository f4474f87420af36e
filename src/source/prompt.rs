//! Interactive terminal image source
//!
//! Plays the part of the OS permission dialogs and the photo picker using
//! terminal prompts. Prompts block, so they run on tokio's blocking pool
//! instead of the runtime thread.

use crate::core::error::{CaptureError, Result};
use crate::core::session::{CameraFacing, ImageRef, PermissionState};
use crate::source::file::{validate_image, FileImageSource};
use crate::source::traits::{ImageSourceProvider, PickOutcome};
use dialoguer::{Confirm, Input};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Mutex;

/// Provider that asks the user on the terminal
#[derive(Debug, Default)]
pub struct PromptImageSource {
    /// Simulated camera
    camera: FileImageSource,
    camera_permission: Mutex<PermissionState>,
}

impl PromptImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_camera_permission(&self) -> PermissionState {
        self.camera_permission
            .lock()
            .map(|p| *p)
            .unwrap_or(PermissionState::Unknown)
    }

    async fn confirm(prompt: &'static str) -> PermissionState {
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(true)) => PermissionState::Granted,
            Ok(Ok(false)) => PermissionState::Denied,
            Ok(Err(e)) => {
                debug!("Permission prompt failed: {}", e);
                PermissionState::Denied
            }
            Err(e) => {
                debug!("Permission prompt task failed: {}", e);
                PermissionState::Denied
            }
        }
    }
}

impl ImageSourceProvider for PromptImageSource {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn camera_permission_status(&self) -> PermissionState {
        self.current_camera_permission()
    }

    async fn request_camera_permission(&self) -> PermissionState {
        let state = Self::confirm("Allow skinscan to access the camera?").await;
        if let Ok(mut current) = self.camera_permission.lock() {
            *current = state;
        }
        info!("Camera permission {}", state);
        state
    }

    async fn capture_still(&self, facing: CameraFacing) -> Result<ImageRef> {
        if !self.current_camera_permission().is_granted() {
            return Err(CaptureError::ImageSourceUnavailable(
                "camera is not authorized".to_string(),
            ));
        }
        Ok(self.camera.simulated_still(facing))
    }

    async fn request_gallery_permission(&self) -> PermissionState {
        Self::confirm("Allow skinscan to access your photo library?").await
    }

    async fn pick_from_gallery(&self) -> Result<PickOutcome> {
        let answer = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("Image to analyze (leave empty to cancel)")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|e| CaptureError::ImageSourceUnavailable(e.to_string()))?
        .map_err(|e| CaptureError::ImageSourceUnavailable(e.to_string()))?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(PickOutcome::Cancelled);
        }
        validate_image(&PathBuf::from(answer)).map(PickOutcome::Picked)
    }
}
