//! File-backed image source
//!
//! Stands in for the camera and the photo library when running on a desktop:
//! camera stills are simulated, and the "gallery" is a file path given up
//! front. Picked files must be decodable PNG or JPEG images.

use crate::core::error::{CaptureError, Result};
use crate::core::session::{CameraFacing, ImageRef, PermissionState};
use crate::source::traits::{ImageSourceProvider, PickOutcome};
use image::{ImageFormat, ImageReader};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Check that `path` is a readable PNG/JPEG and turn it into an [`ImageRef`]
pub fn validate_image(path: &Path) -> Result<ImageRef> {
    let unavailable = |msg: String| CaptureError::ImageSourceUnavailable(msg);

    let path = path
        .canonicalize()
        .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;

    let reader = ImageReader::open(&path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;

    match reader.format() {
        Some(ImageFormat::Png) | Some(ImageFormat::Jpeg) => {}
        Some(other) => {
            return Err(unavailable(format!(
                "{}: unsupported image format {:?}",
                path.display(),
                other
            )))
        }
        None => {
            return Err(unavailable(format!(
                "{}: not an image",
                path.display()
            )))
        }
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
    debug!("Validated {} ({}x{})", path.display(), width, height);

    Ok(ImageRef::new(format!("file://{}", path.display())))
}

/// Non-interactive provider: permissions are fixed, the gallery pick is a
/// preselected file (or a cancellation when none is given).
#[derive(Debug)]
pub struct FileImageSource {
    gallery_image: Option<PathBuf>,
    camera_permission: PermissionState,
    gallery_permission: PermissionState,
    stills_taken: AtomicU64,
}

impl FileImageSource {
    /// Provider with both permissions granted and no preselected image
    pub fn new() -> Self {
        Self {
            gallery_image: None,
            camera_permission: PermissionState::Granted,
            gallery_permission: PermissionState::Granted,
            stills_taken: AtomicU64::new(0),
        }
    }

    /// File returned by the next gallery pick
    pub fn with_gallery_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.gallery_image = Some(path.into());
        self
    }

    pub fn with_camera_permission(mut self, state: PermissionState) -> Self {
        self.camera_permission = state;
        self
    }

    pub fn with_gallery_permission(mut self, state: PermissionState) -> Self {
        self.gallery_permission = state;
        self
    }

    pub fn stills_taken(&self) -> u64 {
        self.stills_taken.load(Ordering::SeqCst)
    }

    pub(crate) fn simulated_still(&self, facing: CameraFacing) -> ImageRef {
        let n = self.stills_taken.fetch_add(1, Ordering::SeqCst) + 1;
        let taken = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        ImageRef::new(format!("camera://still/{}?facing={}&taken={}", n, facing, taken))
    }
}

impl Default for FileImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSourceProvider for FileImageSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn camera_permission_status(&self) -> PermissionState {
        self.camera_permission
    }

    async fn request_camera_permission(&self) -> PermissionState {
        self.camera_permission
    }

    async fn capture_still(&self, facing: CameraFacing) -> Result<ImageRef> {
        if !self.camera_permission.is_granted() {
            warn!("Capture requested without camera permission");
            return Err(CaptureError::ImageSourceUnavailable(
                "camera is not authorized".to_string(),
            ));
        }
        Ok(self.simulated_still(facing))
    }

    async fn request_gallery_permission(&self) -> PermissionState {
        self.gallery_permission
    }

    async fn pick_from_gallery(&self) -> Result<PickOutcome> {
        match &self.gallery_image {
            Some(path) => validate_image(path).map(PickOutcome::Picked),
            None => Ok(PickOutcome::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        image::RgbImage::new(4, 3).save(&path).unwrap();
        path
    }

    #[test]
    fn test_validate_png() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "lesion.png");
        let image = validate_image(&path).unwrap();
        assert!(image.uri().starts_with("file://"));
        assert!(image.uri().ends_with("lesion.png"));
    }

    #[test]
    fn test_validate_rejects_non_images() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "definitely not pixels").unwrap();
        let err = validate_image(&path).unwrap_err();
        assert!(err.is_silent());

        assert!(validate_image(&dir.path().join("missing.jpg")).is_err());
    }

    #[tokio::test]
    async fn test_pick_without_image_is_cancelled() {
        let source = FileImageSource::new();
        assert_eq!(
            source.pick_from_gallery().await.unwrap(),
            PickOutcome::Cancelled
        );
    }

    #[tokio::test]
    async fn test_pick_preselected_image() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "arm.png");
        let source = FileImageSource::new().with_gallery_image(&path);
        assert!(matches!(
            source.pick_from_gallery().await.unwrap(),
            PickOutcome::Picked(_)
        ));
    }

    #[tokio::test]
    async fn test_stills_are_numbered_and_carry_facing() {
        let source = FileImageSource::new();
        let first = source.capture_still(CameraFacing::Front).await.unwrap();
        let second = source.capture_still(CameraFacing::Back).await.unwrap();
        assert!(first.uri().starts_with("camera://still/1?facing=front"));
        assert!(second.uri().starts_with("camera://still/2?facing=back"));
        assert_eq!(source.stills_taken(), 2);
    }

    #[tokio::test]
    async fn test_denied_camera_cannot_capture() {
        let source = FileImageSource::new().with_camera_permission(PermissionState::Denied);
        assert_eq!(
            source.request_camera_permission().await,
            PermissionState::Denied
        );
        assert!(source.capture_still(CameraFacing::Back).await.is_err());
    }
}
