//! Image source abstraction
//!
//! Defines the contract between the capture controller and whatever supplies
//! images. Every call may wait on the user (a permission dialog, a file
//! picker) for as long as it takes; the controller imposes no timeout.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use skinscan::source::{ImageSourceProvider, PickOutcome};
//!
//! async fn pick<P: ImageSourceProvider>(source: &P) -> Option<String> {
//!     if !source.request_gallery_permission().await.is_granted() {
//!         return None;
//!     }
//!     match source.pick_from_gallery().await.ok()? {
//!         PickOutcome::Picked(image) => Some(image.uri().to_string()),
//!         PickOutcome::Cancelled => None,
//!     }
//! }
//! ```

use crate::core::error::Result;
use crate::core::session::{CameraFacing, ImageRef, PermissionState};
use std::future::Future;

/// Outcome of a gallery picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The user selected an image
    Picked(ImageRef),
    /// The user closed the picker without choosing
    Cancelled,
}

/// Supplier of camera stills and gallery picks
///
/// Denied permissions are ordinary results, not errors. Errors from
/// [`capture_still`](Self::capture_still) and
/// [`pick_from_gallery`](Self::pick_from_gallery) mean the source could not
/// produce an image (hardware fault, unreadable file).
pub trait ImageSourceProvider: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Current camera authorization, without prompting
    fn camera_permission_status(&self) -> impl Future<Output = PermissionState> + Send;

    /// Prompt for camera access
    fn request_camera_permission(&self) -> impl Future<Output = PermissionState> + Send;

    /// Take a still with the given camera
    fn capture_still(&self, facing: CameraFacing)
        -> impl Future<Output = Result<ImageRef>> + Send;

    /// Prompt for photo library access
    fn request_gallery_permission(&self) -> impl Future<Output = PermissionState> + Send;

    /// Let the user pick one image from the photo library
    fn pick_from_gallery(&self) -> impl Future<Output = Result<PickOutcome>> + Send;
}
