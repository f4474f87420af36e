//! Image source module
//!
//! This module abstracts where a capture session's image comes from: a
//! camera still or a gallery pick, each gated by an OS permission.
//!
//! # Submodules
//!
//! - `traits` - The [`ImageSourceProvider`] contract consumed by the controller
//! - `file` - File-backed provider that validates picked images on disk
//! - `prompt` - Interactive terminal provider (permission dialogs and picker)
//!
//! # Architecture
//!
//! The controller only talks to [`ImageSourceProvider`]. Real providers, the
//! interactive terminal provider and the scripted mock in `testdb` all
//! implement it, so the workflow can be exercised without a camera.

pub mod file;
pub mod prompt;
pub mod traits;

pub use file::{validate_image, FileImageSource};
pub use prompt::PromptImageSource;
pub use traits::{ImageSourceProvider, PickOutcome};
