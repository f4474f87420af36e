//! Predefined workflow scenarios
//!
//! Each scenario pairs a mock image source with a script of user actions and
//! the outcome the controller must reach. They cover the normal capture and
//! upload paths, permission denials, picker cancellation, source failures,
//! cancellation and concurrent starts.

use super::mock_source::{MockSourceConfig, PickerBehavior};
use crate::core::session::{PermissionState, Phase};
use std::time::Duration;

/// One step a simulated user performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioAction {
    /// Query camera permission without prompting
    RefreshPermission,
    /// Show the camera permission dialog
    RequestPermission,
    /// Flip the camera
    ToggleFacing,
    /// Press the capture button
    StartCamera,
    /// Press the upload button
    StartUpload,
    /// Press the upload button, then cancel after a delay while the
    /// dialogs are still open
    StartUploadThenCancel(Duration),
    /// Press the back button
    Cancel,
    /// Navigate to the result screen
    Handoff,
    /// Wait until the session reaches a phase
    WaitForPhase(Phase),
    /// Let time pass
    Wait(Duration),
}

/// A complete test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Scenario name for identification
    pub name: String,
    /// Description of what this scenario tests
    pub description: String,
    /// Mock source behavior
    pub source: MockSourceConfig,
    /// Scripted user actions
    pub actions: Vec<ScenarioAction>,
    /// Expected outcome
    pub expected: ExpectedOutcome,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

/// Expected state after the script has run
#[derive(Debug, Clone)]
pub struct ExpectedOutcome {
    /// Phase the session ends in
    pub final_phase: Phase,
    /// Condition of the handed-off result, if one is expected
    pub result_condition: Option<String>,
    /// Confidence of the handed-off result
    pub result_confidence: Option<u8>,
    /// Substring the result image URI must contain
    pub image_contains: Option<String>,
    /// Error the last failing action must raise (matched against its debug form)
    pub expected_error: Option<String>,
    /// Whether a picker cancellation must have been observed
    pub picker_cancelled: bool,
}

impl Default for ExpectedOutcome {
    fn default() -> Self {
        Self {
            final_phase: Phase::Idle,
            result_condition: None,
            result_confidence: None,
            image_contains: None,
            expected_error: None,
            picker_cancelled: false,
        }
    }
}

impl ExpectedOutcome {
    fn camera_result() -> Self {
        Self {
            result_condition: Some("Sample Skin Condition".to_string()),
            result_confidence: Some(85),
            ..Default::default()
        }
    }

    fn upload_result() -> Self {
        Self {
            result_condition: Some("Uploaded Skin Condition".to_string()),
            result_confidence: Some(78),
            ..Default::default()
        }
    }

    fn error(name: &str) -> Self {
        Self {
            expected_error: Some(name.to_string()),
            ..Default::default()
        }
    }
}

impl TestScenario {
    /// Create a new test scenario
    pub fn new(
        name: &str,
        description: &str,
        source: MockSourceConfig,
        actions: Vec<ScenarioAction>,
        expected: ExpectedOutcome,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            source,
            actions,
            expected,
            tags: Vec::new(),
        }
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }
}

/// Collection of all predefined test scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    // =========================================================================
    // HAPPY PATHS
    // =========================================================================

    /// Scenario: capture with the back camera and view the result
    pub fn camera_capture() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "camera_capture",
            "Capture a still and follow the analysis to the result",
            MockSourceConfig::default(),
            vec![RefreshPermission, StartCamera, WaitForPhase(Phase::Complete), Handoff],
            ExpectedOutcome {
                image_contains: Some("back".to_string()),
                ..ExpectedOutcome::camera_result()
            },
        )
        .with_tags(vec!["camera", "happy-path"])
    }

    /// Scenario: pick an image from the gallery
    pub fn gallery_upload() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "gallery_upload",
            "Upload an image from the photo library",
            MockSourceConfig::default(),
            vec![StartUpload, WaitForPhase(Phase::Complete), Handoff],
            ExpectedOutcome {
                image_contains: Some("content://".to_string()),
                ..ExpectedOutcome::upload_result()
            },
        )
        .with_tags(vec!["upload", "happy-path"])
    }

    /// Scenario: first launch, permission granted from the dialog
    pub fn first_launch_grant() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "first_launch_grant",
            "Camera permission is unknown until the user allows it",
            MockSourceConfig {
                initial_camera_status: PermissionState::Unknown,
                ..Default::default()
            },
            vec![
                RefreshPermission,
                RequestPermission,
                StartCamera,
                WaitForPhase(Phase::Complete),
                Handoff,
            ],
            ExpectedOutcome::camera_result(),
        )
        .with_tags(vec!["camera", "permission", "happy-path"])
    }

    /// Scenario: switch to the front camera before capturing
    pub fn front_camera_capture() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "front_camera_capture",
            "The still is taken with the camera selected at capture time",
            MockSourceConfig::default(),
            vec![
                RefreshPermission,
                ToggleFacing,
                StartCamera,
                WaitForPhase(Phase::Complete),
                Handoff,
            ],
            ExpectedOutcome {
                image_contains: Some("front".to_string()),
                ..ExpectedOutcome::camera_result()
            },
        )
        .with_tags(vec!["camera", "facing"])
    }

    /// Scenario: the user takes a while in the dialogs
    pub fn slow_picker() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "slow_picker",
            "Permission dialog and picker take time to answer",
            MockSourceConfig {
                dialog_delay: Duration::from_millis(150),
                ..Default::default()
            },
            vec![StartUpload, WaitForPhase(Phase::Complete), Handoff],
            ExpectedOutcome::upload_result(),
        )
        .with_tags(vec!["upload", "timing"])
    }

    // =========================================================================
    // PERMISSION SCENARIOS
    // =========================================================================

    /// Scenario: camera access declined
    pub fn camera_denied() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "camera_denied",
            "Capture is refused while camera permission is denied",
            MockSourceConfig {
                initial_camera_status: PermissionState::Denied,
                grant_camera: false,
                ..Default::default()
            },
            vec![RefreshPermission, RequestPermission, StartCamera],
            ExpectedOutcome::error("PermissionDenied(Camera)"),
        )
        .with_tags(vec!["camera", "permission", "error"])
    }

    /// Scenario: capture before permission was ever queried
    pub fn permission_not_queried() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "permission_not_queried",
            "Capture is refused while camera permission is still unknown",
            MockSourceConfig::default(),
            vec![StartCamera],
            ExpectedOutcome::error("PermissionDenied(Camera)"),
        )
        .with_tags(vec!["camera", "permission", "error"])
    }

    /// Scenario: photo library access declined
    pub fn gallery_denied() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "gallery_denied",
            "Upload stops with a notice when library access is declined",
            MockSourceConfig {
                grant_gallery: false,
                ..Default::default()
            },
            vec![StartUpload],
            ExpectedOutcome::error("PermissionDenied(Gallery)"),
        )
        .with_tags(vec!["upload", "permission", "error"])
    }

    // =========================================================================
    // SOURCE FAILURES
    // =========================================================================

    /// Scenario: the user closes the picker
    pub fn picker_cancelled() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "picker_cancelled",
            "Closing the picker leaves the controller idle without an error",
            MockSourceConfig {
                picker: PickerBehavior::Cancel,
                ..Default::default()
            },
            vec![StartUpload],
            ExpectedOutcome {
                picker_cancelled: true,
                ..Default::default()
            },
        )
        .with_tags(vec!["upload", "cancel"])
    }

    /// Scenario: the picker cannot deliver the file
    pub fn picker_failure() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "picker_failure",
            "An unreadable pick aborts silently back to idle",
            MockSourceConfig {
                picker: PickerBehavior::Fail("file vanished".to_string()),
                ..Default::default()
            },
            vec![StartUpload],
            ExpectedOutcome::error("ImageSourceUnavailable"),
        )
        .with_tags(vec!["upload", "error"])
    }

    /// Scenario: camera hardware fault
    pub fn camera_fault() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "camera_fault",
            "A failed capture aborts silently back to idle",
            MockSourceConfig {
                camera_fails: true,
                ..Default::default()
            },
            vec![RefreshPermission, StartCamera],
            ExpectedOutcome::error("ImageSourceUnavailable"),
        )
        .with_tags(vec!["camera", "error"])
    }

    /// Scenario: every capture fails at random
    pub fn unreliable_camera() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "unreliable_camera",
            "Random source failures never leave a session behind",
            MockSourceConfig {
                random_failure_rate: 100,
                ..Default::default()
            },
            vec![RefreshPermission, StartCamera, StartCamera],
            ExpectedOutcome::error("ImageSourceUnavailable"),
        )
        .with_tags(vec!["camera", "error", "flaky"])
    }

    // =========================================================================
    // CANCELLATION AND CONCURRENCY
    // =========================================================================

    /// Scenario: back button during analysis
    pub fn cancel_mid_analysis() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "cancel_mid_analysis",
            "Cancelling during analysis discards the session and its timers",
            MockSourceConfig::default(),
            vec![
                RefreshPermission,
                StartCamera,
                WaitForPhase(Phase::Analyzing),
                Cancel,
                Wait(Duration::from_millis(200)),
                Cancel,
            ],
            ExpectedOutcome::default(),
        )
        .with_tags(vec!["camera", "cancel"])
    }

    /// Scenario: cancel, then capture again
    pub fn restart_after_cancel() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "restart_after_cancel",
            "A new session after a cancel completes normally",
            MockSourceConfig::default(),
            vec![
                RefreshPermission,
                StartCamera,
                Cancel,
                StartUpload,
                WaitForPhase(Phase::Complete),
                Handoff,
            ],
            ExpectedOutcome::upload_result(),
        )
        .with_tags(vec!["cancel", "upload"])
    }

    /// Scenario: capture pressed twice
    pub fn double_start() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "double_start",
            "A second start while analyzing is rejected and the first finishes",
            MockSourceConfig::default(),
            vec![
                RefreshPermission,
                StartCamera,
                StartUpload,
                WaitForPhase(Phase::Complete),
            ],
            ExpectedOutcome {
                final_phase: Phase::Complete,
                expected_error: Some("SessionAlreadyActive".to_string()),
                ..Default::default()
            },
        )
        .with_tags(vec!["concurrency", "error"])
    }

    /// Scenario: back button while the dialogs are open
    pub fn cancel_during_dialog() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "cancel_during_dialog",
            "Cancelling while the permission dialog is open drops the pending start",
            MockSourceConfig {
                dialog_delay: Duration::from_millis(100),
                ..Default::default()
            },
            vec![
                StartUploadThenCancel(Duration::from_millis(20)),
                Wait(Duration::from_millis(100)),
            ],
            ExpectedOutcome::default(),
        )
        .with_tags(vec!["upload", "cancel", "concurrency"])
    }

    /// Scenario: camera flipped during analysis
    pub fn toggle_during_analysis() -> TestScenario {
        use ScenarioAction::*;
        TestScenario::new(
            "toggle_during_analysis",
            "Flipping the camera never disturbs a running analysis",
            MockSourceConfig::default(),
            vec![
                RefreshPermission,
                StartCamera,
                ToggleFacing,
                WaitForPhase(Phase::Finalizing),
                ToggleFacing,
                WaitForPhase(Phase::Complete),
                Handoff,
            ],
            ExpectedOutcome {
                image_contains: Some("back".to_string()),
                ..ExpectedOutcome::camera_result()
            },
        )
        .with_tags(vec!["camera", "facing", "concurrency"])
    }

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<TestScenario> {
        vec![
            Self::camera_capture(),
            Self::gallery_upload(),
            Self::first_launch_grant(),
            Self::front_camera_capture(),
            Self::slow_picker(),
            Self::camera_denied(),
            Self::permission_not_queried(),
            Self::gallery_denied(),
            Self::picker_cancelled(),
            Self::picker_failure(),
            Self::camera_fault(),
            Self::unreliable_camera(),
            Self::cancel_mid_analysis(),
            Self::restart_after_cancel(),
            Self::double_start(),
            Self::cancel_during_dialog(),
            Self::toggle_during_analysis(),
        ]
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<TestScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Get quick test scenarios (fast to run)
    pub fn quick_scenarios() -> Vec<TestScenario> {
        vec![
            Self::camera_capture(),
            Self::gallery_upload(),
            Self::camera_denied(),
            Self::picker_cancelled(),
            Self::cancel_mid_analysis(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_scenarios_load() {
        let scenarios = ScenarioLibrary::all_scenarios();
        assert!(!scenarios.is_empty());
        let names: HashSet<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), scenarios.len(), "scenario names must be unique");
    }

    #[test]
    fn test_scenario_by_tag() {
        let error_scenarios = ScenarioLibrary::scenarios_by_tag("error");
        assert!(!error_scenarios.is_empty());
        for s in &error_scenarios {
            assert!(s.tags.contains(&"error".to_string()));
            assert!(s.expected.expected_error.is_some());
        }
    }

    #[test]
    fn test_quick_scenarios() {
        let quick = ScenarioLibrary::quick_scenarios();
        assert_eq!(quick.len(), 5);
    }
}
