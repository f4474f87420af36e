//! Test Database Module
//!
//! Exercises the whole capture workflow without a camera, a photo library or
//! a person answering dialogs.
//!
//! # Features
//!
//! - **Mock Source**: Scriptable permissions, camera and picker
//! - **Scenarios**: Scripted user journeys with expected outcomes
//! - **Test Runner**: Execute scenarios and write a JSON report
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skinscan::testdb::{TestRunner, TestRunnerConfig};
//!
//! let mut runner = TestRunner::new();
//! let summary = runner.run_quick();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! let mut runner = TestRunner::with_config(TestRunnerConfig {
//!     verbose: true,
//!     ..Default::default()
//! });
//! let summary = runner.run_by_names(&["camera_capture", "picker_cancelled"]);
//! ```
//!
//! # Available Scenarios
//!
//! ## Happy Paths
//! - `camera_capture` - Capture and view the result
//! - `gallery_upload` - Upload from the photo library
//! - `first_launch_grant` - Permission granted from the dialog
//! - `front_camera_capture` - Capture with the front camera
//! - `slow_picker` - Dialogs that take a while to answer
//!
//! ## Permissions
//! - `camera_denied`, `permission_not_queried`, `gallery_denied`
//!
//! ## Source Failures
//! - `picker_cancelled`, `picker_failure`, `camera_fault`, `unreliable_camera`
//!
//! ## Cancellation and Concurrency
//! - `cancel_mid_analysis`, `restart_after_cancel`, `double_start`,
//!   `cancel_during_dialog`, `toggle_during_analysis`

pub mod mock_source;
pub mod runner;
pub mod scenarios;

// Re-export commonly used types for convenience
pub use mock_source::{MockCallCounts, MockImageSource, MockSourceConfig, PickerBehavior};
pub use runner::{ScenarioResult, TestRunner, TestRunnerConfig, TestSummary};
pub use scenarios::{ExpectedOutcome, ScenarioAction, ScenarioLibrary, TestScenario};

/// Quick function to run all tests with default settings
pub fn run_all_tests() -> TestSummary {
    let mut runner = TestRunner::with_config(TestRunnerConfig {
        verbose: true,
        ..Default::default()
    });
    runner.run_all()
}

/// Get a list of all available scenario names
pub fn list_scenario_names() -> Vec<String> {
    ScenarioLibrary::all_scenarios()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

/// Get a list of all available tags
pub fn list_tags() -> Vec<String> {
    let mut tags: Vec<String> = ScenarioLibrary::all_scenarios()
        .into_iter()
        .flat_map(|s| s.tags)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Print available scenarios to console
pub fn print_available_scenarios() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                AVAILABLE TEST SCENARIOS                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let scenarios = ScenarioLibrary::all_scenarios();

    // Group by first tag
    let mut by_category: std::collections::BTreeMap<String, Vec<&TestScenario>> =
        std::collections::BTreeMap::new();

    for scenario in &scenarios {
        let category = scenario
            .tags
            .first()
            .cloned()
            .unwrap_or_else(|| "other".to_string());
        by_category.entry(category).or_default().push(scenario);
    }

    for (category, scenarios) in &by_category {
        println!("📁 {}", category.to_uppercase());
        for scenario in scenarios {
            println!("   • {} - {}", scenario.name, scenario.description);
        }
        println!();
    }

    println!("Total: {} scenarios available\n", scenarios.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_functions() {
        let names = list_scenario_names();
        assert!(names.contains(&"camera_capture".to_string()));

        let tags = list_tags();
        assert!(tags.contains(&"error".to_string()));
        assert!(tags.windows(2).all(|w| w[0] < w[1]));
    }
}
