//! Test runner for executing scenarios and generating reports
//!
//! Each scenario gets its own controller over a [`MockImageSource`] and a
//! fresh single-threaded tokio runtime. Phase delays are shortened so the
//! whole library runs in a couple of seconds.

use super::mock_source::MockImageSource;
use super::scenarios::{ExpectedOutcome, ScenarioAction, ScenarioLibrary, TestScenario};
use crate::core::config::TimingsConfig;
use crate::core::error::CaptureError;
use crate::core::report::AnalysisResult;
use crate::core::session::Phase;
use crate::ui::controller::{CaptureController, ControllerSettings};
use crate::ui::events::{CaptureEvent, UiEvent};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of running a single test scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the test passed
    pub passed: bool,
    /// Execution time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Phase the controller ended in
    pub final_phase: Option<Phase>,
    /// Sessions that reached `Preparing`
    pub sessions_started: usize,
    /// Events emitted by the controller
    pub events: usize,
    /// Detailed message
    pub message: String,
    /// Failure reason (if any)
    pub failure_reason: Option<String>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl ScenarioResult {
    /// Create a new passing result
    pub fn passed(name: &str, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            duration,
            final_phase: None,
            sessions_started: 0,
            events: 0,
            message: "Test passed".to_string(),
            failure_reason: None,
        }
    }

    /// Create a new failing result
    pub fn failed(name: &str, duration: Duration, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            duration,
            final_phase: None,
            sessions_started: 0,
            events: 0,
            message: format!("Test failed: {}", reason),
            failure_reason: Some(reason.to_string()),
        }
    }

    fn with_stats(mut self, stats: &ExecutionStats) -> Self {
        self.final_phase = Some(stats.final_phase);
        self.sessions_started = stats.sessions_started;
        self.events = stats.events;
        self
    }
}

/// Summary of test run results
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    /// Total scenarios run
    pub total: usize,
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Total execution time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
    /// Names of failed scenarios
    pub failures: Vec<String>,
}

impl TestSummary {
    /// Calculate pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Get all failed scenario names
    pub fn failed_scenarios(&self) -> Vec<&str> {
        self.failures.iter().map(String::as_str).collect()
    }
}

/// Configuration for test runner
#[derive(Debug, Clone)]
pub struct TestRunnerConfig {
    /// Whether to run in verbose mode
    pub verbose: bool,
    /// Whether to stop on first failure
    pub fail_fast: bool,
    /// Filter scenarios by tags
    pub tag_filter: Option<Vec<String>>,
    /// Filter scenarios by name pattern
    pub name_filter: Option<String>,
    /// Output directory for the JSON report
    pub report_dir: Option<String>,
    /// Delay between phases during scenarios
    pub phase_delay_ms: u64,
    /// Longest a `WaitForPhase` step may take
    pub wait_timeout: Duration,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            fail_fast: false,
            tag_filter: None,
            name_filter: None,
            report_dir: None,
            phase_delay_ms: 20,
            wait_timeout: Duration::from_secs(5),
        }
    }
}

/// What a scenario script produced
#[derive(Debug)]
struct ExecutionStats {
    final_phase: Phase,
    last_error: Option<CaptureError>,
    handed_off: Option<AnalysisResult>,
    picker_cancelled: bool,
    sessions_started: usize,
    events: usize,
}

/// Test runner for executing scenarios
pub struct TestRunner {
    /// Configuration
    config: TestRunnerConfig,
    /// Results from test runs
    results: Vec<ScenarioResult>,
    /// Start time of test run
    start_time: Option<Instant>,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(TestRunnerConfig::default())
    }

    /// Create a new test runner with configuration
    pub fn with_config(config: TestRunnerConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
            start_time: None,
        }
    }

    /// Run all available scenarios
    pub fn run_all(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::all_scenarios())
    }

    /// Run quick test scenarios only
    pub fn run_quick(&mut self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::quick_scenarios())
    }

    /// Run scenarios filtered by tag
    pub fn run_by_tag(&mut self, tag: &str) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::scenarios_by_tag(tag))
    }

    /// Run specific scenarios by name
    pub fn run_by_names(&mut self, names: &[&str]) -> TestSummary {
        let scenarios: Vec<_> = ScenarioLibrary::all_scenarios()
            .into_iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect();
        self.run_scenarios(scenarios)
    }

    /// Run a list of scenarios
    pub fn run_scenarios(&mut self, scenarios: Vec<TestScenario>) -> TestSummary {
        self.start_time = Some(Instant::now());
        self.results.clear();

        let filtered_scenarios = self.filter_scenarios(scenarios);

        if self.config.verbose {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                  SKINSCAN - SCENARIO RUNNER                  ║");
            println!("╠══════════════════════════════════════════════════════════════╣");
            println!(
                "║  Running {} scenario(s)                                       ",
                filtered_scenarios.len()
            );
            println!("╚══════════════════════════════════════════════════════════════╝\n");
        }

        for scenario in filtered_scenarios {
            let result = self.run_single_scenario(scenario);

            if self.config.verbose {
                self.print_result(&result);
            }

            let should_stop = self.config.fail_fast && !result.passed;
            self.results.push(result);

            if should_stop {
                if self.config.verbose {
                    println!("\n⚠️  Stopping early due to fail-fast mode\n");
                }
                break;
            }
        }

        let summary = self.generate_summary();

        if self.config.verbose {
            self.print_summary(&summary);
        }

        if let Some(ref dir) = self.config.report_dir {
            if let Err(e) = self.generate_json_report(dir, &summary) {
                eprintln!("Failed to write JSON report: {}", e);
            }
        }

        summary
    }

    /// Filter scenarios based on configuration
    fn filter_scenarios(&self, scenarios: Vec<TestScenario>) -> Vec<TestScenario> {
        let mut filtered = scenarios;

        if let Some(ref tags) = self.config.tag_filter {
            filtered.retain(|s| s.tags.iter().any(|t| tags.contains(t)));
        }

        if let Some(ref pattern) = self.config.name_filter {
            let pattern_lower = pattern.to_lowercase();
            filtered.retain(|s| s.name.to_lowercase().contains(&pattern_lower));
        }

        filtered
    }

    /// Run a single scenario
    fn run_single_scenario(&self, scenario: TestScenario) -> ScenarioResult {
        let start = Instant::now();

        if self.config.verbose {
            println!("▶ Running: {} - {}", scenario.name, scenario.description);
        }

        let outcome = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("failed to build runtime: {}", e))
            .and_then(|rt| rt.block_on(self.execute_scenario(&scenario)));

        let duration = start.elapsed();

        match outcome {
            Ok(stats) => match Self::compare_results(&stats, &scenario.expected) {
                Ok(()) => ScenarioResult::passed(&scenario.name, duration).with_stats(&stats),
                Err(reason) => {
                    ScenarioResult::failed(&scenario.name, duration, &reason).with_stats(&stats)
                }
            },
            Err(reason) => ScenarioResult::failed(&scenario.name, duration, &reason),
        }
    }

    /// Execute a scenario script against a fresh controller
    async fn execute_scenario(&self, scenario: &TestScenario) -> Result<ExecutionStats, String> {
        let settings = ControllerSettings::default()
            .timings(TimingsConfig::uniform(self.config.phase_delay_ms));
        let source = MockImageSource::with_config(scenario.source.clone());
        let controller = CaptureController::new(source, settings);

        let mut last_error = None;
        let mut handed_off = None;

        for action in &scenario.actions {
            debug!("[{}] {:?}", scenario.name, action);
            match action {
                ScenarioAction::RefreshPermission => {
                    controller.refresh_permission().await;
                }
                ScenarioAction::RequestPermission => {
                    controller.request_permission().await;
                }
                ScenarioAction::ToggleFacing => {
                    controller.toggle_facing();
                }
                ScenarioAction::StartCamera => {
                    if let Err(e) = controller.start_capture_from_camera().await {
                        last_error = Some(e);
                    }
                }
                ScenarioAction::StartUpload => {
                    if let Err(e) = controller.start_capture_from_upload().await {
                        last_error = Some(e);
                    }
                }
                ScenarioAction::StartUploadThenCancel(after) => {
                    let (started, _) = tokio::join!(controller.start_capture_from_upload(), async {
                        tokio::time::sleep(*after).await;
                        controller.cancel_session()
                    });
                    match started {
                        Ok(Some(handle)) => {
                            return Err(format!(
                                "session {} started despite the cancel",
                                handle.id
                            ))
                        }
                        Ok(None) => {}
                        Err(e) => last_error = Some(e),
                    }
                }
                ScenarioAction::Cancel => {
                    controller.cancel_session();
                }
                ScenarioAction::Handoff => {
                    handed_off = controller.complete_handoff();
                    if handed_off.is_none() {
                        return Err("handoff requested before the session completed".to_string());
                    }
                }
                ScenarioAction::WaitForPhase(target) => {
                    self.wait_for_phase(&controller, *target).await?;
                }
                ScenarioAction::Wait(duration) => {
                    tokio::time::sleep(*duration).await;
                }
            }
        }

        let events = controller.drain_events();
        let sessions_started = events
            .iter()
            .filter(|e| matches!(e, UiEvent::Capture(CaptureEvent::SessionStarted { .. })))
            .count();
        let picker_cancelled = events
            .iter()
            .any(|e| matches!(e, UiEvent::Capture(CaptureEvent::PickerCancelled { .. })));

        Ok(ExecutionStats {
            final_phase: controller.phase(),
            last_error,
            handed_off,
            picker_cancelled,
            sessions_started,
            events: events.len(),
        })
    }

    /// Poll until the session has reached `target` (or gone past it)
    async fn wait_for_phase(
        &self,
        controller: &CaptureController<MockImageSource>,
        target: Phase,
    ) -> Result<(), String> {
        let deadline = Instant::now() + self.config.wait_timeout;
        loop {
            let phase = controller.phase();
            if phase >= target {
                return Ok(());
            }
            if phase == Phase::Idle && !controller.is_active() {
                return Err(format!("session went idle while waiting for {}", target));
            }
            if Instant::now() >= deadline {
                return Err(format!("timed out waiting for {} (at {})", target, phase));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Compare actual results with expected results
    fn compare_results(actual: &ExecutionStats, expected: &ExpectedOutcome) -> Result<(), String> {
        if actual.final_phase != expected.final_phase {
            return Err(format!(
                "ended in {}, expected {}",
                actual.final_phase, expected.final_phase
            ));
        }

        match (&expected.expected_error, &actual.last_error) {
            (Some(want), Some(got)) if !format!("{:?}", got).contains(want.as_str()) => {
                return Err(format!("expected error {}, got {:?}", want, got));
            }
            (Some(want), None) => return Err(format!("expected error {}, got none", want)),
            (None, Some(got)) => return Err(format!("unexpected error {:?}", got)),
            _ => {}
        }

        if expected.picker_cancelled != actual.picker_cancelled {
            return Err(format!(
                "picker cancellation observed: {}, expected {}",
                actual.picker_cancelled, expected.picker_cancelled
            ));
        }

        if let Some(ref condition) = expected.result_condition {
            let result = actual
                .handed_off
                .as_ref()
                .ok_or_else(|| "no result was handed off".to_string())?;
            if &result.condition != condition {
                return Err(format!("result was {}, expected {}", result.condition, condition));
            }
            if let Some(confidence) = expected.result_confidence {
                if result.confidence.percent() != confidence {
                    return Err(format!(
                        "confidence was {}, expected {}%",
                        result.confidence, confidence
                    ));
                }
            }
            if let Some(ref fragment) = expected.image_contains {
                let uri = result.image.as_ref().map(|i| i.uri()).unwrap_or_default();
                if !uri.contains(fragment.as_str()) {
                    return Err(format!("image '{}' does not contain '{}'", uri, fragment));
                }
            }
        }

        Ok(())
    }

    /// Generate summary from results
    fn generate_summary(&self) -> TestSummary {
        TestSummary {
            total: self.results.len(),
            passed: self.results.iter().filter(|r| r.passed).count(),
            failed: self.results.iter().filter(|r| !r.passed).count(),
            total_duration: self
                .start_time
                .map(|s| s.elapsed())
                .unwrap_or(Duration::ZERO),
            failures: self
                .results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| r.name.clone())
                .collect(),
        }
    }

    /// Print a single result to console
    fn print_result(&self, result: &ScenarioResult) {
        let status = if result.passed {
            "✓ PASS"
        } else {
            "✗ FAIL"
        };
        let status_color = if result.passed {
            "\x1b[32m"
        } else {
            "\x1b[31m"
        };

        println!(
            "  {}{}\x1b[0m - {} ({:.2}ms)",
            status_color,
            status,
            result.name,
            result.duration.as_secs_f64() * 1000.0
        );

        if let Some(ref reason) = result.failure_reason {
            println!("      └─ Reason: {}", reason);
        }
    }

    /// Print summary to console
    fn print_summary(&self, summary: &TestSummary) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                        TEST SUMMARY                          ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!(
            "║  Total:    {:>4}                                              ║",
            summary.total
        );
        println!(
            "║  Passed:   {:>4} \x1b[32m✓\x1b[0m                                             ║",
            summary.passed
        );
        println!(
            "║  Failed:   {:>4} \x1b[31m✗\x1b[0m                                             ║",
            summary.failed
        );
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!(
            "║  Pass Rate: {:>5.1}%                                          ║",
            summary.pass_rate()
        );
        println!(
            "║  Duration:  {:>5.2}s                                          ║",
            summary.total_duration.as_secs_f64()
        );
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        if !summary.failures.is_empty() {
            println!("Failed scenarios:");
            for name in summary.failed_scenarios() {
                println!("  • {}", name);
            }
            println!();
        }
    }

    /// Write `scenario_report.json` into `dir`
    fn generate_json_report(&self, dir: &str, summary: &TestSummary) -> anyhow::Result<()> {
        #[derive(Serialize)]
        struct Report<'a> {
            summary: &'a TestSummary,
            pass_rate: f64,
            results: &'a [ScenarioResult],
        }

        fs::create_dir_all(dir)?;
        let path = Path::new(dir).join("scenario_report.json");
        let report = Report {
            summary,
            pass_rate: summary.pass_rate(),
            results: &self.results,
        };
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;

        if self.config.verbose {
            println!("📄 JSON report generated: {}", path.display());
        }

        Ok(())
    }

    /// Get all results
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}
