//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    print_divider, print_error, print_header, print_info, print_success, print_warning,
    AnalysisProgress,
};
use crate::cli::{Args, Commands, TestCommands};
use crate::core::config::{get_config_path, init_config, open_config_in_editor, Config};
use crate::core::history::{DashboardStats, ScanHistory, ScanRecord};
use crate::core::report::{AnalysisReport, Severity};
use crate::core::session::{CameraFacing, CaptureOrigin, Phase};
use crate::source::{FileImageSource, ImageSourceProvider, PromptImageSource};
use crate::testdb::{self, ScenarioLibrary, TestRunner, TestRunnerConfig};
use crate::ui::{format_duration, CaptureController, CaptureEvent, ControllerSettings, UiEvent};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Options for one `scan` run
#[derive(Debug, Clone)]
struct ScanOptions {
    origin: CaptureOrigin,
    image: Option<PathBuf>,
    facing: Option<CameraFacing>,
    json: bool,
}

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config, cancel_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Scan {
            source,
            image,
            facing,
            json,
        }) => {
            // A file on the command line is always an upload
            let origin = if image.is_some() {
                CaptureOrigin::Upload
            } else {
                CaptureOrigin::from(*source)
            };
            let options = ScanOptions {
                origin,
                image: image.clone(),
                facing: facing.map(CameraFacing::from),
                json: *json,
            };
            run_scan(config, options, cancel_flag)?;
        }
        Some(Commands::History { severity }) => {
            show_history(severity.as_deref())?;
        }
        Some(Commands::Report) => {
            print_report(&AnalysisReport::sample());
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::Test { test_command }) => {
            handle_test_command(test_command)?;
        }
        None => {
            show_dashboard();
        }
    }

    Ok(())
}

// ============================================================================
// Scan
// ============================================================================

fn run_scan(config: &Config, options: ScanOptions, cancel_flag: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;

    match options.image.clone() {
        Some(path) => {
            let provider = FileImageSource::new().with_gallery_image(path);
            runtime.block_on(scan_with(provider, config, &options, &cancel_flag))
        }
        None => runtime.block_on(scan_with(
            PromptImageSource::new(),
            config,
            &options,
            &cancel_flag,
        )),
    }
}

async fn scan_with<P: ImageSourceProvider>(
    provider: P,
    config: &Config,
    options: &ScanOptions,
    cancel_flag: &AtomicBool,
) -> Result<()> {
    let mut settings = ControllerSettings::from_config(config);
    if let Some(facing) = options.facing {
        settings = settings.default_facing(facing);
    }
    let controller = CaptureController::new(provider, settings);
    info!(
        "Starting {} scan with the {} source",
        options.origin,
        controller.provider().name()
    );

    if options.origin == CaptureOrigin::Camera
        && !controller.refresh_permission().await.is_granted()
    {
        controller.request_permission().await;
    }

    let started = match options.origin {
        CaptureOrigin::Camera => controller.start_capture_from_camera().await.map(Some),
        CaptureOrigin::Upload => controller.start_capture_from_upload().await,
    };

    let handle = match started {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            if !options.json {
                print_info("No image selected.");
            }
            return Ok(());
        }
        Err(e) if e.is_silent() => {
            debug!("Scan aborted: {}", e);
            if !options.json {
                print_warning("Could not get an image. Nothing was analyzed.");
            }
            return Ok(());
        }
        Err(e) => {
            if let Some(notice) = e.user_notice() {
                print_error(&format!("{}: {}", notice.title, notice.message));
            }
            return Err(e.into());
        }
    };

    let progress = if options.json {
        AnalysisProgress::hidden()
    } else {
        AnalysisProgress::new()
    };
    progress.set_phase(Phase::Preparing);
    let started_at = Instant::now();

    loop {
        if cancel_flag.swap(false, Ordering::SeqCst) {
            controller.cancel_session();
            progress.abandon("Analysis cancelled");
            return Ok(());
        }

        match controller
            .recv_event_timeout(Duration::from_millis(100))
            .await
        {
            Some(UiEvent::Capture(CaptureEvent::PhaseChanged { session, phase, .. }))
                if session == handle.id =>
            {
                progress.set_phase(phase);
            }
            Some(UiEvent::Capture(CaptureEvent::Completed { session, .. }))
                if session == handle.id =>
            {
                break;
            }
            Some(UiEvent::Capture(CaptureEvent::Cancelled { session, .. }))
                if session == handle.id =>
            {
                progress.abandon("Analysis cancelled");
                return Ok(());
            }
            Some(other) => debug!("Event: {:?}", other),
            None => {}
        }
    }

    let result = controller
        .complete_handoff()
        .ok_or_else(|| anyhow!("Session {} finished without a result", handle.id))?;
    progress.finish(&format!(
        "Analysis complete in {}",
        format_duration(started_at.elapsed())
    ));

    if options.json {
        println!("{}", result.to_json()?);
    } else {
        print_report(&AnalysisReport::from_result(&result));
    }
    Ok(())
}

// ============================================================================
// Report, history and dashboard
// ============================================================================

/// Print the result screen
pub fn print_report(report: &AnalysisReport) {
    print_header("ANALYSIS RESULT");
    println!("  {}", report.condition);
    println!(
        "  Confidence: {} ({:?})    Severity: {}",
        report.confidence,
        report.confidence_level(),
        report.severity
    );
    if report.severity.is_warning() {
        print_warning("This result may need medical attention.");
    }
    println!();
    println!("  {}", report.description);

    print_divider();
    println!("  Recommendations");
    for (i, item) in report.recommendations.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }

    println!();
    println!("  Risk factors");
    for factor in &report.risk_factors {
        print_info(factor);
    }

    if let Some(ref image) = report.image {
        println!();
        println!("  Image: {}", image);
    }

    print_divider();
    println!("  {}", report.disclaimer());
    println!();
}

fn print_record(record: &ScanRecord) {
    println!(
        "  {} {:>8}  {:<20} {:<9} {}",
        record.date_label(),
        record.time_label(),
        record.condition,
        record.severity,
        record.confidence
    );
}

/// Show the scan history list
pub fn show_history(severity: Option<&str>) -> Result<()> {
    let history = ScanHistory::seeded();

    let records: Vec<&ScanRecord> = match severity {
        Some(s) => {
            let severity = Severity::parse(s).ok_or_else(|| {
                anyhow!(
                    "Unknown severity '{}'. Use one of: none, mild, moderate, severe",
                    s
                )
            })?;
            history.by_severity(severity)
        }
        None => history.records().iter().collect(),
    };

    print_header("SCAN HISTORY");
    let summary = history.summary();
    println!(
        "  {} total scans, {} healthy\n",
        summary.total, summary.healthy
    );

    if records.is_empty() {
        print_info("No scans match.");
    }
    for record in records {
        print_record(record);
    }
    println!();
    Ok(())
}

/// Home screen: dashboard tiles and the latest scans
pub fn show_dashboard() {
    let stats = DashboardStats::published();
    let history = ScanHistory::seeded();

    print_header("SKINSCAN");
    println!(
        "  Total scans: {}    Accuracy: {}    Reliability: {}",
        stats.total_scans, stats.accuracy, stats.reliability
    );
    println!();
    println!("  Recent scans");
    for record in history.recent(3) {
        print_record(record);
    }
    println!();
    print_info("Run 'skinscan scan' to take a photo, or 'skinscan scan --image FILE' to upload one.");
    println!();
}

// ============================================================================
// Configuration
// ============================================================================

/// Open, locate or reset the configuration file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Run 'skinscan show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            crate::core::config::write_default_config(&path)?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to change phase timings, result templates and preferences.");
    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("[capture]");
    info!(
        "  image_attachment = {:?}",
        config.capture.image_attachment
    );
    info!("  default_facing = \"{}\"", config.capture.default_facing);
    for (name, timings) in [
        ("camera", config.timings.camera),
        ("upload", config.timings.upload),
    ] {
        info!("");
        info!("[timings.{}]", name);
        info!("  preparing_ms = {}", timings.preparing_ms);
        info!("  analyzing_ms = {}", timings.analyzing_ms);
        info!("  finalizing_ms = {}", timings.finalizing_ms);
    }
    for (name, template) in [
        ("camera", &config.results.camera),
        ("upload", &config.results.upload),
    ] {
        info!("");
        info!("[results.{}]", name);
        info!("  condition = \"{}\"", template.condition);
        info!("  confidence = {}", template.confidence);
        info!("  recommendation = {:?}", template.recommendation);
    }
    info!("");
    info!("[preferences]");
    info!("  dark_mode = {}", config.preferences.dark_mode);
    info!("  notifications = {}", config.preferences.notifications);
    info!("  data_sharing = {}", config.preferences.data_sharing);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

// ============================================================================
// Test scenarios
// ============================================================================

/// Dispatch `skinscan test` subcommands
pub fn handle_test_command(test_command: &TestCommands) -> Result<()> {
    match test_command {
        TestCommands::RunAll {
            output,
            fail_fast,
            tag,
        } => test_run_all(output.clone(), *fail_fast, tag.clone()),
        TestCommands::Run { scenarios, verbose } => test_run_scenarios(scenarios, *verbose),
        TestCommands::ListScenarios { tag, detailed } => {
            test_list_scenarios(tag.as_deref(), *detailed);
            Ok(())
        }
    }
}

fn test_run_all(output: Option<PathBuf>, fail_fast: bool, tag: Option<String>) -> Result<()> {
    let config = TestRunnerConfig {
        verbose: true,
        fail_fast,
        tag_filter: tag.map(|t| vec![t]),
        report_dir: output.map(|p| p.to_string_lossy().into_owned()),
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config);
    let summary = runner.run_all();

    if summary.failed > 0 {
        bail!("{} of {} scenarios failed", summary.failed, summary.total);
    }
    Ok(())
}

fn test_run_scenarios(scenarios: &[String], verbose: bool) -> Result<()> {
    let known = testdb::list_scenario_names();
    for name in scenarios {
        if !known.contains(name) {
            bail!(
                "Unknown scenario '{}'. Run 'skinscan test list-scenarios' to see them all",
                name
            );
        }
    }

    let config = TestRunnerConfig {
        verbose,
        ..Default::default()
    };
    let names: Vec<&str> = scenarios.iter().map(|s| s.as_str()).collect();

    let mut runner = TestRunner::with_config(config);
    let summary = runner.run_by_names(&names);

    if summary.failed > 0 {
        for result in runner.results().iter().filter(|r| !r.passed) {
            print_error(&format!(
                "{}: {}",
                result.name,
                result.failure_reason.as_deref().unwrap_or("failed")
            ));
        }
        bail!("{} of {} scenarios failed", summary.failed, summary.total);
    }

    print_success(&format!(
        "Selected scenarios complete: {}/{} passed",
        summary.passed, summary.total
    ));
    Ok(())
}

fn test_list_scenarios(tag_filter: Option<&str>, detailed: bool) {
    if tag_filter.is_none() && !detailed {
        testdb::print_available_scenarios();
        return;
    }

    let scenarios = match tag_filter {
        Some(tag) => ScenarioLibrary::scenarios_by_tag(tag),
        None => ScenarioLibrary::all_scenarios(),
    };

    if scenarios.is_empty() {
        println!(
            "No scenarios found with tag '{}'",
            tag_filter.unwrap_or_default()
        );
        return;
    }

    for scenario in &scenarios {
        if detailed {
            println!("📋 {}", scenario.name);
            println!("   Description: {}", scenario.description);
            println!("   Tags: {}", scenario.tags.join(", "));
            println!("   Steps: {}", scenario.actions.len());
            println!("   Ends in: {}", scenario.expected.final_phase);
            if let Some(ref err) = scenario.expected.expected_error {
                println!("   Expected error: {}", err);
            }
            println!();
        } else {
            println!(
                "  • {} - {} [{}]",
                scenario.name,
                scenario.description,
                scenario.tags.join(", ")
            );
        }
    }

    println!("Total: {} scenarios", scenarios.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CaptureError;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("spot.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();
        path
    }

    fn fast_config() -> Config {
        Config {
            timings: crate::core::config::TimingsConfig::uniform(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_scan_uploaded_file_completes() {
        let dir = TempDir::new().unwrap();
        let options = ScanOptions {
            origin: CaptureOrigin::Upload,
            image: Some(write_png(&dir)),
            facing: None,
            json: true,
        };
        run_scan(&fast_config(), options, Arc::new(AtomicBool::new(false))).unwrap();
    }

    #[test]
    fn test_scan_unreadable_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "text").unwrap();
        let options = ScanOptions {
            origin: CaptureOrigin::Upload,
            image: Some(path),
            facing: None,
            json: true,
        };
        run_scan(&fast_config(), options, Arc::new(AtomicBool::new(false))).unwrap();
    }

    #[test]
    fn test_scan_cancelled_by_flag() {
        let dir = TempDir::new().unwrap();
        let options = ScanOptions {
            origin: CaptureOrigin::Upload,
            image: Some(write_png(&dir)),
            facing: None,
            json: true,
        };
        let config = Config::default();
        run_scan(&config, options, Arc::new(AtomicBool::new(true))).unwrap();
    }

    #[test]
    fn test_history_rejects_unknown_severity() {
        assert!(show_history(Some("purple")).is_err());
        assert!(show_history(Some("mild")).is_ok());
    }

    #[test]
    fn test_generate_config_to_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skinscan.toml");
        generate_config_file(Some(path.clone())).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.timings.upload.preparing_ms, 800);
    }

    #[test]
    fn test_unknown_scenario_name() {
        let err = test_run_scenarios(&["nope".to_string()], false).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_permission_error_maps_to_notice() {
        let err = CaptureError::PermissionDenied(crate::core::session::PermissionKind::Camera);
        assert!(err.user_notice().is_some());
    }
}
