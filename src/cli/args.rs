//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::session::{CameraFacing, CaptureOrigin};

/// Capture or upload a skin photo and walk it through the (simulated) analysis
#[derive(Parser, Debug)]
#[command(name = "skinscan")]
#[command(version)]
#[command(about = "Capture a skin photo and follow it through analysis to a result", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

/// Where `scan` gets its image
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceArg {
    /// Take a still with the (simulated) camera
    Camera,
    /// Pick an image file
    Upload,
}

impl From<SourceArg> for CaptureOrigin {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Camera => CaptureOrigin::Camera,
            SourceArg::Upload => CaptureOrigin::Upload,
        }
    }
}

/// Camera selection on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for CameraFacing {
    fn from(value: FacingArg) -> Self {
        match value {
            FacingArg::Front => CameraFacing::Front,
            FacingArg::Back => CameraFacing::Back,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one capture session through to its result
    ///
    /// Without --image, permission dialogs and the file picker are shown as
    /// terminal prompts. Press Ctrl+C during the analysis to cancel it.
    Scan {
        /// Image source
        #[arg(short, long, value_enum, default_value = "camera")]
        source: SourceArg,

        /// Image file to upload (implies --source upload, skips prompts)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Camera to use (overrides config)
        #[arg(short, long, value_enum)]
        facing: Option<FacingArg>,

        /// Print the result payload as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Show past scans
    History {
        /// Only show scans with this severity (none, mild, moderate, severe)
        #[arg(short, long)]
        severity: Option<String>,
    },

    /// Show the sample analysis report
    Report,

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\skinscan\config.toml
    /// - Linux/macOS: ~/.config/skinscan/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Run workflow scenarios against a mock image source
    ///
    /// Exercises permissions, capture, upload, cancellation and failure
    /// paths without a camera or any prompts.
    Test {
        #[command(subcommand)]
        test_command: TestCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Run all available test scenarios
    RunAll {
        /// Directory for a JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop on first failure
        #[arg(long)]
        fail_fast: bool,

        /// Only run scenarios with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Run specific test scenarios by name
    Run {
        /// Scenario names to run (comma-separated or multiple values)
        #[arg(value_delimiter = ',', required = true)]
        scenarios: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all available test scenarios
    ListScenarios {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Show detailed information about each scenario
        #[arg(short, long)]
        detailed: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let args = Args::parse_from([
            "skinscan", "scan", "--source", "upload", "--facing", "front", "--json",
        ]);
        match args.command {
            Some(Commands::Scan {
                source,
                facing,
                json,
                image,
            }) => {
                assert_eq!(CaptureOrigin::from(source), CaptureOrigin::Upload);
                assert_eq!(facing.map(CameraFacing::from), Some(CameraFacing::Front));
                assert!(json);
                assert!(image.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["skinscan", "history", "--log-level", "debug"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_run_splits_names() {
        let args = Args::parse_from(["skinscan", "test", "run", "camera_capture,gallery_upload"]);
        match args.command {
            Some(Commands::Test {
                test_command: TestCommands::Run { scenarios, .. },
            }) => assert_eq!(scenarios, vec!["camera_capture", "gallery_upload"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
