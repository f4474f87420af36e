//! Configuration module for skinscan
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\skinscan\config.toml
//! - Linux: ~/.config/skinscan/config.toml
//! - macOS: ~/Library/Application Support/skinscan/config.toml

use crate::core::report::{ImageAttachment, ResultTemplate};
use crate::core::session::{CameraFacing, CaptureOrigin};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config directory
const APP_NAME: &str = "skinscan";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_path = ensure_config_dir()?.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        write_default_config(&config_path)?;
    }

    Ok(config_path)
}

/// Write the commented default config to `path`, replacing any existing file
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
        }
    }
    fs::write(path, Config::generate_default_config())
        .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e.to_string()))
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]).arg(&config_path);
        c
    };

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = std::process::Command::new("open");
        c.arg(&config_path);
        c
    };

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(&config_path);
        c
    };

    command
        .spawn()
        .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture behaviour
    pub capture: CaptureConfig,

    /// Simulated analysis delays per origin
    pub timings: TimingsConfig,

    /// Mocked result values per origin
    pub results: ResultsConfig,

    /// Settings screen toggles
    pub preferences: PreferencesConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Whether the result payload carries the session image
    pub image_attachment: ImageAttachment,

    /// Camera used when the capture screen opens
    pub default_facing: CameraFacing,
}

/// Delays between phase transitions, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTimings {
    /// Preparing -> Analyzing
    pub preparing_ms: u64,
    /// Analyzing -> Finalizing
    pub analyzing_ms: u64,
    /// Finalizing -> Complete
    pub finalizing_ms: u64,
}

impl AnalysisTimings {
    /// Delays for camera captures
    pub const fn camera() -> Self {
        Self {
            preparing_ms: 1000,
            analyzing_ms: 1500,
            finalizing_ms: 1500,
        }
    }

    /// Delays for gallery uploads
    pub const fn upload() -> Self {
        Self {
            preparing_ms: 800,
            analyzing_ms: 1400,
            finalizing_ms: 1300,
        }
    }

    /// Uniform delays, mostly for scripted runs
    pub const fn uniform(ms: u64) -> Self {
        Self {
            preparing_ms: ms,
            analyzing_ms: ms,
            finalizing_ms: ms,
        }
    }

    pub fn preparing(&self) -> Duration {
        Duration::from_millis(self.preparing_ms)
    }

    pub fn analyzing(&self) -> Duration {
        Duration::from_millis(self.analyzing_ms)
    }

    pub fn finalizing(&self) -> Duration {
        Duration::from_millis(self.finalizing_ms)
    }

    /// Time from capture to completion
    pub fn total(&self) -> Duration {
        self.preparing() + self.analyzing() + self.finalizing()
    }
}

/// A `[timings.*]` table where any delay may be left out
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialTimings {
    preparing_ms: Option<u64>,
    analyzing_ms: Option<u64>,
    finalizing_ms: Option<u64>,
}

impl PartialTimings {
    fn or(self, base: AnalysisTimings) -> AnalysisTimings {
        AnalysisTimings {
            preparing_ms: self.preparing_ms.unwrap_or(base.preparing_ms),
            analyzing_ms: self.analyzing_ms.unwrap_or(base.analyzing_ms),
            finalizing_ms: self.finalizing_ms.unwrap_or(base.finalizing_ms),
        }
    }
}

fn camera_timings<'de, D: Deserializer<'de>>(d: D) -> Result<AnalysisTimings, D::Error> {
    PartialTimings::deserialize(d).map(|t| t.or(AnalysisTimings::camera()))
}

fn upload_timings<'de, D: Deserializer<'de>>(d: D) -> Result<AnalysisTimings, D::Error> {
    PartialTimings::deserialize(d).map(|t| t.or(AnalysisTimings::upload()))
}

/// Timing profiles per capture origin. Missing delays fall back to the
/// origin's own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "AnalysisTimings::camera", deserialize_with = "camera_timings")]
    pub camera: AnalysisTimings,
    #[serde(default = "AnalysisTimings::upload", deserialize_with = "upload_timings")]
    pub upload: AnalysisTimings,
}

impl TimingsConfig {
    pub fn for_origin(&self, origin: CaptureOrigin) -> AnalysisTimings {
        match origin {
            CaptureOrigin::Camera => self.camera,
            CaptureOrigin::Upload => self.upload,
        }
    }

    /// Same delays for both origins
    pub fn uniform(ms: u64) -> Self {
        Self {
            camera: AnalysisTimings::uniform(ms),
            upload: AnalysisTimings::uniform(ms),
        }
    }
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            camera: AnalysisTimings::camera(),
            upload: AnalysisTimings::upload(),
        }
    }
}

/// Result templates per capture origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub camera: ResultTemplate,
    pub upload: ResultTemplate,
}

impl ResultsConfig {
    pub fn for_origin(&self, origin: CaptureOrigin) -> &ResultTemplate {
        match origin {
            CaptureOrigin::Camera => &self.camera,
            CaptureOrigin::Upload => &self.upload,
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            camera: ResultTemplate::camera(),
            upload: ResultTemplate::upload(),
        }
    }
}

/// Settings screen toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub dark_mode: bool,
    /// Scan reminders and updates
    pub notifications: bool,
    /// Share anonymised scans to improve accuracy
    pub data_sharing: bool,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            notifications: true,
            data_sharing: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Also write logs to a file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./skinscan.log"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./skinscan.toml
    /// 2. ./config.toml
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_existing_config() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        Self::find_existing_config()
            .or_else(get_config_path)
            .unwrap_or_else(|| PathBuf::from("./skinscan.toml"))
    }

    fn find_existing_config() -> Option<PathBuf> {
        let local_paths = [
            PathBuf::from("./skinscan.toml"),
            PathBuf::from("./config.toml"),
        ];

        local_paths
            .into_iter()
            .chain(get_config_path())
            .find(|path| path.exists())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open config file in editor
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), err)
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), err)
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(f, "Failed to open config file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_timings_match_origins() {
        let timings = TimingsConfig::default();
        assert_eq!(
            timings.for_origin(CaptureOrigin::Camera).total(),
            Duration::from_millis(4000)
        );
        assert_eq!(
            timings.for_origin(CaptureOrigin::Upload).total(),
            Duration::from_millis(3500)
        );
    }

    #[test]
    fn test_example_config_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.timings, defaults.timings);
        assert_eq!(config.results, defaults.results);
        assert_eq!(config.capture.image_attachment, ImageAttachment::Always);
        assert_eq!(config.capture.default_facing, CameraFacing::Back);
        assert_eq!(config.logging.level, "info");
        assert!(config.preferences.notifications);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [capture]
            image_attachment = "upload_only"

            [timings.upload]
            preparing_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.image_attachment, ImageAttachment::UploadOnly);
        assert_eq!(config.timings.upload.preparing_ms, 10);
        assert_eq!(config.timings.upload.analyzing_ms, 1400);
        assert_eq!(config.timings.upload.finalizing_ms, 1300);
        assert_eq!(config.timings.camera, AnalysisTimings::camera());
    }

    #[test]
    fn test_partial_camera_timings_keep_camera_defaults() {
        let config: Config = toml::from_str(
            r#"
            [timings.camera]
            finalizing_ms = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.timings.camera.preparing_ms, 1000);
        assert_eq!(config.timings.camera.analyzing_ms, 1500);
        assert_eq!(config.timings.camera.finalizing_ms, 20);
        assert_eq!(config.timings.upload, AnalysisTimings::upload());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skinscan.toml");

        let mut config = Config::default();
        config.timings = TimingsConfig::uniform(5);
        config.results.camera.confidence = 91;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.timings, TimingsConfig::uniform(5));
        assert_eq!(loaded.results.camera.confidence, 91);
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::FileNotFound(_))
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[capture\nimage_attachment = ").unwrap();
        let err = Config::load(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_, _)));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_write_default_config_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("skinscan.toml");
        write_default_config(&path).unwrap();
        assert!(Config::load(&path).is_ok());
    }
}
