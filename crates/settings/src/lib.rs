use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "scenecam";
const APPLICATION: &str = "scene-camera";
const SETTINGS_FILE: &str = "camera.json";

pub const DEFAULT_MIN_DISTANCE: f32 = 0.01;
pub const DEFAULT_DELAY_MS: f64 = 16.0;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unable to resolve platform config directory")]
    MissingProjectDirs,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected configuration values. Never fatal for a running controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid distance limits [{min}, {max}]: need 0 < min <= max")]
    InvalidDistanceLimits { min: f32, max: f32 },
    #[error("unknown navigation mode `{0}`")]
    UnknownMode(String),
    #[error("invalid {name}: {value} (must be finite and positive)")]
    InvalidSpeed { name: &'static str, value: f32 },
    #[error("invalid delay: {0}ms")]
    InvalidDelay(f64),
}

/// How a pointer drag is interpreted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    #[default]
    Orbit,
    Turntable,
    Pan,
    /// Direct matrix assignment; pointer interpretation is suspended.
    Matrix,
}

impl NavigationMode {
    pub const ALL: [NavigationMode; 4] = [
        NavigationMode::Orbit,
        NavigationMode::Turntable,
        NavigationMode::Pan,
        NavigationMode::Matrix,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            NavigationMode::Orbit => "orbit",
            NavigationMode::Turntable => "turntable",
            NavigationMode::Pan => "pan",
            NavigationMode::Matrix => "matrix",
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NavigationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavigationMode::ALL
            .into_iter()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| ConfigError::UnknownMode(s.to_owned()))
    }
}

/// World axis the turntable keeps vertical.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerticalAxis {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    #[default]
    PositiveZ,
    NegativeZ,
}

impl VerticalAxis {
    pub const fn vector(self) -> [f32; 3] {
        match self {
            VerticalAxis::PositiveX => [1.0, 0.0, 0.0],
            VerticalAxis::NegativeX => [-1.0, 0.0, 0.0],
            VerticalAxis::PositiveY => [0.0, 1.0, 0.0],
            VerticalAxis::NegativeY => [0.0, -1.0, 0.0],
            VerticalAxis::PositiveZ => [0.0, 0.0, 1.0],
            VerticalAxis::NegativeZ => [0.0, 0.0, -1.0],
        }
    }
}

/// Closed range the camera distance is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceLimits {
    min: f32,
    max: f32,
}

impl DistanceLimits {
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        // NaN fails both comparisons; +inf is a valid upper bound.
        if !(min > 0.0 && min.is_finite() && min <= max) {
            return Err(ConfigError::InvalidDistanceLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> f32 {
        self.min
    }

    pub const fn max(&self) -> f32 {
        self.max
    }

    pub fn clamp(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return self.min;
        }
        distance.clamp(self.min, self.max)
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.min, self.max]
    }
}

impl Default for DistanceLimits {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DISTANCE,
            max: f32::INFINITY,
        }
    }
}

/// Construction options for the camera controller. Every field is optional in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub center: [f32; 3],
    pub eye: [f32; 3],
    pub up: [f32; 3],
    pub mode: NavigationMode,
    /// `[min, max]`, both required. Absent means `[0.01, inf]`; set only
    /// `zoom_min` to keep the max unbounded.
    #[serde(alias = "distanceLimits")]
    pub distance_limits: Option<[f32; 2]>,
    #[serde(alias = "zoomMin")]
    pub zoom_min: Option<f32>,
    #[serde(alias = "zoomMax")]
    pub zoom_max: Option<f32>,
    /// Smoothing window in milliseconds.
    pub delay: f64,
    #[serde(alias = "rotateSpeed")]
    pub rotate_speed: f32,
    #[serde(alias = "zoomSpeed")]
    pub zoom_speed: f32,
    #[serde(alias = "translateSpeed")]
    pub translate_speed: f32,
    #[serde(alias = "flipX")]
    pub flip_x: bool,
    #[serde(alias = "flipY")]
    pub flip_y: bool,
    #[serde(alias = "turntableUp")]
    pub turntable_up: VerticalAxis,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.0],
            eye: [0.0, 0.0, 10.0],
            up: [0.0, 1.0, 0.0],
            mode: NavigationMode::Orbit,
            distance_limits: None,
            zoom_min: None,
            zoom_max: None,
            delay: DEFAULT_DELAY_MS,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            translate_speed: 1.0,
            flip_x: false,
            flip_y: false,
            turntable_up: VerticalAxis::default(),
        }
    }
}

impl CameraConfig {
    /// Combine `distance_limits`, `zoom_min` and `zoom_max` into a validated range.
    pub fn resolved_limits(&self) -> Result<DistanceLimits, ConfigError> {
        let defaults = DistanceLimits::default();
        let [mut min, mut max] = self
            .distance_limits
            .unwrap_or([defaults.min(), defaults.max()]);
        if let Some(zoom_min) = self.zoom_min {
            min = zoom_min;
        }
        if let Some(zoom_max) = self.zoom_max {
            max = zoom_max;
        }
        DistanceLimits::new(min, max)
    }

    /// Replace every invalid field with its default and report what was replaced.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let defaults = CameraConfig::default();
        let mut issues = Vec::new();

        if let Err(err) = self.resolved_limits() {
            issues.push(err);
            self.distance_limits = None;
            self.zoom_min = None;
            self.zoom_max = None;
        }

        for (name, speed, fallback) in [
            ("rotate_speed", &mut self.rotate_speed, defaults.rotate_speed),
            ("zoom_speed", &mut self.zoom_speed, defaults.zoom_speed),
            (
                "translate_speed",
                &mut self.translate_speed,
                defaults.translate_speed,
            ),
        ] {
            if !(speed.is_finite() && *speed > 0.0) {
                issues.push(ConfigError::InvalidSpeed {
                    name,
                    value: *speed,
                });
                *speed = fallback;
            }
        }

        if !(self.delay.is_finite() && self.delay >= 0.0) {
            issues.push(ConfigError::InvalidDelay(self.delay));
            self.delay = defaults.delay;
        }

        issues
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self, SettingsError> {
        let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or(SettingsError::MissingProjectDirs)?;
        Ok(Self {
            path: dirs.config_dir().join(SETTINGS_FILE),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load(&self) -> Result<CameraConfig, SettingsError> {
        if !self.path.exists() {
            return Ok(CameraConfig::default());
        }
        Self::load_from(&self.path)
    }

    pub fn load_from(path: &Path) -> Result<CameraConfig, SettingsError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Clone for SettingsStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
        }
    }
}
