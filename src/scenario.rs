use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tower::SchedulerPolicy;
use crate::weather::WeatherRegime;

fn default_seed() -> u64 {
    42
}

fn default_preset() -> String {
    "balanced".to_string()
}

fn default_minutes_per_tick() -> u32 {
    5
}

fn default_start_hour() -> u32 {
    6
}

fn default_policy() -> String {
    "dynamic".to_string()
}

fn default_runways() -> usize {
    2
}

fn default_grid_size() -> i32 {
    20
}

fn default_go_around_probability() -> f64 {
    0.03
}

fn default_max_holding_ticks() -> u32 {
    10
}

fn default_probabilistic() -> bool {
    true
}

fn default_min_change_hours() -> f64 {
    4.0
}

fn default_max_change_hours() -> f64 {
    8.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_airlines() -> Vec<AirlineConfig> {
    (1..=3)
        .map(|n| AirlineConfig {
            code: format!("AL{n}"),
            name: format!("Airline {n}"),
        })
        .collect()
}

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("unknown scenario preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown scheduler policy '{0}'")]
    UnknownPolicy(String),
    #[error("unknown weather regime '{0}'")]
    UnknownWeather(String),
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} is too large (got {value})")]
    TooLarge { field: &'static str, value: i64 },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{field} must lie within [0, 1] (got {value})")]
    NotAProbability { field: &'static str, value: f64 },
    #[error("weather change window [{min}, {max}] hours is invalid")]
    WeatherCadence { min: f64, max: f64 },
    #[error("start hour {0} is not a valid hour of day")]
    StartHour(u32),
    #[error("grid size {0} is too small to fit a holding pattern")]
    GridTooSmall(i32),
    #[error("scenario must define at least one airline")]
    NoAirlines,
}

/// Named operating points: base arrival rate, ground capacity, turn time,
/// takeoff time and max release per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPreset {
    Balanced,
    Normal,
    Overload,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetParameters {
    pub arrival_rate: f64,
    pub ground_capacity: u32,
    pub turn_time: u32,
    pub takeoff_time: u32,
    pub max_release_per_tick: u32,
}

impl ScenarioPreset {
    pub fn from_name(name: &str) -> Result<Self, ScenarioError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "balanced" => Ok(ScenarioPreset::Balanced),
            "normal" => Ok(ScenarioPreset::Normal),
            "overload" => Ok(ScenarioPreset::Overload),
            "custom" => Ok(ScenarioPreset::Custom),
            _ => Err(ScenarioError::UnknownPreset(name.to_string())),
        }
    }

    pub fn parameters(self) -> PresetParameters {
        match self {
            ScenarioPreset::Balanced => PresetParameters {
                arrival_rate: 0.2,
                ground_capacity: 6,
                turn_time: 3,
                takeoff_time: 3,
                max_release_per_tick: 3,
            },
            ScenarioPreset::Overload => PresetParameters {
                arrival_rate: 1.0,
                ground_capacity: 3,
                turn_time: 2,
                takeoff_time: 8,
                max_release_per_tick: 1,
            },
            // Custom starts from the normal operating point and is meant to
            // be overridden field by field.
            ScenarioPreset::Normal | ScenarioPreset::Custom => PresetParameters {
                arrival_rate: 0.5,
                ground_capacity: 4,
                turn_time: 3,
                takeoff_time: 5,
                max_release_per_tick: 2,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    #[serde(default)]
    pub arrival_rate: Option<f64>,
    #[serde(default)]
    pub ground_capacity: Option<i64>,
    #[serde(default)]
    pub turn_time: Option<i64>,
    #[serde(default)]
    pub takeoff_time: Option<i64>,
    #[serde(default)]
    pub max_release_per_tick: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_holding_ticks")]
    pub max_holding_ticks: u32,
}

impl Default for DiversionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_holding_ticks: default_max_holding_ticks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSection {
    #[serde(default, rename = "override")]
    pub override_regime: Option<String>,
    #[serde(default = "default_probabilistic")]
    pub probabilistic: bool,
    #[serde(default = "default_min_change_hours")]
    pub min_change_hours: f64,
    #[serde(default = "default_max_change_hours")]
    pub max_change_hours: f64,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            override_regime: None,
            probabilistic: default_probabilistic(),
            min_change_hours: default_min_change_hours(),
            max_change_hours: default_max_change_hours(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlineConfig {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A scenario as written in a YAML file or posted by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_preset")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_minutes_per_tick")]
    pub minutes_per_tick: u32,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub overrides: ScenarioOverrides,
    #[serde(default)]
    pub diversion: DiversionConfig,
    #[serde(default)]
    pub weather: WeatherSection,
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_runways")]
    pub runways: usize,
    #[serde(default = "default_grid_size")]
    pub grid_size: i32,
    #[serde(default = "default_go_around_probability")]
    pub go_around_probability: f64,
    #[serde(default = "default_airlines")]
    pub airlines: Vec<AirlineConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::from_preset(&default_preset())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherConfig {
    pub override_regime: Option<WeatherRegime>,
    pub probabilistic: bool,
    pub min_change_hours: f64,
    pub max_change_hours: f64,
}

/// Fully resolved and validated engine configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    pub name: String,
    pub seed: u64,
    pub preset: String,
    pub arrival_rate: f64,
    pub ground_capacity: u32,
    pub turn_time: u32,
    pub takeoff_time: u32,
    pub max_release_per_tick: u32,
    pub allow_diversion: bool,
    pub max_holding_ticks: u32,
    pub weather: WeatherConfig,
    pub policy: SchedulerPolicy,
    pub runways: usize,
    pub grid_size: i32,
    pub minutes_per_tick: u32,
    pub start_hour: u32,
    pub go_around_probability: f64,
    pub airlines: Vec<AirlineConfig>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Scenario with every field at its default, using the named preset.
    pub fn from_preset(preset: &str) -> Self {
        Self {
            name: preset.to_string(),
            description: None,
            seed: default_seed(),
            preset: preset.to_string(),
            ticks: None,
            minutes_per_tick: default_minutes_per_tick(),
            start_hour: default_start_hour(),
            overrides: ScenarioOverrides::default(),
            diversion: DiversionConfig::default(),
            weather: WeatherSection::default(),
            policy: default_policy(),
            runways: default_runways(),
            grid_size: default_grid_size(),
            go_around_probability: default_go_around_probability(),
            airlines: default_airlines(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(288)
    }

    pub fn resolve(&self) -> Result<SimulationConfig, ScenarioError> {
        let base = ScenarioPreset::from_name(&self.preset)?.parameters();
        let policy = self
            .policy
            .parse::<SchedulerPolicy>()
            .map_err(|_| ScenarioError::UnknownPolicy(self.policy.clone()))?;
        let override_regime = match self.weather.override_regime.as_deref() {
            None | Some("none") => None,
            Some(name) => Some(
                name.parse::<WeatherRegime>()
                    .map_err(|_| ScenarioError::UnknownWeather(name.to_string()))?,
            ),
        };

        let arrival_rate = self.overrides.arrival_rate.unwrap_or(base.arrival_rate);
        if !arrival_rate.is_finite() || arrival_rate < 0.0 {
            return Err(ScenarioError::Negative {
                field: "arrival_rate",
                value: arrival_rate,
            });
        }
        let ground_capacity =
            non_negative("ground_capacity", self.overrides.ground_capacity, base.ground_capacity)?;
        let turn_time = non_negative("turn_time", self.overrides.turn_time, base.turn_time)?;
        let takeoff_time =
            non_negative("takeoff_time", self.overrides.takeoff_time, base.takeoff_time)?;
        let max_release_per_tick = non_negative(
            "max_release_per_tick",
            self.overrides.max_release_per_tick,
            base.max_release_per_tick,
        )?;

        if turn_time == 0 {
            return Err(ScenarioError::Zero("turn_time"));
        }
        if takeoff_time == 0 {
            return Err(ScenarioError::Zero("takeoff_time"));
        }
        if max_release_per_tick == 0 {
            return Err(ScenarioError::Zero("max_release_per_tick"));
        }
        if self.runways == 0 {
            return Err(ScenarioError::Zero("runways"));
        }
        if self.minutes_per_tick == 0 {
            return Err(ScenarioError::Zero("minutes_per_tick"));
        }
        if self.diversion.enabled && self.diversion.max_holding_ticks == 0 {
            return Err(ScenarioError::Zero("max_holding_ticks"));
        }
        if self.start_hour >= 24 {
            return Err(ScenarioError::StartHour(self.start_hour));
        }
        if !(0.0..=1.0).contains(&self.go_around_probability) {
            return Err(ScenarioError::NotAProbability {
                field: "go_around_probability",
                value: self.go_around_probability,
            });
        }
        let (min, max) = (self.weather.min_change_hours, self.weather.max_change_hours);
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || max < min {
            return Err(ScenarioError::WeatherCadence { min, max });
        }
        if self.grid_size < 7 {
            return Err(ScenarioError::GridTooSmall(self.grid_size));
        }
        if self.airlines.is_empty() {
            return Err(ScenarioError::NoAirlines);
        }

        Ok(SimulationConfig {
            name: self.name.clone(),
            seed: self.seed,
            preset: self.preset.clone(),
            arrival_rate,
            ground_capacity,
            turn_time,
            takeoff_time,
            max_release_per_tick,
            allow_diversion: self.diversion.enabled,
            max_holding_ticks: self.diversion.max_holding_ticks,
            weather: WeatherConfig {
                override_regime,
                probabilistic: self.weather.probabilistic,
                min_change_hours: min,
                max_change_hours: max,
            },
            policy,
            runways: self.runways,
            grid_size: self.grid_size,
            minutes_per_tick: self.minutes_per_tick,
            start_hour: self.start_hour,
            go_around_probability: self.go_around_probability,
            airlines: self.airlines.clone(),
        })
    }
}

fn non_negative(field: &'static str, value: Option<i64>, fallback: u32) -> Result<u32, ScenarioError> {
    match value {
        None => Ok(fallback),
        Some(v) if v < 0 => Err(ScenarioError::Negative {
            field,
            value: v as f64,
        }),
        Some(v) => u32::try_from(v).map_err(|_| ScenarioError::TooLarge { field, value: v }),
    }
}
