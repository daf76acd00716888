//! Runtime configuration for the pipeline.
//!
//! Everything that was once a module-level constant (feed endpoints,
//! timezone, refresh cadence, region bands, delay thresholds) lives here and
//! is handed to [`crate::pipeline::Pipeline`] at construction.
//!
//! Stored as a JSON object on disk; any field may be omitted:
//! ```json
//! {
//!   "vehicle_positions_url": "https://example.org/VehiclePositions/Bus",
//!   "fetch_timeout_secs": 5,
//!   "cascade_mode": "independent",
//!   "region_bands": [
//!     { "name": "Brisbane", "min_latitude": -27.75, "max_latitude": -27.0 }
//!   ]
//! }
//! ```

use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::cascade::CascadeMode;
use crate::classify::{DelayThresholds, RegionBand, default_region_bands};

pub const DEFAULT_VEHICLE_POSITIONS_URL: &str =
    "https://gtfsrt.api.translink.com.au/api/realtime/SEQ/VehiclePositions/Bus";
pub const DEFAULT_TRIP_UPDATES_URL: &str =
    "https://gtfsrt.api.translink.com.au/api/realtime/SEQ/TripUpdates/Bus";
pub const DEFAULT_TIMEZONE: &str = "Australia/Brisbane";

/// Environment variable naming a JSON config file read by [`PipelineConfig::from_env`].
pub const CONFIG_PATH_VAR: &str = "SEQ_BUS_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vehicle_positions_url: String,
    pub trip_updates_url: String,
    #[serde(rename = "fetch_timeout_secs", deserialize_with = "duration_from_secs")]
    pub fetch_timeout: Duration,
    #[serde(rename = "refresh_interval_secs", deserialize_with = "duration_from_secs")]
    pub refresh_interval: Duration,
    pub timezone: String,
    pub region_bands: Vec<RegionBand>,
    pub delay_thresholds: DelayThresholds,
    pub cascade_mode: CascadeMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vehicle_positions_url: DEFAULT_VEHICLE_POSITIONS_URL.to_string(),
            trip_updates_url: DEFAULT_TRIP_UPDATES_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            timezone: DEFAULT_TIMEZONE.to_string(),
            region_bands: default_region_bands(),
            delay_thresholds: DelayThresholds::default(),
            cascade_mode: CascadeMode::Cascading,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid config file '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the config from the file named by `SEQ_BUS_CONFIG` (or the
    /// defaults), then applies individual environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// [`Self::from_env`] with variables read through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => {
                debug!(path = %path, "Loading pipeline config file");
                Self::load(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VEHICLE_POSITIONS_URL") {
            self.vehicle_positions_url = url;
        }
        if let Some(url) = lookup("TRIP_UPDATES_URL") {
            self.trip_updates_url = url;
        }
        if let Some(raw) = lookup("FEED_TIMEOUT_SECS") {
            self.fetch_timeout = parse_secs("FEED_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("REFRESH_INTERVAL_SECS") {
            self.refresh_interval = parse_secs("REFRESH_INTERVAL_SECS", &raw)?;
        }
        if let Some(tz) = lookup("FEED_TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(mode) = lookup("CASCADE_MODE") {
            self.cascade_mode = parse_cascade_mode(&mode)?;
        }
        Ok(())
    }

    /// Parses the configured IANA timezone name.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("unknown timezone '{}': {e}", self.timezone))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.vehicle_positions_url.trim().is_empty(),
            "vehicle_positions_url must not be empty"
        );
        ensure!(
            !self.trip_updates_url.trim().is_empty(),
            "trip_updates_url must not be empty"
        );
        ensure!(!self.fetch_timeout.is_zero(), "fetch_timeout_secs must be positive");
        ensure!(
            !self.refresh_interval.is_zero(),
            "refresh_interval_secs must be positive"
        );
        ensure!(
            self.delay_thresholds.early_before_secs <= self.delay_thresholds.delayed_after_secs,
            "early_before_secs ({}) must not exceed delayed_after_secs ({})",
            self.delay_thresholds.early_before_secs,
            self.delay_thresholds.delayed_after_secs
        );
        for band in &self.region_bands {
            ensure!(
                band.min_latitude.is_finite() && band.max_latitude.is_finite(),
                "region '{}' has a non-finite bound",
                band.name
            );
            ensure!(
                band.min_latitude <= band.max_latitude,
                "region '{}' has min_latitude above max_latitude",
                band.name
            );
        }
        self.timezone()?;
        Ok(())
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{var} must be a number of seconds, got '{raw}'"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("{var} is out of range: {secs}"))
}

fn parse_cascade_mode(raw: &str) -> Result<CascadeMode> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| anyhow!("CASCADE_MODE must be 'cascading' or 'independent', got '{raw}'"))
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
