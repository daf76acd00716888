//! Derivation of the categorical fields attached to each vehicle.
//!
//! All functions here are total: every input maps to exactly one category.

use serde::Deserialize;

use crate::models::DelayStatus;

/// Region assigned to latitudes outside every configured band.
pub const OTHER_REGION: &str = "Other";

/// Delay limits, in seconds, separating early, on-time and delayed trips.
///
/// Both limits are exclusive: a delay equal to a limit is on time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelayThresholds {
    pub delayed_after_secs: i32,
    pub early_before_secs: i32,
}

impl Default for DelayThresholds {
    fn default() -> Self {
        Self {
            delayed_after_secs: 300,
            early_before_secs: -60,
        }
    }
}

impl DelayThresholds {
    pub fn classify(&self, delay_seconds: i32) -> DelayStatus {
        if delay_seconds > self.delayed_after_secs {
            DelayStatus::Delayed
        } else if delay_seconds < self.early_before_secs {
            DelayStatus::Early
        } else {
            DelayStatus::OnTime
        }
    }
}

/// A named latitude range, inclusive at both ends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionBand {
    pub name: String,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl RegionBand {
    pub fn new(name: &str, min_latitude: f64, max_latitude: f64) -> Self {
        Self {
            name: name.to_string(),
            min_latitude,
            max_latitude,
        }
    }

    pub fn contains(&self, latitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
    }
}

/// South East Queensland service areas.
///
/// There is a gap between -27.78 and -27.75 that belongs to no band.
pub fn default_region_bands() -> Vec<RegionBand> {
    vec![
        RegionBand::new("Brisbane", -27.75, -27.0),
        RegionBand::new("Gold Coast", -28.2, -27.78),
        RegionBand::new("Sunshine Coast", -26.9, -26.3),
    ]
}

/// Returns the name of the first band containing `latitude`, or
/// [`OTHER_REGION`].
pub fn classify_region(latitude: f64, bands: &[RegionBand]) -> &str {
    bands
        .iter()
        .find(|band| band.contains(latitude))
        .map_or(OTHER_REGION, |band| band.name.as_str())
}

/// Public route name: the part of the route id before the first `-`.
///
/// `"700-4046"` becomes `"700"`; an id without `-` is returned unchanged.
pub fn route_name(route_id: &str) -> &str {
    route_id.split('-').next().unwrap_or(route_id)
}
