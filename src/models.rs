//! Record types produced by each pipeline stage.
//!
//! Every record is built fresh per fetch cycle and owned by the call that
//! built it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The two upstream feeds a cycle pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    VehiclePositions,
    TripUpdates,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::VehiclePositions => f.write_str("vehicle positions"),
            FeedKind::TripUpdates => f.write_str("trip updates"),
        }
    }
}

/// Punctuality category derived from a trip's arrival delay.
///
/// Variant order matches the lexicographic order of the rendered names, so
/// sorting either gives the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DelayStatus {
    Delayed,
    Early,
    #[serde(rename = "On Time")]
    OnTime,
}

impl DelayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayStatus::Delayed => "Delayed",
            DelayStatus::Early => "Early",
            DelayStatus::OnTime => "On Time",
        }
    }
}

impl fmt::Display for DelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One currently-reporting vehicle from the vehicle positions feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRecord {
    /// Empty when the vehicle is not assigned to a trip.
    pub trip_id: String,
    pub route_id: String,
    /// Fleet label shown to riders, not the internal descriptor id.
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stop_sequence: u32,
    pub position_timestamp: Option<DateTime<Utc>>,
}

/// Delay information for a single trip, taken from its first stop-time update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripUpdateRecord {
    pub trip_id: String,
    pub delay_seconds: i32,
    pub status: DelayStatus,
}

/// A vehicle joined with its trip update and tagged with derived fields.
///
/// Kept flat so it serializes to a single CSV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub trip_id: String,
    pub route_id: String,
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stop_sequence: u32,
    pub position_timestamp: Option<DateTime<Utc>>,
    pub delay_seconds: i32,
    pub status: DelayStatus,
    pub route_name: String,
    pub region: String,
}

/// Column names of an [`EnrichedRecord`] CSV row, in field order.
pub const CSV_COLUMNS: [&str; 11] = [
    "trip_id",
    "route_id",
    "vehicle_id",
    "latitude",
    "longitude",
    "stop_sequence",
    "position_timestamp",
    "delay_seconds",
    "status",
    "route_name",
    "region",
];
