//! Cascading filter over region → route → status → vehicle.
//!
//! Each level's options come only from records that survived the levels
//! before it, so a narrower region never offers routes that have no buses in
//! it. [`CascadeMode::Independent`] instead offers every level's options from
//! the full record set; filtering itself is identical in both modes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, Serializer};

use crate::models::EnrichedRecord;

/// Sentinel accepted for "no filter" and prepended to region, route and
/// vehicle options.
pub const ALL: &str = "All";

/// A single-valued filter: everything, or one concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    #[default]
    All,
    Only(String),
}

impl Choice {
    /// Reads a raw request value. Missing, empty and `"All"` mean no filter.
    /// Any other value is matched exactly, whitespace included.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some(ALL) => Choice::All,
            Some(value) => Choice::Only(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Choice::All => ALL,
            Choice::Only(value) => value.as_str(),
        }
    }

    fn admits(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }
}

impl From<&str> for Choice {
    fn from(raw: &str) -> Self {
        Choice::parse(Some(raw))
    }
}

impl Serialize for Choice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The four filter dimensions of a query.
///
/// An empty `status` list means the caller did not pick any status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CascadeSelection {
    pub region: Choice,
    pub route: Choice,
    pub status: Vec<String>,
    pub vehicle: Choice,
}

/// How option lists after the region level are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Options come from records surviving the earlier levels.
    #[default]
    Cascading,
    /// Options come from the full record set.
    Independent,
}

/// Options at every level, the selection actually applied, and the records
/// it let through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeResult {
    pub region_options: Vec<String>,
    pub route_options: Vec<String>,
    pub status_options: Vec<String>,
    pub vehicle_options: Vec<String>,
    pub effective: CascadeSelection,
    pub records: Vec<EnrichedRecord>,
}

impl CascadeResult {
    /// Result for a cycle with no live vehicles.
    pub fn empty(selection: &CascadeSelection) -> Self {
        Self {
            region_options: Vec::new(),
            route_options: Vec::new(),
            status_options: Vec::new(),
            vehicle_options: Vec::new(),
            effective: selection.clone(),
            records: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Region,
    Route,
    Status,
    Vehicle,
}

impl Level {
    fn key(self, record: &EnrichedRecord) -> &str {
        match self {
            Level::Region => record.region.as_str(),
            Level::Route => record.route_name.as_str(),
            Level::Status => record.status.as_str(),
            Level::Vehicle => record.vehicle_id.as_str(),
        }
    }
}

/// Resolves `selection` against `records`, one level at a time.
pub fn resolve(
    records: &[EnrichedRecord],
    selection: &CascadeSelection,
    mode: CascadeMode,
) -> CascadeResult {
    let universe: Vec<&EnrichedRecord> = records.iter().collect();
    let scope = |narrowed: &[&EnrichedRecord], level: Level| match mode {
        CascadeMode::Cascading => options(narrowed, level),
        CascadeMode::Independent => options(&universe, level),
    };

    let region_options = options(&universe, Level::Region);
    let in_region = narrow(universe.clone(), &selection.region, Level::Region);

    let route_options = scope(&in_region, Level::Route);
    let on_route = narrow(in_region, &selection.route, Level::Route);

    let status_options = scope(&on_route, Level::Status);
    let status = if selection.status.is_empty() {
        status_options.clone()
    } else {
        selection.status.clone()
    };
    let with_status: Vec<&EnrichedRecord> = on_route
        .into_iter()
        .filter(|r| status.iter().any(|s| s == r.status.as_str()))
        .collect();

    let vehicle_options = scope(&with_status, Level::Vehicle);
    let filtered = narrow(with_status, &selection.vehicle, Level::Vehicle);

    CascadeResult {
        region_options: with_all(region_options),
        route_options: with_all(route_options),
        status_options,
        vehicle_options: with_all(vehicle_options),
        effective: CascadeSelection {
            region: selection.region.clone(),
            route: selection.route.clone(),
            status,
            vehicle: selection.vehicle.clone(),
        },
        records: filtered.into_iter().cloned().collect(),
    }
}

/// Distinct values of `level` across `records`, sorted.
fn options(records: &[&EnrichedRecord], level: Level) -> Vec<String> {
    let distinct: BTreeSet<&str> = records.iter().map(|r| level.key(r)).collect();
    distinct.into_iter().map(str::to_string).collect()
}

fn narrow<'a>(
    records: Vec<&'a EnrichedRecord>,
    choice: &Choice,
    level: Level,
) -> Vec<&'a EnrichedRecord> {
    match choice {
        Choice::All => records,
        Choice::Only(_) => records
            .into_iter()
            .filter(|r| choice.admits(level.key(r)))
            .collect(),
    }
}

fn with_all(mut options: Vec<String>) -> Vec<String> {
    if !options.is_empty() {
        options.insert(0, ALL.to_string());
    }
    options
}
