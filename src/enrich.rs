//! Joins vehicle positions with trip updates and attaches derived fields.

use std::collections::HashMap;

use crate::classify::{RegionBand, classify_region, route_name};
use crate::models::{DelayStatus, EnrichedRecord, TripUpdateRecord, VehicleRecord};

/// Left-joins `vehicles` with `updates` on trip id.
///
/// Every vehicle yields exactly one record, in input order. Vehicles without
/// a matching update (including those with no trip id at all) are on time
/// with zero delay. If two updates share a trip id the first one wins.
pub fn enrich(
    vehicles: Vec<VehicleRecord>,
    updates: &[TripUpdateRecord],
    bands: &[RegionBand],
) -> Vec<EnrichedRecord> {
    let mut by_trip: HashMap<&str, &TripUpdateRecord> = HashMap::with_capacity(updates.len());
    for update in updates {
        by_trip.entry(update.trip_id.as_str()).or_insert(update);
    }

    vehicles
        .into_iter()
        .map(|vehicle| {
            let matched = if vehicle.trip_id.is_empty() {
                None
            } else {
                by_trip.get(vehicle.trip_id.as_str())
            };
            let (delay_seconds, status) =
                matched.map_or((0, DelayStatus::OnTime), |u| (u.delay_seconds, u.status));

            EnrichedRecord {
                route_name: route_name(&vehicle.route_id).to_string(),
                region: classify_region(vehicle.latitude, bands).to_string(),
                trip_id: vehicle.trip_id,
                route_id: vehicle.route_id,
                vehicle_id: vehicle.vehicle_id,
                latitude: vehicle.latitude,
                longitude: vehicle.longitude,
                stop_sequence: vehicle.stop_sequence,
                position_timestamp: vehicle.position_timestamp,
                delay_seconds,
                status,
            }
        })
        .collect()
}
