//! Protobuf parser for GTFS Realtime feeds.
//!
//! Turns raw feed bytes into the flat records the rest of the pipeline works
//! with. Entities that carry no payload of the expected kind are skipped.

use chrono::{DateTime, Utc};
use prost::Message;
use tracing::debug;

use crate::classify::DelayThresholds;
use crate::error::DecodeError;
use crate::gtfs_rt::{FeedMessage, TripUpdate, VehiclePosition};
use crate::models::{FeedKind, TripUpdateRecord, VehicleRecord};

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, prost::DecodeError> {
    FeedMessage::decode(bytes)
}

/// Decodes a vehicle positions feed into one [`VehicleRecord`] per entity
/// carrying a vehicle payload.
pub fn decode_vehicle_positions(bytes: &[u8]) -> Result<Vec<VehicleRecord>, DecodeError> {
    let feed = parse_feed(bytes).map_err(|source| DecodeError {
        feed: FeedKind::VehiclePositions,
        source,
    })?;

    let total = feed.entity.len();
    let vehicles: Vec<VehicleRecord> = feed
        .entity
        .into_iter()
        .filter_map(|entity| entity.vehicle)
        .map(vehicle_record)
        .collect();

    debug!(
        entities = total,
        vehicles = vehicles.len(),
        skipped = total - vehicles.len(),
        "Decoded vehicle positions"
    );
    Ok(vehicles)
}

/// Decodes a trip updates feed into at most one [`TripUpdateRecord`] per
/// entity. Only the first stop-time update of a trip is read; trips without
/// any stop-time update are dropped.
pub fn decode_trip_updates(
    bytes: &[u8],
    thresholds: &DelayThresholds,
) -> Result<Vec<TripUpdateRecord>, DecodeError> {
    let feed = parse_feed(bytes).map_err(|source| DecodeError {
        feed: FeedKind::TripUpdates,
        source,
    })?;

    let total = feed.entity.len();
    let updates: Vec<TripUpdateRecord> = feed
        .entity
        .into_iter()
        .filter_map(|entity| entity.trip_update)
        .filter_map(|update| trip_update_record(update, thresholds))
        .collect();

    debug!(
        entities = total,
        trip_updates = updates.len(),
        skipped = total - updates.len(),
        "Decoded trip updates"
    );
    Ok(updates)
}

fn vehicle_record(v: VehiclePosition) -> VehicleRecord {
    let (trip_id, route_id) = v
        .trip
        .map(|trip| {
            (
                trip.trip_id.unwrap_or_default(),
                trip.route_id.unwrap_or_default(),
            )
        })
        .unwrap_or_default();
    let vehicle_id = v.vehicle.and_then(|d| d.label).unwrap_or_default();
    let (latitude, longitude) = v
        .position
        .map(|p| (f64::from(p.latitude), f64::from(p.longitude)))
        .unwrap_or_default();

    VehicleRecord {
        trip_id,
        route_id,
        vehicle_id,
        latitude,
        longitude,
        stop_sequence: v.current_stop_sequence.unwrap_or(0),
        position_timestamp: v.timestamp.and_then(unix_timestamp),
    }
}

fn trip_update_record(tu: TripUpdate, thresholds: &DelayThresholds) -> Option<TripUpdateRecord> {
    let first = tu.stop_time_update.first()?;
    let delay_seconds = first
        .arrival
        .as_ref()
        .and_then(|arrival| arrival.delay)
        .unwrap_or(0);

    Some(TripUpdateRecord {
        trip_id: tu.trip.trip_id.unwrap_or_default(),
        delay_seconds,
        status: thresholds.classify(delay_seconds),
    })
}

fn unix_timestamp(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
    use crate::gtfs_rt::{
        FeedEntity, FeedHeader, Position, TripDescriptor, VehicleDescriptor,
    };
    use crate::models::DelayStatus;

    #[test]
    fn test_parse_empty_bytes_returns_default_feed() {
        // An empty byte array decodes to a FeedMessage with default values
        // This is valid protobuf behavior
        let result = parse_feed(&[]);
        assert!(result.is_ok());
        let feed = result.unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        assert!(parse_feed(&invalid_bytes).is_err());
    }

    #[test]
    fn test_parse_valid_minimal_feed() {
        let feed = FeedMessage {
            header: create_header(),
            entity: vec![],
        };
        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();

        assert_eq!(parsed.header.gtfs_realtime_version, "2.0");
        assert_eq!(parsed.header.timestamp, Some(1234567890));
    }

    #[test]
    fn test_decode_vehicle_positions() {
        let bytes = encode(vec![
            vehicle_entity("v1", Some("T1"), "700-city", "BUS1", -27.5, Some(1_700_000_000)),
            trip_entity("t1", "T1", vec![Some(30)]),
            vehicle_entity("v2", None, "750-coast", "BUS2", -28.0, None),
        ]);

        let vehicles = decode_vehicle_positions(&bytes).unwrap();

        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].trip_id, "T1");
        assert_eq!(vehicles[0].route_id, "700-city");
        assert_eq!(vehicles[0].vehicle_id, "BUS1");
        assert_eq!(vehicles[0].latitude, -27.5);
        assert_eq!(vehicles[0].stop_sequence, 7);
        assert_eq!(
            vehicles[0].position_timestamp,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(vehicles[1].trip_id, "");
        assert_eq!(vehicles[1].position_timestamp, None);
    }

    #[test]
    fn test_wire_latitudes_widen_before_region_lookup() {
        use crate::classify::{OTHER_REGION, classify_region, default_region_bands};

        let bytes = encode(vec![
            vehicle_entity("v1", None, "700", "NORTH_EDGE", -26.3, None),
            vehicle_entity("v2", None, "700", "SOUTH_EDGE", -28.2, None),
            vehicle_entity("v3", None, "700", "GOLD_COAST_TOP", -27.78, None),
            vehicle_entity("v4", None, "700", "SUNSHINE_BOTTOM", -26.9, None),
        ]);
        let bands = default_region_bands();

        let regions: Vec<&str> = decode_vehicle_positions(&bytes)
            .unwrap()
            .iter()
            .map(|v| classify_region(v.latitude, &bands))
            .collect();

        assert_eq!(
            regions,
            vec![OTHER_REGION, OTHER_REGION, "Gold Coast", "Sunshine Coast"]
        );
    }

    #[test]
    fn test_decode_vehicle_without_descriptors_uses_defaults() {
        let bytes = encode(vec![FeedEntity {
            id: "bare".to_string(),
            vehicle: Some(VehiclePosition::default()),
            ..Default::default()
        }]);

        let vehicles = decode_vehicle_positions(&bytes).unwrap();

        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].trip_id, "");
        assert_eq!(vehicles[0].route_id, "");
        assert_eq!(vehicles[0].vehicle_id, "");
        assert_eq!(vehicles[0].stop_sequence, 0);
    }

    #[test]
    fn test_decode_trip_updates_uses_first_stop_time_update() {
        let bytes = encode(vec![
            trip_entity("t1", "A", vec![Some(400), Some(-500)]),
            trip_entity("t2", "B", vec![Some(-61)]),
            trip_entity("t3", "C", vec![]),
            trip_entity("t4", "D", vec![None]),
            vehicle_entity("v1", Some("A"), "700", "BUS1", -27.5, None),
        ]);

        let updates = decode_trip_updates(&bytes, &DelayThresholds::default()).unwrap();

        assert_eq!(
            updates,
            vec![
                TripUpdateRecord {
                    trip_id: "A".to_string(),
                    delay_seconds: 400,
                    status: DelayStatus::Delayed,
                },
                TripUpdateRecord {
                    trip_id: "B".to_string(),
                    delay_seconds: -61,
                    status: DelayStatus::Early,
                },
                TripUpdateRecord {
                    trip_id: "D".to_string(),
                    delay_seconds: 0,
                    status: DelayStatus::OnTime,
                },
            ]
        );
    }

    #[test]
    fn test_decode_errors_carry_feed_kind() {
        let invalid = [0xFF, 0xFE, 0x00, 0x01];

        let err = decode_vehicle_positions(&invalid).unwrap_err();
        assert_eq!(err.feed, FeedKind::VehiclePositions);

        let err = decode_trip_updates(&invalid, &DelayThresholds::default()).unwrap_err();
        assert_eq!(err.feed, FeedKind::TripUpdates);
    }

    #[test]
    fn test_unix_timestamp_out_of_range() {
        assert_eq!(unix_timestamp(u64::MAX), None);
        assert!(unix_timestamp(0).is_some());
    }

    // Helper functions for tests
    fn create_header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1234567890),
            incrementality: None,
            feed_version: None,
        }
    }

    fn encode(entity: Vec<FeedEntity>) -> Vec<u8> {
        FeedMessage {
            header: create_header(),
            entity,
        }
        .encode_to_vec()
    }

    fn vehicle_entity(
        id: &str,
        trip_id: Option<&str>,
        route_id: &str,
        label: &str,
        latitude: f32,
        timestamp: Option<u64>,
    ) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            vehicle: Some(VehiclePosition {
                trip: Some(TripDescriptor {
                    trip_id: trip_id.map(str::to_string),
                    route_id: Some(route_id.to_string()),
                    ..Default::default()
                }),
                vehicle: Some(VehicleDescriptor {
                    id: Some(format!("internal-{label}")),
                    label: Some(label.to_string()),
                    license_plate: None,
                }),
                position: Some(Position {
                    latitude,
                    longitude: 153.0,
                    bearing: None,
                    odometer: None,
                    speed: None,
                }),
                current_stop_sequence: Some(7),
                timestamp,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn trip_entity(id: &str, trip_id: &str, delays: Vec<Option<i32>>) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some(trip_id.to_string()),
                    ..Default::default()
                },
                stop_time_update: delays
                    .into_iter()
                    .enumerate()
                    .map(|(i, delay)| StopTimeUpdate {
                        stop_sequence: Some(i as u32 + 1),
                        arrival: delay.map(|delay| StopTimeEvent {
                            delay: Some(delay),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
