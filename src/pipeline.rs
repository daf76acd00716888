//! One fetch-decode-enrich-resolve cycle over both live feeds.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::info;

use crate::cascade::{CascadeResult, CascadeSelection, resolve};
use crate::config::PipelineConfig;
use crate::enrich::enrich;
use crate::error::PipelineError;
use crate::fetch::{BasicClient, FeedClient, HttpClient};
use crate::models::FeedKind;
use crate::parser::{decode_trip_updates, decode_vehicle_positions};

/// Outcome of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    /// Wall-clock time the cycle started, in the configured timezone.
    pub fetched_at: DateTime<Tz>,
    pub next_refresh_at: DateTime<Tz>,
    pub result: CascadeResult,
}

impl LiveSnapshot {
    /// Number of vehicles that passed every filter level.
    pub fn tracked_count(&self) -> usize {
        self.result.records.len()
    }
}

/// Runs cycles against the configured feed endpoints.
///
/// Holds no state between calls; concurrent `run`s share only the immutable
/// config and the HTTP client.
pub struct Pipeline<C> {
    client: FeedClient<C>,
    config: PipelineConfig,
    timezone: Tz,
}

impl Pipeline<BasicClient> {
    pub fn from_config(config: PipelineConfig) -> anyhow::Result<Self> {
        Self::new(BasicClient::new(), config)
    }
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(http: C, config: PipelineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let timezone = config.timezone()?;
        Ok(Self {
            client: FeedClient::new(http, config.fetch_timeout),
            config,
            timezone,
        })
    }

    /// Pulls both feeds and resolves `selection` against the joined records.
    ///
    /// Both feeds must fetch and decode for the cycle to succeed. A vehicle
    /// feed with no vehicles is a valid, empty snapshot.
    #[tracing::instrument(skip_all, fields(region = %selection.region.as_str(), route = %selection.route.as_str()))]
    pub async fn run(&self, selection: &CascadeSelection) -> Result<LiveSnapshot, PipelineError> {
        let fetched_at = Utc::now().with_timezone(&self.timezone);

        let (vehicle_bytes, trip_bytes) = tokio::try_join!(
            self.fetch(FeedKind::VehiclePositions, &self.config.vehicle_positions_url),
            self.fetch(FeedKind::TripUpdates, &self.config.trip_updates_url),
        )?;

        let vehicles = decode_vehicle_positions(&vehicle_bytes)?;
        let updates = decode_trip_updates(&trip_bytes, &self.config.delay_thresholds)?;

        let result = if vehicles.is_empty() {
            info!("No vehicles currently reporting");
            CascadeResult::empty(selection)
        } else {
            let vehicle_count = vehicles.len();
            let enriched = enrich(vehicles, &updates, &self.config.region_bands);
            let result = resolve(&enriched, selection, self.config.cascade_mode);
            info!(
                vehicles = vehicle_count,
                trip_updates = updates.len(),
                tracked = result.records.len(),
                "Cycle resolved"
            );
            result
        };

        let next_refresh_at = TimeDelta::from_std(self.config.refresh_interval)
            .ok()
            .and_then(|interval| fetched_at.checked_add_signed(interval))
            .unwrap_or(fetched_at);

        Ok(LiveSnapshot {
            fetched_at,
            next_refresh_at,
            result,
        })
    }

    async fn fetch(&self, feed: FeedKind, url: &str) -> Result<bytes::Bytes, PipelineError> {
        self.client
            .fetch(url)
            .await
            .map_err(|source| PipelineError::Fetch { feed, source })
    }
}
