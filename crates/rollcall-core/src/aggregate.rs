//! Reporting over the attendance log: per-identity counts and a
//! day-of-week × hour-of-day occupancy histogram.
//!
//! Bucketing uses the UTC civil time of each event timestamp. Days are
//! numbered from Sunday = 0 to Saturday = 6.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Datelike, Timelike};

use crate::error::Result;
use crate::store::{AttendanceLog, EmbeddingStore};
use crate::types::{AttendanceEvent, HeatmapPoint, Identity, IdentityCount, OccupancyBucket};

/// Count events per enrolled display name.
///
/// Events are joined to identities by key and grouped by the identity's
/// name. Events whose key is not enrolled are dropped, and identities with
/// no events do not appear. Output is sorted by name.
pub fn count_by_identity(identities: &[Identity], events: &[AttendanceEvent]) -> Vec<IdentityCount> {
    let names: HashMap<&str, &str> = identities
        .iter()
        .map(|i| (i.identity_key.as_str(), i.display_name.as_str()))
        .collect();

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for event in events {
        if let Some(name) = names.get(event.identity_key.as_str()) {
            *counts.entry(*name).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(name, count)| IdentityCount { display_name: name.to_string(), count })
        .collect()
}

/// Bucket events by (day-of-week, hour-of-day). Empty buckets are omitted;
/// output is sorted by day, then hour.
pub fn occupancy(events: &[AttendanceEvent]) -> Vec<OccupancyBucket> {
    let mut buckets: BTreeMap<(u8, u8), u64> = BTreeMap::new();
    for event in events {
        let day = event.timestamp.weekday().num_days_from_sunday() as u8;
        let hour = event.timestamp.hour() as u8;
        *buckets.entry((day, hour)).or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|((day_of_week, hour_of_day), count)| OccupancyBucket {
            day_of_week,
            hour_of_day,
            count,
        })
        .collect()
}

/// Read-side reports over a store and its attendance log.
pub struct AttendanceAggregator<S, L> {
    store: Arc<S>,
    log: Arc<L>,
}

impl<S: EmbeddingStore, L: AttendanceLog> AttendanceAggregator<S, L> {
    pub fn new(store: Arc<S>, log: Arc<L>) -> Self {
        Self { store, log }
    }

    pub async fn counts_by_identity(&self) -> Result<Vec<IdentityCount>> {
        let identities = self.store.list_all().await?;
        let events = self.log.events().await?;
        Ok(count_by_identity(&identities, &events))
    }

    pub async fn occupancy_histogram(&self) -> Result<Vec<OccupancyBucket>> {
        let events = self.log.events().await?;
        Ok(occupancy(&events))
    }

    /// The histogram in `{x: "<hour>:00", y: <day>, v: <count>}` form.
    pub async fn heatmap(&self) -> Result<Vec<HeatmapPoint>> {
        Ok(self
            .occupancy_histogram()
            .await?
            .into_iter()
            .map(HeatmapPoint::from)
            .collect())
    }
}
