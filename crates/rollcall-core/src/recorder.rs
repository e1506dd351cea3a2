use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::store::AttendanceLog;
use crate::types::AttendanceEvent;

/// Appends timestamped attendance events for resolved identities.
///
/// There is no cooldown: recording the same identity N times yields N
/// events. Timestamps issued by one recorder never go backwards.
pub struct AttendanceRecorder<L> {
    log: Arc<L>,
    clock: Arc<dyn Clock>,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl<L: AttendanceLog> AttendanceRecorder<L> {
    pub fn new(log: Arc<L>) -> Self {
        Self::with_clock(log, Arc::new(SystemClock))
    }

    pub fn with_clock(log: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock, last: Mutex::new(None) }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let ts = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(ts);
        ts
    }

    /// Append an event for an identity the caller has already resolved.
    pub async fn record_attendance(
        &self,
        identity_key: &str,
        display_name: &str,
    ) -> Result<AttendanceEvent> {
        let event = AttendanceEvent {
            event_id: Uuid::new_v4(),
            identity_key: identity_key.to_string(),
            display_name: display_name.to_string(),
            timestamp: self.next_timestamp(),
        };
        self.log.append(event.clone()).await?;
        tracing::info!(
            identity_key,
            display_name,
            timestamp = %event.timestamp,
            "attendance recorded"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_repeated_records_are_distinct_and_ordered() {
        let log = Arc::new(MemoryStore::new());
        let recorder = AttendanceRecorder::new(log.clone());

        let mut events = Vec::new();
        for _ in 0..5 {
            events.push(recorder.record_attendance("S1", "Ada").await.unwrap());
        }

        let ids: HashSet<_> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids.len(), 5);
        for pair in events.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert_eq!(log.events().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_timestamps_never_go_backwards() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let recorder = AttendanceRecorder::with_clock(Arc::new(MemoryStore::new()), clock.clone());

        let first = recorder.record_attendance("S1", "Ada").await.unwrap();
        clock.set(start - Duration::minutes(5));
        let second = recorder.record_attendance("S1", "Ada").await.unwrap();

        assert_eq!(first.timestamp, start);
        assert_eq!(second.timestamp, start);
    }

    #[tokio::test]
    async fn test_event_carries_supplied_identity() {
        let recorder = AttendanceRecorder::new(Arc::new(MemoryStore::new()));
        let event = recorder.record_attendance("S7", "Grace").await.unwrap();
        assert_eq!(event.identity_key, "S7");
        assert_eq!(event.display_name, "Grace");
    }
}
