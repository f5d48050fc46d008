use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flight::FlightId;

pub type LogEntryId = u64;

/// One applied delay, as recorded by the propagation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptionLogEntry {
    pub id: LogEntryId,
    pub flight_id: FlightId,
    pub delay_minutes: u32,
    pub cause: String,
    /// Flight whose cascade forced this delay; None for a root trigger
    pub caused_by_flight_id: Option<FlightId>,
    /// Connections broken by this step alone
    pub passengers_impacted: u32,
    /// Downstream flights this step pushed a delay onto
    pub flights_impacted: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-flight event handed back to callers for publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptionEvent {
    pub flight_id: FlightId,
    pub delay_minutes: u32,
    pub cause: String,
    pub cascaded: bool,
    pub passengers_impacted: u32,
    pub flights_impacted: u32,
}

impl From<&DisruptionLogEntry> for DisruptionEvent {
    fn from(entry: &DisruptionLogEntry) -> Self {
        Self {
            flight_id: entry.flight_id,
            delay_minutes: entry.delay_minutes,
            cause: entry.cause.clone(),
            cascaded: entry.caused_by_flight_id.is_some(),
            passengers_impacted: entry.passengers_impacted,
            flights_impacted: entry.flights_impacted,
        }
    }
}

/// Append-only disruption log
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Vec<DisruptionLogEntry>,
    next_id: LogEntryId,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Append an entry, assigning its id. Returns the id.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        flight_id: FlightId,
        delay_minutes: u32,
        cause: &str,
        caused_by_flight_id: Option<FlightId>,
        passengers_impacted: u32,
        flights_impacted: u32,
        timestamp: DateTime<Utc>,
    ) -> LogEntryId {
        // Default-constructed logs start at 0; ids are 1-based
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.entries.push(DisruptionLogEntry {
            id,
            flight_id,
            delay_minutes,
            cause: cause.to_string(),
            caused_by_flight_id,
            passengers_impacted,
            flights_impacted,
            timestamp,
        });
        id
    }

    pub fn entries(&self) -> &[DisruptionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended after the log held `len` entries
    pub fn since(&self, len: usize) -> &[DisruptionLogEntry] {
        &self.entries[len.min(self.entries.len())..]
    }

    /// The newest `count` entries, newest first
    pub fn recent(&self, count: usize) -> Vec<DisruptionLogEntry> {
        self.entries.iter().rev().take(count).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 1;
    }
}
