use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub type FlightId = u32;
pub type AircraftId = u32;

/// Whole minutes from `earlier` to `later` (negative when `later` is earlier)
pub fn minutes_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_minutes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Boarding,
    Active,
    Landed,
    /// Parallel to the forward states; still moves on to ACTIVE and LANDED
    Delayed,
    /// Terminal, only ever set from outside the engine
    Cancelled,
}

impl FlightStatus {
    /// LANDED and CANCELLED flights are out of every search and cascade
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightStatus::Landed | FlightStatus::Cancelled)
    }

    /// SCHEDULED, BOARDING or ACTIVE: the flights chaos and scenarios target
    pub fn is_operating(&self) -> bool {
        matches!(
            self,
            FlightStatus::Scheduled | FlightStatus::Boarding | FlightStatus::Active
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::Boarding => "BOARDING",
            FlightStatus::Active => "ACTIVE",
            FlightStatus::Landed => "LANDED",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub flight_number: String,
    pub aircraft_id: Option<AircraftId>,
    pub origin: String,
    pub destination: String,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: DateTime<Utc>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    /// Cumulative delay; only ever grows until reset
    pub delay_minutes: u32,
    pub status: FlightStatus,
}

impl Flight {
    /// A SCHEDULED flight with no actual times yet.
    pub fn new(
        id: FlightId,
        flight_number: &str,
        aircraft_id: Option<AircraftId>,
        origin: &str,
        destination: &str,
        scheduled_departure: DateTime<Utc>,
        scheduled_arrival: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            flight_number: flight_number.to_string(),
            aircraft_id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            scheduled_departure,
            scheduled_arrival,
            actual_departure: None,
            actual_arrival: None,
            delay_minutes: 0,
            status: FlightStatus::Scheduled,
        }
    }

    pub fn effective_departure(&self) -> DateTime<Utc> {
        self.actual_departure.unwrap_or(self.scheduled_departure)
    }

    pub fn effective_arrival(&self) -> DateTime<Utc> {
        self.actual_arrival.unwrap_or(self.scheduled_arrival)
    }

    pub fn scheduled_duration(&self) -> Duration {
        self.scheduled_arrival - self.scheduled_departure
    }

    /// Add `minutes` of delay, shifting both actual endpoints by the same amount
    /// and flagging the flight DELAYED. Nothing changes if the cumulative delay
    /// or either shifted time would overflow.
    pub fn apply_delay(&mut self, minutes: u32) -> Result<()> {
        let overflow = || {
            EngineError::invalid_delay(format!(
                "{} + {minutes} minutes overflows flight {}",
                self.delay_minutes, self.id
            ))
        };
        let total = self.delay_minutes.checked_add(minutes).ok_or_else(overflow)?;
        let shift = Duration::minutes(i64::from(minutes));
        let departure = self
            .effective_departure()
            .checked_add_signed(shift)
            .ok_or_else(overflow)?;
        let arrival = self
            .effective_arrival()
            .checked_add_signed(shift)
            .ok_or_else(overflow)?;

        self.delay_minutes = total;
        self.actual_departure = Some(departure);
        self.actual_arrival = Some(arrival);
        self.status = FlightStatus::Delayed;
        Ok(())
    }

    /// Back to the published schedule.
    pub fn reset(&mut self) {
        self.actual_departure = Some(self.scheduled_departure);
        self.actual_arrival = Some(self.scheduled_arrival);
        self.delay_minutes = 0;
        self.status = FlightStatus::Scheduled;
    }

    pub fn route(&self) -> (&str, &str) {
        (&self.origin, &self.destination)
    }
}
