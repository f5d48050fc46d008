/// Flight lifecycle: SCHEDULED → BOARDING → ACTIVE → LANDED.
/// DELAYED sits beside the forward states and still moves on to ACTIVE.
/// CANCELLED is never produced here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::MAX_THRESHOLD_MINUTES;
use crate::flight::{Flight, FlightId, FlightStatus};
use crate::network::Network;

/// A status change made by one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub flight_id: FlightId,
    pub from: FlightStatus,
    pub to: FlightStatus,
}

/// The lifecycle rules, parameterized by the boarding window.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    boarding_window: Duration,
}

impl Lifecycle {
    /// Windows outside `0..=MAX_THRESHOLD_MINUTES` are clamped.
    pub fn new(boarding_window_minutes: i64) -> Self {
        Self {
            boarding_window: Duration::minutes(
                boarding_window_minutes.clamp(0, MAX_THRESHOLD_MINUTES),
            ),
        }
    }

    /// The transition that applies to `flight` at `now`, if any.
    ///
    /// Each rule only fires inside its own time slot: boarding between the
    /// window opening and departure, ACTIVE between departure and arrival.
    /// A flight whose slot passed between ticks stays where it is.
    pub fn next_status(&self, flight: &Flight, now: DateTime<Utc>) -> Option<FlightStatus> {
        let departure = flight.effective_departure();
        let arrival = flight.effective_arrival();
        let boarding_opens = departure
            .checked_sub_signed(self.boarding_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        match flight.status {
            FlightStatus::Scheduled if now >= boarding_opens && now < departure => {
                Some(FlightStatus::Boarding)
            }
            FlightStatus::Boarding | FlightStatus::Delayed if now >= departure && now < arrival => {
                Some(FlightStatus::Active)
            }
            FlightStatus::Active if now >= arrival => Some(FlightStatus::Landed),
            _ => None,
        }
    }

    /// Apply at most one transition to `flight`.
    pub fn settle(&self, flight: &mut Flight, now: DateTime<Utc>) -> Option<Transition> {
        let next = self.next_status(flight, now)?;
        trace!(flight_id = flight.id, from = %flight.status, to = %next, "lifecycle transition");
        let transition = Transition {
            flight_id: flight.id,
            from: flight.status,
            to: next,
        };
        flight.status = next;
        Some(transition)
    }

    /// Settle every flight in the network.
    pub fn advance(&self, network: &mut Network, now: DateTime<Utc>) -> Vec<Transition> {
        network
            .flights_mut()
            .filter_map(|flight| self.settle(flight, now))
            .collect()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BOARDING_WINDOW_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::at;

    fn flight() -> Flight {
        Flight::new(1, "FC1", None, "JFK", "ORD", at(10, 0), at(12, 0))
    }

    #[test]
    fn test_scheduled_stays_before_window() {
        let mut f = flight();
        assert!(Lifecycle::default().settle(&mut f, at(9, 29)).is_none());
        assert_eq!(f.status, FlightStatus::Scheduled);
    }

    #[test]
    fn test_boarding_window_opens_30_minutes_out() {
        let mut f = flight();
        let transition = Lifecycle::default().settle(&mut f, at(9, 30)).unwrap();
        assert_eq!(transition.from, FlightStatus::Scheduled);
        assert_eq!(transition.to, FlightStatus::Boarding);
        assert_eq!(f.status, FlightStatus::Boarding);
    }

    #[test]
    fn test_active_then_landed() {
        let lifecycle = Lifecycle::default();
        let mut f = flight();
        f.status = FlightStatus::Boarding;

        lifecycle.settle(&mut f, at(10, 0));
        assert_eq!(f.status, FlightStatus::Active);

        lifecycle.settle(&mut f, at(11, 59));
        assert_eq!(f.status, FlightStatus::Active);

        lifecycle.settle(&mut f, at(12, 0));
        assert_eq!(f.status, FlightStatus::Landed);
    }

    #[test]
    fn test_delayed_uses_effective_times() {
        let lifecycle = Lifecycle::default();
        let mut f = flight();
        f.apply_delay(60).unwrap();

        // Inside the boarding window: DELAYED does not board
        lifecycle.settle(&mut f, at(10, 45));
        assert_eq!(f.status, FlightStatus::Delayed);

        // Scheduled departure passed but effective one has not
        lifecycle.settle(&mut f, at(10, 59));
        assert_eq!(f.status, FlightStatus::Delayed);

        lifecycle.settle(&mut f, at(11, 0));
        assert_eq!(f.status, FlightStatus::Active);
    }

    #[test]
    fn test_missed_slots_do_not_fire() {
        let lifecycle = Lifecycle::default();

        // Departure already passed: never boards
        let mut scheduled = flight();
        assert!(lifecycle.settle(&mut scheduled, at(10, 0)).is_none());
        assert!(lifecycle.settle(&mut scheduled, at(13, 0)).is_none());
        assert_eq!(scheduled.status, FlightStatus::Scheduled);

        // Arrival already passed: never goes ACTIVE
        let mut delayed = flight();
        delayed.apply_delay(10).unwrap();
        assert!(lifecycle.settle(&mut delayed, at(13, 0)).is_none());
        assert_eq!(delayed.status, FlightStatus::Delayed);

        let mut boarding = flight();
        boarding.status = FlightStatus::Boarding;
        assert!(lifecycle.settle(&mut boarding, at(12, 0)).is_none());
        assert_eq!(boarding.status, FlightStatus::Boarding);
    }

    #[test]
    fn test_one_step_per_tick() {
        let lifecycle = Lifecycle::default();
        let mut f = flight();
        f.status = FlightStatus::Boarding;
        lifecycle.settle(&mut f, at(11, 0));
        assert_eq!(f.status, FlightStatus::Active);
        assert!(lifecycle.settle(&mut f, at(11, 0)).is_none());
    }

    #[test]
    fn test_terminal_states_never_move() {
        let lifecycle = Lifecycle::default();
        let mut cancelled = flight();
        cancelled.status = FlightStatus::Cancelled;
        assert!(lifecycle.settle(&mut cancelled, at(13, 0)).is_none());

        let mut landed = flight();
        landed.status = FlightStatus::Landed;
        assert!(lifecycle.settle(&mut landed, at(13, 0)).is_none());
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let mut f = flight();
        let lifecycle = Lifecycle::new(i64::MAX);
        lifecycle.settle(&mut f, at(0, 0));
        assert_eq!(f.status, FlightStatus::Boarding);
    }
}
