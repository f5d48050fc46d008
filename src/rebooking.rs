/// Greedy first-fit rebooking for missed connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::booking::{Booking, BookingId, BookingStatus, PassengerId};
use crate::error::{EngineError, Result};
use crate::flight::{minutes_between, Flight, FlightId};
use crate::network::Network;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebookingSuggestion {
    /// Inbound booking whose connection was missed
    pub booking_id: BookingId,
    pub passenger_id: PassengerId,
    pub passenger_name: String,
    /// Onward booking on the missed flight
    pub missed_booking_id: BookingId,
    pub missed_flight_id: FlightId,
    pub missed_flight_number: String,
    pub alternative_flight_id: FlightId,
    pub alternative_flight_number: String,
    pub alternative_departure: DateTime<Utc>,
    pub alternative_arrival: DateTime<Utc>,
    pub seats_available: u32,
    /// Missed arrival minus alternative arrival; negative when the alternative lands later
    pub time_saved_minutes: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RebookingMatcher {
    candidates: usize,
}

impl RebookingMatcher {
    pub fn new(candidates: usize) -> Self {
        Self { candidates }
    }

    /// One suggestion per missed connection that has a flight with room.
    pub fn suggest(
        &self,
        network: &Network,
        now: DateTime<Utc>,
    ) -> Result<Vec<RebookingSuggestion>> {
        let mut suggestions = Vec::new();
        for booking in network.missed_bookings() {
            if let Some(suggestion) = self.suggest_for(network, booking, now)? {
                suggestions.push(suggestion);
            }
        }
        debug!(count = suggestions.len(), "rebooking suggestions computed");
        Ok(suggestions)
    }

    /// Suggestion for a single booking, if it is a missed connection with an
    /// available alternative.
    pub fn suggest_for(
        &self,
        network: &Network,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Result<Option<RebookingSuggestion>> {
        if booking.status != BookingStatus::MissedConnection {
            return Ok(None);
        }
        let Some(missed_booking_id) = booking.next_booking_id else {
            return Ok(None);
        };
        let missed_booking = network.booking(missed_booking_id).map_err(|_| {
            EngineError::storage(format!(
                "booking {} links to missing booking {missed_booking_id}",
                booking.id
            ))
        })?;
        let missed = network.flight(missed_booking.flight_id).map_err(|_| {
            EngineError::storage(format!(
                "booking {missed_booking_id} references missing flight {}",
                missed_booking.flight_id
            ))
        })?;

        let candidates = network.alternatives(
            &missed.origin,
            &missed.destination,
            now,
            missed.id,
            self.candidates,
        );
        for candidate in candidates {
            let available = seats_available(network, candidate)?;
            if available == 0 {
                continue;
            }
            let passenger_name = network
                .passenger(booking.passenger_id)
                .map(|p| p.name.clone())
                .map_err(|_| {
                    EngineError::storage(format!(
                        "booking {} references missing passenger {}",
                        booking.id, booking.passenger_id
                    ))
                })?;
            return Ok(Some(RebookingSuggestion {
                booking_id: booking.id,
                passenger_id: booking.passenger_id,
                passenger_name,
                missed_booking_id,
                missed_flight_id: missed.id,
                missed_flight_number: missed.flight_number.clone(),
                alternative_flight_id: candidate.id,
                alternative_flight_number: candidate.flight_number.clone(),
                alternative_departure: candidate.effective_departure(),
                alternative_arrival: candidate.effective_arrival(),
                seats_available: available,
                time_saved_minutes: minutes_between(
                    missed.effective_arrival(),
                    candidate.effective_arrival(),
                ),
            }));
        }
        Ok(None)
    }

    /// Move the missed onward leg onto `alternative_flight_id`.
    ///
    /// Both the inbound booking and the moved onward booking end up REBOOKED.
    /// Every precondition is checked before anything changes.
    pub fn accept(
        &self,
        network: &mut Network,
        booking_id: BookingId,
        alternative_flight_id: FlightId,
    ) -> Result<()> {
        let booking = network.booking(booking_id)?;
        if booking.status != BookingStatus::MissedConnection {
            return Err(EngineError::invalid_rebooking(format!(
                "booking {booking_id} has not missed a connection"
            )));
        }
        let missed_booking_id = booking.next_booking_id.ok_or_else(|| {
            EngineError::invalid_rebooking(format!("booking {booking_id} has no onward leg"))
        })?;
        let missed_flight_id = network.booking(missed_booking_id)?.flight_id;
        let missed = network.flight(missed_flight_id)?;
        let alternative = network.flight(alternative_flight_id)?;

        if alternative.id == missed.id {
            return Err(EngineError::invalid_rebooking(format!(
                "flight {alternative_flight_id} is the missed flight"
            )));
        }
        if alternative.route() != missed.route() {
            return Err(EngineError::invalid_rebooking(format!(
                "flight {} does not fly {}-{}",
                alternative.flight_number, missed.origin, missed.destination
            )));
        }
        if alternative.status.is_terminal() {
            return Err(EngineError::invalid_rebooking(format!(
                "flight {} is {}",
                alternative.flight_number, alternative.status
            )));
        }
        if seats_available(network, alternative)? == 0 {
            return Err(EngineError::invalid_rebooking(format!(
                "flight {} is full",
                alternative.flight_number
            )));
        }

        let onward = network.booking_mut(missed_booking_id)?;
        onward.flight_id = alternative_flight_id;
        onward.status = BookingStatus::Rebooked;
        network.booking_mut(booking_id)?.status = BookingStatus::Rebooked;

        info!(
            booking_id,
            missed_booking_id,
            from_flight = missed_flight_id,
            to_flight = alternative_flight_id,
            "rebooking accepted"
        );
        Ok(())
    }
}

impl Default for RebookingMatcher {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REBOOKING_CANDIDATES)
    }
}

/// Capacity minus seats held. Never negative.
fn seats_available(network: &Network, flight: &Flight) -> Result<u32> {
    let capacity = network.capacity(flight)?;
    Ok(capacity.saturating_sub(network.occupied_seats(flight.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::Passenger;
    use crate::fixtures::{airport, at};
    use crate::network::Aircraft;

    /// Passenger 1 arrives ORD->JFK on flight 1 and misses JFK->LHR flight 2.
    /// Flights 3, 4, 5 and 6 fly JFK->LHR later on.
    fn scenario() -> (Network, Vec<BookingId>) {
        let mut network = Network::new();
        for code in ["JFK", "LHR", "ORD"] {
            network.add_airport(airport(code)).unwrap();
        }
        for (id, capacity) in [(1, 1), (2, 200)] {
            network
                .add_aircraft(Aircraft {
                    id,
                    tail_number: format!("N{id}"),
                    model: "A330".to_string(),
                    capacity,
                    current_airport: "JFK".to_string(),
                })
                .unwrap();
        }
        let flights = [
            Flight::new(1, "FC1", None, "ORD", "JFK", at(8, 0), at(10, 0)),
            Flight::new(2, "FC2", Some(2), "JFK", "LHR", at(10, 20), at(17, 20)),
            Flight::new(3, "FC3", Some(1), "JFK", "LHR", at(12, 0), at(19, 0)),
            Flight::new(4, "FC4", Some(1), "JFK", "LHR", at(13, 0), at(20, 0)),
            Flight::new(5, "FC5", Some(1), "JFK", "LHR", at(14, 0), at(21, 0)),
            Flight::new(6, "FC6", Some(2), "JFK", "LHR", at(15, 0), at(22, 0)),
        ];
        for flight in flights {
            network.add_flight(flight).unwrap();
        }
        for id in 1..=3 {
            network
                .add_passenger(Passenger::new(id, &format!("P{id}"), &format!("p{id}@example.com")))
                .unwrap();
        }
        let ids = network.add_itinerary(1, &[1, 2]).unwrap();
        // Fill flights 3 and 4
        network.add_itinerary(2, &[3]).unwrap();
        network.add_itinerary(3, &[4]).unwrap();

        for id in &ids {
            network.booking_mut(*id).unwrap().status = BookingStatus::MissedConnection;
        }
        (network, ids)
    }

    #[test]
    fn test_first_candidate_with_a_seat() {
        let (network, ids) = scenario();
        let suggestions = RebookingMatcher::default().suggest(&network, at(9, 0)).unwrap();

        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.booking_id, ids[0]);
        assert_eq!(s.missed_booking_id, ids[1]);
        assert_eq!(s.missed_flight_id, 2);
        assert_eq!(s.alternative_flight_id, 5);
        assert_eq!(s.seats_available, 1);
        assert_eq!(s.passenger_name, "P1");
    }

    #[test]
    fn test_time_saved_can_be_negative() {
        let (network, _) = scenario();
        let suggestions = RebookingMatcher::default().suggest(&network, at(9, 0)).unwrap();
        // Missed arrival 17:20, alternative 21:00
        assert_eq!(suggestions[0].time_saved_minutes, -220);
    }

    #[test]
    fn test_only_three_candidates_considered() {
        let (mut network, _) = scenario();
        // Fill flight 5 too; flight 6 has room but is fourth in line
        network
            .add_passenger(Passenger::new(4, "P4", "p4@example.com"))
            .unwrap();
        network.add_itinerary(4, &[5]).unwrap();

        let suggestions = RebookingMatcher::default().suggest(&network, at(9, 0)).unwrap();
        assert!(suggestions.is_empty());

        let wider = RebookingMatcher::new(4).suggest(&network, at(9, 0)).unwrap();
        assert_eq!(wider[0].alternative_flight_id, 6);
    }

    #[test]
    fn test_departed_candidates_excluded() {
        let (network, _) = scenario();
        // At 13:30 only flights 5 and 6 still depart in the future
        let suggestions = RebookingMatcher::default().suggest(&network, at(13, 30)).unwrap();
        assert_eq!(suggestions[0].alternative_flight_id, 5);

        let later = RebookingMatcher::default().suggest(&network, at(14, 30)).unwrap();
        assert_eq!(later[0].alternative_flight_id, 6);
    }

    #[test]
    fn test_onward_leg_alone_gets_no_suggestion() {
        let (mut network, ids) = scenario();
        network.booking_mut(ids[0]).unwrap().status = BookingStatus::Confirmed;
        let suggestions = RebookingMatcher::default().suggest(&network, at(9, 0)).unwrap();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_accept_moves_onward_leg() {
        let (mut network, ids) = scenario();
        let matcher = RebookingMatcher::default();
        matcher.accept(&mut network, ids[0], 5).unwrap();

        let inbound = network.booking(ids[0]).unwrap();
        let onward = network.booking(ids[1]).unwrap();
        assert_eq!(inbound.status, BookingStatus::Rebooked);
        assert_eq!(onward.status, BookingStatus::Rebooked);
        assert_eq!(onward.flight_id, 5);
        assert_eq!(onward.original_flight_id, 2);
        assert_eq!(network.occupied_seats(5), 1);

        // Nothing left to suggest
        assert!(matcher.suggest(&network, at(9, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_accept_rejects_full_or_wrong_route() {
        let (mut network, ids) = scenario();
        let matcher = RebookingMatcher::default();

        let full = matcher.accept(&mut network, ids[0], 3);
        assert!(matches!(full, Err(EngineError::InvalidRebooking(_))));

        let wrong_route = matcher.accept(&mut network, ids[0], 1);
        assert!(matches!(wrong_route, Err(EngineError::InvalidRebooking(_))));

        let same = matcher.accept(&mut network, ids[0], 2);
        assert!(matches!(same, Err(EngineError::InvalidRebooking(_))));

        // Untouched after the failures
        assert_eq!(
            network.booking(ids[0]).unwrap().status,
            BookingStatus::MissedConnection
        );
    }
}
