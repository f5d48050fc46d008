/// The flight network: reference data, flights and itineraries.
/// Ordered maps keep every query's walk order stable.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::{Booking, BookingId, BookingStatus, Passenger, PassengerId};
use crate::error::{EngineError, Result};
use crate::flight::{AircraftId, Flight, FlightId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name, e.g. "America/New_York"
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: AircraftId,
    pub tail_number: String,
    pub model: String,
    pub capacity: u32,
    pub current_airport: String,
}

/// Plain document form of a network, for JSON import and export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkData {
    pub airports: Vec<Airport>,
    pub aircraft: Vec<Aircraft>,
    pub flights: Vec<Flight>,
    pub passengers: Vec<Passenger>,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    pub(crate) airports: BTreeMap<String, Airport>,
    pub(crate) aircraft: BTreeMap<AircraftId, Aircraft>,
    pub(crate) flights: BTreeMap<FlightId, Flight>,
    pub(crate) passengers: BTreeMap<PassengerId, Passenger>,
    pub(crate) bookings: BTreeMap<BookingId, Booking>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // Building
    // ==========================================

    pub fn add_airport(&mut self, airport: Airport) -> Result<()> {
        if self.airports.contains_key(&airport.code) {
            return Err(EngineError::invalid_network(format!(
                "duplicate airport code {}",
                airport.code
            )));
        }
        self.airports.insert(airport.code.clone(), airport);
        Ok(())
    }

    pub fn add_aircraft(&mut self, aircraft: Aircraft) -> Result<()> {
        if self.aircraft.contains_key(&aircraft.id) {
            return Err(EngineError::invalid_network(format!(
                "duplicate aircraft id {}",
                aircraft.id
            )));
        }
        if self
            .aircraft
            .values()
            .any(|a| a.tail_number == aircraft.tail_number)
        {
            return Err(EngineError::invalid_network(format!(
                "duplicate tail number {}",
                aircraft.tail_number
            )));
        }
        self.airport(&aircraft.current_airport)?;
        self.aircraft.insert(aircraft.id, aircraft);
        Ok(())
    }

    pub fn add_flight(&mut self, flight: Flight) -> Result<()> {
        if self.flights.contains_key(&flight.id) {
            return Err(EngineError::invalid_network(format!(
                "duplicate flight id {}",
                flight.id
            )));
        }
        self.airport(&flight.origin)?;
        self.airport(&flight.destination)?;
        if let Some(aircraft_id) = flight.aircraft_id {
            self.aircraft(aircraft_id)?;
        }
        if flight.scheduled_arrival <= flight.scheduled_departure {
            return Err(EngineError::invalid_network(format!(
                "flight {} arrives before it departs",
                flight.flight_number
            )));
        }
        self.flights.insert(flight.id, flight);
        Ok(())
    }

    pub fn add_passenger(&mut self, passenger: Passenger) -> Result<()> {
        if self.passengers.contains_key(&passenger.id) {
            return Err(EngineError::invalid_network(format!(
                "duplicate passenger id {}",
                passenger.id
            )));
        }
        if self.passengers.values().any(|p| p.email == passenger.email) {
            return Err(EngineError::invalid_network(format!(
                "duplicate passenger email {}",
                passenger.email
            )));
        }
        self.passengers.insert(passenger.id, passenger);
        Ok(())
    }

    /// Insert one booking. A forward link must point at an existing booking
    /// of the same passenger, so itineraries are added last leg first.
    pub fn add_booking(&mut self, booking: Booking) -> Result<()> {
        if self.bookings.contains_key(&booking.id) {
            return Err(EngineError::invalid_network(format!(
                "duplicate booking id {}",
                booking.id
            )));
        }
        self.passenger(booking.passenger_id)?;
        self.flight(booking.flight_id)?;
        self.flight(booking.original_flight_id)?;
        if let Some(next_id) = booking.next_booking_id {
            let next = self.booking(next_id)?;
            if next.passenger_id != booking.passenger_id {
                return Err(EngineError::invalid_network(format!(
                    "booking {} links to booking {} of another passenger",
                    booking.id, next_id
                )));
            }
        }
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    /// Book a passenger onto consecutive flights, linking each leg to the next.
    /// Returns the booking ids in travel order.
    pub fn add_itinerary(
        &mut self,
        passenger_id: PassengerId,
        flight_ids: &[FlightId],
    ) -> Result<Vec<BookingId>> {
        let first_id = self.next_booking_id();
        let ids: Vec<BookingId> = (0..flight_ids.len() as u32).map(|i| first_id + i).collect();

        let mut next = None;
        for (booking_id, flight_id) in ids.iter().zip(flight_ids).rev() {
            self.add_booking(Booking::new(*booking_id, passenger_id, *flight_id, next))?;
            next = Some(*booking_id);
        }
        Ok(ids)
    }

    pub fn next_booking_id(&self) -> BookingId {
        self.bookings.keys().next_back().map(|id| id + 1).unwrap_or(1)
    }

    /// Validate a document into a network. Bookings are inserted in an order
    /// that satisfies forward links regardless of their order in the document.
    pub fn from_data(data: NetworkData) -> Result<Self> {
        let mut network = Network::new();
        for airport in data.airports {
            network.add_airport(airport)?;
        }
        for aircraft in data.aircraft {
            network.add_aircraft(aircraft)?;
        }
        for flight in data.flights {
            network.add_flight(flight)?;
        }
        for passenger in data.passengers {
            network.add_passenger(passenger)?;
        }

        let mut pending = data.bookings;
        while !pending.is_empty() {
            let before = pending.len();
            let (ready, waiting): (Vec<Booking>, Vec<Booking>) =
                pending.into_iter().partition(|b| {
                    b.next_booking_id
                        .map(|next| network.bookings.contains_key(&next))
                        .unwrap_or(true)
                });
            for booking in ready {
                network.add_booking(booking)?;
            }
            pending = waiting;
            if pending.len() == before {
                let ids: Vec<String> = pending.iter().map(|b| b.id.to_string()).collect();
                return Err(EngineError::invalid_network(format!(
                    "bookings with unresolved or cyclic forward links: {}",
                    ids.join(", ")
                )));
            }
        }
        Ok(network)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: NetworkData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    pub fn to_data(&self) -> NetworkData {
        NetworkData {
            airports: self.airports.values().cloned().collect(),
            aircraft: self.aircraft.values().cloned().collect(),
            flights: self.flights.values().cloned().collect(),
            passengers: self.passengers.values().cloned().collect(),
            bookings: self.bookings.values().cloned().collect(),
        }
    }

    // ==========================================
    // Lookup
    // ==========================================

    pub fn airport(&self, code: &str) -> Result<&Airport> {
        self.airports
            .get(code)
            .ok_or_else(|| EngineError::not_found("airport", code))
    }

    pub fn aircraft(&self, id: AircraftId) -> Result<&Aircraft> {
        self.aircraft
            .get(&id)
            .ok_or_else(|| EngineError::not_found("aircraft", id))
    }

    pub fn flight(&self, id: FlightId) -> Result<&Flight> {
        self.flights
            .get(&id)
            .ok_or_else(|| EngineError::not_found("flight", id))
    }

    pub fn flight_mut(&mut self, id: FlightId) -> Result<&mut Flight> {
        self.flights
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("flight", id))
    }

    pub fn passenger(&self, id: PassengerId) -> Result<&Passenger> {
        self.passengers
            .get(&id)
            .ok_or_else(|| EngineError::not_found("passenger", id))
    }

    pub fn booking(&self, id: BookingId) -> Result<&Booking> {
        self.bookings
            .get(&id)
            .ok_or_else(|| EngineError::not_found("booking", id))
    }

    pub fn booking_mut(&mut self, id: BookingId) -> Result<&mut Booking> {
        self.bookings
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("booking", id))
    }

    pub fn flights(&self) -> impl Iterator<Item = &Flight> {
        self.flights.values()
    }

    pub fn flights_mut(&mut self) -> impl Iterator<Item = &mut Flight> {
        self.flights.values_mut()
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    pub fn bookings_mut(&mut self) -> impl Iterator<Item = &mut Booking> {
        self.bookings.values_mut()
    }

    pub fn airports(&self) -> impl Iterator<Item = &Airport> {
        self.airports.values()
    }

    pub fn passengers(&self) -> impl Iterator<Item = &Passenger> {
        self.passengers.values()
    }

    // ==========================================
    // Range queries
    // ==========================================

    /// Earliest flight on `aircraft_id` departing at/after `at_or_after`,
    /// other than `excluding`, that has not landed or been cancelled.
    pub fn next_rotation_flight(
        &self,
        aircraft_id: AircraftId,
        at_or_after: DateTime<Utc>,
        excluding: FlightId,
    ) -> Option<&Flight> {
        self.flights
            .values()
            .filter(|f| {
                f.aircraft_id == Some(aircraft_id)
                    && f.id != excluding
                    && !f.status.is_terminal()
                    && f.effective_departure() >= at_or_after
            })
            .min_by_key(|f| (f.effective_departure(), f.id))
    }

    /// CONFIRMED bookings on `flight_id` that connect onward.
    pub fn onward_bookings(&self, flight_id: FlightId) -> Vec<&Booking> {
        self.bookings
            .values()
            .filter(|b| b.flight_id == flight_id && b.is_confirmed_connection())
            .collect()
    }

    /// Operating flights leaving `code`.
    pub fn departures_from(&self, code: &str) -> Vec<FlightId> {
        self.flights
            .values()
            .filter(|f| f.origin == code && f.status.is_operating())
            .map(|f| f.id)
            .collect()
    }

    /// Operating flights arriving at `code`.
    pub fn arrivals_into(&self, code: &str) -> Vec<FlightId> {
        self.flights
            .values()
            .filter(|f| f.destination == code && f.status.is_operating())
            .map(|f| f.id)
            .collect()
    }

    /// Operating flights anywhere in the network.
    pub fn operating_flights(&self) -> Vec<FlightId> {
        self.flights
            .values()
            .filter(|f| f.status.is_operating())
            .map(|f| f.id)
            .collect()
    }

    /// Same-route flights departing strictly after `after`, earliest first.
    pub fn alternatives(
        &self,
        origin: &str,
        destination: &str,
        after: DateTime<Utc>,
        excluding: FlightId,
        limit: usize,
    ) -> Vec<&Flight> {
        let mut candidates: Vec<&Flight> = self
            .flights
            .values()
            .filter(|f| {
                f.origin == origin
                    && f.destination == destination
                    && f.id != excluding
                    && !f.status.is_terminal()
                    && f.effective_departure() > after
            })
            .collect();
        candidates.sort_by_key(|f| (f.effective_departure(), f.id));
        candidates.truncate(limit);
        candidates
    }

    /// Seats held by CONFIRMED or REBOOKED bookings.
    pub fn occupied_seats(&self, flight_id: FlightId) -> u32 {
        self.bookings
            .values()
            .filter(|b| b.flight_id == flight_id && b.status.occupies_seat())
            .count() as u32
    }

    /// Seat capacity of the flight's aircraft; unassigned flights have none.
    pub fn capacity(&self, flight: &Flight) -> Result<u32> {
        match flight.aircraft_id {
            Some(aircraft_id) => Ok(self.aircraft(aircraft_id)?.capacity),
            None => Ok(0),
        }
    }

    pub fn missed_bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings
            .values()
            .filter(|b| b.status == BookingStatus::MissedConnection)
    }

    /// Distinct passengers holding at least one MISSED_CONNECTION booking
    pub fn stranded_passengers(&self) -> BTreeSet<PassengerId> {
        self.missed_bookings().map(|b| b.passenger_id).collect()
    }
}
