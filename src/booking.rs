use serde::{Deserialize, Serialize};

use crate::flight::FlightId;

pub type PassengerId = u32;
pub type BookingId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: PassengerId,
    pub name: String,
    pub phone: Option<String>,
    /// Unique across the network
    pub email: String,
}

impl Passenger {
    pub fn new(id: PassengerId, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            phone: None,
            email: email.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    MissedConnection,
    Rebooked,
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking holds a seat on its flight
    pub fn occupies_seat(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Rebooked)
    }
}

/// One leg of a passenger itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub passenger_id: PassengerId,
    pub flight_id: FlightId,
    /// Flight the booking was issued on; reset moves rebooked legs back here
    pub original_flight_id: FlightId,
    /// Next leg of the same itinerary
    pub next_booking_id: Option<BookingId>,
    pub status: BookingStatus,
}

impl Booking {
    pub fn new(
        id: BookingId,
        passenger_id: PassengerId,
        flight_id: FlightId,
        next_booking_id: Option<BookingId>,
    ) -> Self {
        Self {
            id,
            passenger_id,
            flight_id,
            original_flight_id: flight_id,
            next_booking_id,
            status: BookingStatus::Confirmed,
        }
    }

    /// CONFIRMED and connecting onward: the bookings connection checks look at
    pub fn is_confirmed_connection(&self) -> bool {
        self.status == BookingStatus::Confirmed && self.next_booking_id.is_some()
    }

    pub fn reset(&mut self) {
        self.flight_id = self.original_flight_id;
        self.status = BookingStatus::Confirmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_booking() {
        let booking = Booking::new(1, 10, 100, Some(2));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.original_flight_id, 100);
        assert!(booking.is_confirmed_connection());
    }

    #[test]
    fn test_final_leg_is_not_a_connection() {
        let booking = Booking::new(2, 10, 101, None);
        assert!(!booking.is_confirmed_connection());
    }

    #[test]
    fn test_seat_occupancy() {
        assert!(BookingStatus::Confirmed.occupies_seat());
        assert!(BookingStatus::Rebooked.occupies_seat());
        assert!(!BookingStatus::MissedConnection.occupies_seat());
        assert!(!BookingStatus::Cancelled.occupies_seat());
    }

    #[test]
    fn test_reset_undoes_rebooking() {
        let mut booking = Booking::new(3, 10, 100, None);
        booking.flight_id = 200;
        booking.status = BookingStatus::Rebooked;
        booking.reset();
        assert_eq!(booking.flight_id, 100);
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }
}
