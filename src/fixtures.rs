/// Ready-made network data.
/// A one-day schedule across eight airports with aircraft rotations and
/// connecting itineraries, used by the demo and by tests.

use chrono::{DateTime, Utc};

use crate::booking::Passenger;
use crate::error::Result;
use crate::flight::Flight;
use crate::network::{Aircraft, Airport, Network};

/// (code, name, city, country, latitude, longitude, timezone)
#[rustfmt::skip]
const AIRPORTS: &[(&str, &str, &str, &str, f64, f64, &str)] = &[
    ("JFK", "John F. Kennedy International", "New York", "US", 40.6413, -73.7781, "America/New_York"),
    ("LHR", "Heathrow", "London", "GB", 51.4700, -0.4543, "Europe/London"),
    ("ORD", "O'Hare International", "Chicago", "US", 41.9742, -87.9073, "America/Chicago"),
    ("ATL", "Hartsfield-Jackson Atlanta International", "Atlanta", "US", 33.6407, -84.4277, "America/New_York"),
    ("SFO", "San Francisco International", "San Francisco", "US", 37.6213, -122.3790, "America/Los_Angeles"),
    ("CDG", "Charles de Gaulle", "Paris", "FR", 49.0097, 2.5479, "Europe/Paris"),
    ("LAX", "Los Angeles International", "Los Angeles", "US", 33.9416, -118.4085, "America/Los_Angeles"),
    ("MIA", "Miami International", "Miami", "US", 25.7959, -80.2870, "America/New_York"),
];

/// (id, tail number, model, capacity, base)
const FLEET: &[(u32, &str, &str, u32, &str)] = &[
    (1, "N101FC", "Airbus A321", 190, "JFK"),
    (2, "G-FCAA", "Boeing 777-300ER", 300, "LHR"),
    (3, "N202FC", "Airbus A320", 150, "SFO"),
    (4, "N303FC", "Boeing 787-9", 250, "JFK"),
    (5, "N404FC", "Airbus A321", 190, "ATL"),
    (6, "N505FC", "Embraer E175", 76, "ORD"),
    (7, "F-FCAB", "Airbus A350-900", 300, "CDG"),
    (8, "N606FC", "Boeing 737-800", 160, "LHR"),
];

/// (id, number, aircraft, origin, destination, departure (h, m), arrival (h, m))
/// Times are UTC on the fixture day; arrivals past midnight use hour >= 24.
const SCHEDULE: &[(u32, &str, u32, &str, &str, (u32, u32), (u32, u32))] = &[
    (1, "FC101", 1, "JFK", "ORD", (7, 0), (9, 30)),
    (2, "FC102", 1, "ORD", "ATL", (10, 30), (13, 0)),
    (3, "FC103", 1, "ATL", "JFK", (14, 0), (16, 15)),
    (4, "FC401", 2, "LHR", "JFK", (8, 0), (11, 30)),
    (5, "FC402", 2, "JFK", "LHR", (13, 0), (20, 0)),
    (6, "FC201", 3, "SFO", "ORD", (6, 0), (10, 15)),
    (7, "FC202", 3, "ORD", "JFK", (11, 15), (13, 30)),
    (8, "FC203", 3, "JFK", "MIA", (14, 30), (17, 30)),
    (9, "FC301", 4, "JFK", "LHR", (18, 0), (25, 0)),
    (10, "FC501", 5, "ATL", "SFO", (8, 0), (13, 0)),
    (11, "FC502", 5, "SFO", "LAX", (14, 0), (15, 30)),
    (12, "FC601", 6, "ORD", "JFK", (15, 0), (17, 15)),
    (13, "FC602", 6, "JFK", "ORD", (18, 0), (20, 15)),
    (14, "FC701", 7, "CDG", "JFK", (9, 0), (12, 30)),
    (15, "FC702", 7, "JFK", "CDG", (14, 30), (22, 0)),
    (16, "FC801", 8, "LHR", "CDG", (7, 0), (8, 15)),
    (17, "FC802", 8, "CDG", "LHR", (9, 0), (10, 15)),
];

/// (passenger id, name, itinerary flight ids)
const ITINERARIES: &[(u32, &str, &[u32])] = &[
    (1, "Amelia Earhart", &[1, 2]),
    (2, "Bessie Coleman", &[6, 7, 8]),
    (3, "Charles Lindbergh", &[4, 8]),
    (4, "Douglas Bader", &[7, 9]),
    (5, "Elly Beinhorn", &[14, 5]),
    (6, "Frank Whittle", &[3, 13]),
    (7, "Geraldine Mock", &[12, 9]),
    (8, "Hanna Reitsch", &[10, 11]),
    (9, "Igor Sikorsky", &[15]),
    (10, "Jacqueline Cochran", &[1, 2, 3]),
];

/// Midnight UTC of the fixture day
pub fn fixture_day() -> DateTime<Utc> {
    // 2024-03-01
    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(19_783)
}

/// An instant on the fixture day. Hours past 23 roll into the next day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    fixture_day() + chrono::Duration::minutes((hour * 60 + minute) as i64)
}

/// Reference data for a known airport code, or a bare placeholder otherwise
pub fn airport(code: &str) -> Airport {
    match AIRPORTS.iter().find(|a| a.0 == code) {
        Some(&(code, name, city, country, latitude, longitude, timezone)) => Airport {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
            timezone: timezone.to_string(),
        },
        None => Airport {
            code: code.to_string(),
            name: format!("{code} Airport"),
            city: code.to_string(),
            country: "ZZ".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: "UTC".to_string(),
        },
    }
}

/// The full demo network.
pub fn demo_network() -> Result<Network> {
    let mut network = Network::new();

    for &(code, ..) in AIRPORTS {
        network.add_airport(airport(code))?;
    }

    for &(id, tail, model, capacity, base) in FLEET {
        network.add_aircraft(Aircraft {
            id,
            tail_number: tail.to_string(),
            model: model.to_string(),
            capacity,
            current_airport: base.to_string(),
        })?;
    }

    for &(id, number, aircraft, origin, destination, dep, arr) in SCHEDULE {
        network.add_flight(Flight::new(
            id,
            number,
            Some(aircraft),
            origin,
            destination,
            at(dep.0, dep.1),
            at(arr.0, arr.1),
        ))?;
    }

    for &(id, name, flights) in ITINERARIES {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        network.add_passenger(Passenger::new(id, name, &email))?;
        network.add_itinerary(id, flights)?;
    }

    Ok(network)
}
