/// Delay propagation through aircraft rotations and passenger connections.
/// Recursion depth is an explicit input; past `max_depth` a call changes nothing.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::audit::AuditLog;
use crate::booking::{BookingId, BookingStatus};
use crate::config::CascadeRules;
use crate::error::{EngineError, Result};
use crate::flight::{minutes_between, FlightId};
use crate::network::Network;

/// How a single propagation call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    /// Delay applied and logged
    Applied,
    /// Depth exceeded the limit; nothing was changed
    DepthLimitReached,
}

/// Cause label for a delay forced by aircraft turnaround
pub fn turnaround_cause(from_flight: FlightId) -> String {
    format!("Aircraft turnaround from flight {from_flight}")
}

/// Runs propagation against a network and log, normally the private copies
/// held by a store transaction.
pub struct Propagator<'a> {
    network: &'a mut Network,
    log: &'a mut AuditLog,
    rules: CascadeRules,
    now: DateTime<Utc>,
}

impl<'a> Propagator<'a> {
    pub fn new(
        network: &'a mut Network,
        log: &'a mut AuditLog,
        rules: CascadeRules,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            network,
            log,
            rules,
            now,
        }
    }

    /// Root call: no causing flight, depth 0.
    pub fn propagate_root(
        &mut self,
        flight_id: FlightId,
        delay_minutes: u32,
        cause: &str,
    ) -> Result<CascadeStep> {
        self.propagate_delay(flight_id, delay_minutes, cause, None, 0)
    }

    pub fn propagate_delay(
        &mut self,
        flight_id: FlightId,
        delay_minutes: u32,
        cause: &str,
        caused_by: Option<FlightId>,
        depth: u32,
    ) -> Result<CascadeStep> {
        if depth > self.rules.max_depth {
            warn!(
                flight_id,
                depth,
                max_depth = self.rules.max_depth,
                "cascade contained at depth limit"
            );
            return Ok(CascadeStep::DepthLimitReached);
        }

        // Apply the delay
        let flight = self
            .network
            .flight_mut(flight_id)
            .map_err(|e| dangling(e, depth))?;
        flight.apply_delay(delay_minutes)?;
        let new_arrival = flight.effective_arrival();
        let aircraft_id = flight.aircraft_id;
        debug!(
            flight_id,
            delay_minutes,
            depth,
            total_delay = flight.delay_minutes,
            cause,
            "delay applied"
        );

        // Aircraft turnaround
        let mut flights_impacted = 0;
        let next_leg = aircraft_id.and_then(|aircraft_id| {
            self.network
                .next_rotation_flight(aircraft_id, new_arrival, flight_id)
                .map(|next| (next.id, minutes_between(next.effective_departure(), new_arrival)))
        });
        if let Some((next_id, ground_minutes)) = next_leg {
            let forced = self.rules.min_turnaround_minutes - ground_minutes;
            if forced > 0 {
                debug!(flight_id, next_id, ground_minutes, forced, "turnaround too short");
                let forced = u32::try_from(forced).map_err(|_| {
                    EngineError::storage(format!("forced delay {forced} out of range"))
                })?;
                self.propagate_delay(
                    next_id,
                    forced,
                    &turnaround_cause(flight_id),
                    Some(flight_id),
                    depth + 1,
                )?;
                flights_impacted += 1;
            }
        }

        // Passenger connections
        let mut passengers_impacted = 0;
        let connections: Vec<(BookingId, BookingId)> = self
            .network
            .onward_bookings(flight_id)
            .iter()
            .filter_map(|b| b.next_booking_id.map(|next| (b.id, next)))
            .collect();
        for (booking_id, next_booking_id) in connections {
            let onward_flight_id = self
                .network
                .booking(next_booking_id)
                .map_err(|_| {
                    EngineError::storage(format!(
                        "booking {booking_id} links to missing booking {next_booking_id}"
                    ))
                })?
                .flight_id;
            let onward_departure = self
                .network
                .flight(onward_flight_id)
                .map_err(|_| {
                    EngineError::storage(format!(
                        "booking {next_booking_id} references missing flight {onward_flight_id}"
                    ))
                })?
                .effective_departure();

            let window = minutes_between(onward_departure, new_arrival);
            if window < self.rules.min_connection_minutes {
                debug!(booking_id, next_booking_id, window, "connection broken");
                self.network.booking_mut(booking_id)?.status = BookingStatus::MissedConnection;
                self.network.booking_mut(next_booking_id)?.status =
                    BookingStatus::MissedConnection;
                passengers_impacted += 1;
            }
        }

        self.log.record(
            flight_id,
            delay_minutes,
            cause,
            caused_by,
            passengers_impacted,
            flights_impacted,
            self.now,
        );
        Ok(CascadeStep::Applied)
    }
}

/// Below the root, a missing flight means the stored rotation is broken.
fn dangling(err: EngineError, depth: u32) -> EngineError {
    match err {
        EngineError::NotFound { kind, id } if depth > 0 => {
            EngineError::storage(format!("cascade reached missing {kind} {id}"))
        }
        other => other,
    }
}
