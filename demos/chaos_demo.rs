use std::sync::Arc;

use flight_cascade::clock::SimClock;
use flight_cascade::config::EngineConfig;
use flight_cascade::fixtures::{at, demo_network};
use flight_cascade::scenario::ScenarioId;
use flight_cascade::{DelayRequest, DisruptionEngine, TriggerOutcome};
use tracing_subscriber::EnvFilter;

fn print_outcome(outcome: &TriggerOutcome) {
    for event in &outcome.events {
        let marker = if event.cascaded { "  ↳" } else { "  ●" };
        println!(
            "{} flight {:>3} +{:>3} min  {} (pax {}, flights {})",
            marker,
            event.flight_id,
            event.delay_minutes,
            event.cause,
            event.passengers_impacted,
            event.flights_impacted
        );
    }
    let m = &outcome.world.metrics;
    println!(
        "\n  delayed: {}  missed: {}  stranded: {}  total delay: {} min\n",
        m.delayed_flights, m.missed_connections, m.stranded_passengers, m.total_delay_minutes
    );
}

fn main() -> flight_cascade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2024);
    let clock = Arc::new(SimClock::starting_at(at(5, 0)));
    let engine = DisruptionEngine::new(
        demo_network()?,
        EngineConfig::default().with_seed(seed),
        clock.clone(),
    )?;

    println!("=== Flight Disruption Demo (seed {}) ===\n", engine.chaos_seed());

    println!("Manual delay: FC101 +90 min");
    println!("{}", "-".repeat(40));
    print_outcome(&engine.trigger_delay(DelayRequest::manual(1, 90, "Weather at origin"))?);

    for broken in engine.world_state()?.broken_connections {
        println!(
            "  ✗ {} misses {} -> {} ({} min)",
            broken.passenger_name,
            broken.inbound_flight_number,
            broken.onward_flight_number,
            broken.connection_minutes
        );
    }

    let suggestions = engine.suggest_rebookings()?;
    println!("\nRebooking suggestions: {}", suggestions.len());
    for s in &suggestions {
        println!(
            "  {} -> {} ({} seats, {:+} min)",
            s.passenger_name, s.alternative_flight_number, s.seats_available, s.time_saved_minutes
        );
    }
    if let Some(first) = suggestions.first() {
        engine.accept_rebooking(first.booking_id, first.alternative_flight_id)?;
        println!("  accepted rebooking for {}", first.passenger_name);
    }

    let baseline = engine.save_snapshot("after FC101")?;
    println!("\nSaved snapshot #{} '{}'\n", baseline.id, baseline.label);

    let scenario = ScenarioId::JfkSnowstorm.scenario();
    println!("Scenario: {}", scenario.name);
    println!("{}", "-".repeat(40));
    print_outcome(&engine.trigger_scenario(scenario.id.as_str())?);

    println!("Random chaos");
    println!("{}", "-".repeat(40));
    for _ in 0..3 {
        print_outcome(&engine.trigger_delay(DelayRequest::random())?);
    }

    println!("Running the clock to midday in 10-minute ticks");
    let mut transitions = 0;
    while engine.now() < at(12, 0) {
        clock.advance_minutes(10);
        transitions += engine.advance_lifecycle()?.transitions.len();
    }
    println!("  {} status transitions\n", transitions);

    engine.reset_simulation()?;
    let restored = engine.restore_snapshot(baseline.id)?;
    println!("Reset, then restored snapshot #{}:", baseline.id);
    print_outcome(&restored);

    println!("Disruption log entries: {}", engine.disruption_log().len());
    Ok(())
}
