pub mod audit;
pub mod booking;
pub mod chaos_seed;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod flight;
pub mod lifecycle;
pub mod network;
pub mod propagation;
pub mod rebooking;
pub mod scenario;
pub mod snapshot;
pub mod store;

pub use engine::{DelayRequest, DisruptionEngine, LifecycleOutcome, TickOutcome, TriggerOutcome};
pub use error::{EngineError, Result};
