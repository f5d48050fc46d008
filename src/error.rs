use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Unknown flight, aircraft, booking, passenger, airport or snapshot
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Scenario id outside the fixed catalog
    #[error("unknown scenario: {0}")]
    InvalidScenario(String),

    /// Dangling reference or failed write while mutating; the invocation is rolled back
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Network data rejected while seeding or importing
    #[error("invalid network data: {0}")]
    InvalidNetwork(String),

    /// Delay that would push a flight past the representable range
    #[error("invalid delay: {0}")]
    InvalidDelay(String),

    /// Rebooking request that does not match a current suggestion's preconditions
    #[error("invalid rebooking: {0}")]
    InvalidRebooking(String),

    /// Random trigger found no SCHEDULED/BOARDING/ACTIVE flight
    #[error("no flight eligible for a random disruption")]
    NoEligibleFlight,

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a not-found error for an entity kind and id
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Create a storage failure
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    /// Create a network validation error
    pub fn invalid_network(msg: impl Into<String>) -> Self {
        Self::InvalidNetwork(msg.into())
    }

    /// Create an out-of-range delay error
    pub fn invalid_delay(msg: impl Into<String>) -> Self {
        Self::InvalidDelay(msg.into())
    }

    /// Create a rebooking precondition error
    pub fn invalid_rebooking(msg: impl Into<String>) -> Self {
        Self::InvalidRebooking(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was raised before any state was touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidScenario(_)
                | Self::InvalidRebooking(_)
                | Self::NoEligibleFlight
        )
    }
}
