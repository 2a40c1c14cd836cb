//! Error taxonomy for the goal tracker core.
//!
//! Every expected failure is returned as a typed `TrackerError`; nothing
//! in the library panics on user input or storage trouble. Load-time
//! corruption is recovered internally and surfaced as a `LoadFailed`
//! warning rather than a hard error.

/// Error types for credential and goal store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// An account with the same (case-insensitive) name already exists
    #[error("account '{0}' already exists")]
    DuplicateAccount(String),

    /// Rejected input (empty name, short secret, blank description, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown account name or wrong secret
    #[error("invalid account name or secret")]
    InvalidCredentials,

    /// Operation requires an active admin session
    #[error("permission denied: admin session required")]
    PermissionDenied,

    /// Section or timeframe outside the closed sets
    #[error("unknown section or timeframe: '{0}'")]
    InvalidBucket(String),

    /// The durable store rejected a write; in-memory state is kept
    #[error("failed to persist state: {0}")]
    PersistenceFailed(String),

    /// Persisted data was corrupt or unparseable; defaults were restored
    #[error("failed to load persisted state: {0}")]
    LoadFailed(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// How a store came up during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No persisted record existed; defaults were seeded
    Seeded,
    /// Persisted state was restored intact
    Restored,
    /// Persisted state was corrupt or unreadable; defaults were restored
    Recovered,
}

impl LoadStatus {
    /// Stable string form for reports crossing the JS boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Seeded => "seeded",
            LoadStatus::Restored => "restored",
            LoadStatus::Recovered => "recovered",
        }
    }
}

/// Outcome of a store initialization.
///
/// Initialization never fails outright: corruption and storage
/// unavailability degrade to defaults and show up here as warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// How the store came up
    pub status: LoadStatus,
    /// Recoverable problems hit along the way
    pub warnings: Vec<TrackerError>,
}

impl LoadReport {
    pub(crate) fn new(status: LoadStatus, warnings: Vec<TrackerError>) -> Self {
        Self { status, warnings }
    }
}
