//! Tracker configuration.

use serde::{Deserialize, Serialize};

/// Policy knobs for the credential store.
///
/// The defaults reproduce the shipped application: a single bootstrap
/// admin account and a six-character minimum secret length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Name of the account seeded on first run
    pub bootstrap_name: String,
    /// Secret of the bootstrap account (hashed before storage)
    pub bootstrap_secret: String,
    /// Minimum accepted secret length for registration
    pub min_secret_len: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bootstrap_name: "admin".to_string(),
            bootstrap_secret: "admin123".to_string(),
            min_secret_len: 6,
        }
    }
}
