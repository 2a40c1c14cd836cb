//! Storage health probing and anonymized data export.
//!
//! A write/read/remove probe against the durable store, approximate
//! sizes of the persisted records, and a backup export that never
//! includes secret material.

use serde::Serialize;

use crate::account::{Account, ACCOUNTS_KEY, SESSION_KEY};
use crate::goal::{GoalBuckets, GOALS_KEY};
use crate::storage::KeyValueStore;

/// Scratch key used by the storage probe.
const PROBE_KEY: &str = "_storage_test_";

/// Size of one persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageItem {
    pub key: String,
    /// Approximate size: UTF-16 code units x 2, as the browser stores it
    pub bytes: usize,
}

/// Result of the storage health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageHealth {
    /// Whether the probe write/read/remove cycle succeeded
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sizes of the persisted records currently present
    pub items: Vec<StorageItem>,
}

/// Run the probe cycle and measure the three persisted records.
pub(crate) fn check_storage_health<S: KeyValueStore>(storage: &S) -> StorageHealth {
    if let Err(error) = probe(storage) {
        return StorageHealth {
            available: false,
            error: Some(error),
            items: Vec::new(),
        };
    }

    let items = [ACCOUNTS_KEY, SESSION_KEY, GOALS_KEY]
        .iter()
        .filter_map(|key| {
            storage.get(key).ok().flatten().map(|value| StorageItem {
                key: (*key).to_string(),
                bytes: utf16_bytes(key) + utf16_bytes(&value),
            })
        })
        .collect();

    StorageHealth {
        available: true,
        error: None,
        items,
    }
}

fn probe<S: KeyValueStore>(storage: &S) -> Result<(), String> {
    storage
        .set(PROBE_KEY, "test")
        .map_err(|e| e.to_string())?;
    let read = storage.get(PROBE_KEY).map_err(|e| e.to_string())?;
    storage.remove(PROBE_KEY).map_err(|e| e.to_string())?;

    if read.as_deref() != Some("test") {
        return Err("storage read/write probe failed".to_string());
    }
    Ok(())
}

fn utf16_bytes(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

/// Anonymized account view for exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedAccount {
    pub name: String,
    pub is_admin: bool,
    /// Whether a credential is on record; the hash itself never leaves
    pub has_secret: bool,
}

impl From<&Account> for ExportedAccount {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            is_admin: account.is_admin,
            has_secret: !account.secret.is_empty(),
        }
    }
}

/// Timestamped backup of the full application state, accounts anonymized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    /// Export time, milliseconds since the UNIX epoch
    pub timestamp: u64,
    /// Crate version that produced the export
    pub version: String,
    pub users: Vec<ExportedAccount>,
    pub goals: GoalBuckets,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_probe_leaves_no_trace() {
        let storage = MemoryStore::new();
        let health = check_storage_health(&storage);

        assert!(health.available);
        assert!(health.error.is_none());
        assert!(health.items.is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_items_measure_persisted_records() {
        let storage = MemoryStore::new();
        storage.set(GOALS_KEY, "{}").unwrap();

        let health = check_storage_health(&storage);
        assert_eq!(health.items.len(), 1);
        assert_eq!(health.items[0].key, GOALS_KEY);
        // ("albionGoals" + "{}") = 13 UTF-16 units
        assert_eq!(health.items[0].bytes, 26);
    }

    #[test]
    fn test_utf16_sizing_counts_code_units() {
        assert_eq!(utf16_bytes("abc"), 6);
        // Astral-plane characters take two code units
        assert_eq!(utf16_bytes("𝄞"), 4);
    }
}
