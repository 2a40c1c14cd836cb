//! Browser bindings: `localStorage` backend and the JS-facing facade.
//!
//! Everything in this module is wasm32-only. The facade keeps the JS
//! boundary thin: strings in, JSON strings out, expected failures as
//! rejected `Result`s carrying the error message. Bucket identifiers
//! and dates are validated here, at the untyped edge.

use wasm_bindgen::prelude::*;

use crate::account::AccountIdentity;
use crate::clock::SystemClock;
use crate::error::TrackerError;
use crate::goal::{Section, Timeframe};
use crate::storage::{KeyValueStore, StorageError};
use crate::tracker::{GoalTracker, InitReport};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["window", "localStorage"], js_name = getItem)]
    fn storage_get_item(key: &str) -> Result<Option<String>, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["window", "localStorage"], js_name = setItem)]
    fn storage_set_item(key: &str, value: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["window", "localStorage"], js_name = removeItem)]
    fn storage_remove_item(key: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["window", "localStorage"], js_name = clear)]
    fn storage_clear() -> Result<(), JsValue>;
}

fn js_error_string(err: JsValue) -> StorageError {
    StorageError(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// `window.localStorage` as a [`KeyValueStore`]. Quota and security
/// errors surface as `StorageError` and become `PersistenceFailed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        storage_get_item(key).map_err(js_error_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        storage_set_item(key, value).map_err(js_error_string)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        storage_remove_item(key).map_err(js_error_string)
    }

    fn clear(&self) -> Result<(), StorageError> {
        storage_clear().map_err(js_error_string)
    }
}

fn to_js_err(err: TrackerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js_json<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_json::to_string(value)
        .map(|json| JsValue::from_str(&json))
        .map_err(|e| JsValue::from_str(&format!("serialization failed: {e}")))
}

fn identity_js(identity: &AccountIdentity) -> Result<JsValue, JsValue> {
    to_js_json(identity)
}

fn parse_bucket(section: &str, timeframe: &str) -> Result<(Section, Timeframe), JsValue> {
    let section = section.parse::<Section>().map_err(to_js_err)?;
    let timeframe = timeframe.parse::<Timeframe>().map_err(to_js_err)?;
    Ok((section, timeframe))
}

fn parse_deadline(deadline: &str) -> Result<chrono::NaiveDate, JsValue> {
    deadline.parse().map_err(|_| {
        to_js_err(TrackerError::InvalidInput(format!(
            "deadline must be YYYY-MM-DD, got '{deadline}'"
        )))
    })
}

fn report_json(report: &InitReport) -> String {
    let side = |r: &crate::error::LoadReport| {
        serde_json::json!({
            "status": r.status.as_str(),
            "warnings": r.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        })
    };
    serde_json::json!({
        "accounts": side(&report.accounts),
        "goals": side(&report.goals),
    })
    .to_string()
}

/// The tracker as seen from JavaScript.
///
/// All methods are synchronous. Payload-bearing results come back as
/// JSON strings for the presentation layer to parse; goal ids travel as
/// JS numbers (they are millisecond timestamps, well inside 2^53).
#[wasm_bindgen]
pub struct TrackerHandle {
    inner: GoalTracker<LocalStorage, SystemClock>,
}

#[wasm_bindgen]
impl TrackerHandle {
    /// Create a tracker over `window.localStorage` and `Date.now()`.
    #[wasm_bindgen(constructor)]
    pub fn new() -> TrackerHandle {
        TrackerHandle {
            inner: GoalTracker::new(LocalStorage, SystemClock),
        }
    }

    /// Re-hydrate all state. Returns a JSON load report; recoveries
    /// (corrupt data, storage trouble) appear as warnings, never throw.
    pub fn initialize(&mut self) -> JsValue {
        JsValue::from_str(&report_json(&self.inner.initialize()))
    }

    /// Register an account. Resolves to the JSON identity (no secret).
    pub fn register(&mut self, name: &str, secret: &str, is_admin: bool) -> Result<JsValue, JsValue> {
        let identity = self.inner.register(name, secret, is_admin).map_err(to_js_err)?;
        identity_js(&identity)
    }

    /// Log in. Resolves to the JSON identity of the session account.
    pub fn login(&mut self, name: &str, secret: &str) -> Result<JsValue, JsValue> {
        let identity = self.inner.login(name, secret).map_err(to_js_err)?;
        identity_js(&identity)
    }

    /// Clear the active session. Idempotent.
    pub fn logout(&mut self) -> Result<(), JsValue> {
        self.inner.logout().map_err(to_js_err)
    }

    /// True iff an admin session is active.
    pub fn is_current_user_admin(&self) -> bool {
        self.inner.is_current_user_admin()
    }

    /// JSON identity of the active session account, or `null`.
    pub fn current_user(&self) -> Result<JsValue, JsValue> {
        match self.inner.current_user() {
            Some(identity) => identity_js(&identity),
            None => Ok(JsValue::NULL),
        }
    }

    /// Create a goal. `tags` is the raw comma-separated input field.
    /// Resolves to the created goal as JSON.
    pub fn add_goal(
        &mut self,
        section: &str,
        timeframe: &str,
        description: &str,
        deadline: &str,
        tags: &str,
    ) -> Result<JsValue, JsValue> {
        let (section, timeframe) = parse_bucket(section, timeframe)?;
        let deadline = parse_deadline(deadline)?;
        let goal = self
            .inner
            .add_goal(section, timeframe, description, deadline, &[tags])
            .map_err(to_js_err)?;
        to_js_json(&goal)
    }

    /// Delete a goal by id. Deleting an absent id is a no-op.
    pub fn delete_goal(&mut self, section: &str, timeframe: &str, id: f64) -> Result<(), JsValue> {
        let (section, timeframe) = parse_bucket(section, timeframe)?;
        self.inner
            .delete_goal(section, timeframe, id as u64)
            .map_err(to_js_err)
    }

    /// Goals in a bucket, deadline-sorted, as a JSON array.
    pub fn list_goals(&self, section: &str, timeframe: &str) -> Result<JsValue, JsValue> {
        let (section, timeframe) = parse_bucket(section, timeframe)?;
        to_js_json(&self.inner.list_goals(section, timeframe))
    }

    /// Bucket listing restricted to one tag (case-insensitive exact).
    pub fn filter_by_tag(
        &self,
        section: &str,
        timeframe: &str,
        tag: &str,
    ) -> Result<JsValue, JsValue> {
        let (section, timeframe) = parse_bucket(section, timeframe)?;
        to_js_json(&self.inner.filter_by_tag(section, timeframe, tag))
    }

    /// Every distinct tag across all buckets, sorted.
    pub fn tag_vocabulary(&self) -> Vec<JsValue> {
        self.inner
            .tag_vocabulary()
            .iter()
            .map(|tag| JsValue::from_str(tag))
            .collect()
    }

    /// Storage health probe result as JSON.
    pub fn storage_health(&self) -> Result<JsValue, JsValue> {
        to_js_json(&self.inner.storage_health())
    }

    /// Anonymized backup of the full state as JSON.
    pub fn export_data(&self) -> Result<JsValue, JsValue> {
        to_js_json(&self.inner.export_data())
    }

    /// Wipe everything and reseed the bootstrap account.
    pub fn clear_all(&mut self) -> JsValue {
        JsValue::from_str(&report_json(&self.inner.clear_all()))
    }

    /// Drop goals and session, keep accounts.
    pub fn reset_to_defaults(&mut self) -> Result<(), JsValue> {
        self.inner.reset_to_defaults().map_err(to_js_err)
    }
}

impl Default for TrackerHandle {
    fn default() -> Self {
        Self::new()
    }
}
