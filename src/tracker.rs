//! The tracker facade: the single surface the presentation layer calls.
//!
//! Owns both stores over shared storage/clock handles (one logical
//! actor, no locking) and enforces the mutation rule: only an
//! authenticated admin session may create or delete goals. Reads are
//! open to everyone.

use std::rc::Rc;

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::account::{AccountIdentity, CredentialStore};
use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::diagnostics::{self, DataExport, ExportedAccount, StorageHealth};
use crate::error::{LoadReport, Result, TrackerError};
use crate::goal::{Goal, GoalStore, Section, Timeframe};
use crate::storage::KeyValueStore;

/// Combined outcome of initializing both stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub accounts: LoadReport,
    pub goals: LoadReport,
}

impl InitReport {
    /// All recoverable problems hit during initialization.
    pub fn warnings(&self) -> impl Iterator<Item = &TrackerError> {
        self.accounts.warnings.iter().chain(self.goals.warnings.iter())
    }
}

/// The goal tracking core: credential store + goal store over one
/// durable key-value backend and one clock.
pub struct GoalTracker<S: KeyValueStore, C: Clock> {
    storage: Rc<S>,
    clock: Rc<C>,
    credentials: CredentialStore<S, C>,
    goals: GoalStore<S, C>,
}

impl<S: KeyValueStore, C: Clock> GoalTracker<S, C> {
    /// Build a tracker with default policy. Call
    /// [`initialize`](Self::initialize) before use.
    pub fn new(storage: S, clock: C) -> Self {
        Self::with_config(storage, clock, TrackerConfig::default())
    }

    /// Build a tracker with explicit policy.
    pub fn with_config(storage: S, clock: C, config: TrackerConfig) -> Self {
        let storage = Rc::new(storage);
        let clock = Rc::new(clock);
        Self {
            credentials: CredentialStore::new(Rc::clone(&storage), Rc::clone(&clock), config),
            goals: GoalStore::new(Rc::clone(&storage), Rc::clone(&clock)),
            storage,
            clock,
        }
    }

    /// Re-hydrate both stores from the durable backend. Never fails;
    /// corruption and storage trouble surface as report warnings.
    pub fn initialize(&mut self) -> InitReport {
        let report = InitReport {
            accounts: self.credentials.initialize(),
            goals: self.goals.initialize(),
        };
        if report.warnings().next().is_some() {
            warn!(
                warnings = report.warnings().count(),
                "tracker initialized with recoveries"
            );
        } else {
            info!("tracker initialized");
        }
        report
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Register a new account. See [`CredentialStore::register`].
    pub fn register(&mut self, name: &str, secret: &str, is_admin: bool) -> Result<AccountIdentity> {
        self.credentials.register(name, secret, is_admin)
    }

    /// Log in and establish the active session.
    pub fn login(&mut self, name: &str, secret: &str) -> Result<AccountIdentity> {
        self.credentials.login(name, secret)
    }

    /// Clear the active session. Idempotent.
    pub fn logout(&mut self) -> Result<()> {
        self.credentials.logout()
    }

    /// True iff an admin session is active.
    pub fn is_current_user_admin(&self) -> bool {
        self.credentials.is_current_user_admin()
    }

    /// Identity of the active session's account, if any.
    pub fn current_user(&self) -> Option<AccountIdentity> {
        self.credentials.current_user()
    }

    // ------------------------------------------------------------------
    // Goal operations
    // ------------------------------------------------------------------

    /// Create a goal. Requires an active admin session; on
    /// `PermissionDenied` the store is untouched.
    pub fn add_goal(
        &mut self,
        section: Section,
        timeframe: Timeframe,
        description: &str,
        deadline: NaiveDate,
        tags: &[&str],
    ) -> Result<Goal> {
        self.require_admin()?;
        self.goals.add(section, timeframe, description, deadline, tags)
    }

    /// Delete a goal by id. Requires an active admin session; deleting
    /// an absent id is a no-op.
    pub fn delete_goal(&mut self, section: Section, timeframe: Timeframe, id: u64) -> Result<()> {
        self.require_admin()?;
        self.goals.delete(section, timeframe, id)
    }

    /// Goals in a bucket, sorted ascending by deadline (stable ties).
    pub fn list_goals(&self, section: Section, timeframe: Timeframe) -> Vec<Goal> {
        self.goals.list_goals(section, timeframe)
    }

    /// Bucket listing restricted to a case-insensitive exact tag match.
    pub fn filter_by_tag(&self, section: Section, timeframe: Timeframe, tag: &str) -> Vec<Goal> {
        self.goals.filter_by_tag(section, timeframe, tag)
    }

    /// All distinct tags across every bucket.
    pub fn tag_vocabulary(&self) -> &BTreeSet<String> {
        self.goals.tag_vocabulary()
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Probe the durable store and measure the persisted records.
    pub fn storage_health(&self) -> StorageHealth {
        diagnostics::check_storage_health(self.storage.as_ref())
    }

    /// Timestamped backup of the full state, accounts anonymized.
    pub fn export_data(&self) -> DataExport {
        DataExport {
            timestamp: self.clock.now_ms(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            users: self
                .credentials
                .accounts()
                .iter()
                .map(ExportedAccount::from)
                .collect(),
            goals: self.goals.buckets().clone(),
        }
    }

    /// Wipe the durable store and reseed everything from scratch.
    pub fn clear_all(&mut self) -> InitReport {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "storage clear failed, reseeding in memory");
        }
        info!("all application data cleared");
        self.initialize()
    }

    /// Drop all goals and the session but keep registered accounts.
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.credentials.logout()?;
        self.goals.reset()?;
        info!("reset to defaults, accounts preserved");
        Ok(())
    }

    fn require_admin(&self) -> Result<()> {
        if self.credentials.is_current_user_admin() {
            Ok(())
        } else {
            Err(TrackerError::PermissionDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn tracker() -> (GoalTracker<MemoryStore, ManualClock>, MemoryStore, ManualClock) {
        let storage = MemoryStore::new();
        let clock = ManualClock::new(1_700_000_000_000);
        let mut tracker = GoalTracker::new(storage.clone(), clock.clone());
        tracker.initialize();
        (tracker, storage, clock)
    }

    #[test]
    fn test_mutations_require_admin_session() {
        let (mut tracker, _, _) = tracker();

        // No session at all
        assert_eq!(
            tracker.add_goal(
                Section::Community,
                Timeframe::OneMonth,
                "Fort",
                date("2025-06-01"),
                &[],
            ),
            Err(TrackerError::PermissionDenied)
        );
        assert_eq!(
            tracker.delete_goal(Section::Community, Timeframe::OneMonth, 1),
            Err(TrackerError::PermissionDenied)
        );

        // Authenticated but not admin
        tracker.register("member", "secret-pw", false).unwrap();
        tracker.login("member", "secret-pw").unwrap();
        assert_eq!(
            tracker.add_goal(
                Section::Community,
                Timeframe::OneMonth,
                "Fort",
                date("2025-06-01"),
                &[],
            ),
            Err(TrackerError::PermissionDenied)
        );

        // Nothing was written
        assert!(tracker.list_goals(Section::Community, Timeframe::OneMonth).is_empty());
        assert!(tracker.tag_vocabulary().is_empty());
    }

    #[test]
    fn test_admin_can_mutate_after_login() {
        let (mut tracker, _, _) = tracker();
        tracker.login("admin", "admin123").unwrap();

        let goal = tracker
            .add_goal(
                Section::Community,
                Timeframe::OneMonth,
                "Build fort",
                date("2025-06-01"),
                &["pvp, guild"],
            )
            .unwrap();
        assert_eq!(tracker.list_goals(Section::Community, Timeframe::OneMonth).len(), 1);

        tracker
            .delete_goal(Section::Community, Timeframe::OneMonth, goal.id)
            .unwrap();
        assert!(tracker.list_goals(Section::Community, Timeframe::OneMonth).is_empty());
    }

    #[test]
    fn test_reads_need_no_session() {
        let (tracker, _, _) = tracker();
        assert!(tracker.list_goals(Section::Vanguard, Timeframe::TwoYears).is_empty());
        assert!(tracker.filter_by_tag(Section::Vanguard, Timeframe::TwoYears, "pvp").is_empty());
        assert!(tracker.tag_vocabulary().is_empty());
    }

    #[test]
    fn test_export_contains_no_secret_material() {
        let (mut tracker, _, _) = tracker();
        tracker.login("admin", "admin123").unwrap();
        tracker
            .add_goal(Section::Ocular, Timeframe::OneYear, "Scout", date("2025-12-01"), &["recon"])
            .unwrap();

        let export = tracker.export_data();
        assert_eq!(export.users.len(), 1);
        assert_eq!(export.users[0].name, "admin");
        assert!(export.users[0].has_secret);

        let json = serde_json::to_string(&export).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("admin123"));
        assert!(json.contains("recon"));
    }

    #[test]
    fn test_reset_to_defaults_preserves_accounts() {
        let (mut tracker, _, _) = tracker();
        tracker.register("keeper", "vault-key", false).unwrap();
        tracker.login("admin", "admin123").unwrap();
        tracker
            .add_goal(Section::Community, Timeframe::OneMonth, "Fort", date("2025-06-01"), &["pvp"])
            .unwrap();

        tracker.reset_to_defaults().unwrap();

        assert!(tracker.current_user().is_none());
        assert!(tracker.tag_vocabulary().is_empty());
        for section in Section::ALL {
            for timeframe in Timeframe::ALL {
                assert!(tracker.list_goals(section, timeframe).is_empty());
            }
        }
        // Accounts survive: both can still log in
        tracker.login("keeper", "vault-key").unwrap();
        tracker.login("admin", "admin123").unwrap();
    }

    #[test]
    fn test_clear_all_reseeds_bootstrap() {
        let (mut tracker, storage, _) = tracker();
        tracker.register("keeper", "vault-key", false).unwrap();

        let report = tracker.clear_all();
        assert!(report.warnings().next().is_none());

        // Registered account is gone, bootstrap admin is back
        assert_eq!(
            tracker.login("keeper", "vault-key"),
            Err(TrackerError::InvalidCredentials)
        );
        tracker.login("admin", "admin123").unwrap();
        assert!(storage.get(crate::account::ACCOUNTS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_storage_health_reports_records() {
        let (tracker, _, _) = tracker();
        let health = tracker.storage_health();
        assert!(health.available);
        // Bootstrap accounts are persisted by initialize
        assert!(health.items.iter().any(|i| i.key == crate::account::ACCOUNTS_KEY));
    }
}
