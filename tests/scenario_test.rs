//! End-to-end tracker scenarios over an in-memory backend
//!
//! Exercises the full public surface the way the browser frontend does:
//! - first-run bootstrap and session lifecycle
//! - admin-gated goal mutation with tag filtering
//! - persistence round-trips across tracker instances
//! - recovery from corrupt persisted records

use goal_tracker_core::{
    GoalTracker, KeyValueStore, LoadStatus, ManualClock, MemoryStore, Section, Timeframe,
    TrackerError,
};

const EPOCH_MS: u64 = 1_700_000_000_000;

fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

fn fresh_tracker() -> (GoalTracker<MemoryStore, ManualClock>, MemoryStore, ManualClock) {
    let storage = MemoryStore::new();
    let clock = ManualClock::new(EPOCH_MS);
    let tracker = GoalTracker::new(storage.clone(), clock.clone());
    (tracker, storage, clock)
}

// =============================================================================
// First run and session lifecycle
// =============================================================================

#[test]
fn test_first_run_seeds_bootstrap_admin() {
    let (mut tracker, _, _) = fresh_tracker();

    let report = tracker.initialize();
    assert_eq!(report.accounts.status, LoadStatus::Seeded);
    assert_eq!(report.goals.status, LoadStatus::Seeded);
    assert!(report.warnings().next().is_none());

    // No session yet
    assert!(tracker.current_user().is_none());
    assert!(!tracker.is_current_user_admin());

    // Wrong secret is rejected without leaking which part was wrong
    assert_eq!(
        tracker.login("admin", "wrong"),
        Err(TrackerError::InvalidCredentials)
    );
    assert_eq!(
        tracker.login("nobody", "admin123"),
        Err(TrackerError::InvalidCredentials)
    );

    let identity = tracker.login("admin", "admin123").unwrap();
    assert_eq!(identity.name, "admin");
    assert!(identity.is_admin);
    assert!(tracker.is_current_user_admin());

    tracker.logout().unwrap();
    assert!(tracker.current_user().is_none());
    // Logout with no session is a no-op
    tracker.logout().unwrap();
}

#[test]
fn test_register_rejects_case_insensitive_duplicates() {
    let (mut tracker, _, _) = fresh_tracker();
    tracker.initialize();

    tracker.register("Scout", "lookout-7", false).unwrap();
    assert_eq!(
        tracker.register("scout", "other-secret", false),
        Err(TrackerError::DuplicateAccount("scout".to_string()))
    );
    // The bootstrap name is reserved too
    assert!(matches!(
        tracker.register("ADMIN", "whatever-pw", true),
        Err(TrackerError::DuplicateAccount(_))
    ));

    // Registering does not establish a session
    assert!(tracker.current_user().is_none());
    tracker.login("Scout", "lookout-7").unwrap();
    assert!(!tracker.is_current_user_admin());
}

// =============================================================================
// Goal lifecycle under the admin gate
// =============================================================================

#[test]
fn test_goal_lifecycle_with_tag_filter() {
    let (mut tracker, _, clock) = fresh_tracker();
    tracker.initialize();
    tracker.login("admin", "admin123").unwrap();

    let fort = tracker
        .add_goal(
            Section::Community,
            Timeframe::OneMonth,
            "Build fort",
            date("2025-06-01"),
            &["pvp, guild"],
        )
        .unwrap();
    clock.advance(1);
    tracker
        .add_goal(
            Section::Community,
            Timeframe::OneMonth,
            "Recruit healers",
            date("2025-05-01"),
            &["guild"],
        )
        .unwrap();

    // Deadline-ascending: the later creation lists first
    let listed = tracker.list_goals(Section::Community, Timeframe::OneMonth);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].description, "Recruit healers");
    assert_eq!(listed[1].description, "Build fort");

    // Tag filter is case-insensitive and exact
    let pvp = tracker.filter_by_tag(Section::Community, Timeframe::OneMonth, "PVP");
    assert_eq!(pvp.len(), 1);
    assert_eq!(pvp[0].id, fort.id);
    assert!(tracker
        .filter_by_tag(Section::Community, Timeframe::OneMonth, "pv")
        .is_empty());

    assert_eq!(
        tracker.tag_vocabulary().iter().collect::<Vec<_>>(),
        vec!["guild", "pvp"]
    );

    tracker
        .delete_goal(Section::Community, Timeframe::OneMonth, fort.id)
        .unwrap();
    // Deleting the same id again is a no-op
    tracker
        .delete_goal(Section::Community, Timeframe::OneMonth, fort.id)
        .unwrap();
    assert_eq!(
        tracker.tag_vocabulary().iter().collect::<Vec<_>>(),
        vec!["guild"]
    );
}

#[test]
fn test_denied_mutations_leave_no_trace() {
    let (mut tracker, storage, _) = fresh_tracker();
    tracker.initialize();
    tracker.register("member", "member-pw", false).unwrap();
    tracker.login("member", "member-pw").unwrap();

    let before = storage.get(goal_tracker_core::goal::GOALS_KEY).unwrap();
    assert_eq!(
        tracker.add_goal(
            Section::Vanguard,
            Timeframe::OneYear,
            "Siege",
            date("2025-12-01"),
            &["war"],
        ),
        Err(TrackerError::PermissionDenied)
    );

    assert!(tracker.list_goals(Section::Vanguard, Timeframe::OneYear).is_empty());
    assert!(tracker.tag_vocabulary().is_empty());
    assert_eq!(storage.get(goal_tracker_core::goal::GOALS_KEY).unwrap(), before);
}

// =============================================================================
// Persistence round-trips
// =============================================================================

#[test]
fn test_state_survives_tracker_restart() {
    let (mut tracker, storage, clock) = fresh_tracker();
    tracker.initialize();
    tracker.register("keeper", "vault-key", false).unwrap();
    tracker.login("admin", "admin123").unwrap();
    let goal = tracker
        .add_goal(
            Section::University,
            Timeframe::ThreeMonths,
            "Study runes",
            date("2025-08-15"),
            &["lore"],
        )
        .unwrap();

    // Same backend, fresh process
    let mut restarted = GoalTracker::new(storage, clock);
    let report = restarted.initialize();
    assert_eq!(report.accounts.status, LoadStatus::Restored);
    assert_eq!(report.goals.status, LoadStatus::Restored);

    // Session came back with the admin still logged in
    let user = restarted.current_user().unwrap();
    assert_eq!(user.name, "admin");
    assert!(restarted.is_current_user_admin());

    let listed = restarted.list_goals(Section::University, Timeframe::ThreeMonths);
    assert_eq!(listed, vec![goal]);
    assert_eq!(
        restarted.tag_vocabulary().iter().collect::<Vec<_>>(),
        vec!["lore"]
    );

    // Registered account survived too
    restarted.login("keeper", "vault-key").unwrap();
}

#[test]
fn test_corrupt_records_recover_without_failing_startup() {
    let storage = MemoryStore::new();
    storage.set(goal_tracker_core::account::ACCOUNTS_KEY, "[broken").unwrap();
    storage.set(goal_tracker_core::goal::GOALS_KEY, "{broken").unwrap();

    let mut tracker = GoalTracker::new(storage, ManualClock::new(EPOCH_MS));
    let report = tracker.initialize();

    assert_eq!(report.accounts.status, LoadStatus::Recovered);
    assert_eq!(report.goals.status, LoadStatus::Recovered);
    assert_eq!(report.warnings().count(), 2);
    assert!(report
        .warnings()
        .all(|w| matches!(w, TrackerError::LoadFailed(_))));

    // Recovery reseeds a usable tracker
    tracker.login("admin", "admin123").unwrap();
    for section in Section::ALL {
        for timeframe in Timeframe::ALL {
            assert!(tracker.list_goals(section, timeframe).is_empty());
        }
    }
}

#[test]
fn test_stale_session_is_dropped_on_restart() {
    let (mut tracker, storage, clock) = fresh_tracker();
    tracker.initialize();

    // A session record pointing at an account that no longer exists
    storage
        .set(
            goal_tracker_core::account::SESSION_KEY,
            r#"{"name":"ghost","secret":"$argon2id$x","isAdmin":true,"createdAt":1}"#,
        )
        .unwrap();

    let mut restarted = GoalTracker::new(storage.clone(), clock);
    restarted.initialize();
    assert!(restarted.current_user().is_none());
    assert!(storage
        .get(goal_tracker_core::account::SESSION_KEY)
        .unwrap()
        .is_none());
}
