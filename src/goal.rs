//! Goals, the two closed bucket dimensions, and the goal store.
//!
//! Goals live in a fixed 4x5 grid of buckets: four sections by five
//! timeframes. All twenty buckets exist at all times; re-hydration
//! reconciles whatever was persisted back onto that skeleton. The tag
//! vocabulary is derived from the stored goals and recomputed after
//! every mutation, never persisted.
//!
//! Persisted wire contract (legacy key, kept so existing data loads):
//! `"albionGoals"` holds the nested section -> timeframe -> goals map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{LoadReport, LoadStatus, Result, TrackerError};
use crate::storage::KeyValueStore;

/// Storage key for the nested goal mapping.
pub const GOALS_KEY: &str = "albionGoals";

/// Top-level goal categories. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "community")]
    Community,
    #[serde(rename = "ocular")]
    Ocular,
    #[serde(rename = "university")]
    University,
    #[serde(rename = "vanguard")]
    Vanguard,
}

impl Section {
    /// Every section, in display order.
    pub const ALL: [Section; 4] = [
        Section::Community,
        Section::Ocular,
        Section::University,
        Section::Vanguard,
    ];

    /// Wire/UI identifier for this section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Community => "community",
            Section::Ocular => "ocular",
            Section::University => "university",
            Section::Vanguard => "vanguard",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| TrackerError::InvalidBucket(s.to_string()))
    }
}

/// Deadline horizons under a section. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "2years")]
    TwoYears,
}

impl Timeframe {
    /// Every timeframe, shortest horizon first.
    pub const ALL: [Timeframe; 5] = [
        Timeframe::OneMonth,
        Timeframe::ThreeMonths,
        Timeframe::SixMonths,
        Timeframe::OneYear,
        Timeframe::TwoYears,
    ];

    /// Wire/UI identifier for this timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMonth => "1month",
            Timeframe::ThreeMonths => "3months",
            Timeframe::SixMonths => "6months",
            Timeframe::OneYear => "1year",
            Timeframe::TwoYears => "2years",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        Timeframe::ALL
            .into_iter()
            .find(|timeframe| timeframe.as_str() == s)
            .ok_or_else(|| TrackerError::InvalidBucket(s.to_string()))
    }
}

/// One goal. Immutable once created; owned by the bucket it was
/// created in and destroyed only by explicit deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Goal {
    /// Unique, monotonically assigned identifier
    pub id: u64,
    /// Free-form description
    pub description: String,
    /// Target date, wire format `YYYY-MM-DD`
    pub deadline: NaiveDate,
    /// Normalized tags, insertion order preserved
    pub tags: Vec<String>,
}

/// The full nested mapping, section -> timeframe -> goals.
pub type GoalBuckets = BTreeMap<Section, BTreeMap<Timeframe, Vec<Goal>>>;

/// Holds the 20-bucket goal grid and its derived tag vocabulary.
pub struct GoalStore<S: KeyValueStore, C: Clock> {
    storage: Rc<S>,
    clock: Rc<C>,
    buckets: GoalBuckets,
    vocabulary: BTreeSet<String>,
    last_id: u64,
}

impl<S: KeyValueStore, C: Clock> GoalStore<S, C> {
    /// Create an empty store with the full bucket skeleton in place;
    /// call [`initialize`](Self::initialize) to re-hydrate.
    pub fn new(storage: Rc<S>, clock: Rc<C>) -> Self {
        Self {
            storage,
            clock,
            buckets: empty_buckets(),
            vocabulary: BTreeSet::new(),
            last_id: 0,
        }
    }

    /// Load the persisted mapping and reconcile it onto the fixed
    /// 20-bucket skeleton. Parse failures fall back to an all-empty
    /// skeleton and are reported as warnings, never as startup failure.
    pub fn initialize(&mut self) -> LoadReport {
        let mut warnings = Vec::new();

        let status = match self.storage.get(GOALS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<GoalBuckets>(&raw) {
                Ok(loaded) => {
                    self.buckets = reconcile(loaded);
                    debug!(goals = self.goal_count(), "restored goal store");
                    LoadStatus::Restored
                }
                Err(e) => {
                    warn!(error = %e, "goal records unparseable, starting empty");
                    warnings.push(TrackerError::LoadFailed(format!("goal records: {e}")));
                    self.buckets = empty_buckets();
                    LoadStatus::Recovered
                }
            },
            Ok(None) => {
                self.buckets = empty_buckets();
                LoadStatus::Seeded
            }
            Err(e) => {
                warn!(error = %e, "goal records unreadable, starting empty");
                warnings.push(TrackerError::LoadFailed(format!("goal records: {e}")));
                self.buckets = empty_buckets();
                LoadStatus::Recovered
            }
        };

        self.rebuild_vocabulary();
        self.last_id = self.max_goal_id();
        LoadReport::new(status, warnings)
    }

    /// Create a goal in the given bucket. Permission checks happen in
    /// the tracker facade; this is the unguarded mutation.
    pub(crate) fn add(
        &mut self,
        section: Section,
        timeframe: Timeframe,
        description: &str,
        deadline: NaiveDate,
        raw_tags: &[&str],
    ) -> Result<Goal> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TrackerError::InvalidInput(
                "goal description must not be empty".to_string(),
            ));
        }

        let goal = Goal {
            id: self.next_id(),
            description: description.to_string(),
            deadline,
            tags: normalize_tags(raw_tags),
        };
        self.bucket_mut(section, timeframe).push(goal.clone());
        self.rebuild_vocabulary();
        info!(id = goal.id, %section, %timeframe, "goal added");

        self.persist()?;
        Ok(goal)
    }

    /// Delete the goal with `id` from the given bucket. Idempotent:
    /// deleting an absent id is a no-op, not an error.
    pub(crate) fn delete(&mut self, section: Section, timeframe: Timeframe, id: u64) -> Result<()> {
        let bucket = self.bucket_mut(section, timeframe);
        let before = bucket.len();
        bucket.retain(|goal| goal.id != id);
        if bucket.len() == before {
            debug!(id, %section, %timeframe, "no goal with this id, nothing to delete");
            return Ok(());
        }

        self.rebuild_vocabulary();
        info!(id, %section, %timeframe, "goal deleted");
        self.persist()
    }

    /// Goals in the bucket, sorted ascending by deadline. The sort is
    /// stable: equal deadlines keep their insertion order.
    pub fn list_goals(&self, section: Section, timeframe: Timeframe) -> Vec<Goal> {
        let mut goals = self
            .buckets
            .get(&section)
            .and_then(|per_timeframe| per_timeframe.get(&timeframe))
            .cloned()
            .unwrap_or_default();
        goals.sort_by_key(|goal| goal.deadline);
        goals
    }

    /// [`list_goals`](Self::list_goals) restricted to goals carrying
    /// `tag`, matched case-insensitively and exactly (no substrings).
    pub fn filter_by_tag(&self, section: Section, timeframe: Timeframe, tag: &str) -> Vec<Goal> {
        let needle = tag.trim().to_lowercase();
        self.list_goals(section, timeframe)
            .into_iter()
            .filter(|goal| goal.tags.iter().any(|t| t.to_lowercase() == needle))
            .collect()
    }

    /// The set of all distinct tags across every bucket.
    pub fn tag_vocabulary(&self) -> &BTreeSet<String> {
        &self.vocabulary
    }

    /// The full nested mapping (crate-internal, used by diagnostics).
    pub(crate) fn buckets(&self) -> &GoalBuckets {
        &self.buckets
    }

    /// Drop every goal and the persisted record, keeping the skeleton.
    /// The id high-water mark survives so ids stay unique.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.buckets = empty_buckets();
        self.vocabulary.clear();
        info!("goal store reset to empty skeleton");
        self.storage
            .remove(GOALS_KEY)
            .map_err(|e| TrackerError::PersistenceFailed(e.to_string()))
    }

    /// Next unique id: wall-clock based, clamped to strictly increase
    /// so same-tick creations cannot collide.
    fn next_id(&mut self) -> u64 {
        let id = self.clock.now_ms().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    fn bucket_mut(&mut self, section: Section, timeframe: Timeframe) -> &mut Vec<Goal> {
        // The skeleton invariant makes this a lookup, never an insert
        self.buckets
            .entry(section)
            .or_default()
            .entry(timeframe)
            .or_default()
    }

    fn rebuild_vocabulary(&mut self) {
        self.vocabulary = self
            .buckets
            .values()
            .flat_map(|per_timeframe| per_timeframe.values())
            .flatten()
            .flat_map(|goal| goal.tags.iter().cloned())
            .collect();
    }

    fn max_goal_id(&self) -> u64 {
        self.buckets
            .values()
            .flat_map(|per_timeframe| per_timeframe.values())
            .flatten()
            .map(|goal| goal.id)
            .max()
            .unwrap_or(0)
    }

    fn goal_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|per_timeframe| per_timeframe.values())
            .map(Vec::len)
            .sum()
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string(&self.buckets)
            .map_err(|e| TrackerError::PersistenceFailed(format!("goal records: {e}")))?;
        self.storage.set(GOALS_KEY, &serialized).map_err(|e| {
            warn!(error = %e, "goal store not persisted, in-memory state kept");
            TrackerError::PersistenceFailed(e.to_string())
        })
    }
}

/// The fixed 20-bucket skeleton, every bucket present and empty.
fn empty_buckets() -> GoalBuckets {
    let mut buckets = GoalBuckets::new();
    for section in Section::ALL {
        let per_timeframe = buckets.entry(section).or_default();
        for timeframe in Timeframe::ALL {
            per_timeframe.entry(timeframe).or_default();
        }
    }
    buckets
}

/// Reconcile a possibly-partial persisted shape onto the skeleton:
/// missing buckets default to empty, existing goals are kept in order.
fn reconcile(loaded: GoalBuckets) -> GoalBuckets {
    let mut buckets = loaded;
    for section in Section::ALL {
        let per_timeframe = buckets.entry(section).or_default();
        for timeframe in Timeframe::ALL {
            per_timeframe.entry(timeframe).or_default();
        }
    }
    buckets
}

/// Split raw tag input on commas, trim whitespace, drop empties.
/// Order is preserved; duplicates are kept (the vocabulary dedupes).
fn normalize_tags(raw: &[&str]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
