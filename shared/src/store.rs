//! Calorie store - the single source of truth for the tally
//!
//! Holds current calories, daily goal, wheel increment and the onboarding flag,
//! and owns every rule about them: clamping, the 03:00 day rollover and the
//! bounded per-day history. Every mutation is committed to the backing
//! [`KeyValueStore`] before the setter returns so the home widget never reads
//! a value older than its own refresh interval.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use toml::{Table, Value};
use tracing::{debug, error, info, warn};

use crate::storage::{keys, KeyValueStore};
use crate::time_engine::{Clock, DayKey};

pub const DEFAULT_DAILY_GOAL: i32 = 2400;
pub const DEFAULT_INCREMENT: i32 = 50;
pub const GOAL_RANGE: RangeInclusive<i32> = 500..=10_000;
pub const INCREMENT_RANGE: RangeInclusive<i32> = 10..=100;
/// Number of distinct days kept in history
pub const HISTORY_RETENTION: usize = 90;

/// Totals stored for one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub calories: i32,
    pub goal: i32,
}

/// One day's calorie record as shown in the history view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRecord {
    pub date_key: DayKey,
    pub date: NaiveDate,
    pub calories: i32,
    pub goal: i32,
}

impl DailyRecord {
    pub fn new(date_key: DayKey, calories: i32, goal: i32) -> Self {
        Self {
            date_key,
            date: date_key.date(),
            calories,
            goal,
        }
    }

    /// Fraction of the goal reached, in `[0, 1]`
    pub fn percentage(&self) -> f32 {
        fraction(self.calories, self.goal)
    }
}

/// What `check_and_rollover_if_new_day` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollover {
    /// No day had been recorded yet; today was stamped
    FirstRun,
    /// Still the same day, nothing changed
    SameDay,
    /// A new day began. The previous day's final tally went to history
    /// (unless its key was unreadable) and the calories were reset.
    RolledOver {
        previous: Option<DayKey>,
        calories: i32,
        goal: i32,
    },
}

/// Persistent calorie state
pub struct CalorieStore<S: KeyValueStore, C: Clock> {
    storage: S,
    clock: C,
    current_calories: i32,
    daily_goal: i32,
    increment: i32,
    has_seen_onboarding: bool,
    revision: u64,
}

impl<S: KeyValueStore, C: Clock> CalorieStore<S, C> {
    /// Load the state from `storage` and apply any pending day rollover
    pub fn open(storage: S, clock: C) -> Self {
        let daily_goal = match storage.get_int(keys::DAILY_GOAL) {
            Some(goal) if goal > 0 => clamp_i64(goal, &GOAL_RANGE),
            _ => DEFAULT_DAILY_GOAL,
        };
        let increment = match storage.get_int(keys::INCREMENT) {
            Some(inc) if inc > 0 => clamp_i64(inc, &INCREMENT_RANGE),
            _ => DEFAULT_INCREMENT,
        };
        let current_calories = clamp_i64(
            storage.get_int(keys::CURRENT_CALORIES).unwrap_or(0),
            &(0..=daily_goal),
        );
        let has_seen_onboarding = storage.get_bool(keys::HAS_SEEN_ONBOARDING).unwrap_or(false);

        let mut store = Self {
            storage,
            clock,
            current_calories,
            daily_goal,
            increment,
            has_seen_onboarding,
            revision: 0,
        };
        debug!(
            calories = current_calories,
            goal = daily_goal,
            increment,
            "calorie store opened"
        );
        store.check_and_rollover_if_new_day();
        store
    }

    pub fn current_calories(&self) -> i32 {
        self.current_calories
    }

    pub fn daily_goal(&self) -> i32 {
        self.daily_goal
    }

    pub fn increment(&self) -> i32 {
        self.increment
    }

    pub fn has_seen_onboarding(&self) -> bool {
        self.has_seen_onboarding
    }

    /// Bumped on every mutation; lets views notice changes made elsewhere
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Day key at the clock's current time
    pub fn today_key(&self) -> DayKey {
        self.clock.today()
    }

    /// Set today's calories, clamped to `[0, daily_goal]`
    pub fn set_current_calories(&mut self, calories: i32) {
        let clamped = calories.clamp(0, self.daily_goal);
        let today = self.today_key();

        self.current_calories = clamped;
        self.persist(keys::CURRENT_CALORIES, Value::Integer(clamped.into()));
        self.persist(keys::LAST_UPDATE_DATE, Value::String(today.to_string()));
        self.save_history_record(today, clamped, self.daily_goal);
        self.revision += 1;
        debug!(calories = clamped, requested = calories, "calories set");
    }

    /// Set the daily goal, clamped to [`GOAL_RANGE`]. Calories above the new
    /// goal are pulled down to it.
    pub fn set_daily_goal(&mut self, goal: i32) {
        let clamped = goal.clamp(*GOAL_RANGE.start(), *GOAL_RANGE.end());

        self.daily_goal = clamped;
        self.persist(keys::DAILY_GOAL, Value::Integer(clamped.into()));
        if self.current_calories > clamped {
            self.set_current_calories(clamped);
        }
        let today = self.today_key();
        self.save_history_record(today, self.current_calories, clamped);
        self.revision += 1;
        info!(goal = clamped, "daily goal changed");
    }

    /// Set the calories per notch, clamped to [`INCREMENT_RANGE`]
    pub fn set_increment(&mut self, increment: i32) {
        let clamped = increment.clamp(*INCREMENT_RANGE.start(), *INCREMENT_RANGE.end());

        self.increment = clamped;
        self.persist(keys::INCREMENT, Value::Integer(clamped.into()));
        self.revision += 1;
        info!(increment = clamped, "increment changed");
    }

    /// One-way switch; once seen, onboarding never shows again
    pub fn mark_onboarding_seen(&mut self) {
        if self.has_seen_onboarding {
            return;
        }
        self.has_seen_onboarding = true;
        self.persist(keys::HAS_SEEN_ONBOARDING, Value::Boolean(true));
        self.revision += 1;
    }

    /// Zero today's calories. History of earlier days is untouched.
    pub fn reset_calories(&mut self) {
        self.set_current_calories(0);
        let today = self.today_key();
        self.persist(keys::LAST_UPDATE_DATE, Value::String(today.to_string()));
        info!(day = %today, "calories reset");
    }

    /// Detect a crossed 03:00 boundary and roll the tally over.
    ///
    /// Must run at startup and every time the app comes to the foreground;
    /// this is the only path that resets calories on its own.
    pub fn check_and_rollover_if_new_day(&mut self) -> Rollover {
        let today = self.today_key();

        let Some(stored) = self.storage.get_str(keys::LAST_UPDATE_DATE) else {
            self.persist(keys::LAST_UPDATE_DATE, Value::String(today.to_string()));
            debug!(day = %today, "first run, day stamped");
            return Rollover::FirstRun;
        };

        let previous = match stored.parse::<DayKey>() {
            Ok(key) if key == today => {
                if stored != today.to_string() {
                    // Rewrite legacy unpadded keys in the padded form
                    self.persist(keys::LAST_UPDATE_DATE, Value::String(today.to_string()));
                }
                return Rollover::SameDay;
            }
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "unreadable last update day, resetting without history");
                None
            }
        };

        let calories = self.current_calories;
        let goal = self.daily_goal;
        if let Some(previous) = previous {
            self.save_history_record(previous, calories, goal);
        }
        self.set_current_calories(0);
        self.persist(keys::LAST_UPDATE_DATE, Value::String(today.to_string()));

        info!(
            from = ?previous.map(|k| k.to_string()),
            to = %today,
            calories,
            goal,
            "day rolled over"
        );
        Rollover::RolledOver {
            previous,
            calories,
            goal,
        }
    }

    /// Number of notches on the wheel
    pub fn notch_count(&self) -> usize {
        debug_assert!(self.increment > 0, "increment must be positive");
        (self.daily_goal / self.increment) as usize
    }

    /// Round `calories` to the nearest multiple of the increment
    pub fn snap_to_increment(&self, calories: i32) -> i32 {
        let inc = i64::from(self.increment);
        let snapped = (i64::from(calories) + inc / 2).div_euclid(inc) * inc;
        snapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Fraction of the goal consumed, in `[0, 1]`
    pub fn percentage(&self) -> f32 {
        fraction(self.current_calories, self.daily_goal)
    }

    /// All stored days, most recent first
    pub fn load_history(&self) -> Vec<DailyRecord> {
        self.load_history_map()
            .into_iter()
            .rev()
            .map(|(key, entry)| DailyRecord::new(key, entry.calories, entry.goal))
            .collect()
    }

    /// The last `days` days for the chart, oldest first.
    ///
    /// Today is filled in from live state when it has no stored entry yet.
    pub fn load_recent_history(&self, days: usize) -> Vec<DailyRecord> {
        if days == 0 {
            return Vec::new();
        }

        let today = self.today_key();
        let mut recent: Vec<DailyRecord> = self.load_history().into_iter().take(days).collect();

        if recent.first().map(|r| r.date_key) != Some(today) {
            recent.insert(
                0,
                DailyRecord::new(today, self.current_calories, self.daily_goal),
            );
            recent.truncate(days);
        }

        recent.reverse();
        recent
    }

    fn load_history_map(&self) -> BTreeMap<DayKey, HistoryEntry> {
        let Some(Value::Table(table)) = self.storage.get(keys::HISTORY) else {
            return BTreeMap::new();
        };

        table
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.parse::<DayKey>().ok()?;
                let entry = value.try_into::<HistoryEntry>().ok()?;
                Some((key, entry))
            })
            .collect()
    }

    fn save_history_record(&mut self, key: DayKey, calories: i32, goal: i32) {
        let mut history = self.load_history_map();
        history.insert(key, HistoryEntry { calories, goal });

        while history.len() > HISTORY_RETENTION {
            if let Some((evicted, _)) = history.pop_first() {
                debug!(day = %evicted, "history entry evicted");
            }
        }

        let table: Table = history
            .iter()
            .map(|(key, entry)| {
                let mut row = Table::new();
                row.insert("calories".to_string(), Value::Integer(entry.calories.into()));
                row.insert("goal".to_string(), Value::Integer(entry.goal.into()));
                (key.to_string(), Value::Table(row))
            })
            .collect();
        self.persist(keys::HISTORY, Value::Table(table));
    }

    fn persist(&mut self, key: &str, value: Value) {
        if let Err(e) = self.storage.set(key, value) {
            error!(key, error = %e, "failed to persist calorie state");
        }
    }
}

fn fraction(calories: i32, goal: i32) -> f32 {
    if goal <= 0 {
        return 0.0;
    }
    (calories as f32 / goal as f32).clamp(0.0, 1.0)
}

fn clamp_i64(value: i64, range: &RangeInclusive<i32>) -> i32 {
    value.clamp(i64::from(*range.start()), i64::from(*range.end())) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::time_engine::FixedClock;
    use chrono::{Duration, NaiveDateTime};

    /// Noon on the given day of 2025
    fn noon(ordinal: u32) -> NaiveDateTime {
        NaiveDate::from_yo_opt(2025, ordinal)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn fresh_store() -> CalorieStore<MemoryStore, FixedClock> {
        CalorieStore::open(MemoryStore::new(), FixedClock::new(noon(100)))
    }

    fn store_with(
        calories: i64,
        goal: i64,
        last_update: &str,
        now: NaiveDateTime,
    ) -> CalorieStore<MemoryStore, FixedClock> {
        let mut storage = MemoryStore::new();
        storage.set(keys::CURRENT_CALORIES, Value::Integer(calories)).unwrap();
        storage.set(keys::DAILY_GOAL, Value::Integer(goal)).unwrap();
        storage
            .set(keys::LAST_UPDATE_DATE, Value::String(last_update.to_string()))
            .unwrap();
        CalorieStore::open(storage, FixedClock::new(now))
    }

    fn history_entry(store: &CalorieStore<MemoryStore, FixedClock>, key: &str) -> Option<(i64, i64)> {
        let history = store.storage().get(keys::HISTORY)?;
        let row = history.get(key)?;
        Some((row.get("calories")?.as_integer()?, row.get("goal")?.as_integer()?))
    }

    #[test]
    fn test_defaults_on_empty_storage() {
        let store = fresh_store();
        assert_eq!(store.current_calories(), 0);
        assert_eq!(store.daily_goal(), DEFAULT_DAILY_GOAL);
        assert_eq!(store.increment(), DEFAULT_INCREMENT);
        assert!(!store.has_seen_onboarding());
    }

    #[test]
    fn test_open_sanitizes_stored_values() {
        let mut storage = MemoryStore::new();
        storage.set(keys::DAILY_GOAL, Value::Integer(50_000)).unwrap();
        storage.set(keys::INCREMENT, Value::Integer(-4)).unwrap();
        storage.set(keys::CURRENT_CALORIES, Value::Integer(99_999)).unwrap();
        storage
            .set(keys::LAST_UPDATE_DATE, Value::String("2025-100".into()))
            .unwrap();

        let store = CalorieStore::open(storage, FixedClock::new(noon(100)));
        assert_eq!(store.daily_goal(), 10_000);
        assert_eq!(store.increment(), DEFAULT_INCREMENT);
        assert_eq!(store.current_calories(), 10_000);
    }

    #[test]
    fn test_set_current_calories_clamps() {
        let mut store = fresh_store();
        for v in [i32::MIN, -1, 0, 1, 1200, 2400, 2401, i32::MAX] {
            store.set_current_calories(v);
            let c = store.current_calories();
            assert!((0..=store.daily_goal()).contains(&c), "{v} -> {c}");
        }
        store.set_current_calories(-20);
        assert_eq!(store.current_calories(), 0);
        store.set_current_calories(5000);
        assert_eq!(store.current_calories(), 2400);
        assert_eq!(store.storage().get_int(keys::CURRENT_CALORIES), Some(2400));
    }

    #[test]
    fn test_set_current_calories_records_today() {
        let mut store = fresh_store();
        store.set_current_calories(650);
        assert_eq!(
            store.storage().get_str(keys::LAST_UPDATE_DATE).as_deref(),
            Some("2025-100")
        );
        assert_eq!(history_entry(&store, "2025-100"), Some((650, 2400)));

        // Same day overwrites its own entry
        store.set_current_calories(900);
        assert_eq!(history_entry(&store, "2025-100"), Some((900, 2400)));
        assert_eq!(store.load_history().len(), 1);
    }

    #[test]
    fn test_set_daily_goal_clamps_and_cascades() {
        let mut store = fresh_store();
        store.set_current_calories(2000);

        store.set_daily_goal(100);
        assert_eq!(store.daily_goal(), 500);
        assert_eq!(store.current_calories(), 500);
        assert_eq!(history_entry(&store, "2025-100"), Some((500, 500)));

        store.set_daily_goal(i32::MAX);
        assert_eq!(store.daily_goal(), 10_000);
        assert_eq!(store.current_calories(), 500);

        for g in [i32::MIN, 0, 499, 501, 9_999, 10_001] {
            store.set_daily_goal(g);
            assert!(GOAL_RANGE.contains(&store.daily_goal()));
            assert!(store.current_calories() <= store.daily_goal());
        }
    }

    #[test]
    fn test_set_increment_clamps_without_touching_calories() {
        let mut store = fresh_store();
        store.set_current_calories(1234);
        store.set_increment(3);
        assert_eq!(store.increment(), 10);
        store.set_increment(1000);
        assert_eq!(store.increment(), 100);
        assert_eq!(store.current_calories(), 1234);
        assert_eq!(store.storage().get_int(keys::INCREMENT), Some(100));
    }

    #[test]
    fn test_onboarding_flag_is_one_way() {
        let mut store = fresh_store();
        store.mark_onboarding_seen();
        let rev = store.revision();
        store.mark_onboarding_seen();
        assert!(store.has_seen_onboarding());
        assert_eq!(store.revision(), rev);
        assert_eq!(store.storage().get_bool(keys::HAS_SEEN_ONBOARDING), Some(true));
    }

    #[test]
    fn test_reset_keeps_history() {
        let mut store = store_with(0, 2000, "2025-099", noon(99));
        store.set_current_calories(1500);
        store.clock().set(noon(100));
        store.check_and_rollover_if_new_day();
        store.set_current_calories(800);

        store.reset_calories();
        assert_eq!(store.current_calories(), 0);
        assert_eq!(history_entry(&store, "2025-099"), Some((1500, 2000)));
        assert_eq!(
            store.storage().get_str(keys::LAST_UPDATE_DATE).as_deref(),
            Some("2025-100")
        );
    }

    #[test]
    fn test_first_run_only_stamps_day() {
        let mut store = fresh_store();
        assert_eq!(
            store.storage().get_str(keys::LAST_UPDATE_DATE).as_deref(),
            Some("2025-100")
        );
        assert!(store.storage().get(keys::HISTORY).is_none());
        assert_eq!(store.check_and_rollover_if_new_day(), Rollover::SameDay);
    }

    #[test]
    fn test_rollover_moves_tally_to_history() {
        let mut store = store_with(1800, 2000, "2025-100", noon(100));
        assert_eq!(store.current_calories(), 1800);

        store.clock().set(noon(101));
        let outcome = store.check_and_rollover_if_new_day();

        assert_eq!(
            outcome,
            Rollover::RolledOver {
                previous: DayKey::from_year_ordinal(2025, 100),
                calories: 1800,
                goal: 2000,
            }
        );
        assert_eq!(store.current_calories(), 0);
        assert_eq!(
            store.storage().get_str(keys::LAST_UPDATE_DATE).as_deref(),
            Some("2025-101")
        );
        assert_eq!(history_entry(&store, "2025-100"), Some((1800, 2000)));
    }

    #[test]
    fn test_rollover_happens_on_open() {
        let store = store_with(1800, 2000, "2025-100", noon(101));
        assert_eq!(store.current_calories(), 0);
        assert_eq!(history_entry(&store, "2025-100"), Some((1800, 2000)));
    }

    #[test]
    fn test_no_rollover_before_three_am() {
        let mut store = store_with(700, 2000, "2025-100", noon(100));
        // 02:30 on the next calendar day is still day 100
        store.clock().advance(Duration::hours(14) + Duration::minutes(30));
        assert_eq!(store.check_and_rollover_if_new_day(), Rollover::SameDay);
        assert_eq!(store.current_calories(), 700);

        store.clock().advance(Duration::minutes(30));
        assert!(matches!(
            store.check_and_rollover_if_new_day(),
            Rollover::RolledOver { .. }
        ));
        assert_eq!(store.current_calories(), 0);
    }

    #[test]
    fn test_legacy_unpadded_key_is_same_day() {
        let day9 = NaiveDate::from_yo_opt(2025, 9).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let store = store_with(300, 2000, "2025-9", day9);
        assert_eq!(store.current_calories(), 300);
        assert_eq!(
            store.storage().get_str(keys::LAST_UPDATE_DATE).as_deref(),
            Some("2025-009")
        );
    }

    #[test]
    fn test_unreadable_day_resets_without_history() {
        let store = store_with(300, 2000, "yesterday", noon(100));
        assert_eq!(store.current_calories(), 0);
        assert_eq!(store.load_history().len(), 1);
        assert_eq!(store.load_history()[0].date_key.to_string(), "2025-100");
    }

    #[test]
    fn test_history_keeps_ninety_days() {
        let mut store = CalorieStore::open(MemoryStore::new(), FixedClock::new(noon(1)));
        for day in 1..=91 {
            store.clock().set(noon(day));
            store.check_and_rollover_if_new_day();
            store.set_current_calories(100);
        }

        let history = store.load_history();
        assert_eq!(history.len(), HISTORY_RETENTION);
        assert_eq!(history.last().unwrap().date_key.to_string(), "2025-002");
        assert_eq!(history.first().unwrap().date_key.to_string(), "2025-091");
        assert!(history_entry(&store, "2025-001").is_none());
    }

    #[test]
    fn test_load_history_is_most_recent_first() {
        let mut store = fresh_store();
        for day in [100, 101, 102] {
            store.clock().set(noon(day));
            store.check_and_rollover_if_new_day();
            store.set_current_calories(day as i32 * 10);
        }
        let keys: Vec<String> = store
            .load_history()
            .iter()
            .map(|r| r.date_key.to_string())
            .collect();
        assert_eq!(keys, vec!["2025-102", "2025-101", "2025-100"]);
    }

    #[test]
    fn test_recent_history_synthesizes_today() {
        let mut storage = MemoryStore::new();
        let mut history = Table::new();
        for day in 95..=99u32 {
            let mut row = Table::new();
            row.insert("calories".into(), Value::Integer(i64::from(day) * 10));
            row.insert("goal".into(), Value::Integer(2000));
            history.insert(format!("2025-{day:03}"), Value::Table(row));
        }
        storage.set(keys::HISTORY, Value::Table(history)).unwrap();
        storage.set(keys::CURRENT_CALORIES, Value::Integer(450)).unwrap();
        storage
            .set(keys::LAST_UPDATE_DATE, Value::String("2025-100".into()))
            .unwrap();
        let store = CalorieStore::open(storage, FixedClock::new(noon(100)));

        let recent = store.load_recent_history(3);
        let keys: Vec<String> = recent.iter().map(|r| r.date_key.to_string()).collect();
        assert_eq!(keys, vec!["2025-098", "2025-099", "2025-100"]);
        assert_eq!(recent[2].calories, 450);
        // Nothing was written for today
        assert!(history_entry(&store, "2025-100").is_none());

        assert!(store.load_recent_history(0).is_empty());
    }

    #[test]
    fn test_recent_history_uses_stored_today() {
        let mut store = CalorieStore::open(MemoryStore::new(), FixedClock::new(noon(99)));
        store.set_current_calories(1000);
        store.clock().set(noon(100));
        store.check_and_rollover_if_new_day();
        store.set_current_calories(600);

        let recent = store.load_recent_history(7);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].calories, 1000);
        assert_eq!(recent[1].calories, 600);
    }

    #[test]
    fn test_notch_count_and_snap() {
        let mut store = fresh_store();
        assert_eq!(store.notch_count(), 48);
        assert_eq!(store.snap_to_increment(0), 0);
        assert_eq!(store.snap_to_increment(24), 0);
        assert_eq!(store.snap_to_increment(25), 50);
        assert_eq!(store.snap_to_increment(1274), 1250);

        store.set_daily_goal(2450);
        store.set_increment(100);
        assert_eq!(store.notch_count(), 24);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let mut store = fresh_store();
        for inc in [10, 25, 50, 100] {
            store.set_increment(inc);
            for x in [i32::MIN, -75, -1, 0, 7, 49, 50, 1234, 9_999, i32::MAX] {
                let once = store.snap_to_increment(x);
                assert_eq!(store.snap_to_increment(once), once, "inc {inc}, x {x}");
            }
        }
    }

    #[test]
    fn test_percentage() {
        let mut store = fresh_store();
        assert_eq!(store.percentage(), 0.0);
        store.set_current_calories(1200);
        assert!((store.percentage() - 0.5).abs() < f32::EPSILON);
        store.set_current_calories(2400);
        assert_eq!(store.percentage(), 1.0);

        let record = DailyRecord::new(store.today_key(), 3000, 2000);
        assert_eq!(record.percentage(), 1.0);
        let record = DailyRecord::new(store.today_key(), 100, 0);
        assert_eq!(record.percentage(), 0.0);
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut store = fresh_store();
        let start = store.revision();
        store.set_current_calories(100);
        store.set_increment(25);
        assert!(store.revision() >= start + 2);
    }
}
