//! Read-only view of the calorie state for the home widget
//!
//! The widget never writes. If the wheel app has not been opened since the
//! last 03:00 reset, the stored tally belongs to a previous day and is shown
//! as zero.

use chrono::{Duration, NaiveDateTime};

use crate::storage::{keys, KeyValueStore};
use crate::store::DEFAULT_DAILY_GOAL;
use crate::time_engine::{next_reset_after, Clock, DayKey};

/// Default interval between widget refreshes
pub const WIDGET_REFRESH_MINUTES: u64 = 30;

/// What the widget shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSnapshot {
    pub current_calories: i32,
    pub daily_goal: i32,
    /// Whole percent of the goal, capped at 100
    pub percentage: u8,
    /// The stored tally is from an earlier day
    pub stale: bool,
}

impl WidgetSnapshot {
    pub fn read(storage: &impl KeyValueStore, clock: &impl Clock) -> Self {
        let daily_goal = match storage.get_int(keys::DAILY_GOAL) {
            Some(goal) if goal > 0 => goal.min(i64::from(i32::MAX)) as i32,
            _ => DEFAULT_DAILY_GOAL,
        };

        let today = clock.today();
        let stale = storage
            .get_str(keys::LAST_UPDATE_DATE)
            .and_then(|s| s.parse::<DayKey>().ok())
            != Some(today);

        let current_calories = if stale {
            0
        } else {
            storage
                .get_int(keys::CURRENT_CALORIES)
                .unwrap_or(0)
                .clamp(0, i64::from(daily_goal)) as i32
        };

        Self {
            current_calories,
            daily_goal,
            percentage: percent_of(current_calories, daily_goal),
            stale,
        }
    }
}

fn percent_of(current: i32, goal: i32) -> u8 {
    if goal <= 0 {
        return 0;
    }
    (i64::from(current.max(0)) * 100 / i64::from(goal)).min(100) as u8
}

/// When the widget should next re-read the state: after `refresh_minutes`,
/// or at the next day boundary if that comes first
pub fn next_refresh(now: NaiveDateTime, refresh_minutes: u64) -> NaiveDateTime {
    let minutes = refresh_minutes.clamp(1, 24 * 60) as i64;
    let periodic = now + Duration::minutes(minutes);
    periodic.min(next_reset_after(now))
}
