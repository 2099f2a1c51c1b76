//! Shared library for the calorie wheel and its home widget
//!
//! Provides:
//! - Day bucketing with a 03:00 boundary and injectable clocks
//! - Key-value persistence of the calorie state
//! - The calorie store and the wheel gesture controller
//! - Widget snapshots, progress colors and preference persistence

pub mod config;
pub mod palette;
pub mod storage;
pub mod store;
pub mod time_engine;
pub mod wheel;
pub mod widget;

pub use config::{save_config, ConfigError, WheelPreferences, PREFERENCES_NAME};
pub use palette::{readout_color, wheel_fill, Rgb, WheelShading};
pub use storage::{KeyValueStore, MemoryStore, StorageError, TomlFileStore};
pub use store::{CalorieStore, DailyRecord, HistoryEntry, Rollover};
pub use time_engine::{
    next_reset_after, parse_timezone, Clock, DayKey, FixedClock, SystemClock, TimeError,
    ZonedClock,
};
pub use wheel::{
    FeedbackPulse, NotchMark, Point, WheelController, WheelEvent, WheelGeometry, WheelState,
};
pub use widget::{next_refresh, WidgetSnapshot, WIDGET_REFRESH_MINUTES};
