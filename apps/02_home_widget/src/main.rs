//! Calorie Widget
//!
//! A small always-visible readout of today's tally. It only ever reads the
//! state file the wheel writes, re-reading on a timer and at the 03:00 reset.

mod drawing;

use chrono::NaiveDateTime;
use nannou::prelude::*;
use shared::{next_refresh, Clock, MemoryStore, TomlFileStore, WheelPreferences, WidgetSnapshot};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::drawing::{colors, draw_error_banner, draw_snapshot};

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    nannou::app(model).update(update).run();
}

/// Application state
struct Model {
    /// Read-only view of the shared state file
    storage: Option<TomlFileStore>,
    /// Clock that defines the calorie day
    clock: Box<dyn Clock>,
    /// What is on screen
    snapshot: WidgetSnapshot,
    /// When to re-read the state file
    next_refresh: NaiveDateTime,
    /// Minutes between timed refreshes
    refresh_minutes: u64,
    /// Error message to display (if any)
    error_message: Option<String>,
}

impl Model {
    /// Re-read the state file and schedule the next refresh
    fn refresh(&mut self) {
        if self.storage.is_none() {
            self.storage = TomlFileStore::open_default().ok();
        }
        if let Some(storage) = self.storage.as_mut() {
            match storage.reload() {
                Ok(()) => {
                    self.snapshot = WidgetSnapshot::read(&*storage, &self.clock);
                    self.error_message = None;
                    debug!(
                        calories = self.snapshot.current_calories,
                        goal = self.snapshot.daily_goal,
                        stale = self.snapshot.stale,
                        "widget refreshed"
                    );
                }
                // Keep showing the last good snapshot
                Err(e) => {
                    warn!(error = %e, "widget could not read state file");
                    self.error_message = Some("Could not read calorie data".to_string());
                }
            }
        }
        self.next_refresh = next_refresh(self.clock.now(), self.refresh_minutes);
    }
}

fn model(app: &App) -> Model {
    app.new_window()
        .title("Calories Today")
        .size(240, 200)
        .min_size(200, 160)
        .view(view)
        .key_pressed(key_pressed)
        .raw_event(raw_window_event)
        .build()
        .unwrap();

    let preferences = WheelPreferences::load_or_default();
    let clock = preferences.clock();

    let (storage, error_message) = match TomlFileStore::open_default() {
        Ok(storage) => {
            info!(path = %storage.path().display(), "widget reading state file");
            (Some(storage), None)
        }
        Err(e) => {
            warn!(error = %e, "widget could not open state file");
            (None, Some("Could not read calorie data".to_string()))
        }
    };

    let snapshot = match &storage {
        Some(storage) => WidgetSnapshot::read(storage, &clock),
        None => WidgetSnapshot::read(&MemoryStore::new(), &clock),
    };
    let next_refresh = next_refresh(clock.now(), preferences.widget_refresh_minutes);

    Model {
        storage,
        clock,
        snapshot,
        next_refresh,
        refresh_minutes: preferences.widget_refresh_minutes,
        error_message,
    }
}

fn update(_app: &App, model: &mut Model, _update: Update) {
    if model.clock.now() >= model.next_refresh {
        model.refresh();
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    let window_rect = app.window_rect();

    // Clear background
    draw.background().color(colors::BACKGROUND);

    draw_snapshot(&draw, &model.snapshot, window_rect.pad(16.0));

    // Draw error banner if needed
    if let Some(ref message) = model.error_message {
        draw_error_banner(&draw, message, window_rect);
    }

    // Render to frame
    draw.to_frame(app, &frame).unwrap();
}

fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    // R (or Space) refreshes now
    if matches!(key, Key::R | Key::Space) {
        model.refresh();
    }
}

fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    // Catch up on anything the wheel wrote while the widget was in the background
    if let nannou::winit::event::WindowEvent::Focused(true) = event {
        model.refresh();
    }
}
