//! Calorie Wheel
//!
//! A dial you turn to log the day's calories: one notch per increment, one
//! full turn per daily goal. The tally starts over at 03:00 local time.

mod drawing;
mod ui;

use std::time::Instant;

use chrono::NaiveDateTime;
use nannou::prelude::*;
use nannou_egui::{self, Egui};
use shared::{
    next_reset_after, readout_color, wheel_fill, CalorieStore, Clock, FeedbackPulse,
    KeyValueStore, MemoryStore, Rollover, TomlFileStore, WheelController, WheelEvent,
    WheelPreferences, PREFERENCES_NAME,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::drawing::{
    colors, draw_error_banner, draw_flash, draw_header, draw_hint, draw_notches, draw_pointer,
    draw_toast, draw_value_window, draw_wheel, to_screen, Flash, Layout, Toast,
};
use crate::ui::{
    draw_history_panel, draw_onboarding, draw_settings_panel, PanelState, UiResult, CHART_DAYS,
};

type Store = CalorieStore<Box<dyn KeyValueStore>, Box<dyn Clock>>;

const TOAST_SECONDS: f32 = 3.0;

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    nannou::app(model).update(update).run();
}

/// Application state
struct Model {
    /// Calorie tally, goal and history
    store: Store,
    /// Gesture state of the dial
    wheel: WheelController,
    /// Store revision the wheel rotation was last synced to
    synced_revision: u64,
    /// Persisted preferences
    preferences: WheelPreferences,
    /// Open overlays
    panels: PanelState,
    /// Rim flash for the latest feedback pulse
    flash: Option<Flash>,
    /// Transient notice (e.g. a new day began)
    toast: Option<Toast>,
    /// Next 03:00 boundary in the store clock's local time
    next_reset: NaiveDateTime,
    /// Error message to display (if any)
    error_message: Option<String>,
    /// egui integration
    egui: Egui,
}

fn save_preferences(model: &Model) {
    if let Err(e) = shared::save_config(PREFERENCES_NAME, &model.preferences) {
        error!(error = %e, "failed to save preferences");
    }
}

fn show_toast(model: &mut Model, text: String) {
    model.toast = Some(Toast {
        text,
        created_at: Instant::now(),
        duration_secs: TOAST_SECONDS,
    });
}

/// Open the shared state file, or fall back to memory so the wheel still works
fn open_storage() -> (Box<dyn KeyValueStore>, Option<String>) {
    match TomlFileStore::open_default() {
        Ok(file) => {
            info!(path = %file.path().display(), "state file opened");
            (Box::new(file), None)
        }
        Err(e) => {
            error!(error = %e, "could not open state file, changes will not be saved");
            (
                Box::new(MemoryStore::new()),
                Some("Saved data could not be opened. Changes this session will not be kept.".to_string()),
            )
        }
    }
}

fn model(app: &App) -> Model {
    // Create window
    let window_id = app
        .new_window()
        .title("Calorie Wheel")
        .size(480, 640)
        .min_size(360, 480)
        .view(view)
        .key_pressed(key_pressed)
        .mouse_pressed(mouse_pressed)
        .mouse_released(mouse_released)
        .mouse_moved(mouse_moved)
        .mouse_exited(mouse_exited)
        .raw_event(raw_window_event)
        .build()
        .unwrap();

    let window = app.window(window_id).unwrap();
    let egui = Egui::from_window(&window);

    let preferences = WheelPreferences::load_or_default();
    let (storage, error_message) = open_storage();

    // Opening applies any rollover that happened while the app was closed
    let store = CalorieStore::open(storage, preferences.clock());
    let layout = Layout::calculate(app.window_rect());
    let wheel = WheelController::new(layout.wheel.center, &store);
    let next_reset = next_reset_after(store.clock().now());

    Model {
        synced_revision: store.revision(),
        store,
        wheel,
        preferences,
        panels: PanelState::default(),
        flash: None,
        toast: None,
        next_reset,
        error_message,
        egui,
    }
}

/// Settle any gesture, then roll the tally over if a day boundary passed
fn check_rollover(model: &mut Model) {
    if model.wheel.is_dragging() {
        let events = model.wheel.pointer_cancel(&mut model.store);
        apply_wheel_events(model, events);
    }

    if let Rollover::RolledOver { calories, .. } = model.store.check_and_rollover_if_new_day() {
        show_toast(model, format!("New day started · yesterday {} cal", calories));
    }
    model.next_reset = next_reset_after(model.store.clock().now());
}

fn apply_wheel_events(model: &mut Model, events: Vec<WheelEvent>) {
    let now = Instant::now();
    let mut long_pressed = false;

    for event in events {
        match event {
            WheelEvent::ValueChanged(calories) => debug!(calories, "wheel value changed"),
            WheelEvent::Feedback(pulse) => {
                if model.preferences.feedback_flash || pulse == FeedbackPulse::Confirm {
                    model.flash = Some(Flash::new(pulse, now));
                }
            }
            WheelEvent::LongPress => long_pressed = true,
        }
    }

    if long_pressed {
        let settled = model.wheel.pointer_cancel(&mut model.store);
        apply_wheel_events(model, settled);
        model.panels.open_settings(model.store.daily_goal());
    }
}

fn apply_ui_result(model: &mut Model, result: UiResult) {
    if let Some(goal) = result.new_goal {
        model.store.set_daily_goal(goal);
        model.panels.settings.goal_input = model.store.daily_goal().to_string();
    }
    if let Some(increment) = result.new_increment {
        model.store.set_increment(increment);
    }
    if result.reset_calories {
        model.store.reset_calories();
        show_toast(model, "Calories reset to 0".to_string());
    }
    if result.preferences_changed {
        save_preferences(model);
    }
    if result.close_settings {
        model.panels.settings_open = false;
    }
}

fn update(app: &App, model: &mut Model, update: Update) {
    let now = Instant::now();

    // Track the wheel center through resizes
    let layout = Layout::calculate(app.window_rect());
    model.wheel.set_center(layout.wheel.center);

    // Crossed 03:00 while running
    if model.store.clock().now() >= model.next_reset {
        check_rollover(model);
    }

    if let Some(event) = model.wheel.poll_long_press(now) {
        apply_wheel_events(model, vec![event]);
    }

    // Store changed outside a gesture (rollover, settings, reset)
    if !model.wheel.is_dragging() && model.store.revision() != model.synced_revision {
        model.wheel.sync_rotation_from_store(&model.store);
        model.synced_revision = model.store.revision();
    }

    if model.flash.map_or(false, |flash| flash.is_finished(now)) {
        model.flash = None;
    }
    if let Some(ref toast) = model.toast {
        if toast.created_at.elapsed().as_secs_f32() > toast.duration_secs {
            model.toast = None;
        }
    }

    // Collect what the panels need before the egui frame borrows the model
    let daily_goal = model.store.daily_goal();
    let increment = model.store.increment();
    let show_onboarding = !model.store.has_seen_onboarding();
    let today = model.store.today_key();
    let (recent, history) = if model.panels.history_open {
        (
            model.store.load_recent_history(CHART_DAYS),
            model.store.load_history(),
        )
    } else {
        (Vec::new(), Vec::new())
    };
    let mut preferences = model.preferences.clone();

    // Begin egui frame
    model.egui.set_elapsed_time(update.since_start);
    let ctx = model.egui.begin_frame();

    let onboarding_done = show_onboarding && draw_onboarding(&ctx);

    let settings_result = if model.panels.settings_open {
        draw_settings_panel(
            &ctx,
            &mut model.panels.settings,
            daily_goal,
            increment,
            &mut preferences,
        )
    } else {
        UiResult::default()
    };

    let history_closed = model.panels.history_open
        && draw_history_panel(&ctx, &recent, &history, daily_goal, today);

    // Now apply UI results after egui frame is done (ctx is dropped here)
    drop(ctx);

    if onboarding_done {
        model.store.mark_onboarding_seen();
    }
    if settings_result.preferences_changed {
        model.preferences = preferences;
    }
    apply_ui_result(model, settings_result);
    if history_closed {
        model.panels.history_open = false;
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    let window_rect = app.window_rect();
    let store = &model.store;

    // Clear background
    draw.background().color(colors::BACKGROUND);

    let layout = Layout::calculate(window_rect);
    let readout = readout_color(store.current_calories(), store.daily_goal());

    draw_header(&draw, store.daily_goal(), layout.header);
    draw_wheel(&draw, &layout.wheel, &wheel_fill(store.percentage()));
    draw_notches(&draw, &layout.wheel, &model.wheel.notch_marks(store));
    if let Some(ref flash) = model.flash {
        draw_flash(
            &draw,
            &layout.wheel,
            flash,
            readout,
            Instant::now(),
            model.preferences.reduced_motion,
        );
    }
    draw_value_window(&draw, &layout.wheel, store.current_calories(), readout);
    draw_pointer(&draw, &layout.wheel);
    draw_hint(&draw, layout.hint);

    if let Some(ref toast) = model.toast {
        draw_toast(&draw, toast, window_rect);
    }

    // Draw error banner if needed
    if let Some(ref message) = model.error_message {
        draw_error_banner(&draw, message, window_rect);
    }

    // Render to frame
    draw.to_frame(app, &frame).unwrap();

    // Render egui on top
    model.egui.draw_to_frame(&frame).unwrap();
}

fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    // The settings panel has a text field; only Escape reaches the app then
    if model.panels.settings_open && key != Key::Escape {
        return;
    }

    match key {
        // Escape closes the topmost panel
        Key::Escape => {
            model.panels.close_top();
        }
        Key::S => {
            if model.panels.settings_open {
                model.panels.settings_open = false;
            } else {
                model.panels.open_settings(model.store.daily_goal());
            }
        }
        Key::H => {
            if model.panels.history_open {
                model.panels.history_open = false;
            } else {
                model.panels.open_history();
            }
        }
        // R toggles reduced motion
        Key::R => {
            model.preferences.reduced_motion = !model.preferences.reduced_motion;
            save_preferences(model);
        }
        _ => {}
    }
}

fn mouse_pressed(app: &App, model: &mut Model, button: MouseButton) {
    if button != MouseButton::Left || model.panels.any_open() || !model.store.has_seen_onboarding() {
        return;
    }

    let layout = Layout::calculate(app.window_rect());
    let pos = to_screen(app.mouse.position());
    if layout.wheel.contains(pos) {
        model.wheel.set_center(layout.wheel.center);
        model.wheel.pointer_down(pos, Instant::now());
    }
}

fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    let events = model.wheel.pointer_move(to_screen(pos), &mut model.store);
    apply_wheel_events(model, events);
}

fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        let events = model.wheel.pointer_up(&mut model.store);
        apply_wheel_events(model, events);
    }
}

fn mouse_exited(_app: &App, model: &mut Model) {
    let events = model.wheel.pointer_cancel(&mut model.store);
    apply_wheel_events(model, events);
}

fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    // Let egui handle raw events for keyboard and mouse input
    model.egui.handle_raw_event(event);

    match event {
        // Back in the foreground: a day may have ended while we were away
        nannou::winit::event::WindowEvent::Focused(true) => check_rollover(model),
        nannou::winit::event::WindowEvent::Focused(false) => {
            let events = model.wheel.pointer_cancel(&mut model.store);
            apply_wheel_events(model, events);
        }
        _ => {}
    }
}
