//! UI module - settings, history and onboarding panels
//!
//! Provides the egui overlays using nannou_egui. Panels never touch the store
//! directly; they report what the user asked for in a [`UiResult`].

use nannou_egui::egui;
use shared::store::GOAL_RANGE;
use shared::{readout_color, DailyRecord, DayKey, Rgb, WheelPreferences};

/// Increments offered by the settings panel
pub const INCREMENT_CHOICES: [i32; 4] = [10, 25, 50, 100];

/// Days shown in the history bar chart
pub const CHART_DAYS: usize = 7;

const CHART_HEIGHT: f32 = 100.0;
const BAR_SPACING: f32 = 8.0;
const MIN_BAR: f32 = 4.0;

/// State of the settings panel
#[derive(Default)]
pub struct SettingsState {
    /// Text of the goal entry field
    pub goal_input: String,
    /// Validation message for the goal entry
    pub goal_error: Option<String>,
    /// Waiting for the user to confirm a reset
    pub confirm_reset: bool,
}

/// Which overlays are open
#[derive(Default)]
pub struct PanelState {
    pub settings_open: bool,
    pub history_open: bool,
    pub settings: SettingsState,
}

impl PanelState {
    pub fn open_settings(&mut self, daily_goal: i32) {
        self.settings_open = true;
        self.history_open = false;
        self.settings = SettingsState {
            goal_input: daily_goal.to_string(),
            ..SettingsState::default()
        };
    }

    pub fn open_history(&mut self) {
        self.history_open = true;
        self.settings_open = false;
    }

    /// Close the topmost panel; returns false if nothing was open
    pub fn close_top(&mut self) -> bool {
        if self.settings_open && self.settings.confirm_reset {
            self.settings.confirm_reset = false;
        } else if self.settings_open {
            self.settings_open = false;
        } else if self.history_open {
            self.history_open = false;
        } else {
            return false;
        }
        true
    }

    pub fn any_open(&self) -> bool {
        self.settings_open || self.history_open
    }
}

/// Result of UI interactions
#[derive(Debug, Default, PartialEq)]
pub struct UiResult {
    /// If Some, the user saved a new daily goal
    pub new_goal: Option<i32>,
    /// If Some, the user picked a new increment
    pub new_increment: Option<i32>,
    /// If true, the user confirmed a calorie reset
    pub reset_calories: bool,
    /// If true, preferences were edited and should be saved
    pub preferences_changed: bool,
    /// If true, close the settings panel
    pub close_settings: bool,
}

/// Parse the goal entry field
pub fn parse_goal_input(input: &str) -> Result<i32, String> {
    let message = || {
        format!(
            "Enter a value between {} and {}",
            group_thousands(*GOAL_RANGE.start()),
            group_thousands(*GOAL_RANGE.end())
        )
    };
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let goal: i32 = cleaned.parse().map_err(|_| message())?;
    if GOAL_RANGE.contains(&goal) {
        Ok(goal)
    } else {
        Err(message())
    }
}

fn group_thousands(value: i32) -> String {
    let digits = value.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

/// Row label for a history record
pub fn day_label(key: DayKey, today: DayKey) -> String {
    if key == today {
        "Today".to_string()
    } else if Some(key) == today.pred() {
        "Yesterday".to_string()
    } else {
        key.date().format("%a, %b %-d").to_string()
    }
}

/// One bar of the weekly chart, measured from the chart's bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBar {
    pub x: f32,
    pub width: f32,
    pub height: f32,
}

/// Bars plus the goal line height for a chart `width` x `height`
pub fn chart_bars(records: &[DailyRecord], goal: i32, width: f32, height: f32) -> (Vec<ChartBar>, f32) {
    let max_value = records
        .iter()
        .map(|r| r.calories)
        .max()
        .unwrap_or(0)
        .max(goal) as f32;
    let count = records.len().max(1) as f32;
    let bar_width = ((width - BAR_SPACING * (count - 1.0)) / count).max(MIN_BAR);

    let scale = |calories: i32| {
        if max_value > 0.0 {
            height * calories as f32 / max_value
        } else {
            0.0
        }
    };

    let bars = records
        .iter()
        .enumerate()
        .map(|(i, record)| ChartBar {
            x: i as f32 * (bar_width + BAR_SPACING),
            width: bar_width,
            height: scale(record.calories).max(MIN_BAR),
        })
        .collect();

    (bars, scale(goal))
}

fn color32(c: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(
        (c.r * 255.0).round() as u8,
        (c.g * 255.0).round() as u8,
        (c.b * 255.0).round() as u8,
    )
}

/// Draw the settings panel
pub fn draw_settings_panel(
    ctx: &egui::Context,
    state: &mut SettingsState,
    daily_goal: i32,
    increment: i32,
    preferences: &mut WheelPreferences,
) -> UiResult {
    let mut result = UiResult::default();

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .default_width(280.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.strong("Daily Calorie Goal");
            ui.label(format!("{} calories", daily_goal));
            ui.horizontal(|ui| {
                let field = ui.text_edit_singleline(&mut state.goal_input);
                let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Save").clicked() || submitted {
                    match parse_goal_input(&state.goal_input) {
                        Ok(goal) => {
                            result.new_goal = Some(goal);
                            state.goal_error = None;
                        }
                        Err(message) => state.goal_error = Some(message),
                    }
                }
            });
            match &state.goal_error {
                Some(message) => {
                    ui.colored_label(egui::Color32::from_rgb(244, 67, 54), message);
                }
                None => {
                    ui.small("Enter a value between 500 and 10,000");
                }
            }

            ui.separator();
            ui.strong("Wheel Increment");
            ui.label(format!("{} calories per notch", increment));
            ui.horizontal(|ui| {
                for value in INCREMENT_CHOICES {
                    if ui
                        .selectable_label(value == increment, format!("{} cal", value))
                        .clicked()
                        && value != increment
                    {
                        result.new_increment = Some(value);
                    }
                }
            });

            ui.separator();
            if ui
                .checkbox(&mut preferences.feedback_flash, "Flash on notch ticks")
                .changed()
            {
                result.preferences_changed = true;
            }
            if ui
                .checkbox(&mut preferences.reduced_motion, "Reduced Motion")
                .changed()
            {
                result.preferences_changed = true;
            }

            ui.separator();
            if state.confirm_reset {
                ui.label("Reset calories to 0?");
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        result.reset_calories = true;
                        state.confirm_reset = false;
                    }
                    if ui.button("No").clicked() {
                        state.confirm_reset = false;
                    }
                });
            } else {
                if ui.button("Reset Calories").clicked() {
                    state.confirm_reset = true;
                }
                ui.small("Reset today's calories to 0");
            }

            ui.separator();
            if ui.button("Done").clicked() {
                result.close_settings = true;
            }
        });

    result
}

/// Draw the history panel: weekly chart above the full list.
/// Returns true when the user closed it.
pub fn draw_history_panel(
    ctx: &egui::Context,
    recent: &[DailyRecord],
    history: &[DailyRecord],
    daily_goal: i32,
    today: DayKey,
) -> bool {
    let mut close = false;

    egui::Window::new("History")
        .collapsible(false)
        .resizable(false)
        .default_width(320.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            draw_weekly_chart(ui, recent, daily_goal);
            ui.separator();

            egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                if history.is_empty() {
                    ui.label("No days recorded yet");
                }
                for record in history {
                    ui.horizontal(|ui| {
                        ui.label(day_label(record.date_key, today));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.small("cal");
                            ui.colored_label(
                                color32(readout_color(record.calories, record.goal)),
                                egui::RichText::new(record.calories.to_string()).strong(),
                            );
                        });
                    });
                }
            });

            ui.separator();
            if ui.button("Close").clicked() {
                close = true;
            }
        });

    close
}

fn draw_weekly_chart(ui: &mut egui::Ui, records: &[DailyRecord], daily_goal: i32) {
    let width = ui.available_width().max(MIN_BAR);
    let label_height = 16.0;
    let (response, painter) = ui.allocate_painter(
        egui::vec2(width, CHART_HEIGHT + label_height),
        egui::Sense::hover(),
    );
    let area = response.rect;
    let bottom = area.top() + CHART_HEIGHT;

    let (bars, goal_height) = chart_bars(records, daily_goal, width, CHART_HEIGHT);

    painter.hline(
        area.left()..=area.right(),
        bottom - goal_height,
        egui::Stroke::new(1.0, egui::Color32::from_white_alpha(51)),
    );

    for (bar, record) in bars.iter().zip(records) {
        let rect = egui::Rect::from_min_max(
            egui::pos2(area.left() + bar.x, bottom - bar.height),
            egui::pos2(area.left() + bar.x + bar.width, bottom),
        );
        painter.rect_filled(rect, 4.0, color32(readout_color(record.calories, record.goal)));

        let letter: String = record.date.format("%a").to_string().chars().take(1).collect();
        painter.text(
            egui::pos2(rect.center().x, bottom + 2.0),
            egui::Align2::CENTER_TOP,
            letter,
            egui::FontId::proportional(11.0),
            egui::Color32::from_gray(102),
        );
    }
}

/// Draw the first-run overlay. Returns true when dismissed.
pub fn draw_onboarding(ctx: &egui::Context) -> bool {
    let mut dismissed = false;

    let steps = [
        (
            Rgb::from_hex(0x4CAF50),
            "Set your daily goal",
            "Press S or long press the wheel to choose a calorie target that works for you",
        ),
        (
            Rgb::from_hex(0x8BC34A),
            "Spin to log",
            "Drag the wheel to add calories as you eat throughout the day",
        ),
        (
            Rgb::from_hex(0xFF9800),
            "Stay on track",
            "The wheel shifts from green to red as you approach your daily goal",
        ),
    ];

    egui::Window::new("Welcome to Calorie Wheel")
        .collapsible(false)
        .resizable(false)
        .default_width(320.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            for (color, title, subtitle) in steps {
                ui.colored_label(color32(color), egui::RichText::new(title).heading());
                ui.label(subtitle);
                ui.add_space(8.0);
            }
            ui.separator();
            if ui.button("Get Started").clicked() {
                dismissed = true;
            }
        });

    dismissed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ordinal: u32) -> DayKey {
        DayKey::from_year_ordinal(2025, ordinal).unwrap()
    }

    #[test]
    fn test_parse_goal_input() {
        assert_eq!(parse_goal_input(" 2000 "), Ok(2000));
        assert_eq!(parse_goal_input("10,000"), Ok(10_000));
        assert!(parse_goal_input("499").is_err());
        assert!(parse_goal_input("10001").is_err());
        assert_eq!(
            parse_goal_input("lots"),
            Err("Enter a value between 500 and 10,000".to_string())
        );
    }

    #[test]
    fn test_day_labels() {
        let today = key(100);
        assert_eq!(day_label(key(100), today), "Today");
        assert_eq!(day_label(key(99), today), "Yesterday");
        // 2025-098 is Tuesday, April 8
        assert_eq!(day_label(key(98), today), "Tue, Apr 8");
    }

    #[test]
    fn test_chart_scales_to_goal_or_largest_day() {
        let records = vec![
            DailyRecord::new(key(98), 0, 2000),
            DailyRecord::new(key(99), 1000, 2000),
            DailyRecord::new(key(100), 4000, 2000),
        ];
        let (bars, goal_height) = chart_bars(&records, 2000, 100.0, 100.0);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].height, MIN_BAR);
        assert!((bars[1].height - 25.0).abs() < 1e-4);
        assert!((bars[2].height - 100.0).abs() < 1e-4);
        assert!((goal_height - 50.0).abs() < 1e-4);
        // Three bars and two gaps fill the width
        let last = bars[2];
        assert!((last.x + last.width - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_close_top_steps_back() {
        let mut panels = PanelState::default();
        panels.open_settings(2400);
        assert_eq!(panels.settings.goal_input, "2400");
        panels.settings.confirm_reset = true;

        assert!(panels.close_top());
        assert!(panels.settings_open);
        assert!(panels.close_top());
        assert!(!panels.settings_open);
        assert!(!panels.close_top());
    }
}
