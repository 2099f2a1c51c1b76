//! Drawing module - the widget readout
//!
//! Big number, "cal" caption, `current / goal` line and a progress bar, all
//! in the readout color of the current tally.

use nannou::prelude::*;
use shared::{readout_color, Rgb, WidgetSnapshot};

/// Color palette for the widget
pub mod colors {
    use nannou::prelude::*;

    pub const BACKGROUND: Srgb<u8> = Srgb {
        red: 26,
        green: 26,
        blue: 26,
        standard: std::marker::PhantomData,
    };
    pub const TEXT_PRIMARY: Srgb<u8> = Srgb {
        red: 240,
        green: 240,
        blue: 240,
        standard: std::marker::PhantomData,
    };
    pub const TEXT_SECONDARY: Srgb<u8> = Srgb {
        red: 176,
        green: 176,
        blue: 176,
        standard: std::marker::PhantomData,
    };
    pub const TRACK: Srgb<u8> = Srgb {
        red: 51,
        green: 51,
        blue: 51,
        standard: std::marker::PhantomData,
    };
}

const BAR_HEIGHT: f32 = 8.0;

/// Width of the filled part of a progress bar `track_width` wide
pub fn bar_fill_width(percentage: u8, track_width: f32) -> f32 {
    track_width * <f32 as From<u8>>::from(percentage.min(100)) / 100.0
}

fn nannou_rgb(c: Rgb) -> Srgb<f32> {
    srgb(c.r, c.g, c.b)
}

/// Draw the whole widget inside `rect`
pub fn draw_snapshot(draw: &Draw, snapshot: &WidgetSnapshot, rect: Rect) {
    let accent = nannou_rgb(readout_color(
        snapshot.current_calories,
        snapshot.daily_goal,
    ));
    let center = rect.xy();

    draw.text(&snapshot.current_calories.to_string())
        .xy(center + vec2(0.0, 30.0))
        .color(accent)
        .font_size(40)
        .w(rect.w());

    draw.text("cal")
        .xy(center + vec2(0.0, -2.0))
        .color(colors::TEXT_SECONDARY)
        .font_size(12)
        .w(rect.w());

    draw.text(&format!(
        "{} / {} cal",
        snapshot.current_calories, snapshot.daily_goal
    ))
    .xy(center + vec2(0.0, -24.0))
    .color(colors::TEXT_SECONDARY)
    .font_size(11)
    .w(rect.w());

    // Progress bar: track, then the filled part anchored at the left
    let track = Rect::from_x_y_w_h(center.x, center.y - 48.0, rect.w(), BAR_HEIGHT);
    draw.rect()
        .xy(track.xy())
        .wh(track.wh())
        .color(colors::TRACK);

    let fill_width = bar_fill_width(snapshot.percentage, track.w());
    if fill_width > 0.0 {
        draw.rect()
            .x_y(track.left() + fill_width / 2.0, track.y())
            .w_h(fill_width, BAR_HEIGHT)
            .color(accent);
    }

    if snapshot.stale {
        draw.text("New day")
            .xy(center + vec2(0.0, -68.0))
            .color(colors::TEXT_SECONDARY)
            .font_size(10)
            .w(rect.w());
    }
}

/// Draw the error banner when the state file can't be read
pub fn draw_error_banner(draw: &Draw, message: &str, rect: Rect) {
    let banner_height = 28.0;
    let banner_rect = Rect::from_x_y_w_h(
        rect.x(),
        rect.top() - banner_height / 2.0,
        rect.w(),
        banner_height,
    );

    draw.rect()
        .xy(banner_rect.xy())
        .wh(banner_rect.wh())
        .color(srgb(80u8, 20u8, 20u8));

    draw.text(message)
        .xy(banner_rect.xy())
        .color(colors::TEXT_PRIMARY)
        .font_size(11)
        .w(banner_rect.w() - 12.0);
}
