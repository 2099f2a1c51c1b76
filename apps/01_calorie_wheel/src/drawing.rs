//! Drawing module - wheel, notches, value window and pointer
//!
//! Geometry comes from the shared wheel model in screen coordinates (y down,
//! origin at the window center); everything here converts to nannou's y-up
//! space at the draw call.

use std::time::{Duration, Instant};

use nannou::prelude::*;
use shared::wheel::{LABEL_RATIO, NOTCH_INNER_RATIO, NOTCH_OUTER_RATIO};
use shared::{FeedbackPulse, NotchMark, Point, Rgb, WheelGeometry, WheelShading};

/// Color palette for the dark wheel theme
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
    pub const HUB_INNER: Srgb<u8> = Srgb {
        red: 44,
        green: 44,
        blue: 44,
        standard: std::marker::PhantomData,
    };
    pub const HUB_OUTER: Srgb<u8> = Srgb {
        red: 26,
        green: 26,
        blue: 26,
        standard: std::marker::PhantomData,
    };
    pub const FRAME: Srgb<u8> = Srgb {
        red: 51,
        green: 51,
        blue: 51,
        standard: std::marker::PhantomData,
    };
    pub const WINDOW_LABEL: Srgb<u8> = Srgb {
        red: 128,
        green: 128,
        blue: 128,
        standard: std::marker::PhantomData,
    };
    pub const TOAST_BG: Srgb<u8> = Srgb {
        red: 50,
        green: 50,
        blue: 50,
        standard: std::marker::PhantomData,
    };
}

/// Concentric fills used to fake a radial gradient
const GRADIENT_RINGS: usize = 48;
/// Share of the radius where the shading reaches the stop color
const BODY_STOP: f32 = 0.7;

/// A short ring flash answering a feedback pulse
#[derive(Debug, Clone, Copy)]
pub struct Flash {
    pub pulse: FeedbackPulse,
    pub started_at: Instant,
}

impl Flash {
    pub fn new(pulse: FeedbackPulse, now: Instant) -> Self {
        Self {
            pulse,
            started_at: now,
        }
    }

    fn duration(&self) -> Duration {
        match self.pulse {
            FeedbackPulse::Light => Duration::from_millis(120),
            FeedbackPulse::Strong => Duration::from_millis(220),
            FeedbackPulse::Confirm => Duration::from_millis(320),
        }
    }

    /// Remaining strength in `[0, 1]`; zero once the flash is over
    pub fn strength(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f32();
        (1.0 - elapsed / self.duration().as_secs_f32()).max(0.0)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.strength(now) <= 0.0
    }
}

/// A toast notification message
pub struct Toast {
    pub text: String,
    pub created_at: Instant,
    pub duration_secs: f32,
}

/// Screen-space (y down) position of a nannou point
pub fn to_screen(p: Point2) -> Point {
    Point::new(p.x as f64, -(p.y as f64))
}

/// nannou position of a screen-space point
pub fn to_draw(p: Point) -> Point2 {
    pt2(p.x as f32, -(p.y as f32))
}

fn nannou_rgb(c: Rgb) -> Srgb<f32> {
    srgb(c.r, c.g, c.b)
}

fn nannou_rgba(c: Rgb, alpha: f32) -> Srgba<f32> {
    srgba(c.r, c.g, c.b, alpha)
}

fn u8_rgb(c: Srgb<u8>) -> Rgb {
    Rgb::new(
        c.red as f32 / 255.0,
        c.green as f32 / 255.0,
        c.blue as f32 / 255.0,
    )
}

/// Window regions: goal header, wheel, hint line
pub struct Layout {
    pub header: Rect,
    pub wheel: WheelGeometry,
    pub hint: Rect,
}

impl Layout {
    pub fn calculate(window_rect: Rect) -> Self {
        let header_height = 70.0;
        let hint_height = 40.0;
        let padding = 24.0;

        let header = Rect::from_x_y_w_h(
            window_rect.x(),
            window_rect.top() - header_height / 2.0,
            window_rect.w(),
            header_height,
        );
        let hint = Rect::from_x_y_w_h(
            window_rect.x(),
            window_rect.bottom() + hint_height / 2.0,
            window_rect.w(),
            hint_height,
        );
        let wheel_area = Rect::from_x_y_w_h(
            window_rect.x(),
            window_rect.y() + (hint_height - header_height) / 2.0,
            (window_rect.w() - padding * 2.0).max(1.0),
            (window_rect.h() - header_height - hint_height - padding * 2.0).max(1.0),
        );

        Layout {
            header,
            wheel: WheelGeometry::fit(
                to_screen(wheel_area.xy()),
                wheel_area.w() as f64,
                wheel_area.h() as f64,
            ),
            hint,
        }
    }
}

/// Draw the "Daily Goal" header
pub fn draw_header(draw: &Draw, daily_goal: i32, rect: Rect) {
    draw.text("Daily Goal")
        .xy(rect.xy() + vec2(0.0, 12.0))
        .color(colors::TEXT_SECONDARY)
        .font_size(14)
        .w(rect.w());
    draw.text(&format!("{} cal", daily_goal))
        .xy(rect.xy() + vec2(0.0, -12.0))
        .color(colors::TEXT_PRIMARY)
        .font_size(22)
        .w(rect.w());
}

/// Draw the hint line under the wheel
pub fn draw_hint(draw: &Draw, rect: Rect) {
    draw.text("Long press wheel or press S for settings  ·  H for history")
        .xy(rect.xy())
        .color(colors::TEXT_SECONDARY)
        .font_size(12)
        .w(rect.w());
}

/// Draw the wheel body: shaded ring, dark hub and both rims
pub fn draw_wheel(draw: &Draw, geometry: &WheelGeometry, shading: &WheelShading) {
    let center = to_draw(geometry.center);
    let radius = geometry.radius as f32;
    let inner_radius = geometry.inner_radius as f32;

    // Largest first so each smaller disc paints over the previous one
    for i in (0..GRADIENT_RINGS).rev() {
        let t = (i + 1) as f32 / GRADIENT_RINGS as f32;
        let color = if t <= BODY_STOP {
            shading.center.blend(shading.body, t / BODY_STOP)
        } else {
            shading
                .body
                .blend(shading.edge, (t - BODY_STOP) / (1.0 - BODY_STOP))
        };
        draw.ellipse()
            .xy(center)
            .radius(radius * t)
            .color(nannou_rgb(color));
    }

    let hub_inner = u8_rgb(colors::HUB_INNER);
    let hub_outer = u8_rgb(colors::HUB_OUTER);
    for i in (0..GRADIENT_RINGS).rev() {
        let t = (i + 1) as f32 / GRADIENT_RINGS as f32;
        draw.ellipse()
            .xy(center)
            .radius(inner_radius * t)
            .color(nannou_rgb(hub_inner.blend(hub_outer, t)));
    }

    let rim = nannou_rgba(shading.rim, 1.0);
    draw_ring(draw, center, radius, radius * 0.02, rim);
    draw_ring(draw, center, inner_radius, radius * 0.02, rim);
}

/// Draw the notch ticks and the labels of major notches
pub fn draw_notches(draw: &Draw, geometry: &WheelGeometry, notches: &[NotchMark]) {
    let radius = geometry.radius as f32;

    for notch in notches {
        let start = to_draw(geometry.point_at(notch.screen_angle_degrees, NOTCH_INNER_RATIO));
        let end = to_draw(geometry.point_at(notch.screen_angle_degrees, NOTCH_OUTER_RATIO));
        let (weight, alpha) = if notch.is_major {
            (radius * 0.02, 1.0)
        } else {
            (radius * 0.01, 0.7)
        };

        draw.line()
            .start(start)
            .end(end)
            .weight(weight)
            .color(srgba(1.0, 1.0, 1.0, alpha));

        if notch.labeled {
            let pos = to_draw(geometry.point_at(notch.screen_angle_degrees, LABEL_RATIO));
            // Baseline tangent to the wheel, reading outward
            let rotation = -((notch.screen_angle_degrees + 90.0) as f32).to_radians();
            draw.text(&notch.calories.to_string())
                .xy(pos)
                .rotate(rotation)
                .color(srgba(1.0, 1.0, 1.0, 0.78))
                .font_size((radius * 0.08).max(8.0) as u32)
                .w(radius * 0.4);
        }
    }
}

/// Draw the value window straddling the top of the wheel
pub fn draw_value_window(draw: &Draw, geometry: &WheelGeometry, calories: i32, text_color: Rgb) {
    let radius = geometry.radius as f32;
    let window_w = radius * 0.5;
    let window_h = radius * 0.25;

    // Box spans from 0.3 window heights above the rim to 1.2 below it
    let top_center = to_draw(Point::new(geometry.center.x, geometry.center.y - geometry.radius));
    let rect = Rect::from_x_y_w_h(
        top_center.x,
        top_center.y + window_h * 0.3 - window_h * 0.75,
        window_w,
        window_h * 1.5,
    );

    draw.rect()
        .xy(rect.xy() + vec2(4.0, -4.0))
        .wh(rect.wh())
        .color(srgba(0.0, 0.0, 0.0, 0.25));
    draw.rect().xy(rect.xy()).wh(rect.wh()).color(WHITE);

    let corners = vec![
        rect.top_left(),
        rect.top_right(),
        rect.bottom_right(),
        rect.bottom_left(),
        rect.top_left(),
    ];
    draw.polyline()
        .weight(radius * 0.02)
        .color(colors::FRAME)
        .points(corners);

    let font_size = radius * 0.18;
    draw.text(&calories.to_string())
        .xy(rect.xy() + vec2(0.0, font_size * 0.15))
        .color(nannou_rgb(text_color))
        .font_size(font_size.max(10.0) as u32)
        .w(rect.w());
    draw.text("cal")
        .xy(rect.xy() + vec2(0.0, -font_size * 0.5))
        .color(colors::WINDOW_LABEL)
        .font_size((font_size * 0.35).max(8.0) as u32)
        .w(rect.w());
}

/// Draw the fixed pointer at the top of the wheel
pub fn draw_pointer(draw: &Draw, geometry: &WheelGeometry) {
    let pointer_h = geometry.radius * 0.08;
    let pointer_w = geometry.radius * 0.06;
    let cx = geometry.center.x;
    let top = geometry.center.y - geometry.radius;

    draw.tri()
        .points(
            to_draw(Point::new(cx, top + pointer_h)),
            to_draw(Point::new(cx - pointer_w / 2.0, top - 5.0)),
            to_draw(Point::new(cx + pointer_w / 2.0, top - 5.0)),
        )
        .color(colors::FRAME);
}

/// Draw the rim flash for the latest feedback pulse
pub fn draw_flash(
    draw: &Draw,
    geometry: &WheelGeometry,
    flash: &Flash,
    accent: Rgb,
    now: Instant,
    reduced_motion: bool,
) {
    let strength = flash.strength(now);
    if strength <= 0.0 {
        return;
    }

    let center = to_draw(geometry.center);
    let radius = geometry.radius as f32;
    let (color, weight) = match flash.pulse {
        FeedbackPulse::Light => (Rgb::WHITE, radius * 0.01),
        FeedbackPulse::Strong => (accent, radius * 0.025),
        FeedbackPulse::Confirm => (accent, radius * 0.04),
    };

    // Reduced motion keeps the ring on the rim instead of expanding it
    let spread = if reduced_motion {
        0.0
    } else {
        (1.0 - strength) * radius * 0.06
    };
    draw_ring(
        draw,
        center,
        radius + weight + spread,
        weight,
        nannou_rgba(color, strength * 0.8),
    );
}

/// Draw the active toast, fading out at the end
pub fn draw_toast(draw: &Draw, toast: &Toast, window_rect: Rect) {
    let toast_width = 280.0;
    let toast_height = 36.0;
    let margin = 15.0;

    let progress = toast.created_at.elapsed().as_secs_f32() / toast.duration_secs;
    let alpha = if progress > 0.8 {
        ((1.0 - progress) / 0.2).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let pos = pt2(
        window_rect.x(),
        window_rect.bottom() + toast_height / 2.0 + margin + 40.0,
    );

    draw.rect()
        .xy(pos)
        .w_h(toast_width, toast_height)
        .color(nannou_rgba(u8_rgb(colors::TOAST_BG), alpha));
    draw.text(&toast.text)
        .xy(pos)
        .color(nannou_rgba(u8_rgb(colors::TEXT_PRIMARY), alpha))
        .font_size(14)
        .w(toast_width - 20.0);
}

/// Draw the error banner when saved data could not be opened
pub fn draw_error_banner(draw: &Draw, message: &str, rect: Rect) {
    let banner_height = 40.0;
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
        .font_size(14)
        .w(banner_rect.w() - 20.0);
}

/// Draw a ring (circle outline) using line segments
fn draw_ring(draw: &Draw, center: Point2, radius: f32, weight: f32, color: Srgba<f32>) {
    let segments = 120;
    let points: Vec<Point2> = (0..=segments)
        .map(|i| {
            let angle = (i as f32 / segments as f32) * TAU;
            center + vec2(angle.cos(), angle.sin()) * radius
        })
        .collect();

    draw.polyline().weight(weight).color(color).points(points);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_round_trip() {
        let p = pt2(120.0, -45.5);
        assert_eq!(to_draw(to_screen(p)), p);
        assert_eq!(to_screen(pt2(0.0, 10.0)), Point::new(0.0, -10.0));
    }

    #[test]
    fn test_flash_fades_out() {
        let start = Instant::now();
        let flash = Flash::new(FeedbackPulse::Confirm, start);
        assert!((flash.strength(start) - 1.0).abs() < 1e-6);
        assert!(flash.strength(start + Duration::from_millis(160)) < 1.0);
        assert!(flash.is_finished(start + Duration::from_millis(320)));
    }

    #[test]
    fn test_layout_keeps_wheel_inside_window() {
        let window = Rect::from_w_h(900.0, 700.0);
        let layout = Layout::calculate(window);
        let wheel = layout.wheel;
        let top = to_draw(Point::new(wheel.center.x, wheel.center.y - wheel.radius));
        assert!(top.y < layout.header.bottom());
        assert!(wheel.radius > 0.0);
    }
}
