//! Progress colors for the wheel and the widget
//!
//! Kept free of any graphics crate so both front ends can share it; convert
//! to the renderer's color type at the draw site.

/// sRGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` literal
    pub fn from_hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        )
    }

    /// Move `amount` of the way toward `other`
    pub fn blend(self, other: Rgb, amount: f32) -> Rgb {
        let t = amount.clamp(0.0, 1.0);
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }
}

/// Green through red, indexed by how much of the goal is used
pub const GRADIENT_STOPS: [u32; 5] = [0x4CAF50, 0x8BC34A, 0xFFEB3B, 0xFF9800, 0xF44336];

pub const READOUT_GREEN: u32 = 0x4CAF50;
pub const READOUT_ORANGE: u32 = 0xFF9800;
pub const READOUT_RED: u32 = 0xF44336;

/// Gradient stop `index` as a color
pub fn gradient_stop(index: usize) -> Rgb {
    Rgb::from_hex(GRADIENT_STOPS[index.min(GRADIENT_STOPS.len() - 1)])
}

/// Index of the lower gradient stop for a progress fraction
pub fn progress_stop(progress: f32) -> usize {
    let stop = (progress * 4.0).floor();
    if stop.is_nan() || stop < 0.0 {
        0
    } else {
        (stop as usize).min(3)
    }
}

/// Radial shading of the wheel ring for one progress level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelShading {
    /// Color at the hub
    pub center: Rgb,
    /// The stop itself, reached at 70 % of the radius
    pub body: Rgb,
    /// Color at the outer edge
    pub edge: Rgb,
    /// Stroke of the inner and outer rims
    pub rim: Rgb,
}

/// Shading for a wheel whose tally is `progress` of the goal
pub fn wheel_fill(progress: f32) -> WheelShading {
    let body = gradient_stop(progress_stop(progress));
    WheelShading {
        center: body.blend(Rgb::WHITE, 0.3),
        body,
        edge: body.blend(Rgb::BLACK, 0.2),
        rim: body.blend(Rgb::BLACK, 0.3),
    }
}

/// Text color for a calorie count: green below half the goal, orange below
/// three quarters, red from there on
pub fn readout_color(calories: i32, goal: i32) -> Rgb {
    let progress = if goal > 0 {
        calories as f32 / goal as f32
    } else {
        0.0
    };
    let hex = if progress < 0.5 {
        READOUT_GREEN
    } else if progress < 0.75 {
        READOUT_ORANGE
    } else {
        READOUT_RED
    };
    Rgb::from_hex(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgb, b: Rgb) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5
    }

    #[test]
    fn test_from_hex() {
        let c = Rgb::from_hex(0xFF8000);
        assert!(close(c, Rgb::new(1.0, 128.0 / 255.0, 0.0)));
    }

    #[test]
    fn test_blend_endpoints() {
        let c = gradient_stop(2);
        assert!(close(c.blend(Rgb::WHITE, 0.0), c));
        assert!(close(c.blend(Rgb::WHITE, 1.0), Rgb::WHITE));
        assert!(close(c.blend(Rgb::WHITE, 7.0), Rgb::WHITE));
    }

    #[test]
    fn test_progress_stop_bounds() {
        assert_eq!(progress_stop(0.0), 0);
        assert_eq!(progress_stop(0.24), 0);
        assert_eq!(progress_stop(0.25), 1);
        assert_eq!(progress_stop(0.8), 3);
        assert_eq!(progress_stop(1.0), 3);
        assert_eq!(progress_stop(-1.0), 0);
        assert_eq!(progress_stop(f32::NAN), 0);
    }

    #[test]
    fn test_wheel_fill_full_goal_stays_on_orange() {
        let shading = wheel_fill(1.0);
        assert_eq!(shading.body, gradient_stop(3));
        assert!(close(shading.center, gradient_stop(3).blend(Rgb::WHITE, 0.3)));
        assert!(close(shading.edge, gradient_stop(3).blend(Rgb::BLACK, 0.2)));
    }

    #[test]
    fn test_wheel_fill_empty_is_green() {
        assert_eq!(wheel_fill(0.0).body, Rgb::from_hex(0x4CAF50));
    }

    #[test]
    fn test_readout_thresholds() {
        assert_eq!(readout_color(1199, 2400), Rgb::from_hex(READOUT_GREEN));
        assert_eq!(readout_color(1200, 2400), Rgb::from_hex(READOUT_ORANGE));
        assert_eq!(readout_color(1799, 2400), Rgb::from_hex(READOUT_ORANGE));
        assert_eq!(readout_color(1800, 2400), Rgb::from_hex(READOUT_RED));
        assert_eq!(readout_color(100, 0), Rgb::from_hex(READOUT_GREEN));
    }
}
