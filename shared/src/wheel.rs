//! Wheel controller - turns a drag around the dial into calorie notches
//!
//! All angles are in degrees in screen convention: x grows right, y grows
//! down, so a positive angle delta is a clockwise drag. The controller keeps
//! the accumulated rotation unwrapped and only normalizes it when mapping to a
//! notch.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::storage::KeyValueStore;
use crate::store::CalorieStore;
use crate::time_engine::Clock;

/// Notches whose value is a multiple of this are major: thicker and labeled
pub const MAJOR_NOTCH_CALORIES: i32 = 500;
/// Labels are drawn only when the wheel has at most this many notches
pub const LABEL_NOTCH_LIMIT: usize = 100;
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(500);
/// Pointer travel (px) that turns a press into a drag and cancels long press
pub const LONG_PRESS_SLOP: f64 = 10.0;

/// Absorbs float error when a snapped rotation lands exactly on a notch
const NOTCH_EPSILON: f64 = 1e-9;

/// Wheel radius as a share of half the smaller view side
const RADIUS_FILL: f64 = 0.85;
const INNER_RADIUS_RATIO: f64 = 0.55;
pub const NOTCH_INNER_RATIO: f64 = 0.88;
pub const NOTCH_OUTER_RATIO: f64 = 0.98;
pub const LABEL_RATIO: f64 = 0.75;

/// A position in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Feedback intensity for a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPulse {
    /// Crossed a minor notch
    Light,
    /// Crossed a major notch
    Strong,
    /// Gesture released and snapped
    Confirm,
}

/// Notifications produced by the controller, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelEvent {
    ValueChanged(i32),
    Feedback(FeedbackPulse),
    LongPress,
}

/// Rotation state of the dial
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelState {
    /// Accumulated rotation, never wrapped
    pub rotation_degrees: f64,
    pub previous_pointer_angle: f64,
    /// Notch the last tick fired for; `None` until the first derivation
    pub last_notch_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GesturePhase {
    Idle,
    Dragging {
        origin: Point,
        pressed_at: Instant,
        beyond_slop: bool,
        long_press_fired: bool,
    },
}

/// Notch the wheel was last pointed at from the store, with the exact value
/// it stands for. A tally at the goal or off the increment grid has no notch
/// of its own, so it is held until the gesture leaves that notch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SyncedNotch {
    index: usize,
    calories: i32,
}

/// Screen placement of the dial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    pub center: Point,
    pub radius: f64,
    pub inner_radius: f64,
}

impl WheelGeometry {
    /// Largest wheel that fits a `width` x `height` view centered on `center`
    pub fn fit(center: Point, width: f64, height: f64) -> Self {
        let radius = width.min(height) / 2.0 * RADIUS_FILL;
        Self {
            center,
            radius,
            inner_radius: radius * INNER_RADIUS_RATIO,
        }
    }

    /// Point at `angle_degrees` (screen convention) and `ratio` of the radius
    pub fn point_at(&self, angle_degrees: f64, ratio: f64) -> Point {
        let rad = angle_degrees.to_radians();
        let r = self.radius * ratio;
        Point::new(self.center.x + r * rad.cos(), self.center.y + r * rad.sin())
    }

    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius
    }
}

/// One notch as the renderer needs it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotchMark {
    pub index: usize,
    pub calories: i32,
    /// Screen angle; index 0 sits at the top (-90°) when rotation is zero
    pub screen_angle_degrees: f64,
    pub is_major: bool,
    pub labeled: bool,
}

/// Angle of `p` around `center`, in `(-180, 180]`
pub fn pointer_angle(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

/// Fold a raw angle delta onto the shortest path, so crossing the ±180° seam
/// does not spin the wheel a full turn
pub fn wrap_delta(delta: f64) -> f64 {
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Rotation folded into `[0, 360)`
pub fn normalize_rotation(rotation: f64) -> f64 {
    ((rotation % 360.0) + 360.0) % 360.0
}

pub fn angle_per_notch(notch_count: usize) -> f64 {
    debug_assert!(notch_count >= 1, "wheel needs at least one notch");
    360.0 / notch_count as f64
}

/// Notch under the pointer for a given rotation.
///
/// Value grows against the rotation angle, hence `360 - rotation`.
pub fn notch_index_for_rotation(rotation: f64, notch_count: usize) -> usize {
    let per_notch = angle_per_notch(notch_count);
    let normalized = normalize_rotation(rotation);
    let index = ((360.0 - normalized) / per_notch + NOTCH_EPSILON).floor() as usize;
    index % notch_count
}

/// Rotation of the notch boundary nearest to `rotation`, in `[0, 360)`
pub fn snap_rotation(rotation: f64, notch_count: usize) -> f64 {
    let per_notch = angle_per_notch(notch_count);
    let normalized = normalize_rotation(rotation);
    let index = (normalized / per_notch).round() as usize % notch_count;
    index as f64 * per_notch
}

/// Gesture controller for the calorie dial
#[derive(Debug, Clone)]
pub struct WheelController {
    center: Point,
    state: WheelState,
    phase: GesturePhase,
    synced: Option<SyncedNotch>,
}

impl WheelController {
    /// A controller whose rotation matches the store's current calories
    pub fn new<S: KeyValueStore, C: Clock>(center: Point, store: &CalorieStore<S, C>) -> Self {
        let mut controller = Self {
            center,
            state: WheelState::default(),
            phase: GesturePhase::Idle,
            synced: None,
        };
        controller.sync_rotation_from_store(store);
        controller
    }

    pub fn state(&self) -> WheelState {
        self.state
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.state.rotation_degrees
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, GesturePhase::Dragging { .. })
    }

    /// Move the pivot, e.g. after the view was resized
    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    /// Start a gesture. Records where the pointer is; the value does not change.
    pub fn pointer_down(&mut self, p: Point, now: Instant) {
        self.state.previous_pointer_angle = pointer_angle(self.center, p);
        self.phase = GesturePhase::Dragging {
            origin: p,
            pressed_at: now,
            beyond_slop: false,
            long_press_fired: false,
        };
    }

    /// Follow the pointer. Ignored when no gesture is active.
    pub fn pointer_move<S: KeyValueStore, C: Clock>(
        &mut self,
        p: Point,
        store: &mut CalorieStore<S, C>,
    ) -> Vec<WheelEvent> {
        let GesturePhase::Dragging {
            origin,
            beyond_slop,
            ..
        } = &mut self.phase
        else {
            return Vec::new();
        };
        if origin.distance(p) > LONG_PRESS_SLOP {
            *beyond_slop = true;
        }

        let current = pointer_angle(self.center, p);
        let delta = wrap_delta(current - self.state.previous_pointer_angle);
        self.state.rotation_degrees += delta;
        self.state.previous_pointer_angle = current;
        trace!(delta, rotation = self.state.rotation_degrees, "wheel dragged");

        let mut events = Vec::new();
        self.update_value_from_rotation(store, &mut events);
        events
    }

    /// Finish a gesture: snap to the nearest notch and confirm
    pub fn pointer_up<S: KeyValueStore, C: Clock>(
        &mut self,
        store: &mut CalorieStore<S, C>,
    ) -> Vec<WheelEvent> {
        if !self.is_dragging() {
            return Vec::new();
        }
        self.phase = GesturePhase::Idle;

        self.state.rotation_degrees = snap_rotation(self.state.rotation_degrees, store.notch_count());

        let mut events = Vec::new();
        self.update_value_from_rotation(store, &mut events);
        events.push(WheelEvent::Feedback(FeedbackPulse::Confirm));
        debug!(calories = store.current_calories(), "wheel released");
        events
    }

    /// A cancelled gesture settles exactly like a released one
    pub fn pointer_cancel<S: KeyValueStore, C: Clock>(
        &mut self,
        store: &mut CalorieStore<S, C>,
    ) -> Vec<WheelEvent> {
        self.pointer_up(store)
    }

    /// Fires `LongPress` once per gesture when the pointer has been held
    /// still for [`LONG_PRESS_DURATION`]
    pub fn poll_long_press(&mut self, now: Instant) -> Option<WheelEvent> {
        if let GesturePhase::Dragging {
            pressed_at,
            beyond_slop: false,
            long_press_fired,
            ..
        } = &mut self.phase
        {
            if !*long_press_fired && now.saturating_duration_since(*pressed_at) >= LONG_PRESS_DURATION {
                *long_press_fired = true;
                return Some(WheelEvent::LongPress);
            }
        }
        None
    }

    /// Point the wheel at the store's current value without writing anything.
    ///
    /// Call after the store changed outside a gesture (rollover, settings).
    pub fn sync_rotation_from_store<S: KeyValueStore, C: Clock>(&mut self, store: &CalorieStore<S, C>) {
        let count = store.notch_count();
        let calories = store.current_calories();
        let index = (calories / store.increment()).max(0) as usize;
        self.state.rotation_degrees = 360.0 - index as f64 * angle_per_notch(count);

        // A full turn (calories at the goal) lands back on notch 0
        let index = index % count;
        self.state.last_notch_index = Some(index);
        self.synced = Some(SyncedNotch { index, calories });
    }

    /// Set a value programmatically, snapped to the increment grid
    pub fn set_calories<S: KeyValueStore, C: Clock>(
        &mut self,
        store: &mut CalorieStore<S, C>,
        calories: i32,
    ) {
        store.set_current_calories(store.snap_to_increment(calories));
        self.sync_rotation_from_store(store);
    }

    /// Every notch with its current screen angle
    pub fn notch_marks<S: KeyValueStore, C: Clock>(&self, store: &CalorieStore<S, C>) -> Vec<NotchMark> {
        let count = store.notch_count();
        let per_notch = angle_per_notch(count);
        (0..count)
            .map(|index| {
                let calories = index as i32 * store.increment();
                let is_major = calories % MAJOR_NOTCH_CALORIES == 0;
                NotchMark {
                    index,
                    calories,
                    screen_angle_degrees: index as f64 * per_notch + self.state.rotation_degrees - 90.0,
                    is_major,
                    labeled: is_major && count <= LABEL_NOTCH_LIMIT,
                }
            })
            .collect()
    }

    fn update_value_from_rotation<S: KeyValueStore, C: Clock>(
        &mut self,
        store: &mut CalorieStore<S, C>,
        events: &mut Vec<WheelEvent>,
    ) {
        let index = notch_index_for_rotation(self.state.rotation_degrees, store.notch_count());
        let calories = match self.synced {
            Some(synced) if synced.index == index => synced.calories,
            _ => {
                self.synced = None;
                index as i32 * store.increment()
            }
        };

        if self.state.last_notch_index != Some(index) {
            let pulse = if calories % MAJOR_NOTCH_CALORIES == 0 {
                FeedbackPulse::Strong
            } else {
                FeedbackPulse::Light
            };
            debug!(index, calories, ?pulse, "notch crossed");
            events.push(WheelEvent::Feedback(pulse));
            self.state.last_notch_index = Some(index);
        }

        if calories != store.current_calories() {
            store.set_current_calories(calories);
            events.push(WheelEvent::ValueChanged(store.current_calories()));
        }
    }
}
