//! Platform-neutral input model.
//!
//! Mouse, touch and pen input is folded into one pointer-session shape keyed by
//! an opaque pointer id with down/move/up/cancel/leave phases. Positions are in
//! view (screen) space; timestamps are host milliseconds.

use crate::config::GestureConfig;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mouse" => Some(Self::Mouse),
            "touch" => Some(Self::Touch),
            "pen" => Some(Self::Pen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
    Leave,
}

impl PointerPhase {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "down" => Some(Self::Down),
            "move" => Some(Self::Move),
            "up" => Some(Self::Up),
            "cancel" => Some(Self::Cancel),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: PointerId,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    pub position: Point,
    /// 0 is the primary button; touches always report 0.
    pub button: i16,
    pub timestamp_ms: f64,
}

impl PointerEvent {
    pub fn new(id: i64, kind: PointerKind, phase: PointerPhase, position: Point, timestamp_ms: f64) -> Self {
        Self {
            id: PointerId(id),
            kind,
            phase,
            position,
            button: 0,
            timestamp_ms,
        }
    }

    pub fn mouse(phase: PointerPhase, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(1, PointerKind::Mouse, phase, Point::new(x, y), timestamp_ms)
    }

    pub fn touch(id: i64, phase: PointerPhase, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(id, PointerKind::Touch, phase, Point::new(x, y), timestamp_ms)
    }

    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    pub fn is_primary(&self) -> bool {
        self.kind == PointerKind::Touch || self.button == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Negative scrolls up, which zooms in.
    pub delta_y: f64,
    pub timestamp_ms: f64,
}

impl WheelEvent {
    pub fn new(x: f64, y: f64, delta_y: f64, timestamp_ms: f64) -> Self {
        Self {
            position: Point::new(x, y),
            delta_y,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Escape,
    Other,
}

impl Key {
    /// Map a DOM-style `key` value.
    pub fn from_key_str(s: &str) -> Self {
        match s {
            "+" | "=" => Self::ZoomIn,
            "-" | "_" => Self::ZoomOut,
            "0" => Self::ResetZoom,
            "Escape" | "Esc" => Self::Escape,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub timestamp_ms: f64,
}

/// What the host should do with the native event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ignored,
    Handled { prevent_default: bool },
}

impl Response {
    pub const HANDLED: Response = Response::Handled { prevent_default: false };
    pub const CONSUMED: Response = Response::Handled { prevent_default: true };

    pub fn is_handled(&self) -> bool {
        matches!(self, Response::Handled { .. })
    }

    pub fn prevent_default(&self) -> bool {
        matches!(self, Response::Handled { prevent_default: true })
    }
}

/// What a tap landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapTarget {
    Canvas,
    Table(String),
}

/// Detects two taps on the same target within the time and distance window.
#[derive(Debug, Default)]
pub struct TapTracker {
    last: Option<(f64, Point, TapTarget)>,
}

impl TapTracker {
    /// Record a completed tap; true when it completes a double tap. A double
    /// tap consumes both taps so a third starts over.
    pub fn register(&mut self, timestamp_ms: f64, position: Point, target: TapTarget, cfg: &GestureConfig) -> bool {
        let is_double = match &self.last {
            Some((t, p, prev)) => {
                *prev == target
                    && timestamp_ms - t <= cfg.double_tap_ms
                    && timestamp_ms >= *t
                    && p.distance(position) <= cfg.double_tap_slop
            }
            None => false,
        };

        self.last = if is_double {
            None
        } else {
            Some((timestamp_ms, position, target))
        };
        is_double
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_tap_window() {
        let cfg = GestureConfig::default();
        let mut taps = TapTracker::default();
        let p = Point::new(10.0, 10.0);
        assert!(!taps.register(0.0, p, TapTarget::Canvas, &cfg));
        assert!(taps.register(200.0, p, TapTarget::Canvas, &cfg));
        // consumed: the next tap starts a new pair
        assert!(!taps.register(300.0, p, TapTarget::Canvas, &cfg));
        assert!(!taps.register(900.0, p, TapTarget::Canvas, &cfg));
    }

    #[test]
    fn test_double_tap_needs_same_target_and_place() {
        let cfg = GestureConfig::default();
        let mut taps = TapTracker::default();
        assert!(!taps.register(0.0, Point::new(0.0, 0.0), TapTarget::Canvas, &cfg));
        assert!(!taps.register(100.0, Point::new(0.0, 0.0), TapTarget::Table("a".into()), &cfg));
        assert!(!taps.register(150.0, Point::new(50.0, 0.0), TapTarget::Table("a".into()), &cfg));
    }

    #[test]
    fn test_primary_button() {
        let e = PointerEvent::mouse(PointerPhase::Down, 0.0, 0.0, 0.0);
        assert!(e.is_primary());
        assert!(!e.with_button(2).is_primary());
        let t = PointerEvent::touch(3, PointerPhase::Down, 0.0, 0.0, 0.0).with_button(1);
        assert!(t.is_primary());
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Key::from_key_str("+"), Key::ZoomIn);
        assert_eq!(Key::from_key_str("-"), Key::ZoomOut);
        assert_eq!(Key::from_key_str("0"), Key::ResetZoom);
        assert_eq!(Key::from_key_str("Escape"), Key::Escape);
        assert_eq!(Key::from_key_str("q"), Key::Other);
    }
}
