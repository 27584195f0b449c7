//! Canvas pan/zoom controller.
//!
//! Owns the view transform and turns pointer sessions that started over empty
//! canvas into transform updates. Scale is always clamped; translation is not.
//!
//! Sessions:
//! - `Panning`: one primary pointer; `transform = start + (pointer - pointer_start)`.
//! - `Pinching`: two touches; scale follows the distance ratio and the layout
//!   point under the initial midpoint stays under the current midpoint.
//!
//! Cancelling a session keeps the last applied transform.

use crate::config::CanvasConfig;
use crate::geometry::{Point, Rect, Size, Transform};
use crate::input::PointerId;
use tracing::debug;

/// Pinch distances below this are treated as degenerate.
const MIN_PINCH_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
enum CanvasSession {
    Panning {
        pointer: PointerId,
        pointer_start: Point,
        transform_start: Transform,
        /// Furthest the pointer got from `pointer_start`.
        travel: f64,
    },
    Pinching {
        pointers: [(PointerId, Point); 2],
        initial_distance: f64,
        initial_scale: f64,
        /// Layout point under the initial midpoint.
        anchor: Point,
    },
}

/// How a canvas session ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasRelease {
    /// A pan that barely moved; the host treats it as a tap at `position`.
    Tap { position: Point },
    Panned,
    PinchEnded,
}

#[derive(Debug, Clone)]
pub struct CanvasController {
    transform: Transform,
    config: CanvasConfig,
    session: Option<CanvasSession>,
}

impl CanvasController {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            transform: Transform::IDENTITY,
            config,
            session: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    /// Replace the transform, clamping its scale.
    pub fn set_transform(&mut self, transform: Transform) {
        let scale = self.config.bounds().clamp(transform.scale);
        let x = if transform.x.is_finite() { transform.x } else { 0.0 };
        let y = if transform.y.is_finite() { transform.y } else { 0.0 };
        self.transform = Transform::new(x, y, scale);
    }

    pub fn reset(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.session, Some(CanvasSession::Panning { .. }))
    }

    /// Pointer of the current pan, if panning.
    pub fn panning_pointer(&self) -> Option<(PointerId, Point)> {
        match &self.session {
            Some(CanvasSession::Panning {
                pointer,
                pointer_start,
                ..
            }) => Some((*pointer, *pointer_start)),
            _ => None,
        }
    }

    /// Whether `pointer` drives the current session.
    pub fn owns(&self, pointer: PointerId) -> bool {
        match &self.session {
            Some(CanvasSession::Panning { pointer: p, .. }) => *p == pointer,
            Some(CanvasSession::Pinching { pointers, .. }) => pointers.iter().any(|(id, _)| *id == pointer),
            None => false,
        }
    }

    pub fn begin_pan(&mut self, pointer: PointerId, position: Point) {
        debug!(?pointer, "canvas pan started");
        self.session = Some(CanvasSession::Panning {
            pointer,
            pointer_start: position,
            transform_start: self.transform,
            travel: 0.0,
        });
    }

    /// Start pinching with two touches, replacing any pan in progress.
    pub fn begin_pinch(&mut self, first: (PointerId, Point), second: (PointerId, Point)) {
        let midpoint = first.1.midpoint(second.1);
        debug!(first = ?first.0, second = ?second.0, "canvas pinch started");
        self.session = Some(CanvasSession::Pinching {
            pointers: [first, second],
            initial_distance: first.1.distance(second.1),
            initial_scale: self.transform.scale,
            anchor: self.transform.to_layout(midpoint),
        });
    }

    /// Apply a move. Returns true when the transform changed; moves from
    /// pointers outside the session are ignored.
    pub fn pointer_move(&mut self, pointer: PointerId, position: Point) -> bool {
        let bounds = self.config.bounds();
        match &mut self.session {
            Some(CanvasSession::Panning {
                pointer: p,
                pointer_start,
                transform_start,
                travel,
            }) if *p == pointer => {
                let delta = position - *pointer_start;
                *travel = travel.max(position.distance(*pointer_start));
                let next = Transform::new(
                    transform_start.x + delta.x,
                    transform_start.y + delta.y,
                    transform_start.scale,
                );
                let changed = next != self.transform;
                self.transform = next;
                changed
            }
            Some(CanvasSession::Pinching {
                pointers,
                initial_distance,
                initial_scale,
                anchor,
            }) => {
                let Some(slot) = pointers.iter_mut().find(|(id, _)| *id == pointer) else {
                    return false;
                };
                slot.1 = position;

                let current = pointers[0].1.distance(pointers[1].1);
                let ratio = if *initial_distance < MIN_PINCH_DISTANCE {
                    1.0
                } else {
                    current / *initial_distance
                };
                let scale = bounds.clamp(*initial_scale * ratio);
                let midpoint = pointers[0].1.midpoint(pointers[1].1);
                let next = Transform::new(midpoint.x - anchor.x * scale, midpoint.y - anchor.y * scale, scale);
                let changed = next != self.transform;
                self.transform = next;
                changed
            }
            _ => false,
        }
    }

    /// End the session if `pointer` belongs to it.
    pub fn pointer_up(&mut self, pointer: PointerId, tap_slop: f64) -> Option<CanvasRelease> {
        let release = match &self.session {
            Some(CanvasSession::Panning {
                pointer: p,
                pointer_start,
                travel,
                ..
            }) if *p == pointer => {
                if *travel <= tap_slop {
                    CanvasRelease::Tap {
                        position: *pointer_start,
                    }
                } else {
                    CanvasRelease::Panned
                }
            }
            Some(CanvasSession::Pinching { pointers, .. }) if pointers.iter().any(|(id, _)| *id == pointer) => {
                CanvasRelease::PinchEnded
            }
            _ => return None,
        };
        debug!(?pointer, ?release, "canvas session ended");
        self.session = None;
        Some(release)
    }

    /// Abort the session, keeping the transform as last applied.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("canvas session cancelled");
        }
    }

    /// Multiply the scale by `factor`, keeping `anchor` fixed.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point) -> bool {
        let scale = self.config.bounds().clamp(self.transform.scale * factor);
        let next = self.transform.zoom_about(anchor, scale);
        let changed = next != self.transform;
        self.transform = next;
        changed
    }

    /// Wheel over empty canvas: one step per event.
    pub fn wheel(&mut self, anchor: Point, delta_y: f64) -> bool {
        if delta_y == 0.0 || delta_y.is_nan() {
            return false;
        }
        let factor = if delta_y < 0.0 {
            self.config.wheel_step
        } else {
            1.0 / self.config.wheel_step
        };
        self.zoom_by(factor, anchor)
    }

    /// Transform that fits `view_box` into `viewport`, centred.
    pub fn fit_transform(&self, view_box: Rect, viewport: Size) -> Transform {
        if view_box.width <= 0.0 || view_box.height <= 0.0 || viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Transform::IDENTITY;
        }
        let pad = self.config.fit_padding;
        let avail_w = (viewport.width - pad * 2.0).max(1.0);
        let avail_h = (viewport.height - pad * 2.0).max(1.0);
        let scale = self
            .config
            .fit_bounds()
            .clamp((avail_w / view_box.width).min(avail_h / view_box.height));
        let c = view_box.center();
        Transform::new(
            viewport.width / 2.0 - c.x * scale,
            viewport.height / 2.0 - c.y * scale,
            scale,
        )
    }

    /// Pan so the layout point `target` sits at the viewport centre.
    pub fn center_on(&mut self, target: Point, viewport: Size) {
        let s = self.transform.scale;
        self.transform = Transform::new(viewport.width / 2.0 - target.x * s, viewport.height / 2.0 - target.y * s, s);
    }
}
