//! Per-table manipulation: drag, independent zoom and stacking.
//!
//! One manipulation mode at a time per table: while a table is being dragged,
//! wheel and pinch zoom aimed at it are ignored.

use crate::config::NodeConfig;
use crate::geometry::Point;
use crate::input::PointerId;
use crate::overrides::Overrides;
use std::collections::BTreeMap;
use tracing::debug;

const MIN_PINCH_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
enum NodeSession {
    Dragging {
        pointer: PointerId,
        table: String,
        pointer_start: Point,
        node_start: Point,
        /// Set once the pointer moved past the drag threshold.
        dragged: bool,
    },
    Pinching {
        table: String,
        pointers: [(PointerId, Point); 2],
        initial_distance: f64,
        initial_scale: f64,
    },
}

/// How a node session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRelease {
    /// Pressed and released without dragging.
    Clicked { table: String, position: Point },
    /// Dragged to a new layout position.
    Dropped { table: String, position: Point },
    PinchEnded { table: String },
}

#[derive(Debug, Clone)]
pub struct NodeController {
    config: NodeConfig,
    session: Option<NodeSession>,
    /// Last non-1 scale per table, restored by the zoom toggle.
    zoom_memory: BTreeMap<String, f64>,
}

impl NodeController {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            session: None,
            zoom_memory: BTreeMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Table being dragged (past the threshold or not).
    pub fn dragging_table(&self) -> Option<&str> {
        match &self.session {
            Some(NodeSession::Dragging { table, .. }) => Some(table),
            _ => None,
        }
    }

    pub fn is_dragging(&self, table: &str) -> bool {
        match &self.session {
            Some(NodeSession::Dragging { table: t, dragged, .. }) => *dragged && t == table,
            _ => false,
        }
    }

    /// Whether `pointer` drives the current session.
    pub fn owns(&self, pointer: PointerId) -> bool {
        match &self.session {
            Some(NodeSession::Dragging { pointer: p, .. }) => *p == pointer,
            Some(NodeSession::Pinching { pointers, .. }) => pointers.iter().any(|(id, _)| *id == pointer),
            None => false,
        }
    }

    /// Press on a table: raise it and start a drag session from `node_start`.
    pub fn press(&mut self, table: &str, pointer: PointerId, position: Point, node_start: Point, overrides: &mut Overrides) -> i64 {
        let z = overrides.bring_to_front(table);
        debug!(table, ?pointer, z, "node press");
        self.session = Some(NodeSession::Dragging {
            pointer,
            table: table.to_string(),
            pointer_start: position,
            node_start,
            dragged: false,
        });
        z
    }

    /// Second touch on the table under an undragged press turns it into a
    /// pinch. Returns false when the touch is not taken.
    pub fn second_press(&mut self, table: &str, pointer: PointerId, position: Point, overrides: &Overrides) -> bool {
        let Some(NodeSession::Dragging {
            pointer: first,
            table: t,
            pointer_start,
            dragged,
            ..
        }) = &self.session
        else {
            return false;
        };
        if *dragged || t != table || *first == pointer {
            return false;
        }
        let first = (*first, *pointer_start);
        debug!(table, "node pinch started");
        self.session = Some(NodeSession::Pinching {
            table: table.to_string(),
            pointers: [first, (pointer, position)],
            initial_distance: first.1.distance(position),
            initial_scale: overrides.scale(table),
        });
        true
    }

    /// Apply a move in view space. `canvas_scale` converts the drag delta
    /// into layout space so the table tracks the pointer 1:1.
    pub fn pointer_move(&mut self, pointer: PointerId, position: Point, canvas_scale: f64, overrides: &mut Overrides) -> bool {
        let threshold = self.config.drag_threshold;
        let bounds = self.config.bounds();
        match &mut self.session {
            Some(NodeSession::Dragging {
                pointer: p,
                table,
                pointer_start,
                node_start,
                dragged,
            }) if *p == pointer => {
                if !*dragged && position.distance(*pointer_start) < threshold {
                    return false;
                }
                *dragged = true;
                let scale = if canvas_scale > 0.0 { canvas_scale } else { 1.0 };
                let delta = (position - *pointer_start).scale(1.0 / scale);
                overrides.set_position(table, *node_start + delta);
                true
            }
            Some(NodeSession::Pinching {
                table,
                pointers,
                initial_distance,
                initial_scale,
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
                let before = overrides.scale(table);
                overrides.set_scale(table, *initial_scale * ratio, bounds) != before
            }
            _ => false,
        }
    }

    /// End the session if `pointer` belongs to it.
    pub fn pointer_up(&mut self, pointer: PointerId, overrides: &Overrides) -> Option<NodeRelease> {
        let release = match &self.session {
            Some(NodeSession::Dragging {
                pointer: p,
                table,
                pointer_start,
                dragged,
                ..
            }) if *p == pointer => {
                if *dragged {
                    NodeRelease::Dropped {
                        table: table.clone(),
                        position: overrides.position(table).unwrap_or_default(),
                    }
                } else {
                    NodeRelease::Clicked {
                        table: table.clone(),
                        position: *pointer_start,
                    }
                }
            }
            Some(NodeSession::Pinching { table, pointers, .. }) if pointers.iter().any(|(id, _)| *id == pointer) => {
                NodeRelease::PinchEnded { table: table.clone() }
            }
            _ => return None,
        };
        debug!(?pointer, ?release, "node session ended");
        self.session = None;
        Some(release)
    }

    /// Abort the session; whatever was applied last stays.
    pub fn cancel(&mut self) -> Option<String> {
        let table = match self.session.take()? {
            NodeSession::Dragging { table, .. } | NodeSession::Pinching { table, .. } => table,
        };
        debug!(table = %table, "node session cancelled");
        Some(table)
    }

    /// Wheel over a table scales only that table. Returns the new scale, or
    /// `None` when ignored because the table is being dragged.
    pub fn wheel(&mut self, table: &str, delta_y: f64, overrides: &mut Overrides) -> Option<f64> {
        if self.is_dragging(table) || delta_y == 0.0 || delta_y.is_nan() {
            return None;
        }
        let factor = if delta_y < 0.0 {
            self.config.wheel_step
        } else {
            1.0 / self.config.wheel_step
        };
        let next = overrides.scale(table) * factor;
        Some(overrides.set_scale(table, next, self.config.bounds()))
    }

    /// Double-tap zoom toggle: 1x goes to the remembered zoom (or the
    /// configured default), anything else goes back to 1x.
    pub fn toggle_zoom(&mut self, table: &str, overrides: &mut Overrides) -> f64 {
        let current = overrides.scale(table);
        let target = if (current - 1.0).abs() < 1e-9 {
            self.zoom_memory
                .get(table)
                .copied()
                .unwrap_or(self.config.toggle_scale)
        } else {
            self.zoom_memory.insert(table.to_string(), current);
            1.0
        };
        overrides.set_scale(table, target, self.config.bounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> NodeController {
        NodeController::new(NodeConfig::default())
    }

    #[test]
    fn test_drag_divides_by_canvas_scale() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("posts", PointerId(1), Point::new(100.0, 100.0), Point::new(360.0, 0.0), &mut o);
        assert!(n.pointer_move(PointerId(1), Point::new(200.0, 60.0), 2.0, &mut o));
        assert_eq!(o.position("posts"), Some(Point::new(410.0, -20.0)));
        assert_eq!(
            n.pointer_up(PointerId(1), &o),
            Some(NodeRelease::Dropped {
                table: "posts".into(),
                position: Point::new(410.0, -20.0)
            })
        );
    }

    #[test]
    fn test_small_move_is_click() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("posts", PointerId(1), Point::new(10.0, 10.0), Point::new(0.0, 0.0), &mut o);
        assert!(!n.pointer_move(PointerId(1), Point::new(12.0, 11.0), 1.0, &mut o));
        assert_eq!(o.position("posts"), None);
        assert!(matches!(n.pointer_up(PointerId(1), &o), Some(NodeRelease::Clicked { .. })));
    }

    #[test]
    fn test_press_brings_to_front() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("a", PointerId(1), Point::default(), Point::default(), &mut o);
        n.pointer_up(PointerId(1), &o);
        n.press("b", PointerId(1), Point::default(), Point::default(), &mut o);
        assert!(o.z_index("b") > o.z_index("a"));
    }

    #[test]
    fn test_wheel_ignored_while_dragging() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("a", PointerId(1), Point::new(0.0, 0.0), Point::new(0.0, 0.0), &mut o);
        n.pointer_move(PointerId(1), Point::new(50.0, 0.0), 1.0, &mut o);
        assert_eq!(n.wheel("a", -1.0, &mut o), None);
        assert!(n.wheel("b", -1.0, &mut o).is_some());
        n.pointer_up(PointerId(1), &o);
        assert!((n.wheel("a", -1.0, &mut o).unwrap() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_clamped() {
        let mut n = controller();
        let mut o = Overrides::default();
        for _ in 0..50 {
            n.wheel("a", -1.0, &mut o);
        }
        assert_eq!(o.scale("a"), 2.5);
    }

    #[test]
    fn test_pinch_on_same_node() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("a", PointerId(1), Point::new(0.0, 0.0), Point::new(0.0, 0.0), &mut o);
        assert!(!n.second_press("b", PointerId(2), Point::new(100.0, 0.0), &o));
        assert!(n.second_press("a", PointerId(2), Point::new(100.0, 0.0), &o));
        n.pointer_move(PointerId(2), Point::new(200.0, 0.0), 1.0, &mut o);
        assert_eq!(o.scale("a"), 2.0);
        assert_eq!(n.pointer_up(PointerId(1), &o), Some(NodeRelease::PinchEnded { table: "a".into() }));
    }

    #[test]
    fn test_toggle_zoom_remembers() {
        let mut n = controller();
        let mut o = Overrides::default();
        assert_eq!(n.toggle_zoom("a", &mut o), 1.5);
        assert_eq!(n.toggle_zoom("a", &mut o), 1.0);
        o.set_scale("a", 2.0, NodeConfig::default().bounds());
        assert_eq!(n.toggle_zoom("a", &mut o), 1.0);
        assert_eq!(n.toggle_zoom("a", &mut o), 2.0);
    }

    #[test]
    fn test_cancel_keeps_last_position() {
        let mut n = controller();
        let mut o = Overrides::default();
        n.press("a", PointerId(1), Point::new(0.0, 0.0), Point::new(0.0, 0.0), &mut o);
        n.pointer_move(PointerId(1), Point::new(30.0, 0.0), 1.0, &mut o);
        assert_eq!(n.cancel(), Some("a".to_string()));
        assert_eq!(o.position("a"), Some(Point::new(30.0, 0.0)));
        assert!(!n.pointer_move(PointerId(1), Point::new(90.0, 0.0), 1.0, &mut o));
        assert_eq!(n.pointer_up(PointerId(1), &o), None);
    }
}
