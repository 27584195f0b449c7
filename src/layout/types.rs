//! Data structures for layout computation.

use crate::geometry::{Point, Rect};
use crate::topology::ColumnRef;
use serde::Serialize;
use std::collections::BTreeMap;

/// A positioned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTable {
    pub name: String,
    /// Top-left corner of the unscaled box.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Per-table zoom, applied around the box centre.
    pub scale: f64,
    pub tier: usize,
    pub component: usize,
}

impl LayoutTable {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Unscaled box.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Box as drawn, after the per-table scale.
    pub fn bounds(&self) -> Rect {
        self.rect().scale_about_center(self.scale)
    }

    /// Map a point from the unscaled box onto the drawn box.
    pub fn project(&self, p: Point) -> Point {
        let c = self.rect().center();
        c + (p - c).scale(self.scale)
    }

    /// Inverse of [`LayoutTable::project`].
    pub fn unproject(&self, p: Point) -> Point {
        let c = self.rect().center();
        c + (p - c).scale(1.0 / self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Where a route attaches to a table: the middle of a column row on one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub point: Point,
    pub side: Side,
}

/// Routed FK -> PK relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipPath {
    pub id: String,
    pub from: ColumnRef,
    pub to: ColumnRef,
    pub source: Anchor,
    pub target: Anchor,
    /// Polyline points (anchor, turns, anchor)
    pub points: Vec<Point>,
    /// SVG path data for `points`.
    pub d: String,
}

/// The complete layout result. Derived, never edited by hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramLayout {
    pub view_box: Rect,
    pub tables: BTreeMap<String, LayoutTable>,
    pub paths: BTreeMap<String, RelationshipPath>,
    pub domain_bounds: BTreeMap<String, Rect>,
}

impl DiagramLayout {
    pub fn position(&self, table: &str) -> Option<Point> {
        self.tables.get(table).map(LayoutTable::position)
    }

    pub fn positions(&self) -> BTreeMap<String, Point> {
        self.tables
            .iter()
            .map(|(name, t)| (name.clone(), t.position()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Result of hit-testing a layout-space point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub table: String,
    /// Column row under the point, `None` on the header or padding.
    pub column: Option<String>,
}
