//! Column anchor calculation for relationship routes.

use crate::geometry::{Point, Rect};
use crate::measure::TableMetrics;

use super::types::{Anchor, LayoutTable, Side};

/// How a route leaves the FK table and enters the PK table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Tables are horizontally apart; the route crosses the gap between them.
    Across { source: Side, target: Side },
    /// Boxes overlap horizontally; the route loops out on one shared side.
    SameSide(Side),
}

/// Pick anchor sides from the drawn boxes.
pub fn choose_facing(from: &Rect, to: &Rect, stub: f64) -> Facing {
    if from.right() + stub <= to.x {
        Facing::Across {
            source: Side::Right,
            target: Side::Left,
        }
    } else if to.right() + stub <= from.x {
        Facing::Across {
            source: Side::Left,
            target: Side::Right,
        }
    } else if (from.right() - to.right()).abs() <= (from.x - to.x).abs() {
        Facing::SameSide(Side::Right)
    } else {
        Facing::SameSide(Side::Left)
    }
}

/// Anchor at the vertical middle of row `row_index` on the given edge of the
/// drawn (scaled) table box.
pub fn column_anchor(table: &LayoutTable, row_index: usize, side: Side, metrics: &TableMetrics) -> Anchor {
    let unscaled_y = table.y + metrics.row_center_offset(row_index);
    let projected = table.project(Point::new(table.x, unscaled_y));
    let bounds = table.bounds();
    let x = match side {
        Side::Left => bounds.x,
        Side::Right => bounds.right(),
    };
    Anchor {
        point: Point::new(x, projected.y),
        side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(x: f64, y: f64, scale: f64) -> LayoutTable {
        LayoutTable {
            name: "t".into(),
            x,
            y,
            width: 240.0,
            height: 36.0 + 2.0 * 28.0 + 12.0,
            scale,
            tier: 0,
            component: 0,
        }
    }

    #[test]
    fn test_facing_across() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(300.0, 0.0, 100.0, 50.0);
        assert_eq!(
            choose_facing(&b, &a, 24.0),
            Facing::Across {
                source: Side::Left,
                target: Side::Right
            }
        );
        assert_eq!(
            choose_facing(&a, &b, 24.0),
            Facing::Across {
                source: Side::Right,
                target: Side::Left
            }
        );
    }

    #[test]
    fn test_facing_stacked_uses_nearer_edge() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(10.0, 200.0, 100.0, 50.0);
        assert_eq!(choose_facing(&a, &b, 24.0), Facing::SameSide(Side::Right));
        let wide = Rect::new(0.0, 200.0, 300.0, 50.0);
        assert_eq!(choose_facing(&a, &wide, 24.0), Facing::SameSide(Side::Left));
    }

    #[test]
    fn test_anchor_row_midpoint() {
        let m = TableMetrics::default();
        let t = table(10.0, 20.0, 1.0);
        let a = column_anchor(&t, 1, Side::Right, &m);
        assert_eq!(a.point, Point::new(250.0, 20.0 + 36.0 + 28.0 + 14.0));
    }

    #[test]
    fn test_anchor_follows_scale() {
        let m = TableMetrics::default();
        let t = table(0.0, 0.0, 2.0);
        let a = column_anchor(&t, 0, Side::Left, &m);
        assert_eq!(a.point.x, t.bounds().x);
        let c = t.rect().center();
        let unscaled = 36.0 + 14.0;
        assert_eq!(a.point.y, c.y + (unscaled - c.y) * 2.0);
    }
}
