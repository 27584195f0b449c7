//! Edge routing and path data generation.

use crate::geometry::Point;
use std::fmt::Write;

use super::types::{Anchor, Side};

/// Calculate lane offset for centered lane distribution.
#[inline]
pub fn calculate_lane_offset(lane: usize, total: usize, lane_spacing: f64) -> f64 {
    if total <= 1 {
        0.0
    } else {
        (lane as f64 - (total - 1) as f64 / 2.0) * lane_spacing
    }
}

/// Route between facing edges: out to a shared vertical at the gap midpoint,
/// across, and in.
pub fn route_across(source: Anchor, target: Anchor, lane_offset: f64) -> Vec<Point> {
    let (s, t) = (source.point, target.point);
    if (s.y - t.y).abs() < f64::EPSILON {
        return vec![s, t];
    }
    let mid_x = (s.x + t.x) / 2.0 + lane_offset;
    vec![s, Point::new(mid_x, s.y), Point::new(mid_x, t.y), t]
}

/// Route for boxes that overlap horizontally (including self references):
/// loop out past the outermost edge on one side and come back.
pub fn route_same_side(source: Anchor, target: Anchor, side: Side, stub: f64, extra_reach: f64) -> Vec<Point> {
    let (s, t) = (source.point, target.point);
    let reach = stub + extra_reach;
    let outer_x = match side {
        Side::Right => s.x.max(t.x) + reach,
        Side::Left => s.x.min(t.x) - reach,
    };
    vec![s, Point::new(outer_x, s.y), Point::new(outer_x, t.y), t]
}

/// SVG path data: `M x y L x y ...` with one decimal.
pub fn path_data(points: &[Point]) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            d.push(' ');
        }
        // writing into a String cannot fail
        let _ = write!(d, "{} {:.1} {:.1}", cmd, p.x, p.y);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: f64, y: f64, side: Side) -> Anchor {
        Anchor {
            point: Point::new(x, y),
            side,
        }
    }

    #[test]
    fn test_lane_offsets_centered() {
        assert_eq!(calculate_lane_offset(0, 1, 12.0), 0.0);
        assert_eq!(calculate_lane_offset(0, 3, 12.0), -12.0);
        assert_eq!(calculate_lane_offset(2, 3, 12.0), 12.0);
    }

    #[test]
    fn test_route_across_three_segments() {
        let pts = route_across(anchor(100.0, 10.0, Side::Right), anchor(300.0, 50.0, Side::Left), 0.0);
        assert_eq!(
            pts,
            vec![
                Point::new(100.0, 10.0),
                Point::new(200.0, 10.0),
                Point::new(200.0, 50.0),
                Point::new(300.0, 50.0)
            ]
        );
    }

    #[test]
    fn test_route_across_straight() {
        let pts = route_across(anchor(100.0, 10.0, Side::Right), anchor(300.0, 10.0, Side::Left), 0.0);
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn test_route_same_side_goes_outside() {
        let pts = route_same_side(
            anchor(240.0, 10.0, Side::Right),
            anchor(250.0, 200.0, Side::Right),
            Side::Right,
            24.0,
            0.0,
        );
        assert_eq!(pts[1].x, 274.0);
        assert_eq!(pts[2].x, 274.0);
    }

    #[test]
    fn test_path_data() {
        let d = path_data(&[Point::new(0.0, 0.0), Point::new(10.26, 5.0)]);
        assert_eq!(d, "M 0.0 0.0 L 10.3 5.0");
    }
}
