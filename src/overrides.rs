//! Session-mutable view overrides, keyed by table name.
//!
//! Each slice is independently addressable. Entries for tables that no longer
//! exist are kept and simply never looked up.

use crate::geometry::{Point, ScaleBounds};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stacking values above this are renumbered; they stay exact as JS numbers.
pub const Z_LIMIT: i64 = 1 << 53;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Overrides {
    pub positions: BTreeMap<String, Point>,
    pub scales: BTreeMap<String, f64>,
    pub z_indexes: BTreeMap<String, i64>,
    pub z_counter: i64,
    pub verbose_tables: BTreeSet<String>,
}

impl Overrides {
    pub fn position(&self, table: &str) -> Option<Point> {
        self.positions.get(table).copied()
    }

    pub fn set_position(&mut self, table: &str, position: Point) {
        self.positions.insert(table.to_string(), position);
    }

    /// Merge into the position slice; tables not in `positions` are untouched.
    pub fn set_positions(&mut self, positions: BTreeMap<String, Point>) {
        self.positions.extend(positions);
    }

    /// Effective scale, 1 when unset or not a usable number.
    pub fn scale(&self, table: &str) -> f64 {
        match self.scales.get(table) {
            Some(&s) if s.is_finite() && s > 0.0 => s,
            _ => 1.0,
        }
    }

    /// Store a clamped scale and return it.
    pub fn set_scale(&mut self, table: &str, scale: f64, bounds: ScaleBounds) -> f64 {
        let clamped = bounds.clamp(scale);
        self.scales.insert(table.to_string(), clamped);
        clamped
    }

    pub fn z_index(&self, table: &str) -> i64 {
        self.z_indexes.get(table).copied().unwrap_or(0)
    }

    /// Give `table` the next z value. Returns the assigned value.
    pub fn bring_to_front(&mut self, table: &str) -> i64 {
        if self.z_counter >= Z_LIMIT {
            self.compact_z_order();
        }
        let next = self.z_counter.max(0) + 1;
        self.z_indexes.insert(table.to_string(), next);
        self.z_counter = next;
        next
    }

    /// Renumber stacking to `1..=n` in the current order, ties by name.
    pub fn compact_z_order(&mut self) {
        let mut order: Vec<(i64, String)> = std::mem::take(&mut self.z_indexes)
            .into_iter()
            .map(|(name, z)| (z, name))
            .collect();
        order.sort();
        self.z_indexes = order
            .into_iter()
            .zip(1..)
            .map(|((_, name), z)| (name, z))
            .collect();
        self.z_counter = self.z_indexes.len() as i64;
    }

    pub fn is_verbose(&self, table: &str) -> bool {
        self.verbose_tables.contains(table)
    }

    /// Flip the verbose flag, returning the new state.
    pub fn toggle_verbose(&mut self, table: &str) -> bool {
        if self.verbose_tables.remove(table) {
            false
        } else {
            self.verbose_tables.insert(table.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bring_to_front_monotonic() {
        let mut o = Overrides::default();
        assert_eq!(o.bring_to_front("a"), 1);
        assert_eq!(o.bring_to_front("b"), 2);
        assert_eq!(o.bring_to_front("a"), 3);
        assert!(o.z_index("a") > o.z_index("b"));
        assert_eq!(o.z_index("never"), 0);
        assert_eq!(o.z_counter, 3);
    }

    #[test]
    fn test_counter_at_limit_renumbers() {
        let mut o = Overrides {
            z_indexes: BTreeMap::from([("a".to_string(), i64::MAX), ("b".to_string(), 7)]),
            z_counter: i64::MAX,
            ..Overrides::default()
        };
        assert_eq!(o.bring_to_front("c"), 3);
        assert_eq!(o.z_index("b"), 1);
        assert_eq!(o.z_index("a"), 2);
        assert_eq!(o.bring_to_front("b"), 4);
    }

    #[test]
    fn test_scale_clamped_and_defaulted() {
        let mut o = Overrides::default();
        let bounds = ScaleBounds::new(0.5, 2.5);
        assert_eq!(o.scale("a"), 1.0);
        assert_eq!(o.set_scale("a", 9.0, bounds), 2.5);
        assert_eq!(o.scale("a"), 2.5);
        o.scales.insert("b".into(), f64::NAN);
        assert_eq!(o.scale("b"), 1.0);
    }

    #[test]
    fn test_set_positions_merges() {
        let mut o = Overrides::default();
        o.set_position("a", Point::new(1.0, 2.0));
        o.set_positions(BTreeMap::from([("b".to_string(), Point::new(3.0, 4.0))]));
        assert_eq!(o.position("a"), Some(Point::new(1.0, 2.0)));
        assert_eq!(o.position("b"), Some(Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_toggle_verbose() {
        let mut o = Overrides::default();
        assert!(o.toggle_verbose("a"));
        assert!(o.is_verbose("a"));
        assert!(!o.toggle_verbose("a"));
        assert!(!o.is_verbose("a"));
    }
}
