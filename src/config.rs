//! Engine configuration, loadable from TOML. Every section and field is
//! optional; missing values take the defaults below.

use crate::error::ConfigError;
use crate::geometry::ScaleBounds;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub canvas: CanvasConfig,
    pub node: NodeConfig,
    pub gesture: GestureConfig,
    pub store: StoreConfig,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub table_width: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Space below the last column row.
    pub padding: f64,
    /// Horizontal gap between tiers.
    pub tier_gap: f64,
    /// Vertical gap between tables stacked in one tier.
    pub row_gap: f64,
    /// Vertical gap between connected components.
    pub component_gap: f64,
    pub view_margin: f64,
    pub domain_padding: f64,
    /// Columns of the grid that collects tables without relationships.
    pub isolated_columns: usize,
    /// Horizontal stub length for routes leaving a table edge.
    pub route_stub: f64,
    /// Spacing between parallel routes joining the same pair of tables.
    pub lane_spacing: f64,
    /// Character width used to measure verbose tables.
    pub char_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            table_width: 240.0,
            header_height: 36.0,
            row_height: 28.0,
            padding: 12.0,
            tier_gap: 120.0,
            row_gap: 48.0,
            component_gap: 96.0,
            view_margin: 40.0,
            domain_padding: 24.0,
            isolated_columns: 4,
            route_stub: 24.0,
            lane_spacing: 12.0,
            char_width: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Upper bound applied by fit-to-view so small diagrams are not blown up.
    pub fit_max_scale: f64,
    pub fit_padding: f64,
    pub wheel_step: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.25,
            max_scale: 3.0,
            fit_max_scale: 2.0,
            fit_padding: 32.0,
            wheel_step: 1.1,
        }
    }
}

impl CanvasConfig {
    pub fn bounds(&self) -> ScaleBounds {
        ScaleBounds::new(self.min_scale, self.max_scale)
    }

    pub fn fit_bounds(&self) -> ScaleBounds {
        ScaleBounds::new(self.min_scale, self.fit_max_scale.min(self.max_scale))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_step: f64,
    /// Scale a double tap switches to when the table has no remembered zoom.
    pub toggle_scale: f64,
    /// Screen-space movement below which a press counts as a click.
    pub drag_threshold: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 2.5,
            wheel_step: 1.1,
            toggle_scale: 1.5,
            drag_threshold: 4.0,
        }
    }
}

impl NodeConfig {
    pub fn bounds(&self) -> ScaleBounds {
        ScaleBounds::new(self.min_scale, self.max_scale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub double_tap_ms: f64,
    pub double_tap_slop: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_ms: 300.0,
            double_tap_slop: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub debounce_ms: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { debounce_ms: 400.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [canvas]
            max_scale = 2.0

            [layout]
            table_width = 300.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.canvas.max_scale, 2.0);
        assert_eq!(cfg.canvas.min_scale, 0.25);
        assert_eq!(cfg.layout.table_width, 300.0);
        assert_eq!(cfg.node, NodeConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(EngineConfig::from_toml_str("[canvas\nmax_scale = ").is_err());
    }

    #[test]
    fn test_fit_bounds_capped() {
        let c = CanvasConfig::default();
        assert_eq!(c.fit_bounds(), ScaleBounds::new(0.25, 2.0));
    }
}
