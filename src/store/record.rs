use crate::geometry::{Point, Transform};
use crate::overrides::{Overrides, Z_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Durable override record for one diagram. Missing fields default, unknown
/// fields are ignored, so older and newer records both load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedLayout {
    pub positions: BTreeMap<String, Point>,
    pub scales: BTreeMap<String, f64>,
    pub z_indexes: BTreeMap<String, i64>,
    pub z_counter: i64,
    pub canvas_transform: Transform,
    pub is_fullscreen: bool,
    pub verbose_tables: BTreeSet<String>,
}

impl PersistedLayout {
    /// Table-keyed slices as engine override state.
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            positions: self.positions.clone(),
            scales: self.scales.clone(),
            z_indexes: self.z_indexes.clone(),
            // a counter behind its own entries would hand out duplicate z values
            z_counter: self
                .z_indexes
                .values()
                .copied()
                .max()
                .unwrap_or(0)
                .max(self.z_counter)
                .max(0),
            verbose_tables: self.verbose_tables.clone(),
        };
        if overrides.z_counter >= Z_LIMIT {
            warn!(z_counter = overrides.z_counter, "persisted stacking out of range, renumbering");
            overrides.compact_z_order();
        }
        overrides
    }
}

/// Partial update: each `Some` field group replaces that group, the rest of
/// the record is kept. Map groups merge key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutPatch {
    pub positions: Option<BTreeMap<String, Point>>,
    pub scales: Option<BTreeMap<String, f64>>,
    pub z_order: Option<(BTreeMap<String, i64>, i64)>,
    pub canvas_transform: Option<Transform>,
    pub is_fullscreen: Option<bool>,
    pub verbose_tables: Option<BTreeSet<String>>,
}

impl LayoutPatch {
    pub fn positions(positions: BTreeMap<String, Point>) -> Self {
        Self {
            positions: Some(positions),
            ..Self::default()
        }
    }

    pub fn scales(scales: BTreeMap<String, f64>) -> Self {
        Self {
            scales: Some(scales),
            ..Self::default()
        }
    }

    pub fn z_order(z_indexes: BTreeMap<String, i64>, z_counter: i64) -> Self {
        Self {
            z_order: Some((z_indexes, z_counter)),
            ..Self::default()
        }
    }

    pub fn canvas_transform(transform: Transform) -> Self {
        Self {
            canvas_transform: Some(transform),
            ..Self::default()
        }
    }

    pub fn fullscreen(on: bool) -> Self {
        Self {
            is_fullscreen: Some(on),
            ..Self::default()
        }
    }

    pub fn verbose_tables(tables: BTreeSet<String>) -> Self {
        Self {
            verbose_tables: Some(tables),
            ..Self::default()
        }
    }

    /// Every override slice at once, as written after a gesture.
    pub fn from_overrides(overrides: &Overrides) -> Self {
        Self {
            positions: Some(overrides.positions.clone()),
            scales: Some(overrides.scales.clone()),
            z_order: Some((overrides.z_indexes.clone(), overrides.z_counter)),
            verbose_tables: Some(overrides.verbose_tables.clone()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, record: &mut PersistedLayout) {
        // JSON has no NaN or infinity
        if let Some(positions) = self.positions {
            record
                .positions
                .extend(positions.into_iter().filter(|(_, p)| p.x.is_finite() && p.y.is_finite()));
        }
        if let Some(scales) = self.scales {
            record.scales.extend(scales.into_iter().filter(|(_, s)| s.is_finite()));
        }
        if let Some((z_indexes, z_counter)) = self.z_order {
            record.z_indexes.extend(z_indexes);
            record.z_counter = record.z_counter.max(z_counter);
        }
        if let Some(transform) = self.canvas_transform.filter(|t| t.x.is_finite() && t.y.is_finite() && t.scale.is_finite()) {
            record.canvas_transform = transform;
        }
        if let Some(on) = self.is_fullscreen {
            record.is_fullscreen = on;
        }
        if let Some(tables) = self.verbose_tables {
            record.verbose_tables = tables;
        }
    }
}

/// Decode a `{ diagramId: record }` document. A document that is not a JSON
/// object loads as empty; a record that fails to decode is skipped.
pub fn decode_records(json: &str) -> BTreeMap<String, PersistedLayout> {
    let document: serde_json::Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "persisted layouts unreadable, starting empty");
            return BTreeMap::new();
        }
    };
    let serde_json::Value::Object(entries) = document else {
        warn!("persisted layouts are not a JSON object, starting empty");
        return BTreeMap::new();
    };

    entries
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<PersistedLayout>(value) {
            Ok(record) => Some((id, record)),
            Err(e) => {
                warn!(diagram = %id, error = %e, "skipping corrupt persisted layout");
                None
            }
        })
        .collect()
}
