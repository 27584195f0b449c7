//! Layout engine core implementation.

use crate::config::LayoutConfig;
use crate::geometry::{Point, Rect};
use crate::measure::TableMetrics;
use crate::overrides::Overrides;
use crate::topology::{Relationship, SchemaTopology};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::analysis::{assign_tiers, connected_components, visible_relationships, visible_tables};
use super::anchors::{Facing, choose_facing, column_anchor};
use super::placement::place_tables;
use super::routing::{calculate_lane_offset, path_data, route_across, route_same_side};
use super::types::{DiagramLayout, Hit, LayoutTable, RelationshipPath};

/// Layout engine configuration and computation.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    pub(crate) config: LayoutConfig,
    pub(crate) metrics: TableMetrics,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        let metrics = TableMetrics::from_config(&config);
        Self { config, metrics }
    }

    pub fn metrics(&self) -> &TableMetrics {
        &self.metrics
    }

    /// Compute the layout. Pure: identical inputs give identical output.
    pub fn layout(&self, topology: &SchemaTopology, hidden: &BTreeSet<String>, overrides: &Overrides) -> DiagramLayout {
        // Phase 1: visibility
        let tables = visible_tables(topology, hidden);
        let visible: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let relationships = visible_relationships(topology, &visible);

        // Phase 2: components and tiers
        let components = connected_components(&tables, &relationships);
        let mut tiers: HashMap<&str, usize> = HashMap::new();
        for members in &components {
            tiers.extend(assign_tiers(members, &relationships));
        }

        // Phase 3: sizing and default placement
        let sizes: HashMap<String, (f64, f64)> = tables
            .iter()
            .map(|t| (t.name.clone(), self.metrics.table_size(t, overrides.is_verbose(&t.name))))
            .collect();
        let placed = place_tables(&components, &tiers, &sizes, &self.config);

        // Phase 4: overrides are pure substitution
        let layout_tables: BTreeMap<String, LayoutTable> = placed
            .into_iter()
            .map(|mut t| {
                if let Some(p) = overrides.position(&t.name).filter(|p| p.x.is_finite() && p.y.is_finite()) {
                    t.x = p.x;
                    t.y = p.y;
                }
                t.scale = overrides.scale(&t.name);
                (t.name.clone(), t)
            })
            .collect();

        // Phase 5: routes, domains, view box
        let paths = self.route_relationships(topology, &relationships, &layout_tables);
        let domain_bounds = self.domain_bounds(topology, &layout_tables);
        let view_box = Rect::union_all(layout_tables.values().map(LayoutTable::bounds))
            .map(|r| r.inflate(self.config.view_margin))
            .unwrap_or_default();

        DiagramLayout {
            view_box,
            tables: layout_tables,
            paths,
            domain_bounds,
        }
    }

    fn route_relationships(
        &self,
        topology: &SchemaTopology,
        relationships: &[&Relationship],
        tables: &BTreeMap<String, LayoutTable>,
    ) -> BTreeMap<String, RelationshipPath> {
        // parallel routes between the same pair of tables get separate lanes
        let mut pair_total: HashMap<(&str, &str), usize> = HashMap::new();
        for rel in relationships {
            *pair_total.entry(table_pair(rel)).or_insert(0) += 1;
        }
        let mut pair_seen: HashMap<(&str, &str), usize> = HashMap::new();

        let mut paths = BTreeMap::new();
        for rel in relationships {
            let pair = table_pair(rel);
            let lane = {
                let seen = pair_seen.entry(pair).or_insert(0);
                *seen += 1;
                *seen - 1
            };
            let total = pair_total.get(&pair).copied().unwrap_or(1);

            let Some(path) = self.route(topology, rel, tables, lane, total) else {
                debug!(relationship = %rel.id, "relationship endpoint not laid out");
                continue;
            };
            paths.insert(rel.id.clone(), path);
        }
        paths
    }

    fn route(
        &self,
        topology: &SchemaTopology,
        rel: &Relationship,
        tables: &BTreeMap<String, LayoutTable>,
        lane: usize,
        total: usize,
    ) -> Option<RelationshipPath> {
        let from_table = tables.get(&rel.from.table)?;
        let to_table = tables.get(&rel.to.table)?;
        let (from_row, _) = topology.table(&rel.from.table)?.find_column(&rel.from.column)?;
        let (to_row, _) = topology.table(&rel.to.table)?.find_column(&rel.to.column)?;

        let facing = choose_facing(&from_table.bounds(), &to_table.bounds(), self.config.route_stub);
        let (source, target, points) = match facing {
            Facing::Across { source, target } => {
                let s = column_anchor(from_table, from_row, source, &self.metrics);
                let t = column_anchor(to_table, to_row, target, &self.metrics);
                let offset = calculate_lane_offset(lane, total, self.config.lane_spacing);
                (s, t, route_across(s, t, offset))
            }
            Facing::SameSide(side) => {
                let s = column_anchor(from_table, from_row, side, &self.metrics);
                let t = column_anchor(to_table, to_row, side, &self.metrics);
                let reach = lane as f64 * self.config.lane_spacing;
                (s, t, route_same_side(s, t, side, self.config.route_stub, reach))
            }
        };

        Some(RelationshipPath {
            id: rel.id.clone(),
            from: rel.from.clone(),
            to: rel.to.clone(),
            source,
            target,
            d: path_data(&points),
            points,
        })
    }

    /// Padded bounding box of each domain's laid-out members. A table counts
    /// only for the first domain that lists it.
    fn domain_bounds(&self, topology: &SchemaTopology, tables: &BTreeMap<String, LayoutTable>) -> BTreeMap<String, Rect> {
        let mut members: BTreeMap<&str, Vec<Rect>> = BTreeMap::new();
        for table in tables.values() {
            if let Some(domain) = topology.domain_of(&table.name) {
                members.entry(domain.name.as_str()).or_default().push(table.bounds());
            }
        }

        members
            .into_iter()
            .filter_map(|(name, rects)| {
                Rect::union_all(rects).map(|r| (name.to_string(), r.inflate(self.config.domain_padding)))
            })
            .collect()
    }

    /// Topmost table under a layout-space point. Stacking is ascending
    /// `z_index`, ties broken by name.
    pub fn hit_test<F>(&self, layout: &DiagramLayout, topology: &SchemaTopology, point: Point, z_index: F) -> Option<Hit>
    where
        F: Fn(&str) -> i64,
    {
        let table = layout
            .tables
            .values()
            .filter(|t| t.bounds().contains(point))
            .max_by(|a, b| {
                z_index(&a.name)
                    .cmp(&z_index(&b.name))
                    .then_with(|| a.name.cmp(&b.name))
            })?;

        let local = table.unproject(point);
        let column = topology.table(&table.name).and_then(|t| {
            self.metrics
                .row_at(local.y - table.y, t.columns.len())
                .map(|row| t.columns[row].name.clone())
        });

        Some(Hit {
            table: table.name.clone(),
            column,
        })
    }
}

fn table_pair(rel: &Relationship) -> (&str, &str) {
    let (a, b) = (rel.from.table.as_str(), rel.to.table.as_str());
    if a <= b { (a, b) } else { (b, a) }
}
