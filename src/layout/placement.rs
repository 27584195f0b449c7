//! Default table placement: tiers left-to-right per component, components
//! stacked top-to-bottom, isolated tables collected into a trailing grid.

use crate::config::LayoutConfig;
use std::collections::HashMap;

use super::types::LayoutTable;

/// Place every member of every component. `sizes` maps table -> unscaled (w, h).
pub fn place_tables(
    components: &[Vec<&str>],
    tiers: &HashMap<&str, usize>,
    sizes: &HashMap<String, (f64, f64)>,
    cfg: &LayoutConfig,
) -> Vec<LayoutTable> {
    let mut placed = Vec::new();
    let mut y = 0.0;
    let mut isolated: Vec<(usize, &str)> = Vec::new();

    for (component_idx, members) in components.iter().enumerate() {
        if members.len() == 1 {
            isolated.push((component_idx, members[0]));
            continue;
        }
        let band_height = place_component(component_idx, members, tiers, sizes, y, cfg, &mut placed);
        y += band_height + cfg.component_gap;
    }

    if !isolated.is_empty() {
        place_grid(&mut isolated, sizes, y, cfg, &mut placed);
    }

    placed
}

/// Lay out one component as tier columns starting at `top`. Returns its height.
fn place_component(
    component_idx: usize,
    members: &[&str],
    tiers: &HashMap<&str, usize>,
    sizes: &HashMap<String, (f64, f64)>,
    top: f64,
    cfg: &LayoutConfig,
    placed: &mut Vec<LayoutTable>,
) -> f64 {
    let tier_count = members
        .iter()
        .map(|m| tiers.get(m).copied().unwrap_or(0))
        .max()
        .unwrap_or(0)
        + 1;

    let mut columns: Vec<Vec<&str>> = vec![Vec::new(); tier_count];
    for &m in members {
        columns[tiers.get(m).copied().unwrap_or(0)].push(m);
    }
    for column in columns.iter_mut() {
        column.sort_unstable();
    }

    let mut x = 0.0;
    let mut band_height: f64 = 0.0;
    for (tier, column) in columns.iter().enumerate() {
        let mut column_width: f64 = 0.0;
        let mut y = top;
        for (i, &name) in column.iter().enumerate() {
            let (w, h) = size_of(sizes, name, cfg);
            if i > 0 {
                y += cfg.row_gap;
            }
            placed.push(LayoutTable {
                name: name.to_string(),
                x,
                y,
                width: w,
                height: h,
                scale: 1.0,
                tier,
                component: component_idx,
            });
            y += h;
            column_width = column_width.max(w);
        }
        band_height = band_height.max(y - top);
        if !column.is_empty() {
            x += column_width + cfg.tier_gap;
        }
    }

    band_height
}

/// Alphabetical grid of tables without relationships.
fn place_grid(
    isolated: &mut [(usize, &str)],
    sizes: &HashMap<String, (f64, f64)>,
    top: f64,
    cfg: &LayoutConfig,
    placed: &mut Vec<LayoutTable>,
) {
    isolated.sort_unstable_by(|a, b| a.1.cmp(b.1));
    let per_row = cfg.isolated_columns.max(1);

    let mut column_widths = vec![0.0_f64; per_row];
    for (i, (_, name)) in isolated.iter().enumerate() {
        let (w, _) = size_of(sizes, name, cfg);
        column_widths[i % per_row] = column_widths[i % per_row].max(w);
    }

    let mut y = top;
    for row in isolated.chunks(per_row) {
        let mut x = 0.0;
        let mut row_height: f64 = 0.0;
        for (col, &(component_idx, name)) in row.iter().enumerate() {
            let (w, h) = size_of(sizes, name, cfg);
            placed.push(LayoutTable {
                name: name.to_string(),
                x,
                y,
                width: w,
                height: h,
                scale: 1.0,
                tier: 0,
                component: component_idx,
            });
            x += column_widths[col] + cfg.tier_gap;
            row_height = row_height.max(h);
        }
        y += row_height + cfg.row_gap;
    }
}

fn size_of(sizes: &HashMap<String, (f64, f64)>, name: &str, cfg: &LayoutConfig) -> (f64, f64) {
    sizes
        .get(name)
        .copied()
        .unwrap_or((cfg.table_width, cfg.header_height + cfg.padding))
}
