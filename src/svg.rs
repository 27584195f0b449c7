use crate::geometry::{Rect, Transform};
use crate::highlight::{HighlightMode, HighlightState, KeyRole};
use crate::layout::{DiagramLayout, LayoutTable, RelationshipPath};
use crate::measure::TableMetrics;
use crate::overrides::Overrides;
use crate::topology::{Column, SchemaTopology, Table};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

/// Live view state drawn on top of a layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub highlights: Option<HighlightState>,
    /// Relationships lit by table hover or selection.
    pub table_relationships: BTreeSet<String>,
    pub selected_table: Option<String>,
    pub z_indexes: BTreeMap<String, i64>,
    pub verbose_tables: BTreeSet<String>,
    /// Canvas transform wrapped around the content; `None` draws layout space as is.
    pub transform: Option<Transform>,
}

impl Scene {
    /// Static scene with stacking and verbosity taken from `overrides`.
    pub fn from_overrides(overrides: &Overrides) -> Self {
        Self {
            z_indexes: overrides.z_indexes.clone(),
            verbose_tables: overrides.verbose_tables.clone(),
            ..Self::default()
        }
    }

    fn z_index(&self, table: &str) -> i64 {
        self.z_indexes.get(table).copied().unwrap_or(0)
    }
}

pub struct SvgRenderer {
    metrics: TableMetrics,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TableMetrics::default(),
        }
    }
}

impl SvgRenderer {
    pub fn new(metrics: TableMetrics) -> Self {
        Self { metrics }
    }

    pub fn render(&self, topology: &SchemaTopology, layout: &DiagramLayout, scene: &Scene) -> String {
        let mut svg = String::new();
        match self.write_document(&mut svg, topology, layout, scene) {
            Ok(()) => svg,
            Err(_) => String::new(),
        }
    }

    fn write_document(&self, svg: &mut String, topology: &SchemaTopology, layout: &DiagramLayout, scene: &Scene) -> fmt::Result {
        let vb = layout.view_box;
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
            num(vb.width),
            num(vb.height),
            num(vb.x),
            num(vb.y),
            num(vb.width),
            num(vb.height)
        )?;

        writeln!(
            svg,
            r#"<style>
  .domain {{ fill: #f5f7fb; stroke: #b8c2d6; stroke-dasharray: 6 4; }}
  .domain-name {{ font-family: monospace; font-size: 12px; fill: #6b7a99; }}
  .table-bg {{ fill: #fff; }}
  .table-header {{ fill: #e0e0e0; }}
  .table-border {{ fill: none; stroke: #333; stroke-width: 1.5; }}
  .table.selected .table-border {{ stroke: #1f6feb; stroke-width: 2.5; }}
  .table-name {{ font-family: monospace; font-size: 14px; font-weight: bold; }}
  .column-text {{ font-family: monospace; font-size: 12px; }}
  .column-type {{ font-family: monospace; font-size: 11px; fill: #777; }}
  .pk {{ font-weight: bold; }}
  .fk {{ font-style: italic; }}
  .row-pk {{ fill: #fff3c4; }}
  .row-fk {{ fill: #dcebff; }}
  .edge {{ stroke: #666; stroke-width: 1.5; fill: none; }}
  .edge.related {{ stroke: #1f6feb; }}
  .edge.highlight-fk {{ stroke: #1f6feb; stroke-width: 2.5; }}
  .edge.highlight-pk {{ stroke: #d29922; stroke-width: 2.5; }}
</style>"#
        )?;

        if let Some(t) = scene.transform {
            writeln!(
                svg,
                r#"<g transform="matrix({} 0 0 {} {} {})">"#,
                num(t.scale),
                num(t.scale),
                num(t.x),
                num(t.y)
            )?;
        }

        for (name, bounds) in &layout.domain_bounds {
            self.write_domain(svg, name, bounds)?;
        }

        // edges sit behind tables
        for path in layout.paths.values() {
            self.write_edge(svg, path, scene)?;
        }

        let mut tables: Vec<&LayoutTable> = layout.tables.values().collect();
        tables.sort_by(|a, b| {
            scene
                .z_index(&a.name)
                .cmp(&scene.z_index(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        for lt in tables {
            if let Some(table) = topology.table(&lt.name) {
                self.write_table(svg, lt, table, scene)?;
            }
        }

        if scene.transform.is_some() {
            writeln!(svg, "</g>")?;
        }
        writeln!(svg, "</svg>")
    }

    fn write_domain(&self, svg: &mut String, name: &str, r: &Rect) -> fmt::Result {
        writeln!(
            svg,
            r#"<rect class="domain" x="{}" y="{}" width="{}" height="{}" rx="8" />"#,
            num(r.x),
            num(r.y),
            num(r.width),
            num(r.height)
        )?;
        writeln!(
            svg,
            r#"<text class="domain-name" x="{}" y="{}">{}</text>"#,
            num(r.x + 8.0),
            num(r.y + 16.0),
            escape_xml(name)
        )
    }

    fn write_edge(&self, svg: &mut String, path: &RelationshipPath, scene: &Scene) -> fmt::Result {
        let class = match &scene.highlights {
            Some(h) if h.highlights_relationship(&path.id) => match h.mode {
                HighlightMode::Fk => "edge highlight-fk",
                HighlightMode::Pk => "edge highlight-pk",
            },
            _ if scene.table_relationships.contains(&path.id) => "edge related",
            _ => "edge",
        };
        writeln!(
            svg,
            r#"<path class="{}" data-relationship="{}" d="{}" />"#,
            class,
            escape_xml(&path.id),
            path.d
        )
    }

    fn write_table(&self, svg: &mut String, lt: &LayoutTable, table: &Table, scene: &Scene) -> fmt::Result {
        let (x, y, w, h) = (lt.x, lt.y, lt.width, lt.height);
        let header_h = self.metrics.header_height;
        let selected = scene.selected_table.as_deref() == Some(lt.name.as_str());

        write!(
            svg,
            r#"<g class="table{}" data-table="{}""#,
            if selected { " selected" } else { "" },
            escape_xml(&lt.name)
        )?;
        if (lt.scale - 1.0).abs() > f64::EPSILON {
            let c = lt.rect().center();
            write!(
                svg,
                r#" transform="translate({} {}) scale({}) translate({} {})""#,
                num(c.x),
                num(c.y),
                num(lt.scale),
                num(-c.x),
                num(-c.y)
            )?;
        }
        writeln!(svg, ">")?;

        writeln!(
            svg,
            r#"<rect class="table-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            num(x),
            num(y),
            num(w),
            num(h)
        )?;
        writeln!(
            svg,
            r#"<rect class="table-header" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            num(x),
            num(y),
            num(w),
            num(header_h)
        )?;
        writeln!(
            svg,
            r#"<text class="table-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            num(x + w / 2.0),
            num(y + header_h / 2.0 + 5.0),
            escape_xml(&table.name)
        )?;

        if !table.columns.is_empty() {
            writeln!(
                svg,
                r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#333" stroke-width="1" />"##,
                num(x),
                num(y + header_h),
                num(x + w),
                num(y + header_h)
            )?;
        }

        let verbose = scene.verbose_tables.contains(&table.name);
        for (i, col) in table.columns.iter().enumerate() {
            self.write_column(svg, lt, i, col, verbose, scene)?;
        }

        writeln!(
            svg,
            r#"<rect class="table-border" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            num(x),
            num(y),
            num(w),
            num(h)
        )?;
        writeln!(svg, "</g>")
    }

    fn write_column(&self, svg: &mut String, lt: &LayoutTable, index: usize, col: &Column, verbose: bool, scene: &Scene) -> fmt::Result {
        let row_top = lt.y + self.metrics.header_height + index as f64 * self.metrics.row_height;
        let baseline = lt.y + self.metrics.row_center_offset(index) + 4.0;

        let role = scene
            .highlights
            .as_ref()
            .and_then(|h| h.role_of(&lt.name, &col.name));
        if let Some(role) = role {
            writeln!(
                svg,
                r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}" />"#,
                match role {
                    KeyRole::Pk => "row-pk",
                    KeyRole::Fk => "row-fk",
                },
                num(lt.x + 1.0),
                num(row_top),
                num(lt.width - 2.0),
                num(self.metrics.row_height)
            )?;
        }

        let mut class = String::from("column-text");
        if col.is_primary_key {
            class.push_str(" pk");
        }
        if col.is_foreign_key() {
            class.push_str(" fk");
        }
        let prefix = match (col.is_primary_key, col.is_foreign_key()) {
            (true, _) => "◆ ",
            (false, true) => "◇ ",
            _ => "  ",
        };

        let label = if verbose {
            let mut text = format!("{prefix}{}: {}", col.name, col.typ);
            if let Some(comment) = &col.comment {
                text.push_str(" -- ");
                text.push_str(comment);
            }
            text
        } else {
            format!("{prefix}{}", col.name)
        };
        writeln!(
            svg,
            r#"<text class="{}" x="{}" y="{}">{}</text>"#,
            class,
            num(lt.x + self.metrics.padding),
            num(baseline),
            escape_xml(&label)
        )?;

        if !verbose {
            writeln!(
                svg,
                r#"<text class="column-type" x="{}" y="{}" text-anchor="end">{}</text>"#,
                num(lt.x + lt.width - self.metrics.padding),
                num(baseline),
                escape_xml(&col.typ)
            )?;
        }
        Ok(())
    }
}

/// One decimal, matching route path data.
fn num(v: f64) -> String {
    format!("{v:.1}")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
