pub mod bindings;
pub mod canvas;
pub mod config;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod input;
pub mod layout;
pub mod measure;
pub mod node;
pub mod observer;
pub mod overrides;
pub mod search;
pub mod store;
pub mod svg;
pub mod topology;

use wasm_bindgen::prelude::*;

use highlight::compute_highlights;
use layout::LayoutEngine;
use overrides::Overrides;
use std::collections::BTreeSet;
use svg::{Scene, SvgRenderer};
use topology::{ColumnRef, SchemaTopology};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Install the fmt subscriber. `RUST_LOG` overrides the `info` default.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn parse_hidden(hidden_json: Option<String>) -> Result<BTreeSet<String>, String> {
    match hidden_json.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(json) => serde_json::from_str(json).map_err(|e| e.to_string()),
        None => Ok(BTreeSet::new()),
    }
}

/// Compute a layout and return it as JSON.
#[wasm_bindgen(js_name = "erdLayout")]
pub fn layout_json(
    topology_json: &str,
    hidden_json: Option<String>,
    overrides_json: Option<String>,
) -> Result<String, String> {
    let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
    let hidden = parse_hidden(hidden_json)?;
    let overrides: Overrides = match overrides_json.as_deref() {
        Some(json) => serde_json::from_str(json).map_err(|e| e.to_string())?,
        None => Overrides::default(),
    };

    let layout = LayoutEngine::default().layout(&topology, &hidden, &overrides);
    serde_json::to_string(&layout).map_err(|e| e.to_string())
}

/// Render a topology to SVG with the default layout
#[wasm_bindgen(js_name = "erdToSvg")]
pub fn render_erd(topology_json: &str, hidden_json: Option<String>) -> Result<String, String> {
    let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
    let hidden = parse_hidden(hidden_json)?;

    let layout = LayoutEngine::default().layout(&topology, &hidden, &Overrides::default());
    let svg = SvgRenderer::default().render(&topology, &layout, &Scene::default());

    Ok(svg)
}

/// Persistence key for a topology.
#[wasm_bindgen(js_name = "diagramId")]
pub fn diagram_id(topology_json: &str, title: Option<String>) -> Result<String, String> {
    let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
    Ok(store::diagram_id(&topology, title.as_deref()))
}

/// Highlight state for a selected column as JSON (`null` when nothing lights up).
#[wasm_bindgen(js_name = "erdHighlights")]
pub fn highlights_json(topology_json: &str, table: &str, column: &str) -> Result<String, String> {
    let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
    let state = compute_highlights(&topology, Some(&ColumnRef::new(table, column)));
    serde_json::to_string(&state).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"{
        "tables": [
            {"name": "users", "columns": [{"name": "id", "type": "int", "isPrimaryKey": true}]},
            {"name": "posts", "columns": [
                {"name": "id", "type": "int", "isPrimaryKey": true},
                {"name": "user_id", "type": "int", "foreignKey": {"table": "users", "column": "id"}}
            ]}
        ]
    }"#;

    #[test]
    fn test_layout_json() {
        let json = layout_json(BLOG, Some(r#"["users"]"#.into()), None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(v["tables"].get("users").is_none());
        assert!(v["tables"].get("posts").is_some());
        assert_eq!(v["paths"].as_object().unwrap().len(), 0);
        assert!(v.get("viewBox").is_some());
    }

    #[test]
    fn test_layout_json_with_overrides() {
        let json = layout_json(BLOG, None, Some(r#"{"positions": {"users": {"x": 7, "y": 9}}}"#.into())).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["tables"]["users"]["x"], 7.0);
    }

    #[test]
    fn test_render_and_errors() {
        assert!(render_erd(BLOG, None).unwrap().contains("<svg"));
        assert!(render_erd("{oops", None).is_err());
        assert!(layout_json(BLOG, Some("not json".into()), None).is_err());
    }

    #[test]
    fn test_highlights_json() {
        let json = highlights_json(BLOG, "posts", "user_id").unwrap();
        assert!(json.contains(r#""mode":"fk""#));
        assert_eq!(highlights_json(BLOG, "posts", "nope").unwrap(), "null");
        assert_eq!(diagram_id(BLOG, None).unwrap().len(), 16);
    }
}
