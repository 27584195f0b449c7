//! Browser surface: a `DiagramHandle` class wrapping the engine facade.
//!
//! The host owns durable storage (typically `localStorage`): it passes the
//! stored document to `hydrate` and writes whatever `takeFlushPayload` returns.

use crate::config::EngineConfig;
use crate::diagram::Diagram;
use crate::geometry::{Point, Transform};
use crate::highlight::HighlightState;
use crate::input::{Key, KeyEvent, PointerEvent, PointerKind, PointerPhase, WheelEvent};
use crate::search::search_tables;
use crate::store::MemoryBackend;
use crate::svg::SvgRenderer;
use crate::topology::{ColumnRef, SchemaTopology};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use wasm_bindgen::prelude::*;

/// Live view state as handed to the host renderer.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewState<'a> {
    diagram_id: &'a str,
    transform: Transform,
    selected_column: Option<&'a ColumnRef>,
    selected_table: Option<&'a str>,
    hovered_table: Option<&'a str>,
    highlights: Option<&'a HighlightState>,
    table_highlights: BTreeSet<String>,
    hidden: &'a BTreeSet<String>,
    z_order: Vec<&'a str>,
    verbose_tables: &'a BTreeSet<String>,
    is_fullscreen: bool,
    is_hydrated: bool,
}

#[wasm_bindgen]
pub struct DiagramHandle {
    inner: Diagram<MemoryBackend>,
}

#[wasm_bindgen]
impl DiagramHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(topology_json: &str, title: Option<String>, config_toml: Option<String>) -> Result<DiagramHandle, String> {
        let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
        let config = match config_toml.as_deref() {
            Some(toml) => EngineConfig::from_toml_str(toml).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        Ok(Self {
            inner: Diagram::new(topology, title, config, MemoryBackend::new()),
        })
    }

    /// Apply the stored document (`undefined` when storage is empty).
    pub fn hydrate(&mut self, stored_json: Option<String>) {
        self.inner.hydrate_from_json(stored_json.as_deref());
    }

    #[wasm_bindgen(js_name = "diagramId")]
    pub fn diagram_id(&self) -> String {
        self.inner.diagram_id().to_string()
    }

    /// Feed a pointer event. Returns whether the host should call
    /// `preventDefault`.
    #[wasm_bindgen(js_name = "pointerEvent")]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_event(
        &mut self,
        pointer_id: i32,
        pointer_type: &str,
        phase: &str,
        x: f64,
        y: f64,
        button: i16,
        timestamp_ms: f64,
    ) -> bool {
        let Some(phase) = PointerPhase::from_str(phase) else {
            return false;
        };
        let kind = PointerKind::from_str(pointer_type).unwrap_or(PointerKind::Mouse);
        let event = PointerEvent::new(i64::from(pointer_id), kind, phase, Point::new(x, y), timestamp_ms).with_button(button);
        self.inner.handle_pointer(event).prevent_default()
    }

    #[wasm_bindgen(js_name = "wheelEvent")]
    pub fn wheel_event(&mut self, x: f64, y: f64, delta_y: f64, timestamp_ms: f64) -> bool {
        self.inner
            .handle_wheel(WheelEvent::new(x, y, delta_y, timestamp_ms))
            .prevent_default()
    }

    #[wasm_bindgen(js_name = "keyEvent")]
    pub fn key_event(&mut self, key: &str, timestamp_ms: f64) -> bool {
        self.inner
            .handle_key(KeyEvent {
                key: Key::from_key_str(key),
                timestamp_ms,
            })
            .prevent_default()
    }

    /// Layout as JSON.
    pub fn layout(&self) -> Result<String, String> {
        serde_json::to_string(self.inner.layout()).map_err(|e| e.to_string())
    }

    /// Selection, highlight, transform and stacking state as JSON.
    pub fn state(&self) -> Result<String, String> {
        let d = &self.inner;
        let state = ViewState {
            diagram_id: d.diagram_id(),
            transform: d.transform(),
            selected_column: d.selected_column(),
            selected_table: d.selected_table(),
            hovered_table: d.hovered_table(),
            highlights: d.highlights(),
            table_highlights: d.table_highlights(),
            hidden: d.hidden(),
            z_order: d.z_order(),
            verbose_tables: &d.overrides().verbose_tables,
            is_fullscreen: d.is_fullscreen(),
            is_hydrated: d.is_hydrated(),
        };
        serde_json::to_string(&state).map_err(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = "renderSvg")]
    pub fn render_svg(&self) -> String {
        let renderer = SvgRenderer::new(self.inner_metrics());
        renderer.render(self.inner.topology(), self.inner.layout(), &self.inner.scene())
    }

    /// Call `callback(kind)` after every state change.
    pub fn subscribe(&mut self, callback: js_sys::Function) {
        self.inner.subscribe(move |change| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(change.as_str()));
        });
    }

    /// Store document to write, if a debounced flush is due.
    #[wasm_bindgen(js_name = "takeFlushPayload")]
    pub fn take_flush_payload(&mut self, now_ms: f64) -> Option<String> {
        self.inner.take_flush_payload(now_ms)
    }

    #[wasm_bindgen(js_name = "exportStore")]
    pub fn export_store(&self) -> Option<String> {
        self.inner.export_store()
    }

    #[wasm_bindgen(js_name = "setPositions")]
    pub fn set_positions(&mut self, positions_json: &str) -> Result<(), String> {
        let positions: BTreeMap<String, Point> = serde_json::from_str(positions_json).map_err(|e| e.to_string())?;
        self.inner.set_positions(positions);
        Ok(())
    }

    #[wasm_bindgen(js_name = "setPosition")]
    pub fn set_position(&mut self, table: &str, x: f64, y: f64) {
        self.inner.set_position(table, Point::new(x, y));
    }

    #[wasm_bindgen(js_name = "setScale")]
    pub fn set_scale(&mut self, table: &str, scale: f64) -> f64 {
        self.inner.set_scale(table, scale)
    }

    #[wasm_bindgen(js_name = "bringToFront")]
    pub fn bring_to_front(&mut self, table: &str) -> f64 {
        self.inner.bring_to_front(table) as f64
    }

    #[wasm_bindgen(js_name = "selectColumn")]
    pub fn select_column(&mut self, table: &str, column: &str) {
        self.inner.select_column(ColumnRef::new(table, column));
    }

    #[wasm_bindgen(js_name = "selectTable")]
    pub fn select_table(&mut self, table: &str) {
        self.inner.select_table(table);
    }

    #[wasm_bindgen(js_name = "setHover")]
    pub fn set_hover(&mut self, table: Option<String>) {
        self.inner.set_hover(table);
    }

    #[wasm_bindgen(js_name = "clearSelection")]
    pub fn clear_selection(&mut self) {
        self.inner.clear_selection();
    }

    #[wasm_bindgen(js_name = "setCanvasTransform")]
    pub fn set_canvas_transform(&mut self, x: f64, y: f64, scale: f64) {
        self.inner.set_canvas_transform(Transform::new(x, y, scale));
    }

    #[wasm_bindgen(js_name = "toggleVisibility")]
    pub fn toggle_visibility(&mut self, table: &str) -> bool {
        self.inner.toggle_visibility(table)
    }

    #[wasm_bindgen(js_name = "showAll")]
    pub fn show_all(&mut self) {
        self.inner.show_all();
    }

    #[wasm_bindgen(js_name = "hideTables")]
    pub fn hide_tables(&mut self, tables_json: &str) -> Result<(), String> {
        let tables: Vec<String> = serde_json::from_str(tables_json).map_err(|e| e.to_string())?;
        self.inner.hide_tables(tables);
        Ok(())
    }

    #[wasm_bindgen(js_name = "resetLayout")]
    pub fn reset_layout(&mut self) {
        self.inner.reset_layout();
    }

    #[wasm_bindgen(js_name = "toggleVerbose")]
    pub fn toggle_verbose(&mut self, table: &str) -> bool {
        self.inner.toggle_verbose(table)
    }

    #[wasm_bindgen(js_name = "setFullscreen")]
    pub fn set_fullscreen(&mut self, on: bool) {
        self.inner.set_fullscreen(on);
    }

    #[wasm_bindgen(js_name = "toggleFullscreen")]
    pub fn toggle_fullscreen(&mut self) -> bool {
        self.inner.toggle_fullscreen()
    }

    #[wasm_bindgen(js_name = "setViewport")]
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.inner.set_viewport(width, height);
    }

    #[wasm_bindgen(js_name = "fitToView")]
    pub fn fit_to_view(&mut self) {
        self.inner.fit_to_view();
    }

    #[wasm_bindgen(js_name = "focusTable")]
    pub fn focus_table(&mut self, table: &str) -> bool {
        self.inner.focus_table(table)
    }

    #[wasm_bindgen(js_name = "setTopology")]
    pub fn set_topology(&mut self, topology_json: &str) -> Result<(), String> {
        let topology = SchemaTopology::from_json(topology_json).map_err(|e| e.to_string())?;
        self.inner.set_topology(topology);
        Ok(())
    }

    /// Table names matching `query`, best first.
    pub fn search(&self, query: &str) -> Vec<String> {
        search_tables(self.inner.topology(), query)
    }
}

impl DiagramHandle {
    fn inner_metrics(&self) -> crate::measure::TableMetrics {
        crate::measure::TableMetrics::from_config(&self.inner.config().layout)
    }
}
