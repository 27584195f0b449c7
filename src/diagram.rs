//! The engine facade.
//!
//! `Diagram` owns the topology, override state, gesture controllers, selection
//! and the persistence store. Hosts feed it pointer, wheel and key events and
//! call its actions; after every state transition subscribers get a [`Change`]
//! and re-query whatever they draw.
//!
//! Input routing: a press is hit-tested in layout space. A press on a table is
//! claimed by the node controller, a press on empty canvas by the canvas
//! controller. Only one session runs at a time; presses that would start a
//! second one are ignored, except a second touch that turns a fresh press into
//! a pinch.

use crate::canvas::{CanvasController, CanvasRelease};
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::geometry::{Point, Size, Transform};
use crate::highlight::{HighlightState, compute_highlights, table_relationships};
use crate::input::{Key, KeyEvent, PointerEvent, PointerId, PointerKind, PointerPhase, Response, TapTarget, TapTracker, WheelEvent};
use crate::layout::{DiagramLayout, Hit, LayoutEngine};
use crate::node::{NodeController, NodeRelease};
use crate::observer::{Observers, SubscriptionId};
use crate::overrides::Overrides;
use crate::store::{LayoutPatch, MemoryBackend, PersistenceStore, StorageBackend, diagram_id};
use crate::svg::Scene;
use crate::topology::{ColumnRef, SchemaTopology};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// What kind of state a transition touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// Positions, scales, stacking, visibility or topology.
    Layout,
    Transform,
    /// Column or table selection, hover, highlights.
    Selection,
    /// Persisted-only state such as the fullscreen flag, or a hydration.
    Persistence,
}

impl Change {
    pub fn as_str(&self) -> &'static str {
        match self {
            Change::Layout => "layout",
            Change::Transform => "transform",
            Change::Selection => "selection",
            Change::Persistence => "persistence",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActivePointer {
    kind: PointerKind,
    position: Point,
}

pub struct Diagram<B: StorageBackend> {
    config: EngineConfig,
    engine: LayoutEngine,
    topology: SchemaTopology,
    title: Option<String>,
    diagram_id: String,
    hidden: BTreeSet<String>,
    overrides: Overrides,
    layout: DiagramLayout,
    canvas: CanvasController,
    nodes: NodeController,
    taps: TapTracker,
    /// Pointers currently pressed, in view space.
    pointers: BTreeMap<PointerId, ActivePointer>,
    selected_column: Option<ColumnRef>,
    selected_table: Option<String>,
    hovered_table: Option<String>,
    highlights: Option<HighlightState>,
    fullscreen: bool,
    viewport: Size,
    /// Latest host time seen, used to stamp store writes.
    now_ms: f64,
    store: PersistenceStore<B>,
    observers: Observers<Change>,
}

impl Diagram<MemoryBackend> {
    /// Diagram with default config and an in-memory store.
    pub fn in_memory(topology: SchemaTopology) -> Self {
        Self::new(topology, None, EngineConfig::default(), MemoryBackend::new())
    }
}

impl<B: StorageBackend> Diagram<B> {
    pub fn new(topology: SchemaTopology, title: Option<String>, config: EngineConfig, backend: B) -> Self {
        let engine = LayoutEngine::new(config.layout.clone());
        let diagram_id = diagram_id(&topology, title.as_deref());
        let overrides = Overrides::default();
        let hidden = BTreeSet::new();
        let layout = engine.layout(&topology, &hidden, &overrides);
        info!(diagram = %diagram_id, tables = topology.tables.len(), "diagram created");

        Self {
            canvas: CanvasController::new(config.canvas.clone()),
            nodes: NodeController::new(config.node.clone()),
            store: PersistenceStore::new(backend, &config.store),
            engine,
            topology,
            title,
            diagram_id,
            hidden,
            overrides,
            layout,
            taps: TapTracker::default(),
            pointers: BTreeMap::new(),
            selected_column: None,
            selected_table: None,
            hovered_table: None,
            highlights: None,
            fullscreen: false,
            viewport: Size::new(0.0, 0.0),
            now_ms: 0.0,
            observers: Observers::default(),
            config,
        }
    }

    // ----- hydration and persistence -----

    /// Load persisted state from the backend and apply it.
    pub async fn hydrate(&mut self) {
        self.store.rehydrate().await;
        self.apply_persisted();
    }

    /// Hydrate from a document the host read itself (`None` if absent).
    pub fn hydrate_from_json(&mut self, payload: Option<&str>) {
        self.store.hydrate_from_json(payload);
        self.apply_persisted();
    }

    pub fn is_hydrated(&self) -> bool {
        self.store.is_hydrated()
    }

    /// Adopt the persisted record for this diagram. With no record, state
    /// changed before hydration is kept and written now.
    fn apply_persisted(&mut self) {
        match self.store.get(&self.diagram_id).cloned() {
            Some(record) => {
                debug!(diagram = %self.diagram_id, "applying persisted layout");
                self.overrides = record.overrides();
                self.canvas.set_transform(record.canvas_transform);
                self.fullscreen = record.is_fullscreen;
            }
            None => {
                if self.overrides != Overrides::default() {
                    self.persist(LayoutPatch::from_overrides(&self.overrides));
                }
                if self.canvas.transform() != Transform::IDENTITY {
                    self.persist(LayoutPatch::canvas_transform(self.canvas.transform()));
                }
                if self.fullscreen {
                    self.persist(LayoutPatch::fullscreen(true));
                }
            }
        }
        self.relayout();
        self.notify(Change::Layout);
        self.notify(Change::Transform);
        self.notify(Change::Persistence);
    }

    fn persist(&mut self, patch: LayoutPatch) {
        match self.store.set(&self.diagram_id, patch, self.now_ms) {
            Ok(()) => {}
            Err(StoreError::NotHydrated(id)) => debug!(diagram = %id, "store not hydrated, change kept in memory"),
            Err(e) => warn!(error = %e, "failed to record layout change"),
        }
    }

    fn persist_overrides(&mut self) {
        self.persist(LayoutPatch::from_overrides(&self.overrides));
    }

    fn persist_transform(&mut self) {
        self.persist(LayoutPatch::canvas_transform(self.canvas.transform()));
    }

    /// Advance the host clock used to stamp writes.
    pub fn tick(&mut self, now_ms: f64) {
        if now_ms.is_finite() && now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    pub fn is_flush_due(&self, now_ms: f64) -> bool {
        self.store.is_flush_due(now_ms)
    }

    /// Write pending changes when the debounce window has passed or a
    /// gesture just ended. Failures are logged and retried on the next call.
    pub async fn flush_if_due(&mut self, now_ms: f64) -> bool {
        self.tick(now_ms);
        match self.store.flush_if_due(now_ms).await {
            Ok(wrote) => wrote,
            Err(e) => {
                warn!(error = %e, "failed to flush layout store");
                false
            }
        }
    }

    pub async fn flush(&mut self) -> bool {
        match self.store.flush().await {
            Ok(wrote) => wrote,
            Err(e) => {
                warn!(error = %e, "failed to flush layout store");
                false
            }
        }
    }

    /// Serialized store document when a flush is due, for hosts that write
    /// the medium themselves.
    pub fn take_flush_payload(&mut self, now_ms: f64) -> Option<String> {
        self.tick(now_ms);
        if !self.store.is_flush_due(now_ms) {
            return None;
        }
        match self.store.take_flush_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize layout store");
                None
            }
        }
    }

    pub fn export_store(&self) -> Option<String> {
        self.store.export_json().ok()
    }

    pub fn store(&self) -> &PersistenceStore<B> {
        &self.store
    }

    // ----- observers -----

    pub fn subscribe(&mut self, callback: impl FnMut(&Change) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn notify(&mut self, change: Change) {
        self.observers.notify(&change);
    }

    fn relayout(&mut self) {
        self.layout = self.engine.layout(&self.topology, &self.hidden, &self.overrides);
    }

    fn layout_changed(&mut self) {
        self.relayout();
        self.notify(Change::Layout);
    }

    // ----- input -----

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Response {
        self.tick(event.timestamp_ms);
        match event.phase {
            PointerPhase::Down => self.pointer_down(event),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up => self.pointer_up(event),
            PointerPhase::Cancel | PointerPhase::Leave => self.pointer_cancel(event),
        }
    }

    fn hit_test(&self, view_point: Point) -> Option<Hit> {
        let point = self.canvas.transform().to_layout(view_point);
        self.engine
            .hit_test(&self.layout, &self.topology, point, |name| self.overrides.z_index(name))
    }

    fn pointer_down(&mut self, event: PointerEvent) -> Response {
        if !event.is_primary() || self.pointers.contains_key(&event.id) {
            return Response::Ignored;
        }
        let hit = self.hit_test(event.position);

        let claimed = if self.nodes.is_active() {
            // second finger on the pressed table starts a node pinch
            event.kind == PointerKind::Touch
                && hit.as_ref().is_some_and(|h| {
                    self.nodes
                        .second_press(&h.table, event.id, event.position, &self.overrides)
                })
        } else if self.canvas.is_active() {
            match self.canvas.panning_pointer() {
                Some((first, _)) if event.kind == PointerKind::Touch && hit.is_none() => {
                    match self.pointers.get(&first) {
                        Some(p) if p.kind == PointerKind::Touch => {
                            self.canvas
                                .begin_pinch((first, p.position), (event.id, event.position));
                            true
                        }
                        _ => false,
                    }
                }
                _ => false,
            }
        } else {
            match &hit {
                Some(h) => {
                    let table = h.table.clone();
                    let start = self.layout.position(&table).unwrap_or_default();
                    self.nodes
                        .press(&table, event.id, event.position, start, &mut self.overrides);
                    self.persist_overrides();
                    self.notify(Change::Layout);
                }
                None => self.canvas.begin_pan(event.id, event.position),
            }
            true
        };

        if !claimed {
            debug!(pointer = ?event.id, "pointer down ignored, another session is active");
            return Response::Ignored;
        }
        self.pointers.insert(
            event.id,
            ActivePointer {
                kind: event.kind,
                position: event.position,
            },
        );
        Response::CONSUMED
    }

    fn pointer_move(&mut self, event: PointerEvent) -> Response {
        match self.pointers.get_mut(&event.id) {
            Some(active) => active.position = event.position,
            None => {
                // hover only
                let hovered = self.hit_test(event.position).map(|h| h.table);
                self.set_hover(hovered);
                return Response::Ignored;
            }
        }

        if self.nodes.owns(event.id) {
            if self
                .nodes
                .pointer_move(event.id, event.position, self.canvas.scale(), &mut self.overrides)
            {
                self.persist_overrides();
                self.layout_changed();
            }
            Response::CONSUMED
        } else if self.canvas.owns(event.id) {
            if self.canvas.pointer_move(event.id, event.position) {
                self.persist_transform();
                self.notify(Change::Transform);
            }
            Response::CONSUMED
        } else {
            Response::Ignored
        }
    }

    fn pointer_up(&mut self, event: PointerEvent) -> Response {
        if self.pointers.remove(&event.id).is_none() {
            return Response::Ignored;
        }

        if let Some(release) = self.nodes.pointer_up(event.id, &self.overrides) {
            self.node_released(release, event.timestamp_ms);
            return Response::CONSUMED;
        }

        let tap_slop = self.config.gesture.double_tap_slop;
        match self.canvas.pointer_up(event.id, tap_slop) {
            Some(CanvasRelease::Tap { position }) => {
                if self
                    .taps
                    .register(event.timestamp_ms, position, TapTarget::Canvas, &self.config.gesture)
                {
                    self.reset_transform();
                } else {
                    self.clear_selection();
                }
                self.store.request_flush();
                Response::CONSUMED
            }
            Some(CanvasRelease::Panned | CanvasRelease::PinchEnded) => {
                self.taps.clear();
                self.store.request_flush();
                Response::CONSUMED
            }
            None => Response::Ignored,
        }
    }

    fn node_released(&mut self, release: NodeRelease, timestamp_ms: f64) {
        match release {
            NodeRelease::Clicked { table, position } => {
                let target = TapTarget::Table(table.clone());
                if self
                    .taps
                    .register(timestamp_ms, position, target, &self.config.gesture)
                {
                    self.nodes.toggle_zoom(&table, &mut self.overrides);
                    self.persist_overrides();
                    self.layout_changed();
                } else {
                    let column = self
                        .hit_test(position)
                        .filter(|h| h.table == table)
                        .and_then(|h| h.column);
                    match column {
                        Some(column) => self.select_column(ColumnRef::new(table, column)),
                        None => self.select_table(&table),
                    }
                }
            }
            NodeRelease::Dropped { table, position } => {
                debug!(table = %table, x = position.x, y = position.y, "table dropped");
                self.taps.clear();
            }
            NodeRelease::PinchEnded { table } => {
                debug!(table = %table, "table pinch ended");
                self.taps.clear();
            }
        }
        self.store.request_flush();
    }

    fn pointer_cancel(&mut self, event: PointerEvent) -> Response {
        if self.pointers.remove(&event.id).is_none() {
            if event.phase == PointerPhase::Leave {
                self.set_hover(None);
            }
            return Response::Ignored;
        }

        if self.nodes.owns(event.id) {
            self.nodes.cancel();
        } else if self.canvas.owns(event.id) {
            self.canvas.cancel();
        } else {
            return Response::Ignored;
        }
        // whatever was applied last stays and gets written
        self.store.request_flush();
        Response::HANDLED
    }

    pub fn handle_wheel(&mut self, event: WheelEvent) -> Response {
        self.tick(event.timestamp_ms);
        match self.hit_test(event.position) {
            Some(hit) => {
                if self
                    .nodes
                    .wheel(&hit.table, event.delta_y, &mut self.overrides)
                    .is_some()
                {
                    self.persist_overrides();
                    self.layout_changed();
                }
            }
            None => {
                if self.canvas.wheel(event.position, event.delta_y) {
                    self.persist_transform();
                    self.notify(Change::Transform);
                }
            }
        }
        // the host page must not scroll either way
        Response::CONSUMED
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> Response {
        self.tick(event.timestamp_ms);
        let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        let step = self.config.canvas.wheel_step;
        match event.key {
            Key::ZoomIn => self.zoom_canvas(step, center),
            Key::ZoomOut => self.zoom_canvas(1.0 / step, center),
            Key::ResetZoom => self.reset_transform(),
            Key::Escape => self.clear_selection(),
            Key::Other => return Response::Ignored,
        }
        Response::CONSUMED
    }

    fn zoom_canvas(&mut self, factor: f64, anchor: Point) {
        if self.canvas.zoom_by(factor, anchor) {
            self.persist_transform();
            self.notify(Change::Transform);
        }
    }

    fn reset_transform(&mut self) {
        self.set_canvas_transform(Transform::IDENTITY);
    }

    // ----- actions -----

    /// Merge absolute positions into the position overrides.
    pub fn set_positions(&mut self, positions: BTreeMap<String, Point>) {
        self.overrides.set_positions(positions);
        self.persist_overrides();
        self.layout_changed();
    }

    pub fn set_position(&mut self, table: &str, position: Point) {
        self.set_positions(BTreeMap::from([(table.to_string(), position)]));
    }

    /// Set one table's zoom, clamped. Returns the stored value.
    pub fn set_scale(&mut self, table: &str, scale: f64) -> f64 {
        let applied = self
            .overrides
            .set_scale(table, scale, self.config.node.bounds());
        self.persist_overrides();
        self.layout_changed();
        applied
    }

    pub fn bring_to_front(&mut self, table: &str) -> i64 {
        let z = self.overrides.bring_to_front(table);
        self.persist_overrides();
        self.layout_changed();
        z
    }

    /// Select a column; selecting the selected column clears it.
    pub fn select_column(&mut self, column: ColumnRef) {
        if self.selected_column.as_ref() == Some(&column) {
            self.selected_column = None;
        } else {
            self.selected_column = Some(column);
        }
        self.refresh_highlights();
        self.notify(Change::Selection);
    }

    /// Select a table; selecting the selected table clears it.
    pub fn select_table(&mut self, table: &str) {
        if self.selected_table.as_deref() == Some(table) {
            self.selected_table = None;
        } else {
            self.selected_table = Some(table.to_string());
        }
        self.notify(Change::Selection);
    }

    pub fn clear_selection(&mut self) {
        if self.selected_column.is_none() && self.selected_table.is_none() {
            return;
        }
        self.selected_column = None;
        self.selected_table = None;
        self.refresh_highlights();
        self.notify(Change::Selection);
    }

    pub fn set_hover(&mut self, table: Option<String>) {
        if self.hovered_table != table {
            self.hovered_table = table;
            self.notify(Change::Selection);
        }
    }

    fn refresh_highlights(&mut self) {
        self.highlights = compute_highlights(&self.topology, self.selected_column.as_ref());
    }

    pub fn set_canvas_transform(&mut self, transform: Transform) {
        self.canvas.set_transform(transform);
        self.persist_transform();
        self.notify(Change::Transform);
    }

    /// Hide or show a table. Returns whether it is now hidden.
    pub fn toggle_visibility(&mut self, table: &str) -> bool {
        let hidden = if self.hidden.remove(table) {
            false
        } else {
            self.hidden.insert(table.to_string());
            true
        };
        self.layout_changed();
        hidden
    }

    pub fn show_all(&mut self) {
        if !self.hidden.is_empty() {
            self.hidden.clear();
            self.layout_changed();
        }
    }

    pub fn hide_tables<I, S>(&mut self, tables: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(tables.into_iter().map(Into::into));
        self.layout_changed();
    }

    /// Drop every override and the persisted record.
    pub fn reset_layout(&mut self) {
        match self.store.reset(&self.diagram_id, self.now_ms) {
            Ok(()) => {}
            Err(StoreError::NotHydrated(id)) => debug!(diagram = %id, "store not hydrated, reset kept in memory"),
            Err(e) => warn!(error = %e, "failed to reset persisted layout"),
        }
        info!(diagram = %self.diagram_id, "layout reset");
        self.overrides = Overrides::default();
        self.canvas.reset();
        self.fullscreen = false;
        self.layout_changed();
        self.notify(Change::Transform);
        self.notify(Change::Persistence);
    }

    /// Flip the verbose flag of a table. Returns the new state.
    pub fn toggle_verbose(&mut self, table: &str) -> bool {
        let verbose = self.overrides.toggle_verbose(table);
        self.persist(LayoutPatch::verbose_tables(self.overrides.verbose_tables.clone()));
        self.layout_changed();
        verbose
    }

    pub fn set_fullscreen(&mut self, on: bool) {
        if self.fullscreen == on {
            return;
        }
        self.fullscreen = on;
        self.persist(LayoutPatch::fullscreen(on));
        self.notify(Change::Persistence);
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.set_fullscreen(!self.fullscreen);
        self.fullscreen
    }

    /// Size of the host viewport in view units.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width.max(0.0), height.max(0.0));
    }

    /// Fit the whole layout into the viewport.
    pub fn fit_to_view(&mut self) {
        let fit = self.canvas.fit_transform(self.layout.view_box, self.viewport);
        self.set_canvas_transform(fit);
    }

    /// Pan so `table` sits in the middle of the viewport. False if the table
    /// is not laid out.
    pub fn focus_table(&mut self, table: &str) -> bool {
        let Some(center) = self.layout.tables.get(table).map(|t| t.bounds().center()) else {
            return false;
        };
        self.canvas.center_on(center, self.viewport);
        self.persist_transform();
        self.notify(Change::Transform);
        true
    }

    /// Swap in a new topology. When its id differs, override state is read
    /// for the new id; otherwise current overrides carry over by table name.
    pub fn set_topology(&mut self, topology: SchemaTopology) {
        let id = diagram_id(&topology, self.title.as_deref());
        self.topology = topology;
        self.nodes.cancel();
        self.canvas.cancel();
        self.pointers.clear();

        if id != self.diagram_id {
            info!(from = %self.diagram_id, to = %id, "diagram id changed");
            self.diagram_id = id;
            match self.store.get(&self.diagram_id).cloned() {
                Some(record) => {
                    self.overrides = record.overrides();
                    self.canvas.set_transform(record.canvas_transform);
                    self.fullscreen = record.is_fullscreen;
                }
                None => {
                    self.overrides = Overrides::default();
                    self.canvas.reset();
                    self.fullscreen = false;
                }
            }
            self.notify(Change::Transform);
        }

        if self
            .selected_column
            .as_ref()
            .is_some_and(|c| self.topology.column(c).is_none())
        {
            self.selected_column = None;
        }
        if self
            .selected_table
            .as_deref()
            .is_some_and(|t| self.topology.table(t).is_none())
        {
            self.selected_table = None;
        }
        self.refresh_highlights();
        self.layout_changed();
        self.notify(Change::Selection);
    }

    // ----- queries -----

    pub fn topology(&self) -> &SchemaTopology {
        &self.topology
    }

    pub fn layout(&self) -> &DiagramLayout {
        &self.layout
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn transform(&self) -> Transform {
        self.canvas.transform()
    }

    pub fn diagram_id(&self) -> &str {
        &self.diagram_id
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn highlights(&self) -> Option<&HighlightState> {
        self.highlights.as_ref()
    }

    pub fn selected_column(&self) -> Option<&ColumnRef> {
        self.selected_column.as_ref()
    }

    pub fn selected_table(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    pub fn hovered_table(&self) -> Option<&str> {
        self.hovered_table.as_deref()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Relationships lit by the hovered or selected table.
    pub fn table_highlights(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for table in [self.hovered_table.as_deref(), self.selected_table.as_deref()]
            .into_iter()
            .flatten()
        {
            ids.extend(table_relationships(&self.topology, table));
        }
        ids
    }

    /// Tables in drawing order, back to front.
    pub fn z_order(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.layout.tables.keys().map(String::as_str).collect();
        names.sort_by(|a, b| {
            self.overrides
                .z_index(a)
                .cmp(&self.overrides.z_index(b))
                .then_with(|| a.cmp(b))
        });
        names
    }

    /// Everything the renderer needs besides the layout.
    pub fn scene(&self) -> Scene {
        Scene {
            highlights: self.highlights.clone(),
            table_relationships: self.table_highlights(),
            selected_table: self.selected_table.clone(),
            z_indexes: self.overrides.z_indexes.clone(),
            verbose_tables: self.overrides.verbose_tables.clone(),
            transform: Some(self.canvas.transform()),
        }
    }
}
