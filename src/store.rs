//! Persistence of override state, keyed by diagram id.
//!
//! The store starts unhydrated. Until the one-shot load completes, reads return
//! nothing and writes are rejected, so defaults can never overwrite persisted
//! data. Writes are merged per field group and flushed in debounced batches.

mod backend;
mod fingerprint;
mod record;

#[cfg(not(target_arch = "wasm32"))]
pub use backend::FileBackend;
pub use backend::{MemoryBackend, StorageBackend};
pub use fingerprint::diagram_id;
pub use record::{LayoutPatch, PersistedLayout, decode_records};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::geometry::{Point, Transform};
use crate::observer::{Observers, SubscriptionId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct PersistenceStore<B> {
    backend: B,
    records: BTreeMap<String, PersistedLayout>,
    hydrated: bool,
    /// Time of the first change not yet flushed.
    dirty_since: Option<f64>,
    flush_requested: bool,
    debounce_ms: f64,
    observers: Observers<String>,
}

impl<B: StorageBackend> PersistenceStore<B> {
    pub fn new(backend: B, config: &StoreConfig) -> Self {
        Self {
            backend,
            records: BTreeMap::new(),
            hydrated: false,
            dirty_since: None,
            flush_requested: false,
            debounce_ms: config.debounce_ms.max(0.0),
            observers: Observers::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Load the durable document. A failed read counts as "no prior data".
    /// Only the first call loads; later calls do nothing.
    pub async fn rehydrate(&mut self) {
        if self.hydrated {
            debug!("store already hydrated");
            return;
        }
        let payload = match self.backend.load().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to load persisted layouts, starting empty");
                None
            }
        };
        self.hydrate_from_json(payload.as_deref());
    }

    /// Hydrate from a document the host already read. `None` means the medium
    /// held nothing.
    pub fn hydrate_from_json(&mut self, payload: Option<&str>) {
        if self.hydrated {
            debug!("store already hydrated");
            return;
        }
        self.records = payload.map(decode_records).unwrap_or_default();
        self.hydrated = true;
        info!(records = self.records.len(), "store hydrated");
    }

    /// Persisted record for `id`; `None` before hydration or when absent.
    pub fn get(&self, id: &str) -> Option<&PersistedLayout> {
        if !self.hydrated {
            return None;
        }
        self.records.get(id)
    }

    /// Merge `patch` into the record for `id`, creating it on first write.
    pub fn set(&mut self, id: &str, patch: LayoutPatch, now_ms: f64) -> Result<(), StoreError> {
        if !self.hydrated {
            return Err(StoreError::NotHydrated(id.to_string()));
        }
        if patch.is_empty() {
            return Ok(());
        }
        patch.apply(self.records.entry(id.to_string()).or_default());
        self.mark_dirty(now_ms);
        self.observers.notify(&id.to_string());
        Ok(())
    }

    pub fn set_positions(&mut self, id: &str, positions: BTreeMap<String, Point>, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::positions(positions), now_ms)
    }

    pub fn set_scales(&mut self, id: &str, scales: BTreeMap<String, f64>, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::scales(scales), now_ms)
    }

    pub fn set_z_order(&mut self, id: &str, z_indexes: BTreeMap<String, i64>, z_counter: i64, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::z_order(z_indexes, z_counter), now_ms)
    }

    pub fn set_canvas_transform(&mut self, id: &str, transform: Transform, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::canvas_transform(transform), now_ms)
    }

    pub fn set_fullscreen(&mut self, id: &str, on: bool, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::fullscreen(on), now_ms)
    }

    pub fn set_verbose_tables(&mut self, id: &str, tables: BTreeSet<String>, now_ms: f64) -> Result<(), StoreError> {
        self.set(id, LayoutPatch::verbose_tables(tables), now_ms)
    }

    /// Delete the whole record; the next `get` sees a first visit.
    pub fn reset(&mut self, id: &str, now_ms: f64) -> Result<(), StoreError> {
        if !self.hydrated {
            return Err(StoreError::NotHydrated(id.to_string()));
        }
        if self.records.remove(id).is_some() {
            info!(diagram = %id, "persisted layout reset");
            self.mark_dirty(now_ms);
            self.request_flush();
        }
        self.observers.notify(&id.to_string());
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(&self.records)?)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Flush immediately at the next check, e.g. when a gesture ends.
    pub fn request_flush(&mut self) {
        if self.is_dirty() {
            self.flush_requested = true;
        }
    }

    pub fn is_flush_due(&self, now_ms: f64) -> bool {
        match self.dirty_since {
            Some(since) => self.flush_requested || now_ms - since >= self.debounce_ms,
            None => false,
        }
    }

    /// Serialized document if there are unflushed changes, marking them
    /// flushed. For hosts that write the medium themselves.
    pub fn take_flush_payload(&mut self) -> Result<Option<String>, StoreError> {
        if !self.is_dirty() {
            return Ok(None);
        }
        let payload = self.export_json()?;
        self.dirty_since = None;
        self.flush_requested = false;
        Ok(Some(payload))
    }

    /// Write unflushed changes to the backend, clearing it once no record is
    /// left. Returns whether anything was written; on failure the changes
    /// stay pending.
    pub async fn flush(&mut self) -> Result<bool, StoreError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        if self.records.is_empty() {
            self.backend.clear().await?;
        } else {
            let payload = self.export_json()?;
            self.backend.save(&payload).await?;
        }
        self.dirty_since = None;
        self.flush_requested = false;
        debug!(records = self.records.len(), "store flushed");
        Ok(true)
    }

    pub async fn flush_if_due(&mut self, now_ms: f64) -> Result<bool, StoreError> {
        if !self.is_flush_due(now_ms) {
            return Ok(false);
        }
        self.flush().await
    }

    /// Called with the diagram id after every set or reset.
    pub fn subscribe(&mut self, callback: impl FnMut(&String) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn mark_dirty(&mut self, now_ms: f64) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(now_ms);
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> PersistenceStore<MemoryBackend> {
        PersistenceStore::new(MemoryBackend::new(), &StoreConfig::default())
    }

    fn positions(pairs: &[(&str, f64, f64)]) -> BTreeMap<String, Point> {
        pairs
            .iter()
            .map(|(n, x, y)| (n.to_string(), Point::new(*x, *y)))
            .collect()
    }

    #[test]
    fn test_writes_rejected_before_hydration() {
        let mut s = store();
        let err = s.set_positions("d", positions(&[("a", 1.0, 1.0)]), 0.0).unwrap_err();
        assert!(matches!(err, StoreError::NotHydrated(_)));
        assert!(s.get("d").is_none());
        assert!(!s.is_dirty());
        assert!(s.reset("d", 0.0).is_err());
    }

    #[tokio::test]
    async fn test_hydration_does_not_lose_persisted_data() {
        let backend = MemoryBackend::with_contents(r#"{"d": {"positions": {"a": {"x": 5, "y": 6}}}}"#);
        let mut s = PersistenceStore::new(backend.clone(), &StoreConfig::default());

        // an early default write must not reach the medium
        assert!(s.set_positions("d", BTreeMap::new(), 0.0).is_err());
        assert!(s.flush().await.is_ok_and(|wrote| !wrote));

        s.rehydrate().await;
        assert_eq!(s.get("d").unwrap().positions["a"], Point::new(5.0, 6.0));
        assert!(backend.contents().unwrap().contains("\"x\": 5"));
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let mut s = store();
        s.rehydrate().await;
        let p = positions(&[("posts", 410.0, -20.0)]);
        s.set_positions("d", p.clone(), 0.0).unwrap();
        s.set_fullscreen("d", true, 1.0).unwrap();
        let r = s.get("d").unwrap();
        assert_eq!(r.positions, p);
        assert!(r.is_fullscreen);
        assert_eq!(r.canvas_transform, Transform::IDENTITY);
    }

    #[tokio::test]
    async fn test_reset_removes_record() {
        let mut s = store();
        s.rehydrate().await;
        s.set_scales("d", BTreeMap::from([("a".to_string(), 2.0)]), 0.0).unwrap();
        s.flush().await.unwrap();
        s.reset("d", 10.0).unwrap();
        assert!(s.get("d").is_none());
        assert!(s.is_flush_due(10.0));
        s.flush().await.unwrap();
        assert_eq!(s.backend().contents(), None);
    }

    #[tokio::test]
    async fn test_last_reset_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        let mut s = PersistenceStore::new(FileBackend::new(&path), &StoreConfig::default());
        s.rehydrate().await;
        s.set_fullscreen("d", true, 0.0).unwrap();
        assert!(s.flush().await.unwrap());
        assert!(path.exists());

        s.reset("d", 1.0).unwrap();
        assert!(s.flush().await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_debounce() {
        let mut s = store();
        s.rehydrate().await;
        assert!(!s.is_flush_due(0.0));
        s.set_positions("d", positions(&[("a", 1.0, 0.0)]), 100.0).unwrap();
        s.set_positions("d", positions(&[("a", 2.0, 0.0)]), 300.0).unwrap();
        assert!(!s.is_flush_due(450.0));
        assert!(s.is_flush_due(500.0));
        assert!(s.flush_if_due(500.0).await.unwrap());
        assert!(!s.is_dirty());

        s.set_positions("d", positions(&[("a", 3.0, 0.0)]), 600.0).unwrap();
        s.request_flush();
        assert!(s.is_flush_due(601.0));
    }

    #[tokio::test]
    async fn test_corrupt_medium_loads_empty() {
        let mut s = PersistenceStore::new(MemoryBackend::with_contents("not json"), &StoreConfig::default());
        s.rehydrate().await;
        assert!(s.is_hydrated());
        assert!(s.get("d").is_none());
    }

    #[test]
    fn test_take_payload_and_subscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut s = store();
        let log = Rc::clone(&seen);
        s.subscribe(move |id| log.borrow_mut().push(id.clone()));
        s.hydrate_from_json(None);
        assert_eq!(s.take_flush_payload().unwrap(), None);
        s.set_canvas_transform("d", Transform::new(1.0, 2.0, 0.5), 0.0).unwrap();
        let payload = s.take_flush_payload().unwrap().unwrap();
        assert!(payload.contains("canvasTransform"));
        assert!(!s.is_dirty());
        assert_eq!(*seen.borrow(), vec!["d".to_string()]);
    }
}
