//! Deterministic tier layout of a schema topology.
//!
//! Tables are split into connected components, ranked into tiers by the
//! longest FK -> PK path, and placed on a grid. Position overrides replace the
//! computed position of their table and nothing else.

mod analysis;
mod anchors;
mod engine;
mod placement;
mod routing;
mod types;

pub use anchors::Facing;
pub use engine::LayoutEngine;
pub use types::{Anchor, DiagramLayout, Hit, LayoutTable, RelationshipPath, Side};

use crate::overrides::Overrides;
use crate::topology::SchemaTopology;
use std::collections::BTreeSet;

/// [`LayoutEngine::layout`] with the default configuration.
pub fn compute_layout(topology: &SchemaTopology, hidden: &BTreeSet<String>, overrides: &Overrides) -> DiagramLayout {
    LayoutEngine::default().layout(topology, hidden, overrides)
}
