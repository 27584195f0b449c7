//! Property-based invariants over generated topologies:
//!
//! 1. Layout determinism
//! 2. Position overrides replace their own table and nothing else
//! 3. Hiding then showing a table restores the layout
//! 4. Bring-to-front hands out strictly increasing z values
//! 5. FK and PK selections light the same relationship from either end
//! 6. Hidden tables and their routes never appear

use erd_canvas::diagram::Diagram;
use erd_canvas::geometry::Point;
use erd_canvas::highlight::compute_highlights;
use erd_canvas::layout::compute_layout;
use erd_canvas::overrides::Overrides;
use erd_canvas::topology::{Column, ColumnRef, Relationship, SchemaTopology, Table};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// How a generated edge is declared.
#[derive(Debug, Clone, Copy)]
enum EdgeKind {
    /// A new FK column.
    Column,
    /// The source table's own `id` PK also references the target.
    KeyChain,
    /// A plain column tied to the target only through the relationship list.
    Listed,
}

fn edge_kind() -> impl Strategy<Value = EdgeKind> {
    prop_oneof![Just(EdgeKind::Column), Just(EdgeKind::KeyChain), Just(EdgeKind::Listed)]
}

fn make_topology(table_count: usize, edges: &[(usize, usize, EdgeKind)]) -> SchemaTopology {
    let mut tables: Vec<Table> = (0..table_count)
        .map(|i| Table::new(format!("t{i}")).column(Column::pk("id", "int")))
        .collect();
    let mut listed = Vec::new();
    for (k, &(from, to, kind)) in edges.iter().enumerate() {
        if from >= table_count || to >= table_count {
            continue;
        }
        let target = ColumnRef::new(format!("t{to}"), "id");
        match kind {
            EdgeKind::Column => {
                let column = Column::new(format!("ref_{k}"), "int").references(format!("t{to}"), "id");
                tables[from].columns.push(column);
            }
            EdgeKind::KeyChain if from != to && tables[from].columns[0].foreign_key.is_none() => {
                tables[from].columns[0].foreign_key = Some(target);
            }
            EdgeKind::KeyChain => {}
            EdgeKind::Listed => {
                let name = format!("listed_{k}");
                tables[from].columns.push(Column::new(name.clone(), "int"));
                listed.push(Relationship::new(ColumnRef::new(format!("t{from}"), name), target));
            }
        }
    }

    let raw = SchemaTopology {
        tables,
        relationships: listed,
        domains: vec![],
    };
    SchemaTopology::from_json(&serde_json::to_string(&raw).unwrap()).unwrap()
}

fn topology_strategy() -> impl Strategy<Value = SchemaTopology> {
    (1usize..8)
        .prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n, edge_kind()), 0..10)))
        .prop_map(|(n, edges)| make_topology(n, &edges))
}

proptest! {
    #[test]
    fn prop_layout_is_deterministic(topology in topology_strategy()) {
        let a = compute_layout(&topology, &BTreeSet::new(), &Overrides::default());
        let b = compute_layout(&topology, &BTreeSet::new(), &Overrides::default());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_override_is_pure_substitution(
        topology in topology_strategy(),
        pick in any::<prop::sample::Index>(),
        x in -2000.0f64..2000.0,
        y in -2000.0f64..2000.0,
    ) {
        let base = compute_layout(&topology, &BTreeSet::new(), &Overrides::default());
        let target = topology.tables[pick.index(topology.tables.len())].name.clone();

        let mut overrides = Overrides::default();
        overrides.set_position(&target, Point::new(x, y));
        let moved = compute_layout(&topology, &BTreeSet::new(), &overrides);

        prop_assert_eq!(moved.position(&target), Some(Point::new(x, y)));
        for (name, table) in &base.tables {
            if *name != target {
                prop_assert_eq!(moved.position(name), Some(table.position()));
            }
        }
    }

    #[test]
    fn prop_hide_show_round_trip(topology in topology_strategy(), pick in any::<prop::sample::Index>()) {
        let target = topology.tables[pick.index(topology.tables.len())].name.clone();
        let mut d = Diagram::in_memory(topology);
        d.hydrate_from_json(None);
        let before = d.layout().clone();

        prop_assert!(d.toggle_visibility(&target));
        prop_assert!(!d.layout().tables.contains_key(&target));
        prop_assert!(!d.toggle_visibility(&target));
        prop_assert_eq!(d.layout(), &before);
    }

    #[test]
    fn prop_bring_to_front_is_monotonic(
        topology in topology_strategy(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..12),
    ) {
        let names: Vec<String> = topology.tables.iter().map(|t| t.name.clone()).collect();
        let mut d = Diagram::in_memory(topology);
        d.hydrate_from_json(None);

        let mut last = 0;
        let mut last_table = String::new();
        for pick in picks {
            let table = &names[pick.index(names.len())];
            let z = d.bring_to_front(table);
            prop_assert!(z > last);
            last = z;
            last_table = table.clone();
        }
        prop_assert_eq!(d.z_order().last().copied(), Some(last_table.as_str()));
    }

    #[test]
    fn prop_highlight_is_symmetric(topology in topology_strategy()) {
        for rel in topology.valid_relationships() {
            let from_fk = compute_highlights(&topology, Some(&rel.from));
            prop_assert!(from_fk.is_some());
            let from_fk = from_fk.unwrap();
            prop_assert!(from_fk.highlights_relationship(&rel.id));
            prop_assert!(from_fk.highlights_column(&rel.to.table, &rel.to.column));

            let from_pk = compute_highlights(&topology, Some(&rel.to));
            prop_assert!(from_pk.is_some());
            let from_pk = from_pk.unwrap();
            prop_assert!(from_pk.highlights_relationship(&rel.id));
            prop_assert!(from_pk.highlights_column(&rel.from.table, &rel.from.column));
            prop_assert_eq!(&from_fk.relationships, &from_pk.relationships);
        }
    }

    #[test]
    fn prop_hidden_tables_are_absent(
        topology in topology_strategy(),
        mask in prop::collection::vec(any::<bool>(), 8),
    ) {
        let hidden: BTreeSet<String> = topology
            .tables
            .iter()
            .zip(&mask)
            .filter(|(_, hide)| **hide)
            .map(|(t, _)| t.name.clone())
            .collect();
        let layout = compute_layout(&topology, &hidden, &Overrides::default());

        for name in &hidden {
            prop_assert!(!layout.tables.contains_key(name));
        }
        prop_assert_eq!(layout.tables.len(), topology.tables.len() - hidden.len());
        for path in layout.paths.values() {
            prop_assert!(!hidden.contains(&path.from.table));
            prop_assert!(!hidden.contains(&path.to.table));
        }
    }
}
