//! Key highlighting for a selected column.
//!
//! Selecting an FK or the PK it references lights up the same edge set: the
//! referenced PK, every FK pointing at it, and further keys chained through
//! them. Only the mode differs, which the renderer uses to pick the emphasis
//! direction.

use crate::topology::{ColumnRef, Relationship, SchemaTopology};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    /// Selection made from a referencing column.
    Fk,
    /// Selection made from the referenced key.
    Pk,
}

impl HighlightMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightMode::Fk => "fk",
            HighlightMode::Pk => "pk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Pk,
    Fk,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HighlightedColumn {
    pub table: String,
    pub column: String,
    pub role: KeyRole,
}

impl HighlightedColumn {
    fn new(r: &ColumnRef, role: KeyRole) -> Self {
        Self {
            table: r.table.clone(),
            column: r.column.clone(),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightState {
    pub mode: HighlightMode,
    pub columns: BTreeSet<HighlightedColumn>,
    pub relationships: BTreeSet<String>,
}

impl HighlightState {
    pub fn highlights_column(&self, table: &str, column: &str) -> bool {
        self.columns.iter().any(|c| c.table == table && c.column == column)
    }

    pub fn role_of(&self, table: &str, column: &str) -> Option<KeyRole> {
        self.columns
            .iter()
            .find(|c| c.table == table && c.column == column)
            .map(|c| c.role)
    }

    pub fn highlights_relationship(&self, id: &str) -> bool {
        self.relationships.contains(id)
    }
}

/// Highlight state for `selected`, or `None` when nothing should light up.
///
/// The lit set is every key column and relationship reachable from the
/// selection through valid relationships, so an FK, the PK it references and
/// any key chained beyond them all light the same edges. A column that is the
/// source of a relationship selects in FK mode even when it is also a PK. A
/// plain column, or an FK whose target does not resolve, yields `None`; a PK
/// nobody references yields a state holding just that column.
pub fn compute_highlights(topology: &SchemaTopology, selected: Option<&ColumnRef>) -> Option<HighlightState> {
    let selected = selected?;
    let column = topology.column(selected)?;
    let relationships = topology.valid_relationships();

    let is_source = relationships.iter().any(|rel| rel.from == *selected);
    let is_target = relationships.iter().any(|rel| rel.to == *selected);
    let mode = if is_source {
        HighlightMode::Fk
    } else if is_target || column.is_primary_key {
        HighlightMode::Pk
    } else {
        return None;
    };

    let lit = key_component(&relationships, selected);
    let mut state = HighlightState {
        mode,
        columns: BTreeSet::new(),
        relationships: BTreeSet::new(),
    };
    if lit.is_empty() {
        state.columns.insert(HighlightedColumn::new(selected, KeyRole::Pk));
        return Some(state);
    }

    let targets: BTreeSet<ColumnRef> = lit.iter().map(|rel| rel.to.clone()).collect();
    for rel in lit {
        state.relationships.insert(rel.id.clone());
        for end in [&rel.from, &rel.to] {
            let role = if targets.contains(end) { KeyRole::Pk } else { KeyRole::Fk };
            state.columns.insert(HighlightedColumn::new(end, role));
        }
    }
    Some(state)
}

/// Relationships connected to `start`, walking column to column in either
/// direction.
fn key_component<'a>(relationships: &[&'a Relationship], start: &ColumnRef) -> Vec<&'a Relationship> {
    let mut seen: BTreeSet<&ColumnRef> = BTreeSet::from([start]);
    let mut queue: VecDeque<&ColumnRef> = VecDeque::from([start]);
    let mut lit = Vec::new();
    let mut taken = vec![false; relationships.len()];

    while let Some(current) = queue.pop_front() {
        for (i, rel) in relationships.iter().enumerate() {
            if taken[i] || (rel.from != *current && rel.to != *current) {
                continue;
            }
            taken[i] = true;
            lit.push(*rel);
            for end in [&rel.from, &rel.to] {
                if seen.insert(end) {
                    queue.push_back(end);
                }
            }
        }
    }
    lit
}

/// Ids of every valid relationship touching `table`, for table-level hover.
pub fn table_relationships(topology: &SchemaTopology, table: &str) -> BTreeSet<String> {
    topology
        .valid_relationships()
        .into_iter()
        .filter(|rel| rel.touches(table))
        .map(|rel| rel.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Column, Table};

    fn blog() -> SchemaTopology {
        SchemaTopology::new(
            vec![
                Table::new("users")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("email", "text")),
                Table::new("posts")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("user_id", "int").references("users", "id")),
                Table::new("comments")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("author_id", "int").references("users", "id"))
                    .column(Column::new("post_id", "int").references("posts", "id")),
            ],
            vec![],
        )
    }

    #[test]
    fn test_no_selection() {
        assert_eq!(compute_highlights(&blog(), None), None);
    }

    #[test]
    fn test_fk_selection_includes_siblings() {
        let t = blog();
        let h = compute_highlights(&t, Some(&ColumnRef::new("posts", "user_id"))).unwrap();
        assert_eq!(h.mode, HighlightMode::Fk);
        assert_eq!(h.role_of("users", "id"), Some(KeyRole::Pk));
        assert_eq!(h.role_of("posts", "user_id"), Some(KeyRole::Fk));
        assert_eq!(h.role_of("comments", "author_id"), Some(KeyRole::Fk));
        assert!(!h.highlights_column("comments", "post_id"));
        assert_eq!(h.relationships.len(), 2);
        assert!(h.highlights_relationship("posts.user_id-users.id"));
    }

    #[test]
    fn test_pk_selection_matches_fk_edges() {
        let t = blog();
        let fk = compute_highlights(&t, Some(&ColumnRef::new("comments", "author_id"))).unwrap();
        let pk = compute_highlights(&t, Some(&ColumnRef::new("users", "id"))).unwrap();
        assert_eq!(pk.mode, HighlightMode::Pk);
        assert_eq!(fk.relationships, pk.relationships);
        assert_eq!(fk.columns, pk.columns);
    }

    #[test]
    fn test_plain_column_and_unknown() {
        let t = blog();
        assert_eq!(compute_highlights(&t, Some(&ColumnRef::new("users", "email"))), None);
        assert_eq!(compute_highlights(&t, Some(&ColumnRef::new("users", "nope"))), None);
        assert_eq!(compute_highlights(&t, Some(&ColumnRef::new("ghost", "id"))), None);
    }

    #[test]
    fn test_unreferenced_pk() {
        let t = blog();
        let h = compute_highlights(&t, Some(&ColumnRef::new("comments", "id"))).unwrap();
        assert_eq!(h.columns.len(), 1);
        assert!(h.relationships.is_empty());
    }

    #[test]
    fn test_dangling_fk_is_none() {
        let t = SchemaTopology::new(
            vec![Table::new("a").column(Column::new("b_id", "int").references("b", "id"))],
            vec![],
        );
        assert_eq!(compute_highlights(&t, Some(&ColumnRef::new("a", "b_id"))), None);
    }

    #[test]
    fn test_key_that_is_both_pk_and_fk() {
        // posts.profile_id -> profiles.user_id -> users.id
        let t = SchemaTopology::new(
            vec![
                Table::new("users").column(Column::pk("id", "int")),
                Table::new("profiles").column(Column::pk("user_id", "int").references("users", "id")),
                Table::new("posts")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("profile_id", "int").references("profiles", "user_id")),
            ],
            vec![],
        );
        let from_posts = compute_highlights(&t, Some(&ColumnRef::new("posts", "profile_id"))).unwrap();
        let from_profiles = compute_highlights(&t, Some(&ColumnRef::new("profiles", "user_id"))).unwrap();
        let from_users = compute_highlights(&t, Some(&ColumnRef::new("users", "id"))).unwrap();

        assert_eq!(from_profiles.mode, HighlightMode::Fk);
        assert_eq!(from_users.mode, HighlightMode::Pk);
        assert_eq!(from_posts.relationships, from_profiles.relationships);
        assert_eq!(from_profiles.relationships, from_users.relationships);
        assert_eq!(from_posts.relationships.len(), 2);
        assert_eq!(from_posts.role_of("profiles", "user_id"), Some(KeyRole::Pk));
        assert_eq!(from_posts.role_of("posts", "profile_id"), Some(KeyRole::Fk));
    }

    #[test]
    fn test_relationship_listed_outside_columns() {
        let t = SchemaTopology::from_json(
            r#"{
                "tables": [
                    {"name": "users", "columns": [{"name": "id", "type": "int", "isPrimaryKey": true}]},
                    {"name": "posts", "columns": [{"name": "user_id", "type": "int"}]}
                ],
                "relationships": [
                    {"from": {"table": "posts", "column": "user_id"}, "to": {"table": "users", "column": "id"}}
                ]
            }"#,
        )
        .unwrap();
        let fk = compute_highlights(&t, Some(&ColumnRef::new("posts", "user_id"))).unwrap();
        let pk = compute_highlights(&t, Some(&ColumnRef::new("users", "id"))).unwrap();
        assert_eq!(fk.mode, HighlightMode::Fk);
        assert_eq!(fk.relationships, BTreeSet::from(["posts.user_id-users.id".to_string()]));
        assert_eq!(fk.relationships, pk.relationships);
    }

    #[test]
    fn test_table_relationships() {
        let t = blog();
        let rels = table_relationships(&t, "posts");
        assert_eq!(rels.len(), 2);
        assert!(rels.contains("comments.post_id-posts.id"));
        assert!(table_relationships(&t, "ghost").is_empty());
    }
}
