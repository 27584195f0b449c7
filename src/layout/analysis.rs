//! Graph analysis: visibility filtering, connected components and tiers.

use crate::topology::{Relationship, SchemaTopology, Table};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Tables not in `hidden`, in topology order.
pub fn visible_tables<'a>(topology: &'a SchemaTopology, hidden: &BTreeSet<String>) -> Vec<&'a Table> {
    topology
        .tables
        .iter()
        .filter(|t| !hidden.contains(&t.name))
        .collect()
}

/// Valid relationships whose endpoints are both visible.
pub fn visible_relationships<'a>(
    topology: &'a SchemaTopology,
    visible: &HashSet<&str>,
) -> Vec<&'a Relationship> {
    topology
        .valid_relationships()
        .into_iter()
        .filter(|r| visible.contains(r.from.table.as_str()) && visible.contains(r.to.table.as_str()))
        .collect()
}

/// Undirected connected components. Members keep topology order; components
/// are ordered by their first member.
pub fn connected_components<'a>(tables: &[&'a Table], relationships: &[&Relationship]) -> Vec<Vec<&'a str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for rel in relationships {
        if rel.is_self_ref() {
            continue;
        }
        adjacency
            .entry(rel.from.table.as_str())
            .or_default()
            .push(rel.to.table.as_str());
        adjacency
            .entry(rel.to.table.as_str())
            .or_default()
            .push(rel.from.table.as_str());
    }

    let order: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut component_of: HashMap<&str, usize> = HashMap::new();
    let mut components: Vec<Vec<&'a str>> = Vec::new();

    for table in tables {
        let start = table.name.as_str();
        if component_of.contains_key(start) {
            continue;
        }
        let id = components.len();
        let mut members = vec![start];
        component_of.insert(start, id);
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for &next in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(&idx) = order.get(next) {
                    if !component_of.contains_key(next) {
                        component_of.insert(next, id);
                        members.push(tables[idx].name.as_str());
                        stack.push(next);
                    }
                }
            }
        }
        members.sort_by_key(|m| order.get(m).copied().unwrap_or(usize::MAX));
        components.push(members);
    }

    components
}

/// Longest path over FK -> PK edges: tables with no outgoing FK sit at tier 0,
/// every other table one tier past its deepest target. Edges back into the
/// current traversal path are ignored so cycles terminate.
pub fn assign_tiers<'a>(members: &[&'a str], relationships: &[&Relationship]) -> HashMap<&'a str, usize> {
    let member_set: HashSet<&str> = members.iter().copied().collect();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for rel in relationships {
        if rel.is_self_ref() {
            continue;
        }
        let from = rel.from.table.as_str();
        let to = rel.to.table.as_str();
        if member_set.contains(from) && member_set.contains(to) {
            outgoing.entry(from).or_default().push(to);
        }
    }

    let mut tiers: HashMap<&str, usize> = HashMap::new();
    let mut on_path: HashSet<&str> = HashSet::new();
    for &member in members {
        tier_of(member, &outgoing, &mut tiers, &mut on_path);
    }

    members
        .iter()
        .map(|&m| (m, tiers.get(m).copied().unwrap_or(0)))
        .collect()
}

fn tier_of<'b>(
    table: &'b str,
    outgoing: &HashMap<&'b str, Vec<&'b str>>,
    tiers: &mut HashMap<&'b str, usize>,
    on_path: &mut HashSet<&'b str>,
) -> usize {
    if let Some(&t) = tiers.get(table) {
        return t;
    }
    on_path.insert(table);

    let mut tier = 0;
    for &target in outgoing.get(table).map(Vec::as_slice).unwrap_or(&[]) {
        if on_path.contains(target) {
            continue;
        }
        tier = tier.max(tier_of(target, outgoing, tiers, on_path) + 1);
    }

    on_path.remove(table);
    tiers.insert(table, tier);
    tier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Column, Table};

    fn chain() -> SchemaTopology {
        SchemaTopology::new(
            vec![
                Table::new("users").column(Column::pk("id", "int")),
                Table::new("posts")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("user_id", "int").references("users", "id")),
                Table::new("comments")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("post_id", "int").references("posts", "id"))
                    .column(Column::new("user_id", "int").references("users", "id")),
                Table::new("tags").column(Column::pk("id", "int")),
            ],
            vec![],
        )
    }

    #[test]
    fn test_components() {
        let t = chain();
        let tables = visible_tables(&t, &BTreeSet::new());
        let visible: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let rels = visible_relationships(&t, &visible);
        let comps = connected_components(&tables, &rels);
        assert_eq!(comps, vec![vec!["users", "posts", "comments"], vec!["tags"]]);
    }

    #[test]
    fn test_longest_path_tiers() {
        let t = chain();
        let tables = visible_tables(&t, &BTreeSet::new());
        let visible: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let rels = visible_relationships(&t, &visible);
        let tiers = assign_tiers(&["users", "posts", "comments"], &rels);
        assert_eq!(tiers["users"], 0);
        assert_eq!(tiers["posts"], 1);
        // comments -> posts -> users is longer than comments -> users
        assert_eq!(tiers["comments"], 2);
    }

    #[test]
    fn test_cycle_terminates() {
        let t = SchemaTopology::new(
            vec![
                Table::new("a").column(Column::pk("id", "int")).column(Column::new("b_id", "int").references("b", "id")),
                Table::new("b").column(Column::pk("id", "int")).column(Column::new("a_id", "int").references("a", "id")),
            ],
            vec![],
        );
        let rels: Vec<&Relationship> = t.relationships.iter().collect();
        let tiers = assign_tiers(&["a", "b"], &rels);
        assert_eq!(tiers.len(), 2);
        assert_ne!(tiers["a"], tiers["b"]);
    }

    #[test]
    fn test_hidden_table_splits_component() {
        let t = chain();
        let hidden = BTreeSet::from(["posts".to_string(), "users".to_string()]);
        let tables = visible_tables(&t, &hidden);
        let visible: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let rels = visible_relationships(&t, &visible);
        assert!(rels.is_empty());
        assert_eq!(connected_components(&tables, &rels).len(), 2);
    }
}
