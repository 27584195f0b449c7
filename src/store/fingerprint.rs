//! Stable persistence key for a topology.
//!
//! The key hashes structure only: sorted table names and sorted relationship
//! ids. Reordering tables or renaming the diagram keeps the key; adding or
//! removing a table or relationship changes it.

use crate::topology::SchemaTopology;
use sha3::{Digest, Sha3_256};

const DIGEST_CHARS: usize = 16;

pub fn diagram_id(topology: &SchemaTopology, title: Option<&str>) -> String {
    let mut tables: Vec<&str> = topology.tables.iter().map(|t| t.name.as_str()).collect();
    tables.sort_unstable();
    let mut relationships: Vec<&str> = topology.relationships.iter().map(|r| r.id.as_str()).collect();
    relationships.sort_unstable();

    let mut hasher = Sha3_256::new();
    for name in &tables {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    // list separator
    hasher.update([0xffu8]);
    for id in &relationships {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    let digest = &digest[..DIGEST_CHARS];

    match title.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => format!("{slug}--{digest}"),
        None => digest.to_string(),
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Column, Table};

    fn topo(order: &[&str]) -> SchemaTopology {
        let tables = order
            .iter()
            .map(|name| match *name {
                "posts" => Table::new("posts")
                    .column(Column::pk("id", "int"))
                    .column(Column::new("user_id", "int").references("users", "id")),
                other => Table::new(other).column(Column::pk("id", "int")),
            })
            .collect();
        SchemaTopology::new(tables, vec![])
    }

    #[test]
    fn test_order_independent() {
        let a = diagram_id(&topo(&["users", "posts"]), None);
        let b = diagram_id(&topo(&["posts", "users"]), None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_structure_changes_key() {
        let a = diagram_id(&topo(&["users", "posts"]), None);
        let b = diagram_id(&topo(&["users", "posts", "tags"]), None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_title_prefix() {
        let id = diagram_id(&topo(&["users"]), Some("  My Blog: v2! "));
        assert!(id.starts_with("my-blog-v2--"));
        let bare = diagram_id(&topo(&["users"]), Some("!!!"));
        assert_eq!(bare.len(), 16);
    }
}
