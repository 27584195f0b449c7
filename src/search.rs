use crate::topology::SchemaTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Exact,
    Prefix,
    Substring,
    Column,
}

/// Table names matching `query`, best match first.
///
/// Matching is case-insensitive: exact name, then name prefix, then name
/// substring, then any column name containing the query. Ties sort by name.
pub fn search_tables(topology: &SchemaTopology, query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<(Rank, &str)> = topology
        .tables
        .iter()
        .filter_map(|table| {
            let name = table.name.to_lowercase();
            let rank = if name == needle {
                Rank::Exact
            } else if name.starts_with(&needle) {
                Rank::Prefix
            } else if name.contains(&needle) {
                Rank::Substring
            } else if table.columns.iter().any(|c| c.name.to_lowercase().contains(&needle)) {
                Rank::Column
            } else {
                return None;
            };
            Some((rank, table.name.as_str()))
        })
        .collect();

    hits.sort();
    hits.into_iter().map(|(_, name)| name.to_string()).collect()
}
