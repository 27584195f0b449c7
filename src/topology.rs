//! Schema topology: tables, key relationships and optional domains.
//!
//! The topology is produced by an external introspection step and handed to the
//! engine as JSON or built in code. It is treated as immutable for a render pass.

use crate::error::TopologyError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// `{table, column}` pair naming one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            is_primary_key: false,
            foreign_key: None,
            comment: None,
            example: None,
        }
    }

    pub fn pk(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self::new(name, typ).primary_key()
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ColumnRef::new(table, column));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }
}

/// Directed FK -> PK edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub from: ColumnRef,
    pub to: ColumnRef,
}

impl Relationship {
    pub fn new(from: ColumnRef, to: ColumnRef) -> Self {
        let id = relationship_id(&from, &to);
        Self { id, from, to }
    }

    pub fn touches(&self, table: &str) -> bool {
        self.from.table == table || self.to.table == table
    }

    pub fn is_self_ref(&self) -> bool {
        self.from.table == self.to.table
    }
}

/// `fromTable.fromCol-toTable.toCol`
pub fn relationship_id(from: &ColumnRef, to: &ColumnRef) -> String {
    format!("{}.{}-{}.{}", from.table, from.column, to.table, to.column)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaTopology {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub domains: Vec<Domain>,
}

impl SchemaTopology {
    /// Build from tables; relationships are derived from column foreign keys.
    pub fn new(tables: Vec<Table>, domains: Vec<Domain>) -> Self {
        let mut topology = Self {
            tables,
            relationships: Vec::new(),
            domains,
        };
        topology.normalize();
        topology
    }

    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        let mut topology: SchemaTopology = serde_json::from_str(json)?;
        topology.normalize();
        Ok(topology)
    }

    /// Dedupe tables by name, derive FK relationships from columns and assign
    /// ids. Column-derived relationships come first, in table order. Columns
    /// named as a source only in the relationship list get that target as
    /// their foreign key.
    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.tables.retain(|t| {
            let fresh = seen.insert(t.name.clone());
            if !fresh {
                warn!(table = %t.name, "duplicate table name in topology, keeping the first");
            }
            fresh
        });

        let explicit = std::mem::take(&mut self.relationships);
        let derived = self.tables.iter().flat_map(|t| {
            t.columns.iter().filter_map(|c| {
                c.foreign_key
                    .as_ref()
                    .map(|target| Relationship::new(ColumnRef::new(&t.name, &c.name), target.clone()))
            })
        });

        let mut ids = HashSet::new();
        let mut relationships = Vec::new();
        for rel in derived.chain(explicit.into_iter().map(|r| Relationship::new(r.from, r.to))) {
            if ids.insert(rel.id.clone()) {
                relationships.push(rel);
            }
        }
        for rel in &relationships {
            let column = self
                .tables
                .iter_mut()
                .find(|t| t.name == rel.from.table)
                .and_then(|t| t.columns.iter_mut().find(|c| c.name == rel.from.column));
            if let Some(column) = column.filter(|c| c.foreign_key.is_none()) {
                column.foreign_key = Some(rel.to.clone());
            }
        }
        self.relationships = relationships;
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn column(&self, r: &ColumnRef) -> Option<&Column> {
        self.table(&r.table)
            .and_then(|t| t.find_column(&r.column))
            .map(|(_, c)| c)
    }

    /// Whether both endpoints of `rel` name an existing table and column.
    pub fn resolves(&self, rel: &Relationship) -> bool {
        self.column(&rel.from).is_some() && self.column(&rel.to).is_some()
    }

    /// Relationships whose endpoints exist; malformed ones are dropped.
    pub fn valid_relationships(&self) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|rel| {
                let ok = self.resolves(rel);
                if !ok {
                    debug!(relationship = %rel.id, "dropping relationship with unknown endpoint");
                }
                ok
            })
            .collect()
    }

    /// First domain claiming each table; later memberships are ignored.
    pub fn domain_of(&self, table: &str) -> Option<&Domain> {
        self.domains
            .iter()
            .find(|d| d.tables.iter().any(|t| t == table))
    }
}
