use redb::{ReadableTable, TableDefinition};

use lectern_core::{Collection, EdgeType, NodeLabel, NodeRef, StorageError};

use crate::db_error;

/// Table for storing user profiles.
/// Key: profile key (`user:<email>`)
/// Value: serialized UserProfile as bytes
pub const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Catalog collections, one table each.
/// Key: ObjectId as 24 hex characters
/// Value: JSON document as bytes
pub const COURSES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("courses");
pub const UNITS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("units");
pub const CLASSES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("classes");

/// Table for storing graph nodes.
/// Key: see `encode_node_key`
/// Value: serialized Node as bytes
pub const NODES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Table for storing graph edges.
/// Key: see `encode_edge_key`
/// Value: serialized Edge as bytes
pub const EDGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("edges");

/// Reverse index over edges, written alongside `EDGES_TABLE`.
/// Key: see `encode_edge_target_key`
/// Value: serialized Edge as bytes
pub const EDGES_BY_TARGET_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("edges_by_target");

/// Separates key components. Never appears in validated emails or hex ids.
const SEP: char = '\u{1f}';

pub fn collection_table(
    collection: Collection,
) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match collection {
        Collection::Courses => COURSES_TABLE,
        Collection::Units => UNITS_TABLE,
        Collection::Classes => CLASSES_TABLE,
    }
}

/// Encode a node key as `Label<SEP>key`, so every label forms one contiguous range.
pub fn encode_node_key(node: &NodeRef) -> String {
    format!("{}{}{}", node.label.as_str(), SEP, node.key)
}

/// Prefix shared by every node key of a label.
pub fn node_label_prefix(label: NodeLabel) -> String {
    format!("{}{}", label.as_str(), SEP)
}

/// Encode an edge key. Sorts by edge type first, then origin, then target.
pub fn encode_edge_key(edge_type: EdgeType, from: &NodeRef, to: &NodeRef) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        edge_type.as_str(),
        encode_node_key(from),
        encode_node_key(to),
        sep = SEP
    )
}

/// Prefix shared by every edge key of a type.
pub fn edge_type_prefix(edge_type: EdgeType) -> String {
    format!("{}{}", edge_type.as_str(), SEP)
}

/// Prefix shared by every edge of a type leaving `from`.
pub fn edge_origin_prefix(edge_type: EdgeType, from: &NodeRef) -> String {
    format!(
        "{}{sep}{}{sep}",
        edge_type.as_str(),
        encode_node_key(from),
        sep = SEP
    )
}

/// Encode a reverse-index key. Sorts by edge type first, then target, then origin.
pub fn encode_edge_target_key(edge_type: EdgeType, to: &NodeRef, from: &NodeRef) -> String {
    encode_edge_key(edge_type, to, from)
}

/// Prefix shared by every reverse-index key of a type pointing at `to`.
pub fn edge_target_prefix(edge_type: EdgeType, to: &NodeRef) -> String {
    edge_origin_prefix(edge_type, to)
}

/// Collect every value whose key starts with `prefix`, in key order.
pub fn scan_prefix<T>(table: &T, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.range(prefix..).map_err(db_error)? {
        let (key, value) = entry.map_err(db_error)?;
        if !key.value().starts_with(prefix) {
            break;
        }
        values.push(value.value().to_vec());
    }
    Ok(values)
}
