use std::sync::Arc;

use redb::{Database, ReadableTable, Table};

use lectern_core::{
    Edge, EdgeType, GraphRead, GraphStore, GraphWrite, Node, NodeLabel, NodeRef, Properties,
    StorageError,
};

use crate::db_error;
use crate::tables::{
    edge_origin_prefix, edge_target_prefix, edge_type_prefix, encode_edge_key,
    encode_edge_target_key, encode_node_key, node_label_prefix, scan_prefix,
    EDGES_BY_TARGET_TABLE, EDGES_TABLE, NODES_TABLE,
};

/// redb implementation of GraphStore.
///
/// Each `write` runs inside one redb write transaction, so a closure that
/// fails leaves no partial nodes or edges behind.
pub struct RedbGraphStore {
    db: Arc<Database>,
}

impl RedbGraphStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Initialize the database tables.
    pub fn init_tables(db: &Database) -> Result<(), StorageError> {
        let write_txn = db.begin_write().map_err(db_error)?;
        {
            let _ = write_txn.open_table(NODES_TABLE).map_err(db_error)?;
            let _ = write_txn.open_table(EDGES_TABLE).map_err(db_error)?;
            let _ = write_txn.open_table(EDGES_BY_TARGET_TABLE).map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;
        Ok(())
    }
}

type WriteTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

/// Node and edge tables opened inside one transaction.
struct GraphTables<N, E> {
    nodes: N,
    edges: E,
    /// Same edges as `edges`, keyed by target first.
    targets: E,
}

fn decode_edges(values: Vec<Vec<u8>>) -> Result<Vec<Edge>, StorageError> {
    values
        .iter()
        .map(|bytes| serde_json::from_slice(bytes).map_err(StorageError::from))
        .collect()
}

impl<N, E> GraphRead for GraphTables<N, E>
where
    N: ReadableTable<&'static str, &'static [u8]>,
    E: ReadableTable<&'static str, &'static [u8]>,
{
    fn node(&self, node: &NodeRef) -> Result<Option<Properties>, StorageError> {
        let key = encode_node_key(node);
        match self.nodes.get(key.as_str()).map_err(db_error)? {
            Some(value) => {
                let stored: Node = serde_json::from_slice(value.value())?;
                Ok(Some(stored.props))
            }
            None => Ok(None),
        }
    }

    fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StorageError> {
        scan_prefix(&self.nodes, &node_label_prefix(label))?
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).map_err(StorageError::from))
            .collect()
    }

    fn edges(&self, edge_type: EdgeType) -> Result<Vec<Edge>, StorageError> {
        decode_edges(scan_prefix(&self.edges, &edge_type_prefix(edge_type))?)
    }

    fn edges_into(&self, edge_type: EdgeType, to: &NodeRef) -> Result<Vec<Edge>, StorageError> {
        decode_edges(scan_prefix(&self.targets, &edge_target_prefix(edge_type, to))?)
    }

    fn edges_from(&self, from: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>, StorageError> {
        decode_edges(scan_prefix(&self.edges, &edge_origin_prefix(edge_type, from))?)
    }
}

impl GraphWrite for GraphTables<WriteTable<'_>, WriteTable<'_>> {
    fn create_node(&mut self, node: &NodeRef, props: Properties) -> Result<bool, StorageError> {
        let key = encode_node_key(node);
        if self.nodes.get(key.as_str()).map_err(db_error)?.is_some() {
            return Ok(false);
        }

        let value = serde_json::to_vec(&Node {
            id: node.clone(),
            props,
        })?;
        self.nodes
            .insert(key.as_str(), value.as_slice())
            .map_err(db_error)?;
        Ok(true)
    }

    fn merge_edge(
        &mut self,
        from: &NodeRef,
        to: &NodeRef,
        edge_type: EdgeType,
        props: Properties,
    ) -> Result<bool, StorageError> {
        for endpoint in [from, to] {
            let key = encode_node_key(endpoint);
            if self.nodes.get(key.as_str()).map_err(db_error)?.is_none() {
                return Err(StorageError::MissingRecord(endpoint.to_string()));
            }
        }

        let key = encode_edge_key(edge_type, from, to);
        let value = serde_json::to_vec(&Edge {
            edge_type,
            from: from.clone(),
            to: to.clone(),
            props,
        })?;
        let created = self
            .edges
            .insert(key.as_str(), value.as_slice())
            .map_err(db_error)?
            .is_none();
        self.targets
            .insert(
                encode_edge_target_key(edge_type, to, from).as_str(),
                value.as_slice(),
            )
            .map_err(db_error)?;
        Ok(created)
    }
}

impl GraphStore for RedbGraphStore {
    fn read<R, E>(&self, f: impl FnOnce(&dyn GraphRead) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let read_txn = self.db.begin_read().map_err(db_error)?;
        let tables = GraphTables {
            nodes: read_txn.open_table(NODES_TABLE).map_err(db_error)?,
            edges: read_txn.open_table(EDGES_TABLE).map_err(db_error)?,
            targets: read_txn.open_table(EDGES_BY_TARGET_TABLE).map_err(db_error)?,
        };
        f(&tables)
    }

    fn write<R, E>(
        &self,
        f: impl FnOnce(&mut dyn GraphWrite) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let write_txn = self.db.begin_write().map_err(db_error)?;
        let result = {
            let mut tables = GraphTables {
                nodes: write_txn.open_table(NODES_TABLE).map_err(db_error)?,
                edges: write_txn.open_table(EDGES_TABLE).map_err(db_error)?,
                targets: write_txn.open_table(EDGES_BY_TARGET_TABLE).map_err(db_error)?,
            };
            f(&mut tables)
        };

        match result {
            Ok(value) => {
                write_txn.commit().map_err(db_error)?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort().map_err(db_error)?;
                Err(e)
            }
        }
    }
}
