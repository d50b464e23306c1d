use serde_json::Value;

use crate::catalog::{CatalogDocument, Collection};
use crate::error::StorageError;
use crate::graph::{Aggregation, Edge, EdgeType, Node, NodeLabel, NodeRef, Properties};
use crate::ids::ObjectId;
use crate::profile::UserProfile;

/// Key/value store holding one whole user record per profile key.
pub trait ProfileStore: Send + Sync {
    /// Get the profile stored under `key`.
    fn get(&self, key: &str) -> Result<Option<UserProfile>, StorageError>;

    /// Overwrite the whole record under `key`.
    fn put(&self, key: &str, profile: &UserProfile) -> Result<(), StorageError>;

    /// Write `profile` with version `expected + 1`, only if the stored version
    /// is still `expected` (an absent record counts as version 0).
    /// Returns Ok(false) if the record moved on in the meantime.
    fn put_if_version(
        &self,
        key: &str,
        profile: &UserProfile,
        expected: u64,
    ) -> Result<bool, StorageError>;

    /// All keys starting with `prefix`, in key order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Document store holding the course/unit/class hierarchy.
pub trait CatalogStore: Send + Sync {
    /// Get the raw JSON document.
    fn get_document(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> Result<Option<Value>, StorageError>;

    /// Insert or replace a raw JSON document.
    fn put_document(
        &self,
        collection: Collection,
        id: ObjectId,
        document: Value,
    ) -> Result<(), StorageError>;

    /// Set one top-level field. Returns Ok(false) if no such document exists.
    fn update_field(
        &self,
        collection: Collection,
        id: ObjectId,
        field: &str,
        value: Value,
    ) -> Result<bool, StorageError>;

    /// All documents of a collection, in id order.
    fn documents(&self, collection: Collection) -> Result<Vec<Value>, StorageError>;

    fn find_by_id<D: CatalogDocument>(&self, id: ObjectId) -> Result<Option<D>, StorageError> {
        self.get_document(D::COLLECTION, id)?
            .map(|doc| serde_json::from_value(doc).map_err(StorageError::from))
            .transpose()
    }

    /// Look up several ids at once. Missing ids are skipped.
    fn find_many_by_ids<D: CatalogDocument>(
        &self,
        ids: &[ObjectId],
    ) -> Result<Vec<D>, StorageError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.find_by_id(*id)? {
                found.push(doc);
            }
        }
        Ok(found)
    }

    fn insert<D: CatalogDocument>(&self, document: &D) -> Result<(), StorageError> {
        self.put_document(D::COLLECTION, document.id(), serde_json::to_value(document)?)
    }

    fn scan<D: CatalogDocument>(&self) -> Result<Vec<D>, StorageError> {
        self.documents(D::COLLECTION)?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StorageError::from))
            .collect()
    }
}

/// Read access inside one graph transaction.
pub trait GraphRead {
    fn node(&self, node: &NodeRef) -> Result<Option<Properties>, StorageError>;

    /// All nodes carrying `label`.
    fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StorageError>;

    /// All edges of one type.
    fn edges(&self, edge_type: EdgeType) -> Result<Vec<Edge>, StorageError>;

    fn node_exists(&self, node: &NodeRef) -> Result<bool, StorageError> {
        Ok(self.node(node)?.is_some())
    }

    fn edges_into(&self, edge_type: EdgeType, to: &NodeRef) -> Result<Vec<Edge>, StorageError> {
        Ok(self
            .edges(edge_type)?
            .into_iter()
            .filter(|e| &e.to == to)
            .collect())
    }

    fn edges_from(&self, from: &NodeRef, edge_type: EdgeType) -> Result<Vec<Edge>, StorageError> {
        Ok(self
            .edges(edge_type)?
            .into_iter()
            .filter(|e| &e.from == from)
            .collect())
    }

    /// Aggregate a numeric property over every `edge_type` edge pointing at `target`.
    /// Edges without a numeric `property` are ignored.
    fn aggregate(
        &self,
        edge_type: EdgeType,
        target: &NodeRef,
        property: &str,
        aggregation: Aggregation,
    ) -> Result<Option<f64>, StorageError> {
        let values: Vec<f64> = self
            .edges_into(edge_type, target)?
            .iter()
            .filter_map(|e| e.props.get(property).and_then(Value::as_f64))
            .collect();
        Ok(aggregation.apply(&values))
    }
}

/// Write access inside one graph transaction.
pub trait GraphWrite: GraphRead {
    /// Create the node if absent. An existing node is left untouched.
    /// Returns true if the node was created.
    fn create_node(&mut self, node: &NodeRef, props: Properties) -> Result<bool, StorageError>;

    /// Merge the edge keyed by (from, to, edge_type), replacing its properties.
    /// Both endpoints must exist. Returns true if the edge was created.
    fn merge_edge(
        &mut self,
        from: &NodeRef,
        to: &NodeRef,
        edge_type: EdgeType,
        props: Properties,
    ) -> Result<bool, StorageError>;
}

/// Graph store running closures inside managed transactions.
///
/// `write` commits only when the closure returns Ok; an Err discards every
/// change made inside it.
pub trait GraphStore: Send + Sync {
    fn read<R, E>(&self, f: impl FnOnce(&dyn GraphRead) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>;

    fn write<R, E>(&self, f: impl FnOnce(&mut dyn GraphWrite) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>;

    fn node_exists(&self, node: &NodeRef) -> Result<bool, StorageError> {
        self.read(|g| g.node_exists(node))
    }

    fn upsert_node(&self, node: &NodeRef, props: Properties) -> Result<bool, StorageError> {
        self.write(|g| g.create_node(node, props))
    }

    fn upsert_edge(
        &self,
        from: &NodeRef,
        to: &NodeRef,
        edge_type: EdgeType,
        props: Properties,
    ) -> Result<bool, StorageError> {
        self.write(|g| g.merge_edge(from, to, edge_type, props))
    }

    fn aggregate(
        &self,
        edge_type: EdgeType,
        target: &NodeRef,
        property: &str,
        aggregation: Aggregation,
    ) -> Result<Option<f64>, StorageError> {
        self.read(|g| g.aggregate(edge_type, target, property, aggregation))
    }

    fn count_nodes(&self, label: NodeLabel) -> Result<usize, StorageError> {
        self.read(|g| Ok(g.nodes(label)?.len()))
    }
}

// In-memory implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    fn poisoned<T>(_: T) -> StorageError {
        StorageError::Database("lock poisoned".to_string())
    }

    /// In-memory profile store for testing.
    #[derive(Default)]
    pub struct InMemoryProfileStore {
        profiles: RwLock<BTreeMap<String, UserProfile>>,
        writes: AtomicUsize,
    }

    impl InMemoryProfileStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of successful writes so far.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl ProfileStore for InMemoryProfileStore {
        fn get(&self, key: &str) -> Result<Option<UserProfile>, StorageError> {
            Ok(self.profiles.read().map_err(poisoned)?.get(key).cloned())
        }

        fn put(&self, key: &str, profile: &UserProfile) -> Result<(), StorageError> {
            self.profiles
                .write()
                .map_err(poisoned)?
                .insert(key.to_string(), profile.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn put_if_version(
            &self,
            key: &str,
            profile: &UserProfile,
            expected: u64,
        ) -> Result<bool, StorageError> {
            let mut profiles = self.profiles.write().map_err(poisoned)?;
            let current = profiles.get(key).map(|p| p.version).unwrap_or(0);
            if current != expected {
                return Ok(false);
            }

            let mut next = profile.clone();
            next.version = expected + 1;
            profiles.insert(key.to_string(), next);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            Ok(self
                .profiles
                .read()
                .map_err(poisoned)?
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    /// In-memory catalog store for testing.
    #[derive(Default)]
    pub struct InMemoryCatalogStore {
        documents: RwLock<BTreeMap<(&'static str, ObjectId), Value>>,
    }

    impl InMemoryCatalogStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl CatalogStore for InMemoryCatalogStore {
        fn get_document(
            &self,
            collection: Collection,
            id: ObjectId,
        ) -> Result<Option<Value>, StorageError> {
            Ok(self
                .documents
                .read()
                .map_err(poisoned)?
                .get(&(collection.name(), id))
                .cloned())
        }

        fn put_document(
            &self,
            collection: Collection,
            id: ObjectId,
            document: Value,
        ) -> Result<(), StorageError> {
            self.documents
                .write()
                .map_err(poisoned)?
                .insert((collection.name(), id), document);
            Ok(())
        }

        fn update_field(
            &self,
            collection: Collection,
            id: ObjectId,
            field: &str,
            value: Value,
        ) -> Result<bool, StorageError> {
            let mut documents = self.documents.write().map_err(poisoned)?;
            match documents
                .get_mut(&(collection.name(), id))
                .and_then(Value::as_object_mut)
            {
                Some(doc) => {
                    doc.insert(field.to_string(), value);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn documents(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
            Ok(self
                .documents
                .read()
                .map_err(poisoned)?
                .iter()
                .filter(|((name, _), _)| *name == collection.name())
                .map(|(_, doc)| doc.clone())
                .collect())
        }
    }

    #[derive(Default, Clone)]
    struct GraphState {
        nodes: BTreeMap<NodeRef, Properties>,
        edges: BTreeMap<(EdgeType, NodeRef, NodeRef), Properties>,
    }

    impl GraphRead for GraphState {
        fn node(&self, node: &NodeRef) -> Result<Option<Properties>, StorageError> {
            Ok(self.nodes.get(node).cloned())
        }

        fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StorageError> {
            Ok(self
                .nodes
                .iter()
                .filter(|(id, _)| id.label == label)
                .map(|(id, props)| Node {
                    id: id.clone(),
                    props: props.clone(),
                })
                .collect())
        }

        fn edges(&self, edge_type: EdgeType) -> Result<Vec<Edge>, StorageError> {
            Ok(self
                .edges
                .iter()
                .filter(|((t, _, _), _)| *t == edge_type)
                .map(|((t, from, to), props)| Edge {
                    edge_type: *t,
                    from: from.clone(),
                    to: to.clone(),
                    props: props.clone(),
                })
                .collect())
        }
    }

    impl GraphWrite for GraphState {
        fn create_node(&mut self, node: &NodeRef, props: Properties) -> Result<bool, StorageError> {
            if self.nodes.contains_key(node) {
                return Ok(false);
            }
            self.nodes.insert(node.clone(), props);
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
                if !self.nodes.contains_key(endpoint) {
                    return Err(StorageError::MissingRecord(endpoint.to_string()));
                }
            }
            let previous = self
                .edges
                .insert((edge_type, from.clone(), to.clone()), props);
            Ok(previous.is_none())
        }
    }

    /// In-memory graph store for testing. Writes run against a copy that
    /// replaces the live state only on success.
    #[derive(Default)]
    pub struct InMemoryGraphStore {
        state: RwLock<GraphState>,
        transactions: AtomicUsize,
    }

    impl InMemoryGraphStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of transactions opened so far, reads included.
        pub fn transaction_count(&self) -> usize {
            self.transactions.load(Ordering::SeqCst)
        }
    }

    impl GraphStore for InMemoryGraphStore {
        fn read<R, E>(&self, f: impl FnOnce(&dyn GraphRead) -> Result<R, E>) -> Result<R, E>
        where
            E: From<StorageError>,
        {
            self.transactions.fetch_add(1, Ordering::SeqCst);
            let state = self.state.read().map_err(|e| E::from(poisoned(e)))?;
            f(&*state)
        }

        fn write<R, E>(&self, f: impl FnOnce(&mut dyn GraphWrite) -> Result<R, E>) -> Result<R, E>
        where
            E: From<StorageError>,
        {
            self.transactions.fetch_add(1, Ordering::SeqCst);
            let mut state = self.state.write().map_err(|e| E::from(poisoned(e)))?;
            let mut draft = state.clone();
            let result = f(&mut draft)?;
            *state = draft;
            Ok(result)
        }
    }

}
