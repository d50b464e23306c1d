//! Lectern DB - redb implementations of the profile, catalog and graph stores.
//!
//! Each store lives in its own database file.

pub mod catalog_store;
pub mod graph_store;
pub mod profile_store;
pub mod tables;

pub use catalog_store::RedbCatalogStore;
pub use graph_store::RedbGraphStore;
pub use profile_store::RedbProfileStore;

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use redb::Database;

use lectern_core::StorageError;

pub const PROFILE_DB_FILE: &str = "profiles.redb";
pub const CATALOG_DB_FILE: &str = "catalog.redb";
pub const GRAPH_DB_FILE: &str = "graph.redb";

pub(crate) fn db_error(e: impl Display) -> StorageError {
    StorageError::Database(e.to_string())
}

fn open_database(path: impl AsRef<Path>) -> Result<Database, StorageError> {
    Database::create(path).map_err(db_error)
}

/// Open (or create) the profile database with its tables.
pub fn init_profile_db(path: impl AsRef<Path>) -> Result<Arc<Database>, StorageError> {
    let db = open_database(path)?;
    RedbProfileStore::init_tables(&db)?;
    Ok(Arc::new(db))
}

/// Open (or create) the catalog database with its tables.
pub fn init_catalog_db(path: impl AsRef<Path>) -> Result<Arc<Database>, StorageError> {
    let db = open_database(path)?;
    RedbCatalogStore::init_tables(&db)?;
    Ok(Arc::new(db))
}

/// Open (or create) the graph database with its tables.
pub fn init_graph_db(path: impl AsRef<Path>) -> Result<Arc<Database>, StorageError> {
    let db = open_database(path)?;
    RedbGraphStore::init_tables(&db)?;
    Ok(Arc::new(db))
}

/// The three stores, opened from one data directory.
pub struct Stores {
    pub profiles: RedbProfileStore,
    pub catalog: RedbCatalogStore,
    pub graph: RedbGraphStore,
}

/// Open all three stores under `dir`, creating the directory if needed.
pub fn open_stores(dir: impl AsRef<Path>) -> Result<Stores, StorageError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(db_error)?;

    Ok(Stores {
        profiles: RedbProfileStore::new(init_profile_db(dir.join(PROFILE_DB_FILE))?),
        catalog: RedbCatalogStore::new(init_catalog_db(dir.join(CATALOG_DB_FILE))?),
        graph: RedbGraphStore::new(init_graph_db(dir.join(GRAPH_DB_FILE))?),
    })
}
