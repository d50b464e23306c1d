use std::sync::Arc;

use redb::{Database, ReadableTable};
use serde_json::Value;

use lectern_core::{CatalogStore, Collection, ObjectId, StorageError};

use crate::db_error;
use crate::tables::collection_table;

const COLLECTIONS: [Collection; 3] = [Collection::Courses, Collection::Units, Collection::Classes];

/// redb implementation of CatalogStore. Documents are stored as JSON.
pub struct RedbCatalogStore {
    db: Arc<Database>,
}

impl RedbCatalogStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Initialize the database tables.
    pub fn init_tables(db: &Database) -> Result<(), StorageError> {
        let write_txn = db.begin_write().map_err(db_error)?;
        for collection in COLLECTIONS {
            let _ = write_txn
                .open_table(collection_table(collection))
                .map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;
        Ok(())
    }
}

impl CatalogStore for RedbCatalogStore {
    fn get_document(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> Result<Option<Value>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_error)?;
        let table = read_txn
            .open_table(collection_table(collection))
            .map_err(db_error)?;

        let key = id.to_hex();
        match table.get(key.as_str()).map_err(db_error)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_document(
        &self,
        collection: Collection,
        id: ObjectId,
        document: Value,
    ) -> Result<(), StorageError> {
        let key = id.to_hex();
        let value = serde_json::to_vec(&document)?;

        let write_txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = write_txn
                .open_table(collection_table(collection))
                .map_err(db_error)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;

        Ok(())
    }

    fn update_field(
        &self,
        collection: Collection,
        id: ObjectId,
        field: &str,
        value: Value,
    ) -> Result<bool, StorageError> {
        let key = id.to_hex();

        let write_txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = write_txn
                .open_table(collection_table(collection))
                .map_err(db_error)?;

            let mut document: Value = match table.get(key.as_str()).map_err(db_error)? {
                Some(stored) => serde_json::from_slice(stored.value())?,
                None => return Ok(false),
            };
            match document.as_object_mut() {
                Some(fields) => {
                    fields.insert(field.to_string(), value);
                }
                None => {
                    return Err(StorageError::Serialization(format!(
                        "{} document {} is not an object",
                        collection.name(),
                        key
                    )))
                }
            }

            let bytes = serde_json::to_vec(&document)?;
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;

        Ok(true)
    }

    fn documents(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_error)?;
        let table = read_txn
            .open_table(collection_table(collection))
            .map_err(db_error)?;

        let mut documents = Vec::new();
        for entry in table.iter().map_err(db_error)? {
            let (_, value) = entry.map_err(db_error)?;
            documents.push(serde_json::from_slice(value.value())?);
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{Class, Course, Unit, COURSE_RATING_FIELD};
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_store() -> (tempfile::TempDir, RedbCatalogStore) {
        let dir = tempdir().unwrap();
        let db = Database::create(dir.path().join("catalog.redb")).unwrap();
        RedbCatalogStore::init_tables(&db).unwrap();
        (dir, RedbCatalogStore::new(Arc::new(db)))
    }

    #[test]
    fn test_insert_and_find() {
        let (_dir, store) = create_test_store();
        let course = Course::new("Rust", "Ownership and borrowing");
        store.insert(&course).unwrap();

        let found: Course = store.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(found, course);

        // Same id in another collection is a different document
        let missing: Option<Unit> = store.find_by_id(course.id).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_update_field_keeps_other_fields() {
        let (_dir, store) = create_test_store();
        let course = Course::new("Rust", "Ownership");
        store.insert(&course).unwrap();

        assert!(store
            .update_field(Collection::Courses, course.id, COURSE_RATING_FIELD, json!(3.5))
            .unwrap());

        let found: Course = store.find_by_id(course.id).unwrap().unwrap();
        assert_eq!(found.rating, 3.5);
        assert_eq!(found.name, "Rust");
    }

    #[test]
    fn test_update_field_missing_document() {
        let (_dir, store) = create_test_store();
        assert!(!store
            .update_field(Collection::Courses, ObjectId::generate(), "rating", json!(1.0))
            .unwrap());
    }

    #[test]
    fn test_scan_and_find_many() {
        let (_dir, store) = create_test_store();
        let course = Course::new("Rust", "");
        let unit = Unit::new(course.id, "Basics");
        let c1 = Class::new(unit.id, "Intro");
        let c2 = Class::new(unit.id, "Traits");
        store.insert(&course).unwrap();
        store.insert(&unit).unwrap();
        store.insert(&c1).unwrap();
        store.insert(&c2).unwrap();

        let classes: Vec<Class> = store.scan().unwrap();
        assert_eq!(classes.len(), 2);

        let found: Vec<Class> = store
            .find_many_by_ids(&[c2.id, ObjectId::generate()])
            .unwrap();
        assert_eq!(found, vec![c2]);
    }
}
