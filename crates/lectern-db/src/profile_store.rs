use std::sync::Arc;

use redb::{Database, ReadableTable};

use lectern_core::{ProfileStore, StorageError, UserProfile};

use crate::db_error;
use crate::tables::PROFILES_TABLE;

/// redb implementation of ProfileStore.
pub struct RedbProfileStore {
    db: Arc<Database>,
}

impl RedbProfileStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Initialize the database tables.
    pub fn init_tables(db: &Database) -> Result<(), StorageError> {
        let write_txn = db.begin_write().map_err(db_error)?;
        {
            let _ = write_txn.open_table(PROFILES_TABLE).map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;
        Ok(())
    }
}

impl ProfileStore for RedbProfileStore {
    fn get(&self, key: &str) -> Result<Option<UserProfile>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_error)?;
        let table = read_txn.open_table(PROFILES_TABLE).map_err(db_error)?;

        match table.get(key).map_err(db_error)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, profile: &UserProfile) -> Result<(), StorageError> {
        let value = serde_json::to_vec(profile)?;

        let write_txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = write_txn.open_table(PROFILES_TABLE).map_err(db_error)?;
            table.insert(key, value.as_slice()).map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;

        Ok(())
    }

    fn put_if_version(
        &self,
        key: &str,
        profile: &UserProfile,
        expected: u64,
    ) -> Result<bool, StorageError> {
        let mut next = profile.clone();
        next.version = expected + 1;
        let value = serde_json::to_vec(&next)?;

        // redb serializes write transactions, so the check and the insert see
        // the same record.
        let write_txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = write_txn.open_table(PROFILES_TABLE).map_err(db_error)?;

            let current = match table.get(key).map_err(db_error)? {
                Some(stored) => serde_json::from_slice::<UserProfile>(stored.value())?.version,
                None => 0,
            };
            if current != expected {
                return Ok(false);
            }

            table.insert(key, value.as_slice()).map_err(db_error)?;
        }
        write_txn.commit().map_err(db_error)?;

        Ok(true)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let read_txn = self.db.begin_read().map_err(db_error)?;
        let table = read_txn.open_table(PROFILES_TABLE).map_err(db_error)?;

        let mut keys = Vec::new();
        for entry in table.range(prefix..).map_err(db_error)? {
            let (key, _) = entry.map_err(db_error)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            keys.push(key.value().to_string());
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lectern_core::{profile_key, ObjectId, PROFILE_KEY_PREFIX};
    use tempfile::tempdir;

    fn create_test_store() -> (tempfile::TempDir, RedbProfileStore) {
        let dir = tempdir().unwrap();
        let db = Database::create(dir.path().join("profiles.redb")).unwrap();
        RedbProfileStore::init_tables(&db).unwrap();
        (dir, RedbProfileStore::new(Arc::new(db)))
    }

    fn make_profile(email: &str) -> UserProfile {
        UserProfile::new(email.to_string(), "Ana".to_string(), "$argon2id$stub".to_string())
    }

    #[test]
    fn test_put_and_get() {
        let (_dir, store) = create_test_store();
        let mut profile = make_profile("ana@example.com");
        profile.enroll(ObjectId::generate(), Utc::now());

        store.put(&profile.key(), &profile).unwrap();

        let retrieved = store.get("user:ana@example.com").unwrap().unwrap();
        assert_eq!(retrieved, profile);
        assert!(store.get("user:nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_put_if_version() {
        let (_dir, store) = create_test_store();
        let key = profile_key("ana@example.com");
        let profile = make_profile("ana@example.com");

        assert!(store.put_if_version(&key, &profile, 0).unwrap());
        let stored = store.get(&key).unwrap().unwrap();
        assert_eq!(stored.version, 1);

        // A writer still holding version 0 loses
        assert!(!store.put_if_version(&key, &profile, 0).unwrap());
        assert_eq!(store.get(&key).unwrap().unwrap().version, 1);

        assert!(store.put_if_version(&key, &stored, 1).unwrap());
        assert_eq!(store.get(&key).unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_keys_by_prefix() {
        let (_dir, store) = create_test_store();
        for email in ["b@x.io", "a@x.io", "c@x.io"] {
            let p = make_profile(email);
            store.put(&p.key(), &p).unwrap();
        }
        store.put("session:1", &make_profile("z@x.io")).unwrap();

        let keys = store.keys(PROFILE_KEY_PREFIX).unwrap();
        assert_eq!(keys, vec!["user:a@x.io", "user:b@x.io", "user:c@x.io"]);
    }
}
