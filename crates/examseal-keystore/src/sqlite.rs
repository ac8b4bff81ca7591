//! SQLite implementation of the Keystore trait.
//!
//! The durable backend for a device installation. Uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Several identities can
//! share one database file under different profiles.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use examseal_core::{DeviceInfo, DeviceKeyRecord, PersistedRecord, RecordKind};

use crate::error::{KeystoreError, Result};
use crate::migration;
use crate::traits::Keystore;

/// Profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// SQLite-based keystore.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteKeystore {
    conn: Arc<Mutex<Connection>>,
    profile: Arc<str>,
}

impl SqliteKeystore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            profile: Arc::from(DEFAULT_PROFILE),
        }
    }

    /// A handle on the same database scoped to another identity profile.
    pub fn with_profile(&self, profile: impl AsRef<str>) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            profile: Arc::from(profile.as_ref()),
        }
    }

    /// The identity profile this handle reads and writes.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let profile = Arc::clone(&self.profile);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| KeystoreError::Poisoned)?;
            f(&mut conn, &profile)
        })
        .await
        .map_err(|e| KeystoreError::Task(e.to_string()))?
    }
}

fn load_body(conn: &Connection, profile: &str, kind: RecordKind) -> Result<Option<PersistedRecord>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM device_records WHERE profile = ?1 AND kind = ?2",
            params![profile, kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(body.map(|text| PersistedRecord::from_json(&text)).transpose()?)
}

fn upsert_body(conn: &Connection, profile: &str, kind: RecordKind, body: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO device_records (profile, kind, body, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(profile, kind) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![profile, kind.as_str(), body, now_millis()],
    )?;
    Ok(())
}

#[async_trait]
impl Keystore for SqliteKeystore {
    async fn load_key_record(&self) -> Result<Option<DeviceKeyRecord>> {
        self.blocking(|conn, profile| {
            Ok(load_body(conn, profile, RecordKind::DeviceKey)?
                .map(PersistedRecord::into_device_key)
                .transpose()?)
        })
        .await
    }

    async fn load_device_info(&self) -> Result<Option<DeviceInfo>> {
        self.blocking(|conn, profile| {
            Ok(load_body(conn, profile, RecordKind::DeviceInfo)?
                .map(PersistedRecord::into_device_info)
                .transpose()?)
        })
        .await
    }

    async fn store_identity(&self, keys: &DeviceKeyRecord, info: &DeviceInfo) -> Result<()> {
        let keys_json = PersistedRecord::from(keys.clone()).to_json()?;
        let info_json = PersistedRecord::from(info.clone()).to_json()?;

        self.blocking(move |conn, profile| {
            let tx = conn.transaction()?;
            upsert_body(&tx, profile, RecordKind::DeviceKey, &keys_json)?;
            upsert_body(&tx, profile, RecordKind::DeviceInfo, &info_json)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_device_info(&self, info: &DeviceInfo) -> Result<()> {
        let info_json = PersistedRecord::from(info.clone()).to_json()?;

        self.blocking(move |conn, profile| {
            let updated = conn.execute(
                "UPDATE device_records SET body = ?1, updated_at = ?2
                 WHERE profile = ?3 AND kind = ?4",
                params![info_json, now_millis(), profile, RecordKind::DeviceInfo.as_str()],
            )?;
            if updated == 0 {
                return Err(KeystoreError::NotFound(RecordKind::DeviceInfo));
            }
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.blocking(|conn, profile| {
            let removed = conn.execute(
                "DELETE FROM device_records WHERE profile = ?1",
                params![profile],
            )?;
            tracing::debug!(profile, removed, "cleared keystore profile");
            Ok(())
        })
        .await
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KeystoreExt;
    use examseal_core::DeviceId;

    fn identity(id: &str) -> (DeviceKeyRecord, DeviceInfo) {
        let keys = DeviceKeyRecord::new(format!("pub-{}", id), format!("priv-{}", id));
        let info = DeviceInfo::new(
            DeviceId::new(id).unwrap(),
            "test".into(),
            format!("pub-{}", id),
            1_000,
        );
        (keys, info)
    }

    #[tokio::test]
    async fn test_sqlite_keystore_basic() {
        let store = SqliteKeystore::open_memory().unwrap();
        assert!(store.load_identity().await.unwrap().is_none());

        let (keys, info) = identity("dev_a");
        store.store_identity(&keys, &info).await.unwrap();

        let (k, i) = store.load_identity().await.unwrap().unwrap();
        assert_eq!(k, keys);
        assert_eq!(i, info);
    }

    #[tokio::test]
    async fn test_store_identity_replaces() {
        let store = SqliteKeystore::open_memory().unwrap();
        let (keys_a, info_a) = identity("dev_a");
        let (keys_b, info_b) = identity("dev_b");

        store.store_identity(&keys_a, &info_a).await.unwrap();
        store.store_identity(&keys_b, &info_b).await.unwrap();

        let (k, i) = store.load_identity().await.unwrap().unwrap();
        assert_eq!(k, keys_b);
        assert_eq!(i.device_id, info_b.device_id);
    }

    #[tokio::test]
    async fn test_profiles_are_isolated() {
        let alice = SqliteKeystore::open_memory().unwrap().with_profile("alice");
        let bob = alice.with_profile("bob");
        assert_eq!(bob.profile(), "bob");

        let (keys, info) = identity("dev_alice");
        alice.store_identity(&keys, &info).await.unwrap();

        assert!(bob.load_identity().await.unwrap().is_none());
        bob.clear().await.unwrap();
        assert!(alice.load_identity().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_clear() {
        let store = SqliteKeystore::open_memory().unwrap();
        let (keys, mut info) = identity("dev_a");

        assert!(matches!(
            store.update_device_info(&info).await,
            Err(KeystoreError::NotFound(RecordKind::DeviceInfo))
        ));

        store.store_identity(&keys, &info).await.unwrap();
        info.touch(5_000);
        store.update_device_info(&info).await.unwrap();
        assert_eq!(store.load_device_info().await.unwrap().unwrap().last_active, 5_000);

        store.clear().await.unwrap();
        assert!(store.load_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.db");
        let (keys, info) = identity("dev_disk");

        {
            let store = SqliteKeystore::open(&path).unwrap();
            store.store_identity(&keys, &info).await.unwrap();
        }

        let store = SqliteKeystore::open(&path).unwrap();
        let (k, i) = store.load_identity().await.unwrap().unwrap();
        assert_eq!(k, keys);
        assert_eq!(i, info);
    }

    #[tokio::test]
    async fn test_corrupted_body_rejected() {
        let store = SqliteKeystore::open_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO device_records (profile, kind, body, updated_at) VALUES (?1, ?2, ?3, 0)",
                params![DEFAULT_PROFILE, "device_key", "{not json"],
            )
            .unwrap();
        }

        assert!(matches!(
            store.load_key_record().await,
            Err(KeystoreError::Record(_))
        ));
    }
}
