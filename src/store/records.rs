use sqlx::sqlite::SqlitePool;

use crate::error::{AppError, Result};

/// Namespace holding session records.
pub const NS_SESSIONS: &str = "sessions";
/// Namespace holding account records.
pub const NS_ACCOUNTS: &str = "accounts";

/// Durable `(namespace, key) -> blob` mapping over the embedded SQLite store.
///
/// Each operation is atomic on its own; multi-step sequences built on top of
/// it are not, unless they go through [`create_if_absent`].
///
/// [`create_if_absent`]: RecordStore::create_if_absent
#[derive(Clone)]
pub struct RecordStore {
    db: SqlitePool,
}

impl RecordStore {
    /// Creates a record store over an existing pool.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Writes a record, overwriting any existing value (create semantics
    /// with overwrite allowed).
    pub async fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO records (namespace, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Writes a record only if the key is absent.
    ///
    /// # Returns
    ///
    /// `true` when the row was created, `false` when the key already existed.
    /// This is the atomic primitive closing the check-then-create race.
    pub async fn create_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO records (namespace, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (namespace, key) DO NOTHING
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Reads a record, returning `None` when the key is absent.
    pub async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            r#"
            SELECT value FROM records WHERE namespace = ?1 AND key = ?2
            "#,
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Overwrites an existing record; updating an absent key is an error.
    pub async fn update(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE records SET value = ?3 WHERE namespace = ?1 AND key = ?2
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "update of absent record {}/{}",
                namespace, key
            )));
        }
        Ok(())
    }

    /// Deletes a record. Idempotent: deleting an absent key is not an error.
    pub async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM records WHERE namespace = ?1 AND key = ?2
            "#,
        )
        .bind(namespace)
        .bind(key)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> RecordStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        RecordStore::new(pool)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let rs = store().await;
        rs.put(NS_SESSIONS, "k1", b"v1").await.unwrap();
        assert_eq!(rs.get(NS_SESSIONS, "k1").await.unwrap(), Some(b"v1".to_vec()));

        rs.put(NS_SESSIONS, "k1", b"v2").await.unwrap();
        assert_eq!(rs.get(NS_SESSIONS, "k1").await.unwrap(), Some(b"v2".to_vec()));

        rs.delete(NS_SESSIONS, "k1").await.unwrap();
        assert_eq!(rs.get(NS_SESSIONS, "k1").await.unwrap(), None);

        // Deleting again is fine.
        rs.delete(NS_SESSIONS, "k1").await.unwrap();
    }

    #[tokio::test]
    async fn create_if_absent_is_first_writer_wins() {
        let rs = store().await;
        assert!(rs.create_if_absent(NS_ACCOUNTS, "me@me.com", b"first").await.unwrap());
        assert!(!rs.create_if_absent(NS_ACCOUNTS, "me@me.com", b"second").await.unwrap());
        assert_eq!(
            rs.get(NS_ACCOUNTS, "me@me.com").await.unwrap(),
            Some(b"first".to_vec())
        );
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let rs = store().await;
        rs.put(NS_SESSIONS, "shared-key", b"session data").await.unwrap();
        rs.put(NS_ACCOUNTS, "shared-key", b"account data").await.unwrap();

        assert_eq!(
            rs.get(NS_SESSIONS, "shared-key").await.unwrap(),
            Some(b"session data".to_vec())
        );
        assert_eq!(
            rs.get(NS_ACCOUNTS, "shared-key").await.unwrap(),
            Some(b"account data".to_vec())
        );

        rs.delete(NS_SESSIONS, "shared-key").await.unwrap();
        assert_eq!(
            rs.get(NS_ACCOUNTS, "shared-key").await.unwrap(),
            Some(b"account data".to_vec())
        );
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let rs = store().await;
        assert!(rs.update(NS_ACCOUNTS, "missing", b"x").await.is_err());

        rs.put(NS_ACCOUNTS, "present", b"old").await.unwrap();
        rs.update(NS_ACCOUNTS, "present", b"new").await.unwrap();
        assert_eq!(
            rs.get(NS_ACCOUNTS, "present").await.unwrap(),
            Some(b"new".to_vec())
        );
    }
}
