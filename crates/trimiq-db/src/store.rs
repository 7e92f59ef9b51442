//! SQLite store for user accounts and the usage ledger.
//!
//! rusqlite is synchronous; the connection lives behind a tokio mutex so
//! handlers can share one `Database` clone. Queries here are short row
//! lookups and single-row writes.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use trimiq_models::{UsageOperationType, UsageTransaction, UserRecord};

use crate::error::{DbError, DbResult};

/// Shared handle to the SQLite store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> DbResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                balance REAL NOT NULL DEFAULT 0,
                minutes_used REAL NOT NULL DEFAULT 0,
                ad_revenue REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS usage_transactions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                timestamp TEXT NOT NULL,
                operation_type TEXT NOT NULL,
                minutes REAL NOT NULL,
                description TEXT NOT NULL,
                balance_after REAL NOT NULL,
                job_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_usage_user
                ON usage_transactions(user_id, timestamp);
            "#,
        )?;
        info!("Database schema initialized");
        Ok(())
    }

    /// Ping the store (readiness probe).
    pub async fn ping(&self) -> DbResult<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Insert a new user with zeroed balance counters.
    ///
    /// `password_hash` is the SHA-256 hex digest of the plaintext password.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> DbResult<UserRecord> {
        let conn = self.conn.lock().await;

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(DbError::DuplicateEmail);
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (username, email, password, balance, minutes_used, ad_revenue, created_at)
             VALUES (?1, ?2, ?3, 0, 0, 0, ?4)",
            params![username, email, password_hash, created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        Ok(UserRecord {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            balance: 0.0,
            minutes_used: 0.0,
            ad_revenue: 0.0,
            created_at,
        })
    }

    /// Look up a user by email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, username, email, password, balance, minutes_used, ad_revenue, created_at
                 FROM users WHERE email = ?1",
                params![email],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Balance counters for an account: `(balance, minutes_used, ad_revenue)`.
    pub async fn balance(&self, email: &str) -> DbResult<Option<(f64, f64, f64)>> {
        let conn = self.conn.lock().await;
        let counters = conn
            .query_row(
                "SELECT balance, minutes_used, ad_revenue FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(counters)
    }

    /// Look up a user by email and password hash.
    ///
    /// Returns `None` when either the email is unknown or the hash does not
    /// match, so callers cannot distinguish the two.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> DbResult<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, username, email, password, balance, minutes_used, ad_revenue, created_at
                 FROM users WHERE email = ?1 AND password = ?2",
                params![email, password_hash],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Credit an account balance (top-up or admin adjustment).
    pub async fn credit_balance(&self, user_id: i64, amount: f64) -> DbResult<f64> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE users SET balance = balance + ?1 WHERE id = ?2",
            params![amount, user_id],
        )?;
        if updated == 0 {
            return Err(DbError::UserNotFound);
        }
        let balance = conn.query_row(
            "SELECT balance FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(balance)
    }

    /// Debit processed minutes from an account and record a ledger entry.
    ///
    /// Runs in a single SQL transaction: the balance decrement, the
    /// minutes-used increment and the ledger insert either all land or none
    /// do. Fails without side effects when the balance cannot cover
    /// `minutes * rate_per_minute`.
    pub async fn debit_minutes(
        &self,
        user_id: i64,
        minutes: f64,
        rate_per_minute: f64,
        operation: UsageOperationType,
        description: &str,
        job_id: Option<&str>,
    ) -> DbResult<UsageTransaction> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let balance: f64 = tx
            .query_row(
                "SELECT balance FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(DbError::UserNotFound)?;

        let cost = minutes * rate_per_minute;
        if cost > balance {
            return Err(DbError::InsufficientBalance {
                required: cost,
                available: balance,
            });
        }

        let balance_after = balance - cost;
        if minutes > 0.0 {
            tx.execute(
                "UPDATE users SET balance = ?1, minutes_used = minutes_used + ?2 WHERE id = ?3",
                params![balance_after, minutes, user_id],
            )?;
        }

        let mut record = UsageTransaction::new(
            Uuid::new_v4().to_string(),
            user_id,
            operation,
            minutes,
            description.to_string(),
            balance_after,
        );
        if let Some(job_id) = job_id {
            record = record.with_job_id(job_id);
        }

        if minutes > 0.0 {
            tx.execute(
                "INSERT INTO usage_transactions
                 (id, user_id, timestamp, operation_type, minutes, description, balance_after, job_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.user_id,
                    record.timestamp.to_rfc3339(),
                    record.operation_type.as_str(),
                    record.minutes,
                    record.description,
                    record.balance_after,
                    record.job_id,
                ],
            )?;
        }

        tx.commit()?;
        Ok(record)
    }

    /// Newest-first page of the usage ledger for a user.
    pub async fn usage_history(&self, user_id: i64, limit: u32) -> DbResult<Vec<UsageTransaction>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, timestamp, operation_type, minutes, description, balance_after, job_id
             FROM usage_transactions
             WHERE user_id = ?1
             ORDER BY timestamp DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], map_usage_row)?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?);
        }
        Ok(transactions)
    }
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        balance: row.get(4)?,
        minutes_used: row.get(5)?,
        ad_revenue: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
    })
}

fn map_usage_row(row: &Row<'_>) -> rusqlite::Result<UsageTransaction> {
    let operation: String = row.get(3)?;
    let operation = UsageOperationType::from_str(&operation).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown operation type: {operation}").into(),
        )
    })?;
    Ok(UsageTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        timestamp: parse_timestamp(row, 2)?,
        operation_type: operation,
        minutes: row.get(4)?,
        description: row.get(5)?,
        balance_after: row.get(6)?,
        job_id: row.get(7)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open_in_memory().expect("in-memory db")
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = test_db().await;
        let user = db
            .create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        assert_eq!(user.balance, 0.0);

        let found = db.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.username, "alice");

        assert!(db.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        db.create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        let err = db
            .create_user("alice2", "alice@example.com", "hash-b")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let db = test_db().await;
        db.create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();

        let ok = db
            .verify_credentials("alice@example.com", "hash-a")
            .await
            .unwrap();
        assert!(ok.is_some());

        let wrong_hash = db
            .verify_credentials("alice@example.com", "hash-b")
            .await
            .unwrap();
        assert!(wrong_hash.is_none());

        let unknown = db.verify_credentials("bob@example.com", "hash-a").await.unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_debit_minutes_updates_balance_and_ledger() {
        let db = test_db().await;
        let user = db
            .create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        db.credit_balance(user.id, 10.0).await.unwrap();

        let tx = db
            .debit_minutes(
                user.id,
                2.5,
                2.0,
                UsageOperationType::Assembly,
                "2.5 minutes rendered",
                Some("job-1"),
            )
            .await
            .unwrap();
        assert!((tx.balance_after - 5.0).abs() < 1e-9);

        let found = db.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert!((found.balance - 5.0).abs() < 1e-9);
        assert!((found.minutes_used - 2.5).abs() < 1e-9);

        let history = db.usage_history(user.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].job_id.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn test_debit_insufficient_balance_has_no_side_effects() {
        let db = test_db().await;
        let user = db
            .create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        db.credit_balance(user.id, 1.0).await.unwrap();

        let err = db
            .debit_minutes(
                user.id,
                5.0,
                1.0,
                UsageOperationType::Assembly,
                "too expensive",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InsufficientBalance { .. }));

        let found = db.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert!((found.balance - 1.0).abs() < 1e-9);
        assert_eq!(found.minutes_used, 0.0);
        assert!(db.usage_history(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_minute_debit_is_noop() {
        let db = test_db().await;
        let user = db
            .create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        db.credit_balance(user.id, 3.0).await.unwrap();

        let tx = db
            .debit_minutes(
                user.id,
                0.0,
                1.0,
                UsageOperationType::Transcription,
                "empty narration",
                None,
            )
            .await
            .unwrap();
        assert!((tx.balance_after - 3.0).abs() < 1e-9);
        assert!(db.usage_history(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_counters() {
        let db = test_db().await;
        let user = db
            .create_user("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();
        db.credit_balance(user.id, 7.5).await.unwrap();

        let (balance, minutes_used, ad_revenue) =
            db.balance("alice@example.com").await.unwrap().unwrap();
        assert!((balance - 7.5).abs() < 1e-9);
        assert_eq!(minutes_used, 0.0);
        assert_eq!(ad_revenue, 0.0);

        assert!(db.balance("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_unknown_user() {
        let db = test_db().await;
        let err = db.credit_balance(99, 5.0).await.unwrap_err();
        assert!(matches!(err, DbError::UserNotFound));
    }
}
