//! MySQL OTP repository
//!
//! The durable, authoritative tier of the OTP store. One row per canonical
//! phone in `otp_codes`. Read-check-write sequences run inside a transaction
//! holding the row lock (`SELECT ... FOR UPDATE`); single-row transitions are
//! conditional `UPDATE`s whose affected-row count is the verdict.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row, Transaction};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use otp_core::{
    AttemptUpdate, CanonicalPhone, OtpRecord, OtpRepository, StoreError, UpsertOutcome,
};

/// Upserts that lose a deadlock are retried this many times in total
const MAX_UPSERT_ATTEMPTS: u32 = 3;

/// MySQL SQLSTATE for a deadlock or lock-wait rollback
const SQLSTATE_DEADLOCK: &str = "40001";

const SELECT_COLUMNS: &str = r#"
    phone, id, code, superseded_code, attempts,
    created_at, expires_at, last_sent_at, consumed
"#;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS otp_codes (
        phone           VARCHAR(20)  NOT NULL,
        id              CHAR(36)     NOT NULL,
        code            VARCHAR(12)  NOT NULL,
        superseded_code VARCHAR(12)  NULL,
        attempts        INT UNSIGNED NOT NULL DEFAULT 0,
        created_at      DATETIME(6)  NOT NULL,
        expires_at      DATETIME(6)  NOT NULL,
        last_sent_at    DATETIME(6)  NOT NULL,
        consumed        BOOLEAN      NOT NULL DEFAULT FALSE,
        PRIMARY KEY (phone),
        INDEX idx_otp_codes_expires_at (expires_at)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// OTP repository backed by MySQL
#[derive(Clone)]
pub struct MySqlOtpRepository {
    /// Database connection pool
    pool: Pool<MySql>,
}

impl MySqlOtpRepository {
    /// Create a new OTP repository
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Create the `otp_codes` table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create otp_codes table");
                unavailable(e)
            })?;

        info!("otp_codes table ready");
        Ok(())
    }

    async fn try_upsert(
        &self,
        record: &OtpRecord,
        cooldown: Duration,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = lock_row(&mut tx, &record.phone).await?;
        let existing = match existing {
            Some(row) => Some(
                record_from_row(&row)
                    .map_err(|e| sqlx::Error::Decode(Box::new(CorruptRow(e.to_string()))))?,
            ),
            None => None,
        };

        if let Some(retry_after) = existing
            .as_ref()
            .and_then(|e| e.cooldown_remaining(record.last_sent_at, cooldown))
        {
            tx.rollback().await?;
            return Ok(UpsertOutcome::CooldownActive { retry_after });
        }

        let stored = record.superseding(existing.as_ref());

        let query = r#"
            INSERT INTO otp_codes (
                phone, id, code, superseded_code, attempts,
                created_at, expires_at, last_sent_at, consumed
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                id = VALUES(id),
                code = VALUES(code),
                superseded_code = VALUES(superseded_code),
                attempts = VALUES(attempts),
                created_at = VALUES(created_at),
                expires_at = VALUES(expires_at),
                last_sent_at = VALUES(last_sent_at),
                consumed = VALUES(consumed)
        "#;

        sqlx::query(query)
            .bind(stored.phone.as_str())
            .bind(stored.id.to_string())
            .bind(&stored.code)
            .bind(stored.superseded_code.as_deref())
            .bind(stored.attempts)
            .bind(stored.created_at)
            .bind(stored.expires_at)
            .bind(stored.last_sent_at)
            .bind(stored.consumed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(UpsertOutcome::Stored(stored))
    }

    async fn try_increment(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<AttemptUpdate, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, attempts, expires_at, consumed FROM otp_codes WHERE phone = ? FOR UPDATE",
        )
        .bind(phone.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let row = match row {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Ok(AttemptUpdate::Gone);
            }
        };

        let row_id: String = row.try_get("id")?;
        let attempts: u32 = row.try_get("attempts")?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        let consumed: bool = row.try_get("consumed")?;

        if row_id != id.to_string() || consumed || now > expires_at {
            tx.rollback().await?;
            return Ok(AttemptUpdate::Gone);
        }
        if attempts >= max_attempts {
            tx.rollback().await?;
            return Ok(AttemptUpdate::Exhausted);
        }

        sqlx::query("UPDATE otp_codes SET attempts = attempts + 1 WHERE phone = ?")
            .bind(phone.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AttemptUpdate::Incremented(attempts + 1))
    }
}

async fn lock_row(
    tx: &mut Transaction<'_, MySql>,
    phone: &CanonicalPhone,
) -> Result<Option<MySqlRow>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM otp_codes WHERE phone = ? FOR UPDATE",
        SELECT_COLUMNS
    );
    sqlx::query(&query)
        .bind(phone.as_str())
        .fetch_optional(&mut **tx)
        .await
}

fn record_from_row(row: &MySqlRow) -> Result<OtpRecord, StoreError> {
    let phone: String = row.try_get("phone").map_err(corrupt)?;
    let id: String = row.try_get("id").map_err(corrupt)?;

    Ok(OtpRecord {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("id: {}", e)))?,
        phone: CanonicalPhone::parse(&phone)
            .map_err(|_| StoreError::Corrupt("phone column is not canonical".to_string()))?,
        code: row.try_get("code").map_err(corrupt)?,
        superseded_code: row.try_get("superseded_code").map_err(corrupt)?,
        attempts: row.try_get("attempts").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        expires_at: row.try_get("expires_at").map_err(corrupt)?,
        last_sent_at: row.try_get("last_sent_at").map_err(corrupt)?,
        consumed: row.try_get("consumed").map_err(corrupt)?,
    })
}

#[derive(Debug)]
struct CorruptRow(String);

impl std::fmt::Display for CorruptRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CorruptRow {}

fn is_deadlock(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(SQLSTATE_DEADLOCK),
        _ => false,
    }
}

fn corrupt(e: sqlx::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn unavailable(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => corrupt(e),
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl OtpRepository for MySqlOtpRepository {
    async fn upsert(
        &self,
        record: &OtpRecord,
        cooldown: Duration,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut attempt = 1;
        loop {
            match self.try_upsert(record, cooldown).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_deadlock(&e) && attempt < MAX_UPSERT_ATTEMPTS => {
                    warn!(
                        phone = %record.phone.masked(),
                        attempt,
                        "OTP upsert lost a deadlock, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        phone = %record.phone.masked(),
                        error = %e,
                        "Failed to store OTP record"
                    );
                    return Err(unavailable(e));
                }
            }
        }
    }

    async fn find(&self, phone: &CanonicalPhone) -> Result<Option<OtpRecord>, StoreError> {
        let query = format!("SELECT {} FROM otp_codes WHERE phone = ?", SELECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(phone = %phone.masked(), error = %e, "Failed to load OTP record");
                unavailable(e)
            })?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn consume(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = r#"
            UPDATE otp_codes
            SET consumed = TRUE
            WHERE phone = ?
              AND id = ?
              AND consumed = FALSE
              AND expires_at >= ?
              AND attempts < ?
        "#;

        let result = sqlx::query(query)
            .bind(phone.as_str())
            .bind(id.to_string())
            .bind(now)
            .bind(max_attempts)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(phone = %phone.masked(), error = %e, "Failed to consume OTP record");
                unavailable(e)
            })?;

        let won = result.rows_affected() == 1;
        debug!(phone = %phone.masked(), won, "OTP consume compare-and-set");
        Ok(won)
    }

    async fn increment_attempts(
        &self,
        phone: &CanonicalPhone,
        id: Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<AttemptUpdate, StoreError> {
        self.try_increment(phone, id, max_attempts, now)
            .await
            .map_err(|e| {
                error!(
                    phone = %phone.masked(),
                    error = %e,
                    "Failed to increment OTP attempt counter"
                );
                unavailable(e)
            })
    }

    async fn invalidate(&self, phone: &CanonicalPhone, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE phone = ? AND id = ?")
            .bind(phone.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(phone = %phone.masked(), error = %e, "Failed to invalidate OTP record");
                unavailable(e)
            })?;

        // MySQL reports zero affected rows when the row was already consumed
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        let current = self.find(phone).await?;
        Ok(current.map(|r| r.id == id).unwrap_or(false))
    }

    async fn delete_expired(
        &self,
        phone: &CanonicalPhone,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE phone = ? AND expires_at < ?")
            .bind(phone.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(phone = %phone.masked(), error = %e, "Failed to delete expired OTP record");
                unavailable(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at < ?")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to purge expired OTP records");
                unavailable(e)
            })?;

        let count = result.rows_affected();
        if count > 0 {
            info!(count, "Purged expired OTP records");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_keeps_one_row_per_phone() {
        assert!(CREATE_TABLE.contains("PRIMARY KEY (phone)"));
        assert!(CREATE_TABLE.contains("superseded_code"));
        assert!(CREATE_TABLE.contains("INDEX idx_otp_codes_expires_at (expires_at)"));
    }

    #[test]
    fn test_decode_errors_map_to_corrupt() {
        let err = unavailable(sqlx::Error::Decode(Box::new(CorruptRow("bad".into()))));
        assert!(matches!(err, StoreError::Corrupt(_)));

        let err = unavailable(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_non_database_errors_are_not_deadlocks() {
        assert!(!is_deadlock(&sqlx::Error::PoolTimedOut));
        assert!(!is_deadlock(&sqlx::Error::RowNotFound));
    }
}
