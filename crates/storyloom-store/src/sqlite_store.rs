//! SQLite implementation of the session store ports.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use storyloom_core::error::DomainError;
use storyloom_core::history::{EntryRole, HistoryEntry};
use storyloom_core::participant::Participant;
use storyloom_core::proposal::Proposal;
use storyloom_core::repository::{
    HistoryStore, ParticipantRegistry, ProposalStore, check_append,
};
use tracing::info;

use crate::schema::CREATE_SESSION_TABLES;

/// SQLite-backed session store.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("sqlite: {err}"))
}

fn to_db(value: u64) -> Result<i64, DomainError> {
    i64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("value {value} exceeds i64 range")))
}

fn from_db(value: i64) -> Result<u64, DomainError> {
    u64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative value {value} in database")))
}

/// Validates and writes `entries` at the end of the log inside `tx`.
async fn append_in(
    tx: &mut Transaction<'_, Sqlite>,
    entries: &[HistoryEntry],
) -> Result<(), DomainError> {
    let len: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history_entries")
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error)?;
    check_append(from_db(len)?, entries)?;

    for entry in entries {
        sqlx::query("INSERT INTO history_entries (entry_index, role, text) VALUES (?, ?, ?)")
            .bind(to_db(entry.index)?)
            .bind(entry.role.as_str())
            .bind(&entry.text)
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

impl SqliteSessionStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the URL is invalid or the
    /// database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(db_error)?;
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database. A single connection is kept alive
    /// for the lifetime of the pool so the data is not lost.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the database cannot be opened.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error)?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the schema cannot be applied.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, DomainError> {
        sqlx::raw_sql(CREATE_SESSION_TABLES)
            .execute(&pool)
            .await
            .map_err(db_error)?;
        info!("session store schema ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for SqliteSessionStore {
    async fn scenario(&self) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>("SELECT scenario FROM session_seed WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn seed(&self, scenario: &str, opening: &str) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_seed")
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        if existing > 0 {
            return Err(DomainError::AlreadySeeded);
        }

        sqlx::query("INSERT INTO session_seed (id, scenario) VALUES (1, ?)")
            .bind(scenario)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("INSERT INTO history_entries (entry_index, role, text) VALUES (0, ?, ?)")
            .bind(EntryRole::Seed.as_str())
            .bind(opening)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn append(&self, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        append_in(&mut tx, entries).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn commit_round(&self, round: u64, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        append_in(&mut tx, entries).await?;
        sqlx::query("DELETE FROM proposals WHERE round_number = ?")
            .bind(to_db(round)?)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)
    }

    async fn read_all(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT entry_index, role, text FROM history_entries ORDER BY entry_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|(index, role, text)| {
                let role = EntryRole::parse(&role).ok_or_else(|| {
                    DomainError::Infrastructure(format!("unknown history role {role:?}"))
                })?;
                Ok(HistoryEntry::new(from_db(index)?, role, text))
            })
            .collect()
    }
}

#[async_trait]
impl ParticipantRegistry for SqliteSessionStore {
    async fn register_if_absent(
        &self,
        identity: &str,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO participants (identity, display_name, joined_at) VALUES (?, ?, ?)",
        )
        .bind(identity)
        .bind(display_name)
        .bind(joined_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_all(&self) -> Result<Vec<Participant>, DomainError> {
        let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT identity, display_name, joined_at FROM participants ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(identity, display_name, joined_at)| Participant {
                identity,
                display_name,
                joined_at,
            })
            .collect())
    }

    async fn find(&self, identity: &str) -> Result<Option<Participant>, DomainError> {
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT identity, display_name, joined_at FROM participants WHERE identity = ?",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(identity, display_name, joined_at)| Participant {
            identity,
            display_name,
            joined_at,
        }))
    }
}

#[async_trait]
impl ProposalStore for SqliteSessionStore {
    async fn insert(&self, proposal: &Proposal) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO proposals (round_number, participant_identity, text) VALUES (?, ?, ?)",
        )
        .bind(to_db(proposal.round_number)?)
        .bind(&proposal.participant_identity)
        .bind(&proposal.text)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn load_round(&self, round: u64) -> Result<Vec<Proposal>, DomainError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT participant_identity, text FROM proposals WHERE round_number = ? ORDER BY seq",
        )
        .bind(to_db(round)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(identity, text)| Proposal::new(identity, text, round))
            .collect())
    }

    async fn earliest_round(&self) -> Result<Option<u64>, DomainError> {
        let earliest: Option<i64> = sqlx::query_scalar("SELECT MIN(round_number) FROM proposals")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        earliest.map(from_db).transpose()
    }
}
