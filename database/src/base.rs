//! Connection handle, sessions and table management.

use crate::errors::Result;
use crate::schema::{self, TABLES};
use crate::settings::Config;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{Sqlite, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Future returned by the body of [`Database::session_scope`].
pub type ScopedFuture<'s, T> = Pin<Box<dyn Future<Output = Result<T>> + 's>>;

/// Current time at the precision the store keeps.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Handle to the backing store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Connecting to database...");
        let mut options = SqliteConnectOptions::from_str(&config.database_url)?
            .foreign_keys(true)
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            // the database lives only as long as one of its connections
            options = options.journal_mode(SqliteJournalMode::Memory);
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options.connect_with(options).await?;
        info!(
            "Database connection established ({}, {})",
            config.env.as_str(),
            redact(&config.database_url)
        );

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a new unit of work.
    pub fn session(&self) -> Session {
        Session {
            pool: self.pool.clone(),
            tx: None,
        }
    }

    /// Run `body` inside a fresh session. Commits when it returns `Ok`,
    /// rolls back and hands back the error otherwise. The session is
    /// released on every path.
    pub async fn session_scope<T, F>(&self, body: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> ScopedFuture<'s, T>,
    {
        let mut session = self.session();
        let outcome = body(&mut session).await;

        let result = match outcome {
            Ok(value) => match session.commit().await {
                Ok(()) => Ok(value),
                Err(e) => {
                    error!("Commit failed, rolling back: {}", e);
                    Err(e)
                }
            },
            Err(e) => {
                debug!("Session body failed, rolling back: {}", e);
                if let Err(rollback_err) = session.rollback().await {
                    error!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        };

        session.close().await;
        result
    }

    pub async fn create_all_tables(&self) -> Result<()> {
        info!("Creating {} tables", TABLES.len());
        let mut tx = self.pool.begin().await?;
        for (name, ddl) in TABLES {
            debug!("CREATE TABLE {}", name);
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn drop_all_tables(&self) -> Result<()> {
        info!("Dropping {} tables", TABLES.len());
        let mut tx = self.pool.begin().await?;
        for name in schema::table_names().rev() {
            debug!("DROP TABLE {}", name);
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", name))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Remove every row from every table, children first, in one
    /// transaction. Returns the number of rows removed.
    pub async fn delete_all_data(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for name in schema::table_names().rev() {
            let result = sqlx::query(&format!("DELETE FROM {}", name))
                .execute(&mut *tx)
                .await?;
            debug!("Deleted {} rows from {}", result.rows_affected(), name);
            removed += result.rows_affected();
        }
        tx.commit().await?;
        info!("Deleted {} rows", removed);
        Ok(removed)
    }

    /// Names of the tables that currently exist in the store.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A unit of work. Writes made through a session are visible to it right
/// away and to everyone else once [`Session::commit`] succeeds.
///
/// A transaction is opened on first use. Dropping a session with pending
/// work rolls that work back.
pub struct Session {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl Session {
    /// Connection of the open transaction, beginning one if needed.
    pub async fn connection(&mut self) -> Result<&mut SqliteConnection> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                debug!("Beginning transaction");
                self.pool.begin().await?
            }
        };
        Ok(&mut **self.tx.insert(tx))
    }

    /// True while there is uncommitted work.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("Transaction committed");
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("Transaction rolled back");
        }
        Ok(())
    }

    /// Discard pending work and release the connection.
    pub async fn close(&mut self) {
        if let Err(e) = self.rollback().await {
            error!("Failed to release session: {}", e);
        }
    }
}

/// Where a read is executed: inside a session (seeing its pending work)
/// or straight against the database.
pub enum QueryContext<'a> {
    Session(&'a mut Session),
    Database(&'a Database),
}

impl<'a> From<&'a mut Session> for QueryContext<'a> {
    fn from(session: &'a mut Session) -> Self {
        QueryContext::Session(session)
    }
}

impl<'a> From<&'a Database> for QueryContext<'a> {
    fn from(db: &'a Database) -> Self {
        QueryContext::Database(db)
    }
}

fn redact(url: &str) -> &str {
    url.split('@').last().unwrap_or("***")
}
