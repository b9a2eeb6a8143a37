//! Versioned schema migrations.
//!
//! Revisions are `<VERSION>_<description>.sql` files in a script
//! directory, applied through sqlx's migrator and recorded in its
//! `_sqlx_migrations` table.

use crate::base::{utc_now, Database};
use crate::errors::{Error, Result};
use crate::schema::ddl_script;
use crate::settings::Config;
use sqlx::migrate::{Migrate, MigrateError, Migration, Migrator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Revision name meaning "the newest revision in the script directory".
pub const HEAD: &str = "head";

#[derive(Debug, Clone)]
pub struct MigrationTool {
    script_location: PathBuf,
}

/// Which revisions an operation should reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Head,
    Version(i64),
}

impl Target {
    fn parse(revision: &str) -> Result<Self> {
        let revision = revision.trim();
        if revision.eq_ignore_ascii_case(HEAD) {
            return Ok(Target::Head);
        }
        revision.parse().map(Target::Version).map_err(|_| {
            Error::Validation(format!(
                "Unknown revision `{}`, expected a version number or `{}`",
                revision, HEAD
            ))
        })
    }

    fn includes(&self, version: i64) -> bool {
        match self {
            Target::Head => true,
            Target::Version(target) => version <= *target,
        }
    }
}

impl MigrationTool {
    pub fn new(script_location: impl Into<PathBuf>) -> Self {
        MigrationTool {
            script_location: script_location.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        MigrationTool::new(config.migrations_dir())
    }

    pub fn script_location(&self) -> &Path {
        &self.script_location
    }

    async fn migrator(&self) -> Result<Migrator> {
        debug!("Loading migrations from {}", self.script_location.display());
        Ok(Migrator::new(self.script_location.clone()).await?)
    }

    /// Up-migrations not yet recorded as applied, in version order, up to
    /// `target`. An applied revision whose script changed is an error.
    fn pending<'m>(
        migrator: &'m Migrator,
        applied: &HashMap<i64, Vec<u8>>,
        target: Target,
    ) -> Result<Vec<&'m Migration>> {
        let mut pending = Vec::new();
        for migration in migrator.iter() {
            if migration.migration_type.is_down_migration() {
                continue;
            }
            match applied.get(&migration.version) {
                Some(checksum) if checksum.as_slice() != &*migration.checksum => {
                    return Err(MigrateError::VersionMismatch(migration.version).into());
                }
                Some(_) => {}
                None if target.includes(migration.version) => pending.push(migration),
                None => {}
            }
        }
        Ok(pending)
    }

    async fn applied(db: &Database) -> Result<HashMap<i64, Vec<u8>>> {
        let mut conn = db.pool().acquire().await?;
        conn.ensure_migrations_table().await?;
        let applied = conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| (m.version, m.checksum.into_owned()))
            .collect();
        Ok(applied)
    }

    /// Records revisions up to `revision` as applied without running them,
    /// for a database whose tables were created directly. Returns how many
    /// revisions were stamped.
    pub async fn stamp(&self, db: &Database, revision: &str) -> Result<usize> {
        let target = Target::parse(revision)?;
        let migrator = self.migrator().await?;
        let applied = Self::applied(db).await?;
        let pending = Self::pending(&migrator, &applied, target)?;

        let mut tx = db.pool().begin().await?;
        for migration in &pending {
            sqlx::query(
                "INSERT INTO _sqlx_migrations (version, description, success, checksum, execution_time) \
                 VALUES (?, ?, TRUE, ?, 0)",
            )
            .bind(migration.version)
            .bind(&*migration.description)
            .bind(&*migration.checksum)
            .execute(&mut *tx)
            .await?;
            debug!("Stamped revision {}", migration.version);
        }
        tx.commit().await?;

        info!("Stamped {} revision(s) as applied", pending.len());
        Ok(pending.len())
    }

    /// Applies pending revisions up to `revision`, oldest first. Returns
    /// how many were applied.
    pub async fn upgrade(&self, db: &Database, revision: &str) -> Result<usize> {
        let target = Target::parse(revision)?;
        let migrator = self.migrator().await?;
        let applied = Self::applied(db).await?;
        let pending = Self::pending(&migrator, &applied, target)?;

        let mut conn = db.pool().acquire().await?;
        for migration in &pending {
            let elapsed = conn.apply(migration).await?;
            info!(
                "Applied revision {} ({}) in {:?}",
                migration.version, migration.description, elapsed
            );
        }

        if pending.is_empty() {
            info!("Database already at revision {}", revision);
        }
        Ok(pending.len())
    }

    /// Writes a new revision script holding the current schema. Returns
    /// the path of the new file.
    pub async fn revision(&self, message: &str) -> Result<PathBuf> {
        let slug = slugify(message);
        if slug.is_empty() {
            return Err(Error::Validation(
                "A revision needs a message".to_string(),
            ));
        }

        let now = utc_now();
        let version = now.format("%Y%m%d%H%M%S").to_string();
        let path = self
            .script_location
            .join(format!("{}_{}.sql", version, slug));
        if tokio::fs::try_exists(&path).await? {
            return Err(Error::Validation(format!(
                "Revision {} already exists",
                path.display()
            )));
        }

        let script = format!(
            "-- {}\n-- Revision {}, created {}\n\n{}",
            message.trim(),
            version,
            now.to_rfc3339(),
            ddl_script()
        );
        tokio::fs::create_dir_all(&self.script_location).await?;
        tokio::fs::write(&path, script).await?;

        info!("Created revision {}", path.display());
        Ok(path)
    }

    /// Newest revision recorded as applied, if any.
    pub async fn current_revision(&self, db: &Database) -> Result<Option<i64>> {
        let applied = Self::applied(db).await?;
        Ok(applied.keys().max().copied())
    }
}

/// Lowercase words joined by underscores, as used in revision filenames.
fn slugify(message: &str) -> String {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
