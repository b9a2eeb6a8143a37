//! Create, read, update and delete for every model.
//!
//! A model describes its table through [`Model`]; [`Crud`] and
//! [`SurrogatePk`] are implemented for every model from that description.

use crate::base::{utc_now, QueryContext, Session};
use crate::errors::{Error, Result};
use crate::validate::{check_fields, Fields, RecordId};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};
use tracing::debug;

pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Mapping between a struct and its table. `id` is the surrogate key and
/// is not listed in `COLUMNS`.
pub trait Model:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + Sized
{
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Every persisted column except `id`, in binding order.
    const COLUMNS: &'static [&'static str];
    /// Association tables and the column in each that holds this
    /// record's id. Their rows go with the record on delete.
    const LINKS: &'static [(&'static str, &'static str)] = &[];

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Binds the values of `COLUMNS`, in the same order.
    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    fn before_insert(&mut self, _now: DateTime<Utc>) {}

    fn before_update(&mut self, _now: DateTime<Utc>) {}

    /// Builds an unsaved instance from named fields.
    fn from_fields(fields: Fields) -> Result<Self> {
        check_fields(Self::NAME, Self::COLUMNS, &fields)?;
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Assigns named fields to this instance.
    fn assign(&mut self, fields: Fields) -> Result<()> {
        check_fields(Self::NAME, Self::COLUMNS, &fields)?;
        let id = self.id();
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(Error::Validation(format!("{} is not a record", Self::NAME))),
        };
        current.extend(fields);
        *self = serde_json::from_value(Value::Object(current))?;
        if let Some(id) = id {
            self.set_id(id);
        }
        Ok(())
    }
}

fn quoted(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| format!("\"{}\"", c)).collect()
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        quoted(columns).join(", "),
        placeholders
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = quoted(columns)
        .into_iter()
        .map(|c| format!("{} = ?", c))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = ?",
        table,
        assignments.join(", ")
    )
}

#[allow(async_fn_in_trait)]
pub trait Crud: Model {
    /// Builds an instance from `fields`, saves it and commits.
    async fn create(session: &mut Session, fields: Fields) -> Result<Self> {
        let mut instance = Self::from_fields(fields)?;
        instance.save(session, true).await?;
        Ok(instance)
    }

    /// Assigns `fields` and saves. The change stays pending in the
    /// session unless `commit` is set.
    async fn update(
        &mut self,
        session: &mut Session,
        fields: Fields,
        commit: bool,
    ) -> Result<&mut Self> {
        self.assign(fields)?;
        self.save(session, commit).await
    }

    /// Writes the instance into the session: an insert the first time,
    /// assigning `id`, an update afterwards.
    async fn save(&mut self, session: &mut Session, commit: bool) -> Result<&mut Self> {
        let now = utc_now();
        match self.id() {
            None => {
                self.before_insert(now);
                let sql = insert_sql(Self::TABLE, Self::COLUMNS);
                let result = self
                    .bind_columns(sqlx::query(&sql))
                    .execute(session.connection().await?)
                    .await?;
                self.set_id(result.last_insert_rowid());
                debug!("Inserted {} {}", Self::NAME, result.last_insert_rowid());
            }
            Some(id) => {
                self.before_update(now);
                let sql = update_sql(Self::TABLE, Self::COLUMNS);
                let result = self
                    .bind_columns(sqlx::query(&sql))
                    .bind(id)
                    .execute(session.connection().await?)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(Error::NotPersisted(Self::NAME));
                }
                debug!("Updated {} {}", Self::NAME, id);
            }
        }

        if commit {
            session.commit().await?;
        }
        Ok(self)
    }

    /// Stages removal of the row. Returns whether a commit took place,
    /// so an uncommitted delete reports `false` even though it is pending.
    async fn delete(self, session: &mut Session, commit: bool) -> Result<bool> {
        let id = self.id().ok_or(Error::NotPersisted(Self::NAME))?;
        for (table, column) in Self::LINKS {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", table, column))
                .bind(id)
                .execute(session.connection().await?)
                .await?;
            debug!(
                "Unlinked {} {} from {} row(s) of {}",
                Self::NAME,
                id,
                result.rows_affected(),
                table
            );
        }
        let sql = format!("DELETE FROM {} WHERE id = ?", Self::TABLE);
        sqlx::query(&sql)
            .bind(id)
            .execute(session.connection().await?)
            .await?;
        debug!("Deleted {} {}", Self::NAME, id);

        if commit {
            session.commit().await?;
        }
        Ok(commit)
    }
}

impl<T: Model> Crud for T {}

#[allow(async_fn_in_trait)]
pub trait SurrogatePk: Model {
    /// Looks a record up by id. Malformed ids and missing rows are both
    /// `Ok(None)`.
    async fn get_by_id<'c>(
        record_id: impl Into<RecordId>,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Self>> {
        let Some(id) = record_id.into().get() else {
            return Ok(None);
        };
        let sql = format!("SELECT * FROM {} WHERE id = ?", Self::TABLE);
        let query = sqlx::query_as::<_, Self>(&sql).bind(id);

        let row = match ctx.into() {
            QueryContext::Session(session) => {
                query.fetch_optional(session.connection().await?).await?
            }
            QueryContext::Database(db) => query.fetch_optional(db.pool()).await?,
        };
        Ok(row)
    }

    /// Every record of this model, ordered by id.
    async fn all<'c>(ctx: impl Into<QueryContext<'c>>) -> Result<Vec<Self>> {
        let sql = format!("SELECT * FROM {} ORDER BY id", Self::TABLE);
        let query = sqlx::query_as::<_, Self>(&sql);

        let rows = match ctx.into() {
            QueryContext::Session(session) => query.fetch_all(session.connection().await?).await?,
            QueryContext::Database(db) => query.fetch_all(db.pool()).await?,
        };
        Ok(rows)
    }
}

impl<T: Model> SurrogatePk for T {}

/// Fetches at most one record of `T` where `column` equals `value`.
pub(crate) async fn find_one_by<'c, T: Model>(
    column: &str,
    value: impl Into<KeyValue>,
    ctx: impl Into<QueryContext<'c>>,
) -> Result<Option<T>> {
    let sql = format!("SELECT * FROM {} WHERE \"{}\" = ? LIMIT 1", T::TABLE, column);
    let query = value.into().bind_to(sqlx::query_as::<_, T>(&sql));

    let row = match ctx.into() {
        QueryContext::Session(session) => query.fetch_optional(session.connection().await?).await?,
        QueryContext::Database(db) => query.fetch_optional(db.pool()).await?,
    };
    Ok(row)
}

/// Fetches every record of `T` where `column` equals `value`, by id.
pub(crate) async fn find_all_by<'c, T: Model>(
    column: &str,
    value: impl Into<KeyValue>,
    ctx: impl Into<QueryContext<'c>>,
) -> Result<Vec<T>> {
    let sql = format!(
        "SELECT * FROM {} WHERE \"{}\" = ? ORDER BY id",
        T::TABLE,
        column
    );
    let query = value.into().bind_to(sqlx::query_as::<_, T>(&sql));

    let rows = match ctx.into() {
        QueryContext::Session(session) => query.fetch_all(session.connection().await?).await?,
        QueryContext::Database(db) => query.fetch_all(db.pool()).await?,
    };
    Ok(rows)
}

/// A key value used in lookups: a surrogate id or a natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Id(i64),
    Name(String),
}

impl KeyValue {
    fn bind_to<'q, T>(
        self,
        query: sqlx::query::QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryAs<'q, Sqlite, T, SqliteArguments<'q>> {
        match self {
            KeyValue::Id(id) => query.bind(id),
            KeyValue::Name(name) => query.bind(name),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(id: i64) -> Self {
        KeyValue::Id(id)
    }
}

impl From<String> for KeyValue {
    fn from(name: String) -> Self {
        KeyValue::Name(name)
    }
}

impl From<&str> for KeyValue {
    fn from(name: &str) -> Self {
        KeyValue::Name(name.to_string())
    }
}
