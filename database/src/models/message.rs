use crate::base::utc_now;
use crate::crud::{Model, SqliteQuery};
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A message passed between parts of the system, valid over a window of
/// time. The payload is stored as serialized JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    #[serde(default)]
    pub id: Option<i64>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub classification: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub payload: Option<Vec<u8>>,
}

impl Message {
    pub fn new(source: &str, destination: &str, classification: &str) -> Self {
        Message {
            id: None,
            source: Some(source.to_string()),
            destination: Some(destination.to_string()),
            classification: Some(classification.to_string()),
            created_at: None,
            valid_from: None,
            valid_to: None,
            payload: None,
        }
    }

    /// Sets the validity window relative to now. `valid_from` defaults to
    /// now and `valid_to` to one day after now.
    pub fn set_datetime(&mut self, valid_from: Option<Duration>, valid_to: Option<Duration>) {
        let now = utc_now();
        self.valid_from = Some(now + valid_from.unwrap_or_else(Duration::zero));
        self.valid_to = Some(now + valid_to.unwrap_or_else(|| Duration::days(1)));
    }

    pub fn set_payload<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<()> {
        self.payload = Some(serde_json::to_vec(payload)?);
        Ok(())
    }

    pub fn payload<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.payload {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether `at` falls inside the validity window. A message without a
    /// window is never valid.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        match (self.valid_from, self.valid_to) {
            (Some(from), Some(to)) => from <= at && at <= to,
            _ => false,
        }
    }
}

impl Model for Message {
    const NAME: &'static str = "Message";
    const TABLE: &'static str = "message";
    const COLUMNS: &'static [&'static str] = &[
        "source",
        "destination",
        "classification",
        "created_at",
        "valid_from",
        "valid_to",
        "payload",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.source.clone())
            .bind(self.destination.clone())
            .bind(self.classification.clone())
            .bind(self.created_at)
            .bind(self.valid_from)
            .bind(self.valid_to)
            .bind(self.payload.clone())
    }

    fn before_insert(&mut self, now: DateTime<Utc>) {
        self.created_at.get_or_insert(now);
    }
}
