//! Relational store for the farm monitor: schema, models and the
//! create/read/update/delete layer on top of SQLite.

pub mod base;
pub mod crud;
pub mod errors;
pub mod migrations;
pub mod models;
pub mod password;
pub mod relations;
pub mod schema;
pub mod settings;
pub mod validate;

pub use base::{utc_now, Database, QueryContext, Session};
pub use crud::{Crud, Model, SurrogatePk};
pub use errors::{Error, Result};
pub use migrations::MigrationTool;
pub use models::*;
pub use relations::{BelongsTo, Parent};
pub use settings::{get_config, Config, Environment};
pub use validate::{fields, Fields, RecordId};
