//! Users and the roles they hold.

use crate::base::{utc_now, QueryContext, Session};
use crate::crud::{find_one_by, Crud, Model, SqliteQuery};
use crate::errors::{Error, Result};
use crate::password::{hash_password, verify_password};
use crate::validate::{check_fields, Fields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    /// Argon2 hash. Never the plaintext.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "utc_now")]
    pub created_at: DateTime<Utc>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub is_admin: bool,
}

/// Splits a `password` entry out of `fields`, leaving the rest to be
/// assigned as plain columns.
fn take_password(fields: &mut Fields) -> Result<Option<Option<String>>> {
    match fields.remove("password") {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(password)) => Ok(Some(Some(password))),
        Some(_) => Err(Error::Validation(
            "User password must be a string".to_string(),
        )),
    }
}

impl User {
    pub fn new(username: &str, email: &str, password: Option<&str>) -> Result<Self> {
        let mut user = User {
            id: None,
            username: username.to_string(),
            email: email.to_string(),
            password: None,
            created_at: utc_now(),
            first_name: None,
            last_name: None,
            active: false,
            is_admin: false,
        };
        if let Some(password) = password {
            user.set_password(password)?;
        }
        Ok(user)
    }

    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.password = Some(hash_password(password)?);
        Ok(())
    }

    /// A user without a stored password never matches.
    pub fn check_password(&self, password: &str) -> bool {
        match &self.password {
            Some(hash) => verify_password(password, hash),
            None => false,
        }
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub async fn get_by_username<'c>(
        username: &str,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<User>> {
        find_one_by::<User>("username", username, ctx).await
    }

    pub async fn get_by_email<'c>(
        email: &str,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<User>> {
        find_one_by::<User>("email", email, ctx).await
    }

    /// Roles held by this user, ordered by role id.
    pub async fn roles<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Vec<Role>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        let query = sqlx::query_as::<_, Role>(
            "SELECT roles.* FROM roles \
             JOIN user_roles ON user_roles.role_id = roles.id \
             WHERE user_roles.user_id = ? ORDER BY roles.id",
        )
        .bind(id);

        let roles = match ctx.into() {
            QueryContext::Session(session) => query.fetch_all(session.connection().await?).await?,
            QueryContext::Database(db) => query.fetch_all(db.pool()).await?,
        };
        Ok(roles)
    }

    /// Links `role` to this user, saving either side first if needed. An
    /// existing link is left alone.
    pub async fn add_role(
        &mut self,
        session: &mut Session,
        role: &mut Role,
        commit: bool,
    ) -> Result<()> {
        if self.id.is_none() {
            self.save(session, false).await?;
        }
        if role.id.is_none() {
            role.save(session, false).await?;
        }
        let user_id = self.id.ok_or(Error::NotPersisted(User::NAME))?;
        let role_id = role.id.ok_or(Error::NotPersisted(Role::NAME))?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE user_id = ? AND role_id = ?")
                .bind(user_id)
                .bind(role_id)
                .fetch_one(session.connection().await?)
                .await?;
        if existing == 0 {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(role_id)
                .execute(session.connection().await?)
                .await?;
            info!("Granted role {} to user {}", role.name, self.username);
        } else {
            debug!("User {} already has role {}", self.username, role.name);
        }

        if commit {
            session.commit().await?;
        }
        Ok(())
    }

    /// Unlinks `role`. Returns whether a link existed.
    pub async fn remove_role(
        &self,
        session: &mut Session,
        role: &Role,
        commit: bool,
    ) -> Result<bool> {
        let (Some(user_id), Some(role_id)) = (self.id, role.id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(session.connection().await?)
            .await?;

        if commit {
            session.commit().await?;
        }
        Ok(result.rows_affected() > 0)
    }
}

impl Model for User {
    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const LINKS: &'static [(&'static str, &'static str)] = &[("user_roles", "user_id")];
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "email",
        "password",
        "created_at",
        "first_name",
        "last_name",
        "active",
        "is_admin",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.username.clone())
            .bind(self.email.clone())
            .bind(self.password.clone())
            .bind(self.created_at)
            .bind(self.first_name.clone())
            .bind(self.last_name.clone())
            .bind(self.active)
            .bind(self.is_admin)
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        check_fields(Self::NAME, Self::COLUMNS, &fields)?;
        let password = take_password(&mut fields)?;
        let mut user: User = serde_json::from_value(Value::Object(fields))?;
        if let Some(Some(password)) = password {
            user.set_password(&password)?;
        }
        Ok(user)
    }

    fn assign(&mut self, mut fields: Fields) -> Result<()> {
        check_fields(Self::NAME, Self::COLUMNS, &fields)?;
        let password = take_password(&mut fields)?;

        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(Error::Validation("User is not a record".to_string())),
        };
        current.extend(fields);
        let mut user: User = serde_json::from_value(Value::Object(current))?;
        user.id = self.id;
        match password {
            Some(Some(password)) => user.set_password(&password)?,
            Some(None) => user.password = None,
            None => {}
        }
        *self = user;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

impl Role {
    pub fn new(name: &str) -> Self {
        Role {
            id: None,
            name: name.to_string(),
        }
    }

    pub async fn get_by_name<'c>(
        name: &str,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Role>> {
        find_one_by::<Role>("name", name, ctx).await
    }

    /// Users holding this role, ordered by user id.
    pub async fn users<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Vec<User>> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        let query = sqlx::query_as::<_, User>(
            "SELECT users.* FROM users \
             JOIN user_roles ON user_roles.user_id = users.id \
             WHERE user_roles.role_id = ? ORDER BY users.id",
        )
        .bind(id);

        let users = match ctx.into() {
            QueryContext::Session(session) => query.fetch_all(session.connection().await?).await?,
            QueryContext::Database(db) => query.fetch_all(db.pool()).await?,
        };
        Ok(users)
    }
}

impl Model for Role {
    const NAME: &'static str = "Role";
    const TABLE: &'static str = "roles";
    const COLUMNS: &'static [&'static str] = &["name"];
    const LINKS: &'static [(&'static str, &'static str)] = &[("user_roles", "role_id")];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.name.clone())
    }
}
