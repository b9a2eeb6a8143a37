//! Database management commands. Progress lines are written to the given
//! output so the binary can print them and tests can capture them.

use anyhow::{Context, Result};
use fm_database::{Crud, Database, MigrationTool, SystemSetup, User};
use std::io::Write;
use tracing::info;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@mail.com";
const ADMIN_PASSWORD: &str = "admin";

pub struct Manage {
    db: Database,
    migrations: MigrationTool,
}

impl Manage {
    pub fn new(db: Database, migrations: MigrationTool) -> Self {
        Manage { db, migrations }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates every table and marks the newest migration as applied.
    pub async fn create_tables(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "creating all tables")?;
        self.db.create_all_tables().await?;

        writeln!(out, "stamping migration head")?;
        self.migrations
            .stamp(&self.db, "head")
            .await
            .context("Failed to stamp migration head")?;
        writeln!(out, "done")?;
        Ok(())
    }

    pub async fn drop_tables(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "dropping all tables")?;
        self.db.drop_all_tables().await?;
        writeln!(out, "done")?;
        Ok(())
    }

    pub async fn recreate_database(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "dropping all tables")?;
        self.db.drop_all_tables().await?;
        self.create_tables(out).await
    }

    /// Removes every row. Nothing happens unless `confirm` is set.
    pub async fn delete_all_data(&self, confirm: bool, out: &mut impl Write) -> Result<()> {
        if !confirm {
            writeln!(
                out,
                "Action was not confirmed (command option '--confirm'). No change made."
            )?;
            return Ok(());
        }

        writeln!(out, "deleting all data from the database.")?;
        let removed = self.db.delete_all_data().await?;
        info!("Removed {} rows", removed);
        writeln!(out, "done")?;
        Ok(())
    }

    /// Seeds the admin user and the system setup row, in one commit.
    pub async fn init(&self, out: &mut impl Write) -> Result<()> {
        let mut session = self.db.session();

        writeln!(out, "creating user")?;
        let mut user = User::new(ADMIN_USERNAME, ADMIN_EMAIL, Some(ADMIN_PASSWORD))?;
        user.active = true;
        user.is_admin = true;
        user.save(&mut session, false)
            .await
            .context("Failed to create admin user")?;
        writeln!(out, "created user {}", user.username)?;

        writeln!(out, "inserting SystemSetup record")?;
        SystemSetup::new().save(&mut session, false).await?;

        session.commit().await?;
        Ok(())
    }

    pub async fn create_revision(&self, message: &str, out: &mut impl Write) -> Result<()> {
        let path = self.migrations.revision(message).await?;
        writeln!(out, "created revision {}", path.display())?;
        Ok(())
    }

    pub async fn database_upgrade(&self, revision: &str, out: &mut impl Write) -> Result<()> {
        let applied = self.migrations.upgrade(&self.db, revision).await?;
        writeln!(out, "applied {} revision(s), target {}", applied, revision)?;
        Ok(())
    }
}
