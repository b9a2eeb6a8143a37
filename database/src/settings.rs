//! Application configuration.
//!
//! One environment variable picks a named configuration. Anything that is
//! not `dev`, `test` or `prod` resolves to the development configuration.

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Selects the configuration when no override is passed to [`get_config`].
pub const CONFIG_ENV_VAR: &str = "FM_DATABASE_CONFIG";

/// Overrides the connection string of the dev and prod configurations.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";

/// Overrides the directory that holds `migrations/`.
pub const PROJECT_ROOT_ENV_VAR: &str = "FM_PROJECT_ROOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl Environment {
    /// Unrecognized names fall back to `Dev`.
    pub fn resolve(name: &str) -> Self {
        match name {
            "dev" => Environment::Dev,
            "prod" => Environment::Prod,
            "test" => Environment::Test,
            other => {
                debug!("Unknown configuration '{}', using dev", other);
                Environment::Dev
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub env: Environment,
    pub debug: bool,
    pub testing: bool,
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub project_root: PathBuf,
}

impl Config {
    pub fn dev() -> Self {
        Config {
            env: Environment::Dev,
            debug: true,
            ..Config::base()
        }
    }

    pub fn prod() -> Self {
        Config {
            env: Environment::Prod,
            debug: false,
            ..Config::base()
        }
    }

    pub fn test() -> Self {
        Config {
            env: Environment::Test,
            debug: true,
            testing: true,
            database_url: memory_url(),
            acquire_timeout: Duration::from_secs(5),
            ..Config::base()
        }
    }

    fn base() -> Self {
        let project_root = env::var(PROJECT_ROOT_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")));
        let database_url = env::var(DATABASE_URL_ENV_VAR).unwrap_or_else(|_| {
            format!(
                "sqlite://{}?mode=rwc",
                project_root.join("farm_monitor.db").display()
            )
        });

        Config {
            env: Environment::Dev,
            debug: false,
            testing: false,
            database_url,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            project_root,
        }
    }

    /// Script location handed to the migration tool.
    pub fn migrations_dir(&self) -> PathBuf {
        self.project_root.join("migrations")
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
            || self.database_url.contains("mode=memory")
            || self.database_url.contains("vfs=memdb")
    }
}

/// A fresh in-memory database per call. Connections of one pool share it
/// under the `memdb` VFS, so readers see committed state while another
/// connection holds an open write transaction.
fn memory_url() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "sqlite:///fm_test_{}_{}?vfs=memdb",
        process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

/// Returns the configuration named by `override_default`, or by
/// `FM_DATABASE_CONFIG` when no override is given.
pub fn get_config(override_default: Option<&str>) -> Config {
    let name = match override_default {
        Some(name) => name.to_string(),
        None => env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| "dev".to_string()),
    };

    match Environment::resolve(&name) {
        Environment::Dev => Config::dev(),
        Environment::Test => Config::test(),
        Environment::Prod => Config::prod(),
    }
}
