//! Configuration of the host the monitor runs on.

use crate::base::{QueryContext, Session};
use crate::crud::{find_one_by, Model, SqliteQuery};
use crate::errors::Result;
use crate::relations::{BelongsTo, Parent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn yes() -> bool {
    true
}

fn default_wifi_name() -> String {
    "FarmMonitor".to_string()
}

fn default_wifi_password() -> String {
    "raspberry".to_string()
}

fn default_wifi_mode() -> String {
    "wpa".to_string()
}

/// First-run and update state. There is normally a single row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemSetup {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_setup_complete: bool,
    pub first_setup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_in_progress: bool,
    #[serde(default)]
    pub new_update_installed: bool,
}

impl SystemSetup {
    pub fn new() -> Self {
        SystemSetup::default()
    }
}

impl Model for SystemSetup {
    const NAME: &'static str = "SystemSetup";
    const TABLE: &'static str = "system_setup";
    const COLUMNS: &'static [&'static str] = &[
        "first_setup_complete",
        "first_setup_time",
        "update_in_progress",
        "new_update_installed",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.first_setup_complete)
            .bind(self.first_setup_time)
            .bind(self.update_in_progress)
            .bind(self.new_update_installed)
    }
}

/// A network interface, identified by its name (`wlan0`, `eth0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interface {
    #[serde(default)]
    pub id: Option<i64>,
    pub interface: String,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub is_for_fm: bool,
    #[serde(default)]
    pub is_external: bool,
    pub state: Option<String>,
}

impl Interface {
    pub fn new(interface: &str) -> Self {
        Interface {
            id: None,
            interface: interface.to_string(),
            is_active: true,
            is_for_fm: false,
            is_external: false,
            state: None,
        }
    }

    pub async fn get_by_name<'c>(
        interface: &str,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Interface>> {
        find_one_by::<Interface>("interface", interface, ctx).await
    }

    pub async fn credentials<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Vec<Wifi>> {
        self.children::<Wifi>(ctx).await
    }

    pub async fn add_credential(
        &mut self,
        session: &mut Session,
        wifi: &mut Wifi,
        commit: bool,
    ) -> Result<()> {
        self.append(session, wifi, commit).await
    }
}

impl Model for Interface {
    const NAME: &'static str = "Interface";
    const TABLE: &'static str = "system_interface";
    const COLUMNS: &'static [&'static str] =
        &["interface", "is_active", "is_for_fm", "is_external", "state"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.interface.clone())
            .bind(self.is_active)
            .bind(self.is_for_fm)
            .bind(self.is_external)
            .bind(self.state.clone())
    }
}

/// Wifi credentials, attached to an interface by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wifi {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "default_wifi_name")]
    pub wifi_name: String,
    #[serde(default = "default_wifi_password")]
    pub wifi_password: String,
    #[serde(default = "default_wifi_mode")]
    pub wifi_mode: String,
    pub interface: Option<String>,
}

impl Wifi {
    pub fn new() -> Self {
        Wifi {
            id: None,
            wifi_name: default_wifi_name(),
            wifi_password: default_wifi_password(),
            wifi_mode: default_wifi_mode(),
            interface: None,
        }
    }

    pub async fn interface<'c>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Interface>> {
        <Self as BelongsTo<Interface>>::parent(self, ctx).await
    }
}

impl Default for Wifi {
    fn default() -> Self {
        Wifi::new()
    }
}

impl Model for Wifi {
    const NAME: &'static str = "Wifi";
    const TABLE: &'static str = "system_wifi";
    const COLUMNS: &'static [&'static str] =
        &["wifi_name", "wifi_password", "wifi_mode", "interface"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.wifi_name.clone())
            .bind(self.wifi_password.clone())
            .bind(self.wifi_mode.clone())
            .bind(self.interface.clone())
    }
}

impl BelongsTo<Interface> for Wifi {
    type Key = String;
    const FOREIGN_KEY: &'static str = "interface";
    const REFERENCES: &'static str = "interface";

    fn referenced_key(parent: &Interface) -> Option<String> {
        Some(parent.interface.clone())
    }

    fn foreign_key(&self) -> Option<String> {
        self.interface.clone()
    }

    fn set_foreign_key(&mut self, key: String) {
        self.interface = Some(key);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Hardware {
    #[serde(default)]
    pub id: Option<i64>,
    pub device_name: Option<String>,
    pub hardware_version: Option<String>,
    pub serial_number: Option<String>,
}

impl Hardware {
    pub fn new(device_name: &str, hardware_version: &str, serial_number: &str) -> Self {
        Hardware {
            id: None,
            device_name: Some(device_name.to_string()),
            hardware_version: Some(hardware_version.to_string()),
            serial_number: Some(serial_number.to_string()),
        }
    }
}

impl Model for Hardware {
    const NAME: &'static str = "Hardware";
    const TABLE: &'static str = "system_hardware";
    const COLUMNS: &'static [&'static str] =
        &["device_name", "hardware_version", "serial_number"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.device_name.clone())
            .bind(self.hardware_version.clone())
            .bind(self.serial_number.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Software {
    #[serde(default)]
    pub id: Option<i64>,
    pub software_version: Option<String>,
    pub software_version_last: Option<String>,
}

impl Software {
    pub fn new(software_version: &str) -> Self {
        Software {
            id: None,
            software_version: Some(software_version.to_string()),
            software_version_last: None,
        }
    }
}

impl Model for Software {
    const NAME: &'static str = "Software";
    const TABLE: &'static str = "system_software";
    const COLUMNS: &'static [&'static str] = &["software_version", "software_version_last"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.software_version.clone())
            .bind(self.software_version_last.clone())
    }
}
