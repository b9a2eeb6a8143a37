//! Devices and the grain bins, temperature cables and sensors hanging off
//! them.

use crate::base::{QueryContext, Session};
use crate::crud::{find_one_by, Model, SqliteQuery};
use crate::errors::Result;
use crate::relations::{BelongsTo, Parent};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

fn not_set() -> String {
    "not set".to_string()
}

fn not_set_title() -> String {
    "Not Set".to_string()
}

fn new_bin_name() -> String {
    "New".to_string()
}

fn standard() -> String {
    "standard".to_string()
}

fn temperature() -> String {
    "temperature".to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

/// A monitoring device. Telemetry fields hold the last value reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    #[serde(default)]
    pub id: Option<i64>,
    pub device_id: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default = "not_set")]
    pub name: String,
    #[serde(default = "not_set")]
    pub location: String,
    #[serde(default = "not_set")]
    pub description: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub user_configured: bool,
    pub last_update_received: Option<DateTime<Utc>>,
    pub interior_temp: Option<String>,
    pub exterior_temp: Option<String>,
    pub device_temp: Option<String>,
    /// Seconds.
    pub uptime: Option<i64>,
    pub current_time: Option<DateTime<Utc>>,
    pub load_avg: Option<String>,
    pub disk_total: Option<String>,
    pub disk_used: Option<String>,
    pub disk_free: Option<String>,
    #[serde(default)]
    pub grainbin_count: i32,
}

impl Device {
    pub fn new(device_id: &str, hardware_version: &str, software_version: &str) -> Self {
        Device {
            id: None,
            device_id: Some(device_id.to_string()),
            hardware_version: Some(hardware_version.to_string()),
            software_version: Some(software_version.to_string()),
            creation_time: None,
            last_updated: None,
            name: not_set(),
            location: not_set(),
            description: not_set(),
            connected: false,
            user_configured: false,
            last_update_received: None,
            interior_temp: None,
            exterior_temp: None,
            device_temp: None,
            uptime: None,
            current_time: None,
            load_avg: None,
            disk_total: None,
            disk_used: None,
            disk_free: None,
            grainbin_count: 0,
        }
    }

    pub async fn get_by_device_id<'c>(
        device_id: &str,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Device>> {
        find_one_by::<Device>("device_id", device_id, ctx).await
    }

    pub fn set_uptime(&mut self, uptime: Duration) {
        self.uptime = Some(uptime.num_seconds());
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.uptime.map(Duration::seconds)
    }

    pub async fn bins<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Vec<Grainbin>> {
        self.children::<Grainbin>(ctx).await
    }

    pub async fn add_bin(
        &mut self,
        session: &mut Session,
        bin: &mut Grainbin,
        commit: bool,
    ) -> Result<()> {
        self.append(session, bin, commit).await
    }
}

impl Model for Device {
    const NAME: &'static str = "Device";
    const TABLE: &'static str = "device";
    const COLUMNS: &'static [&'static str] = &[
        "device_id",
        "hardware_version",
        "software_version",
        "creation_time",
        "last_updated",
        "name",
        "location",
        "description",
        "connected",
        "user_configured",
        "last_update_received",
        "interior_temp",
        "exterior_temp",
        "device_temp",
        "uptime",
        "current_time",
        "load_avg",
        "disk_total",
        "disk_used",
        "disk_free",
        "grainbin_count",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.device_id.clone())
            .bind(self.hardware_version.clone())
            .bind(self.software_version.clone())
            .bind(self.creation_time)
            .bind(self.last_updated)
            .bind(self.name.clone())
            .bind(self.location.clone())
            .bind(self.description.clone())
            .bind(self.connected)
            .bind(self.user_configured)
            .bind(self.last_update_received)
            .bind(self.interior_temp.clone())
            .bind(self.exterior_temp.clone())
            .bind(self.device_temp.clone())
            .bind(self.uptime)
            .bind(self.current_time)
            .bind(self.load_avg.clone())
            .bind(self.disk_total.clone())
            .bind(self.disk_used.clone())
            .bind(self.disk_free.clone())
            .bind(self.grainbin_count)
    }

    fn before_insert(&mut self, now: DateTime<Utc>) {
        self.creation_time.get_or_insert(now);
        self.last_updated = Some(now);
    }

    fn before_update(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

/// A grain bin, wired to a device at a position on the device's bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Grainbin {
    #[serde(default)]
    pub id: Option<i64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default = "new_bin_name")]
    pub name: String,
    #[serde(default = "standard")]
    pub grainbin_type: String,
    #[serde(default = "temperature")]
    pub sensor_type: String,
    #[serde(default = "not_set_title")]
    pub location: String,
    #[serde(default = "not_set_title")]
    pub description: String,
    #[serde(default)]
    pub total_updates: i32,
    pub average_temp: Option<String>,
    pub bus_number: i32,
    #[serde(default)]
    pub user_configured: bool,
    pub device_id: Option<i64>,
}

impl Grainbin {
    pub fn new(device_id: Option<i64>, bus_number: i32) -> Self {
        Grainbin {
            id: None,
            creation_time: None,
            last_updated: None,
            name: new_bin_name(),
            grainbin_type: standard(),
            sensor_type: temperature(),
            location: not_set_title(),
            description: not_set_title(),
            total_updates: 0,
            average_temp: None,
            bus_number,
            user_configured: false,
            device_id,
        }
    }

    pub async fn device<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Option<Device>> {
        <Self as BelongsTo<Device>>::parent(self, ctx).await
    }

    pub async fn cables<'c>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Vec<TemperatureCable>> {
        self.children::<TemperatureCable>(ctx).await
    }

    pub async fn add_cable(
        &mut self,
        session: &mut Session,
        cable: &mut TemperatureCable,
        commit: bool,
    ) -> Result<()> {
        self.append(session, cable, commit).await
    }
}

impl Model for Grainbin {
    const NAME: &'static str = "Grainbin";
    const TABLE: &'static str = "grainbin";
    const COLUMNS: &'static [&'static str] = &[
        "creation_time",
        "last_updated",
        "name",
        "grainbin_type",
        "sensor_type",
        "location",
        "description",
        "total_updates",
        "average_temp",
        "bus_number",
        "user_configured",
        "device_id",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.creation_time)
            .bind(self.last_updated)
            .bind(self.name.clone())
            .bind(self.grainbin_type.clone())
            .bind(self.sensor_type.clone())
            .bind(self.location.clone())
            .bind(self.description.clone())
            .bind(self.total_updates)
            .bind(self.average_temp.clone())
            .bind(self.bus_number)
            .bind(self.user_configured)
            .bind(self.device_id)
    }

    fn before_insert(&mut self, now: DateTime<Utc>) {
        self.creation_time.get_or_insert(now);
        self.last_updated = Some(now);
    }

    fn before_update(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl BelongsTo<Device> for Grainbin {
    type Key = i64;
    const FOREIGN_KEY: &'static str = "device_id";

    fn referenced_key(parent: &Device) -> Option<i64> {
        parent.id
    }

    fn foreign_key(&self) -> Option<i64> {
        self.device_id
    }

    fn set_foreign_key(&mut self, key: i64) {
        self.device_id = Some(key);
    }
}

/// A temperature cable hanging in a grain bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemperatureCable {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub sensor_count: i32,
    #[serde(default = "temperature")]
    pub cable_type: String,
    #[serde(default)]
    pub bin_cable_number: i32,
    pub grainbin_id: Option<i64>,
}

impl TemperatureCable {
    pub fn new(grainbin_id: Option<i64>) -> Self {
        TemperatureCable {
            id: None,
            sensor_count: 0,
            cable_type: temperature(),
            bin_cable_number: 0,
            grainbin_id,
        }
    }

    pub async fn grainbin<'c>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<Grainbin>> {
        <Self as BelongsTo<Grainbin>>::parent(self, ctx).await
    }

    pub async fn sensors<'c>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Vec<TemperatureSensor>> {
        self.children::<TemperatureSensor>(ctx).await
    }

    pub async fn add_sensor(
        &mut self,
        session: &mut Session,
        sensor: &mut TemperatureSensor,
        commit: bool,
    ) -> Result<()> {
        self.append(session, sensor, commit).await
    }
}

impl Model for TemperatureCable {
    const NAME: &'static str = "TemperatureCable";
    const TABLE: &'static str = "temperature_cable";
    const COLUMNS: &'static [&'static str] =
        &["sensor_count", "cable_type", "bin_cable_number", "grainbin_id"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.sensor_count)
            .bind(self.cable_type.clone())
            .bind(self.bin_cable_number)
            .bind(self.grainbin_id)
    }
}

impl BelongsTo<Grainbin> for TemperatureCable {
    type Key = i64;
    const FOREIGN_KEY: &'static str = "grainbin_id";

    fn referenced_key(parent: &Grainbin) -> Option<i64> {
        parent.id
    }

    fn foreign_key(&self) -> Option<i64> {
        self.grainbin_id
    }

    fn set_foreign_key(&mut self, key: i64) {
        self.grainbin_id = Some(key);
    }
}

/// One sensor on a temperature cable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemperatureSensor {
    #[serde(default)]
    pub id: Option<i64>,
    pub templow: Option<String>,
    pub temphigh: Option<String>,
    #[serde(default = "unknown")]
    pub last_value: String,
    pub cable_id: Option<i64>,
}

impl TemperatureSensor {
    pub fn new(cable_id: Option<i64>) -> Self {
        TemperatureSensor {
            id: None,
            templow: None,
            temphigh: None,
            last_value: unknown(),
            cable_id,
        }
    }

    pub async fn cable<'c>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Option<TemperatureCable>> {
        <Self as BelongsTo<TemperatureCable>>::parent(self, ctx).await
    }
}

impl Model for TemperatureSensor {
    const NAME: &'static str = "TemperatureSensor";
    const TABLE: &'static str = "temperature_sensor";
    const COLUMNS: &'static [&'static str] = &["templow", "temphigh", "last_value", "cable_id"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.templow.clone())
            .bind(self.temphigh.clone())
            .bind(self.last_value.clone())
            .bind(self.cable_id)
    }
}

impl BelongsTo<TemperatureCable> for TemperatureSensor {
    type Key = i64;
    const FOREIGN_KEY: &'static str = "cable_id";

    fn referenced_key(parent: &TemperatureCable) -> Option<i64> {
        parent.id
    }

    fn foreign_key(&self) -> Option<i64> {
        self.cable_id
    }

    fn set_foreign_key(&mut self, key: i64) {
        self.cable_id = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::fields;
    use serde_json::json;

    #[test]
    fn test_device_defaults() {
        let device = Device::new("dev-1", "hw-1", "sw-1");
        assert_eq!(device.id, None);
        assert_eq!(device.name, "not set");
        assert_eq!(device.location, "not set");
        assert!(!device.connected);
        assert_eq!(device.grainbin_count, 0);
    }

    #[test]
    fn test_device_from_fields_uses_defaults() {
        let device = Device::from_fields(
            fields(json!({"device_id": "dev-1", "hardware_version": "1", "software_version": "2"}))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(device, Device::new("dev-1", "1", "2"));
    }

    #[test]
    fn test_grainbin_requires_bus_number() {
        assert!(Grainbin::from_fields(fields(json!({"device_id": 1})).unwrap()).is_err());
        let bin = Grainbin::from_fields(fields(json!({"device_id": 1, "bus_number": 3})).unwrap())
            .unwrap();
        assert_eq!(bin, Grainbin::new(Some(1), 3));
    }

    #[test]
    fn test_sensor_last_value_is_unknown() {
        let sensor = TemperatureSensor::new(None);
        assert_eq!(sensor.last_value, "unknown");
        assert_eq!(sensor.templow, None);
    }

    #[test]
    fn test_assign_keeps_id() {
        let mut cable = TemperatureCable::new(Some(4));
        cable.set_id(9);
        cable
            .assign(fields(json!({"sensor_count": 8, "bin_cable_number": 2})).unwrap())
            .unwrap();
        assert_eq!(cable.id, Some(9));
        assert_eq!(cable.sensor_count, 8);
        assert_eq!(cable.bin_cable_number, 2);
        assert_eq!(cable.grainbin_id, Some(4));
    }

    #[test]
    fn test_uptime() {
        let mut device = Device::new("dev-1", "1", "1");
        device.set_uptime(Duration::hours(2));
        assert_eq!(device.uptime, Some(7200));
        assert_eq!(device.uptime(), Some(Duration::hours(2)));
    }
}
