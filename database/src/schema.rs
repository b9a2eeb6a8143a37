//! Table definitions, parents before children.

pub const DEVICE: &str = r#"
CREATE TABLE IF NOT EXISTS device (
    id INTEGER PRIMARY KEY,
    device_id VARCHAR(20) UNIQUE,
    hardware_version VARCHAR(20),
    software_version VARCHAR(20),
    creation_time DATETIME,
    last_updated DATETIME,
    name VARCHAR(20) NOT NULL,
    location VARCHAR(20),
    description VARCHAR(50),
    connected BOOLEAN DEFAULT 0,
    user_configured BOOLEAN DEFAULT 0,
    last_update_received DATETIME,
    interior_temp VARCHAR(7),
    exterior_temp VARCHAR(7),
    device_temp VARCHAR(7),
    uptime BIGINT,
    "current_time" DATETIME,
    load_avg VARCHAR(20),
    disk_total VARCHAR(20),
    disk_used VARCHAR(20),
    disk_free VARCHAR(20),
    grainbin_count INTEGER DEFAULT 0
)"#;

pub const GRAINBIN: &str = r#"
CREATE TABLE IF NOT EXISTS grainbin (
    id INTEGER PRIMARY KEY,
    creation_time DATETIME,
    last_updated DATETIME,
    name VARCHAR(20) NOT NULL,
    grainbin_type VARCHAR(20) DEFAULT 'standard',
    sensor_type VARCHAR(20) DEFAULT 'temperature',
    location VARCHAR(20),
    description VARCHAR(50),
    total_updates INTEGER,
    average_temp VARCHAR(7),
    bus_number INTEGER NOT NULL,
    user_configured BOOLEAN DEFAULT 0,
    device_id INTEGER NOT NULL REFERENCES device (id)
)"#;

pub const TEMPERATURE_CABLE: &str = r#"
CREATE TABLE IF NOT EXISTS temperature_cable (
    id INTEGER PRIMARY KEY,
    sensor_count INTEGER DEFAULT 0,
    cable_type VARCHAR(20) DEFAULT 'temperature',
    bin_cable_number INTEGER DEFAULT 0,
    grainbin_id INTEGER NOT NULL REFERENCES grainbin (id)
)"#;

pub const TEMPERATURE_SENSOR: &str = r#"
CREATE TABLE IF NOT EXISTS temperature_sensor (
    id INTEGER PRIMARY KEY,
    templow VARCHAR(4),
    temphigh VARCHAR(4),
    last_value VARCHAR(7),
    cable_id INTEGER NOT NULL REFERENCES temperature_cable (id)
)"#;

pub const MESSAGE: &str = r#"
CREATE TABLE IF NOT EXISTS message (
    id INTEGER PRIMARY KEY,
    source VARCHAR(20),
    destination VARCHAR(20),
    classification VARCHAR(20),
    created_at DATETIME,
    valid_from DATETIME,
    valid_to DATETIME,
    payload BLOB
)"#;

pub const ROLES: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY,
    name VARCHAR(80) NOT NULL UNIQUE
)"#;

pub const USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username VARCHAR(80) NOT NULL UNIQUE,
    email VARCHAR(80) NOT NULL UNIQUE,
    password VARCHAR(128),
    created_at DATETIME NOT NULL,
    first_name VARCHAR(30),
    last_name VARCHAR(30),
    active BOOLEAN DEFAULT 0,
    is_admin BOOLEAN DEFAULT 0
)"#;

pub const USER_ROLES: &str = r#"
CREATE TABLE IF NOT EXISTS user_roles (
    role_id INTEGER REFERENCES roles (id),
    user_id INTEGER REFERENCES users (id)
)"#;

pub const SYSTEM_SETUP: &str = r#"
CREATE TABLE IF NOT EXISTS system_setup (
    id INTEGER PRIMARY KEY,
    first_setup_complete BOOLEAN DEFAULT 0,
    first_setup_time DATETIME,
    update_in_progress BOOLEAN DEFAULT 0,
    new_update_installed BOOLEAN DEFAULT 0
)"#;

pub const SYSTEM_INTERFACE: &str = r#"
CREATE TABLE IF NOT EXISTS system_interface (
    id INTEGER PRIMARY KEY,
    interface VARCHAR(5) NOT NULL UNIQUE,
    is_active BOOLEAN DEFAULT 1,
    is_for_fm BOOLEAN DEFAULT 0,
    is_external BOOLEAN DEFAULT 0,
    state VARCHAR(20)
)"#;

pub const SYSTEM_WIFI: &str = r#"
CREATE TABLE IF NOT EXISTS system_wifi (
    id INTEGER PRIMARY KEY,
    wifi_name VARCHAR(20) DEFAULT 'FarmMonitor',
    wifi_password VARCHAR(20) DEFAULT 'raspberry',
    wifi_mode VARCHAR(20) DEFAULT 'wpa',
    interface VARCHAR(5) REFERENCES system_interface (interface) ON DELETE CASCADE
)"#;

pub const SYSTEM_HARDWARE: &str = r#"
CREATE TABLE IF NOT EXISTS system_hardware (
    id INTEGER PRIMARY KEY,
    device_name VARCHAR(20),
    hardware_version VARCHAR(20),
    serial_number VARCHAR(20)
)"#;

pub const SYSTEM_SOFTWARE: &str = r#"
CREATE TABLE IF NOT EXISTS system_software (
    id INTEGER PRIMARY KEY,
    software_version VARCHAR(20),
    software_version_last VARCHAR(20)
)"#;

/// Every table with its DDL, in creation order.
pub const TABLES: &[(&str, &str)] = &[
    ("device", DEVICE),
    ("grainbin", GRAINBIN),
    ("temperature_cable", TEMPERATURE_CABLE),
    ("temperature_sensor", TEMPERATURE_SENSOR),
    ("message", MESSAGE),
    ("roles", ROLES),
    ("users", USERS),
    ("user_roles", USER_ROLES),
    ("system_setup", SYSTEM_SETUP),
    ("system_interface", SYSTEM_INTERFACE),
    ("system_wifi", SYSTEM_WIFI),
    ("system_hardware", SYSTEM_HARDWARE),
    ("system_software", SYSTEM_SOFTWARE),
];

/// Table names in creation order.
pub fn table_names() -> impl DoubleEndedIterator<Item = &'static str> + ExactSizeIterator {
    TABLES.iter().map(|(name, _)| *name)
}

/// The whole schema as one script, as written into new migrations.
pub fn ddl_script() -> String {
    let mut script = String::new();
    for (_, ddl) in TABLES {
        script.push_str(ddl.trim());
        script.push_str(";\n\n");
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_match_definitions() {
        assert_eq!(table_names().len(), TABLES.len());
        for (name, (_, ddl)) in table_names().zip(TABLES) {
            assert!(ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", name)));
        }
        assert_eq!(table_names().next_back(), Some("system_software"));
    }

    #[test]
    fn test_parents_are_created_before_children() {
        let position = |table: &str| table_names().position(|t| t == table).unwrap();
        for (name, ddl) in TABLES {
            for parent in table_names() {
                if ddl.contains(&format!("REFERENCES {} (", parent)) {
                    assert!(position(parent) < position(name), "{} before {}", parent, name);
                }
            }
        }
    }

    #[test]
    fn test_ddl_script_contains_every_table() {
        let script = ddl_script();
        for name in table_names() {
            assert!(script.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", name)));
        }
        assert_eq!(script.matches(";\n").count(), TABLES.len());
    }
}
