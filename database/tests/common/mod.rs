#![allow(dead_code)]

use fm_database::{
    Config, Crud, Database, Device, Grainbin, Interface, Role, Session, TemperatureCable, User,
};
use rand::Rng;

/// A fresh in-memory database with every table created.
pub async fn test_db() -> Database {
    let db = Database::connect(&Config::test())
        .await
        .expect("connect to in-memory database");
    db.create_all_tables().await.expect("create tables");
    db
}

/// An in-memory database with no tables.
pub async fn empty_db() -> Database {
    Database::connect(&Config::test())
        .await
        .expect("connect to in-memory database")
}

pub fn unique(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}-{}", prefix, rng.gen_range(0..1_000_000u32))
}

pub async fn create_device(session: &mut Session) -> Device {
    let mut device = Device::new(&unique("dev"), "hw-1.0", "sw-1.0");
    device.save(session, true).await.expect("save device");
    device
}

pub async fn create_grainbin(session: &mut Session, device: &Device, bus_number: i32) -> Grainbin {
    let mut bin = Grainbin::new(device.id, bus_number);
    bin.save(session, true).await.expect("save grainbin");
    bin
}

pub async fn create_cable(session: &mut Session, bin: &Grainbin) -> TemperatureCable {
    let mut cable = TemperatureCable::new(bin.id);
    cable.save(session, true).await.expect("save cable");
    cable
}

pub async fn create_user(session: &mut Session, password: &str) -> User {
    let name = unique("user");
    let mut user = User::new(&name, &format!("{}@example.com", name), Some(password))
        .expect("hash password");
    user.save(session, true).await.expect("save user");
    user
}

pub async fn create_role(session: &mut Session) -> Role {
    let mut role = Role::new(&unique("role"));
    role.save(session, true).await.expect("save role");
    role
}

pub async fn create_interface(session: &mut Session, name: &str) -> Interface {
    let mut interface = Interface::new(name);
    interface.save(session, true).await.expect("save interface");
    interface
}
