mod common;

use chrono::Duration;
use common::{create_cable, create_device, create_grainbin, test_db};
use fm_database::{
    Crud, Device, Grainbin, Parent, SurrogatePk, TemperatureCable, TemperatureSensor,
};

#[tokio::test]
async fn test_device_defaults_persist() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;

    let fetched = Device::get_by_id(device.id, &db).await.unwrap().unwrap();
    assert_eq!(fetched.name, "not set");
    assert_eq!(fetched.location, "not set");
    assert_eq!(fetched.description, "not set");
    assert!(!fetched.connected);
    assert!(!fetched.user_configured);
    assert_eq!(fetched.grainbin_count, 0);
    assert!(fetched.creation_time.is_some());
    assert_eq!(fetched.creation_time, fetched.last_updated);
}

#[tokio::test]
async fn test_get_by_device_id() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;

    let found = Device::get_by_device_id(device.device_id.as_deref().unwrap(), &db)
        .await
        .unwrap();
    assert_eq!(found, Some(device));
    assert_eq!(Device::get_by_device_id("missing", &db).await.unwrap(), None);
}

#[tokio::test]
async fn test_uptime_and_telemetry_round_trip() {
    let db = test_db().await;
    let mut session = db.session();
    let mut device = create_device(&mut session).await;

    device.set_uptime(Duration::days(3) + Duration::minutes(5));
    device.interior_temp = Some("21.5".to_string());
    device.load_avg = Some("0.15 0.10 0.05".to_string());
    device.current_time = Some(fm_database::utc_now());
    device.save(&mut session, true).await.unwrap();

    let fetched = Device::get_by_id(device.id, &db).await.unwrap().unwrap();
    assert_eq!(fetched.uptime(), Some(Duration::days(3) + Duration::minutes(5)));
    assert_eq!(fetched, device);
}

#[tokio::test]
async fn test_last_updated_moves_on_update() {
    let db = test_db().await;
    let mut session = db.session();
    let mut device = create_device(&mut session).await;
    let created = device.creation_time;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    device.name = "renamed".to_string();
    device.save(&mut session, true).await.unwrap();

    assert_eq!(device.creation_time, created);
    assert!(device.last_updated > created);
}

#[tokio::test]
async fn test_grainbin_defaults() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;
    let bin = create_grainbin(&mut session, &device, 4).await;

    let fetched = Grainbin::get_by_id(bin.id, &db).await.unwrap().unwrap();
    assert_eq!(fetched.name, "New");
    assert_eq!(fetched.grainbin_type, "standard");
    assert_eq!(fetched.sensor_type, "temperature");
    assert_eq!(fetched.location, "Not Set");
    assert_eq!(fetched.description, "Not Set");
    assert_eq!(fetched.total_updates, 0);
    assert_eq!(fetched.bus_number, 4);
    assert_eq!(fetched.device_id, device.id);
}

#[tokio::test]
async fn test_bin_attached_through_device() {
    let db = test_db().await;
    let mut session = db.session();

    let mut device = Device::new("dev-rel", "hw", "sw");
    let mut bin = Grainbin::new(None, 1);
    device.add_bin(&mut session, &mut bin, true).await.unwrap();

    assert!(device.id.is_some());
    assert_eq!(bin.device_id, device.id);

    let bins = device.bins(&db).await.unwrap();
    assert_eq!(bins, vec![bin.clone()]);
    assert_eq!(bin.device(&db).await.unwrap(), Some(device));
}

#[tokio::test]
async fn test_bin_attached_by_foreign_key() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;

    let mut bin = Grainbin::new(device.id, 1);
    bin.save(&mut session, true).await.unwrap();

    assert_eq!(device.bins(&db).await.unwrap(), vec![bin.clone()]);
    assert_eq!(bin.device(&db).await.unwrap(), Some(device));
}

#[tokio::test]
async fn test_both_orderings_converge() {
    let db = test_db().await;
    let mut session = db.session();

    let mut through_parent = Device::new("dev-a", "hw", "sw");
    let mut bin_a = Grainbin::new(None, 2);
    through_parent
        .add_bin(&mut session, &mut bin_a, true)
        .await
        .unwrap();

    let by_key = create_device(&mut session).await;
    let bin_b = create_grainbin(&mut session, &by_key, 2).await;

    let stored_a = Grainbin::get_by_id(bin_a.id, &db).await.unwrap().unwrap();
    let stored_b = Grainbin::get_by_id(bin_b.id, &db).await.unwrap().unwrap();
    assert_eq!(stored_a.device_id, through_parent.id);
    assert_eq!(stored_b.device_id, by_key.id);

    let strip = |bin: Grainbin| Grainbin {
        id: None,
        device_id: None,
        creation_time: None,
        last_updated: None,
        ..bin
    };
    assert_eq!(strip(stored_a), strip(stored_b));
}

#[tokio::test]
async fn test_unsaved_parent_has_no_children() {
    let db = test_db().await;
    let device = Device::new("unsaved", "hw", "sw");
    assert!(device.bins(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cables_and_sensors() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;
    let mut bin = create_grainbin(&mut session, &device, 1).await;

    let mut cable = TemperatureCable::new(None);
    bin.add_cable(&mut session, &mut cable, true).await.unwrap();
    assert_eq!(cable.grainbin_id, bin.id);
    assert_eq!(cable.sensor_count, 0);
    assert_eq!(cable.cable_type, "temperature");

    for _ in 0..3 {
        let mut sensor = TemperatureSensor::new(None);
        cable.add_sensor(&mut session, &mut sensor, false).await.unwrap();
    }
    session.commit().await.unwrap();

    let sensors = cable.sensors(&db).await.unwrap();
    assert_eq!(sensors.len(), 3);
    assert!(sensors.iter().all(|s| s.cable_id == cable.id));
    assert!(sensors.iter().all(|s| s.last_value == "unknown"));

    assert_eq!(sensors[0].cable(&db).await.unwrap(), Some(cable.clone()));
    assert_eq!(cable.grainbin(&db).await.unwrap(), Some(bin.clone()));
    assert_eq!(bin.cables(&db).await.unwrap(), vec![cable]);
}

#[tokio::test]
async fn test_children_are_per_parent() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;
    let first = create_grainbin(&mut session, &device, 1).await;
    let second = create_grainbin(&mut session, &device, 2).await;
    create_cable(&mut session, &first).await;
    create_cable(&mut session, &first).await;
    create_cable(&mut session, &second).await;

    assert_eq!(first.cables(&db).await.unwrap().len(), 2);
    assert_eq!(second.cables(&db).await.unwrap().len(), 1);
    assert_eq!(device.children::<Grainbin>(&db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_device_with_bins_cannot_be_deleted() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;
    create_grainbin(&mut session, &device, 1).await;

    let err = device.clone().delete(&mut session, true).await.unwrap_err();
    assert!(err.is_constraint_violation());
    session.close().await;

    assert!(Device::get_by_id(device.id, &db).await.unwrap().is_some());
}
