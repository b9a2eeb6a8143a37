mod common;

use common::{create_device, create_grainbin, empty_db, test_db};
use fm_database::schema;
use fm_database::{Crud, Device, Error, Grainbin, SurrogatePk};

#[tokio::test]
async fn test_session_scope_commits_on_success() {
    let db = test_db().await;

    let id = db
        .session_scope(|session| {
            Box::pin(async move {
                let mut device = Device::new("scoped", "hw", "sw");
                device.save(session, false).await?;
                Ok::<_, Error>(device.id)
            })
        })
        .await
        .unwrap();

    let device = Device::get_by_id(id, &db).await.unwrap().unwrap();
    assert_eq!(device.device_id.as_deref(), Some("scoped"));
}

#[tokio::test]
async fn test_session_scope_rolls_back_on_error() {
    let db = test_db().await;

    let result: Result<(), Error> = db
        .session_scope(|session| {
            Box::pin(async move {
                let mut device = Device::new("doomed", "hw", "sw");
                device.save(session, false).await?;
                Err::<(), _>(Error::Validation("abort".to_string()))
            })
        })
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(Device::all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_scope_rolls_back_failed_statement() {
    let db = test_db().await;

    let result = db
        .session_scope(|session| {
            Box::pin(async move {
                let mut device = Device::new("first", "hw", "sw");
                device.save(session, false).await?;
                let mut duplicate = Device::new("first", "hw", "sw");
                duplicate.save(session, false).await?;
                Ok::<_, Error>(())
            })
        })
        .await;

    assert!(result.unwrap_err().is_constraint_violation());
    assert!(Device::all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_session_discards_pending_work() {
    let db = test_db().await;

    {
        let mut session = db.session();
        let mut device = Device::new("dropped", "hw", "sw");
        device.save(&mut session, false).await.unwrap();
        assert!(session.in_transaction());
    }

    assert!(Device::all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_sees_its_own_pending_work() {
    let db = test_db().await;
    let mut session = db.session();

    let mut device = Device::new("pending", "hw", "sw");
    device.save(&mut session, false).await.unwrap();

    let found = Device::get_by_device_id("pending", &mut session).await.unwrap();
    assert_eq!(found.map(|d| d.id), Some(device.id));

    session.commit().await.unwrap();
    assert!(!session.in_transaction());
    assert!(Device::get_by_device_id("pending", &db).await.unwrap().is_some());
}

#[tokio::test]
async fn test_default_context_reads_committed_state_during_open_session() {
    let db = test_db().await;
    let mut session = db.session();
    let committed = create_device(&mut session).await;

    let mut device = Device::new("uncommitted", "hw", "sw");
    device.save(&mut session, false).await.unwrap();
    assert!(session.in_transaction());

    assert!(Device::get_by_id(9999, &db).await.unwrap().is_none());
    assert!(Device::get_by_id(device.id, &db).await.unwrap().is_none());
    let all = Device::all(&db).await.unwrap();
    assert_eq!(all.iter().map(|d| d.id).collect::<Vec<_>>(), vec![committed.id]);

    session.commit().await.unwrap();
    assert_eq!(Device::all(&db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_and_drop_tables() {
    let db = empty_db().await;
    assert!(db.table_names().await.unwrap().is_empty());

    db.create_all_tables().await.unwrap();
    let mut names = db.table_names().await.unwrap();
    names.sort();
    let mut expected: Vec<String> = schema::table_names().map(String::from).collect();
    expected.sort();
    assert_eq!(names, expected);

    // creating again is harmless
    db.create_all_tables().await.unwrap();

    db.drop_all_tables().await.unwrap();
    assert!(db.table_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_all_data() {
    let db = test_db().await;
    let mut session = db.session();
    let device = create_device(&mut session).await;
    create_grainbin(&mut session, &device, 1).await;
    create_grainbin(&mut session, &device, 2).await;

    let removed = db.delete_all_data().await.unwrap();
    assert_eq!(removed, 3);
    assert!(Device::all(&db).await.unwrap().is_empty());
    assert!(Grainbin::all(&db).await.unwrap().is_empty());

    // tables are still there
    assert_eq!(db.table_names().await.unwrap().len(), schema::table_names().len());
}
