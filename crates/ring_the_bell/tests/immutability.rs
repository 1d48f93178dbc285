use entity::webhook_events;
use migration::{Migrator, MigratorTrait as _};
use ring_the_bell::database::{RepoError, WebhookEvents};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, Database, DatabaseConnection, EntityTrait as _,
};

async fn test_database() -> DatabaseConnection {
    let database = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&database, None)
        .await
        .expect("migrations should apply");
    database
}

#[tokio::test]
async fn frozen_columns_reject_updates() {
    let database = test_database().await;
    let event_id = WebhookEvents::insert(&database, "<feed>original</feed>", Some("vid1"), None)
        .await
        .unwrap();

    let tampered = webhook_events::ActiveModel {
        id: Set(event_id),
        raw_payload: Set("<feed>tampered</feed>".to_owned()),
        ..Default::default()
    }
    .update(&database)
    .await;

    let error = tampered.expect_err("rewriting the payload should be refused");
    assert!(matches!(RepoError::from(error), RepoError::ImmutableRecord));

    let event = WebhookEvents::get(&database, event_id).await.unwrap().unwrap();
    assert_eq!(event.raw_payload, "<feed>original</feed>");
}

#[tokio::test]
async fn deletion_is_refused() {
    let database = test_database().await;
    let event_id = WebhookEvents::insert(&database, "<feed>permanent</feed>", None, None)
        .await
        .unwrap();

    let deleted = webhook_events::Entity::delete_by_id(event_id)
        .exec(&database)
        .await;

    let error = deleted.expect_err("deleting an event should be refused");
    assert!(matches!(RepoError::from(error), RepoError::ImmutableRecord));

    assert!(WebhookEvents::get(&database, event_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn processing_status_stays_writable() {
    let database = test_database().await;
    let event_id = WebhookEvents::insert(&database, "<feed>ok</feed>", None, None)
        .await
        .unwrap();

    WebhookEvents::mark_processed(&database, event_id, Some("boom".to_owned()))
        .await
        .expect("status columns are the mutable exception");

    let event = WebhookEvents::get(&database, event_id).await.unwrap().unwrap();
    assert!(event.processed);
    assert_eq!(event.processing_error.as_deref(), Some("boom"));
}
