use entity_types::subscription::SubscriptionStatus;
use jiff::SignedDuration;
use migration::{Migrator, MigratorTrait as _};
use ring_the_bell::{database::Subscriptions, hub::topic_for};
use sea_orm::{Database, DatabaseConnection};

const CHANNEL: &str = "UCuAXFkgsw1L7xaCfnd5JJOw";

async fn test_database() -> DatabaseConnection {
    let database = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&database, None)
        .await
        .expect("migrations should apply");
    database
}

async fn seed_pending(database: &DatabaseConnection) {
    Subscriptions::upsert_pending(
        database,
        CHANNEL,
        &topic_for(CHANNEL),
        "https://example.com/pubsub",
        "https://pubsubhubbub.appspot.com/subscribe",
        "hunter2",
        432_000,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn activation_starts_the_lease_clock() {
    let database = test_database().await;
    seed_pending(&database).await;

    let subscription = Subscriptions::get_by_topic(&database, &topic_for(CHANNEL))
        .await
        .unwrap()
        .expect("pending row should exist");
    assert_eq!(subscription.status, SubscriptionStatus::Pending);
    assert_eq!(subscription.expires_at, None);

    Subscriptions::mark_active(&database, CHANNEL, 432_000)
        .await
        .unwrap();

    let subscription = Subscriptions::get_by_channel(&database, CHANNEL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert!(subscription.expires_at.is_some());
    assert_eq!(subscription.renewal_attempts, 0);
}

#[tokio::test]
async fn pending_rows_are_immediately_due() {
    let database = test_database().await;
    seed_pending(&database).await;

    let due = Subscriptions::list_due(&database, SignedDuration::from_hours(24))
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].channel_id, CHANNEL);
}

#[tokio::test]
async fn fresh_leases_are_not_due() {
    let database = test_database().await;
    seed_pending(&database).await;
    Subscriptions::mark_active(&database, CHANNEL, 432_000)
        .await
        .unwrap();

    let due = Subscriptions::list_due(&database, SignedDuration::from_hours(24))
        .await
        .unwrap();
    assert!(due.is_empty());

    // A margin wider than the lease catches it again.
    let due = Subscriptions::list_due(&database, SignedDuration::from_secs(500_000))
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn transient_failures_back_off_and_permanent_ones_park() {
    let database = test_database().await;
    seed_pending(&database).await;

    Subscriptions::record_failure(&database, CHANNEL, "hub timed out", false)
        .await
        .unwrap();
    let subscription = Subscriptions::get_by_channel(&database, CHANNEL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.renewal_attempts, 1);
    assert_eq!(subscription.last_renewal_error.as_deref(), Some("hub timed out"));
    assert!(subscription.next_renewal_at.is_some());

    // Backed-off rows drop out of the due list until their gate passes.
    let due = Subscriptions::list_due(&database, SignedDuration::from_hours(24))
        .await
        .unwrap();
    assert!(due.is_empty());

    Subscriptions::record_failure(&database, CHANNEL, "hub returned 400", true)
        .await
        .unwrap();
    let subscription = Subscriptions::get_by_channel(&database, CHANNEL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Failed);
    assert_eq!(subscription.renewal_attempts, 2);
}
