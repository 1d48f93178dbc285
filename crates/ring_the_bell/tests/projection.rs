use entity_types::update::UpdateKind;
use jiff::Timestamp;
use migration::{Migrator, MigratorTrait as _};
use ring_the_bell::{
    database::{Channels, RepoError, VideoUpdates, Videos, WebhookEvents},
    feed::VideoNotification,
    projection,
};
use sea_orm::{Database, DatabaseConnection};

async fn test_database() -> DatabaseConnection {
    let database = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&database, None)
        .await
        .expect("migrations should apply");
    database
}

fn notification(video_id: &str, title: &str) -> VideoNotification {
    VideoNotification {
        video_id: video_id.to_owned(),
        channel_id: "UCuAXFkgsw1L7xaCfnd5JJOw".to_owned(),
        title: title.to_owned(),
        video_url: format!("https://www.youtube.com/watch?v={video_id}"),
        channel_title: Some("Example".to_owned()),
        channel_url: "https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw".to_owned(),
        published_at: "2025-10-07T12:00:00Z".parse::<Timestamp>().unwrap(),
        updated_at: "2025-10-07T12:00:05Z".parse::<Timestamp>().unwrap(),
    }
}

#[tokio::test]
async fn new_video_creates_channel_video_and_history() {
    let database = test_database().await;
    let incoming = notification("dQw4w9WgXcQ", "Ex");

    let event_id = WebhookEvents::insert(
        &database,
        "<feed>first delivery</feed>",
        Some(&incoming.video_id),
        Some(&incoming.channel_id),
    )
    .await
    .unwrap();

    let update_kind = projection::project(&database, event_id, &incoming)
        .await
        .unwrap();
    assert_eq!(update_kind, UpdateKind::NewVideo);

    WebhookEvents::mark_processed(&database, event_id, None)
        .await
        .unwrap();

    let channel = Channels::get(&database, &incoming.channel_id)
        .await
        .unwrap()
        .expect("channel row should exist");
    assert_eq!(channel.title, "Example");

    let video = Videos::get(&database, &incoming.video_id)
        .await
        .unwrap()
        .expect("video row should exist");
    assert_eq!(video.title, "Ex");
    assert_eq!(video.channel_id, incoming.channel_id);

    let history = VideoUpdates::list_for_video(&database, &incoming.video_id, 10, 0)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].update_kind, UpdateKind::NewVideo);
    assert_eq!(history[0].webhook_event_id, event_id);

    let event = WebhookEvents::get(&database, event_id)
        .await
        .unwrap()
        .expect("event row should exist");
    assert!(event.processed);
    assert_eq!(event.processing_error, None);
}

#[tokio::test]
async fn title_change_updates_video_and_classifies() {
    let database = test_database().await;

    let first = notification("vid1", "Old");
    let event_one = WebhookEvents::insert(&database, "<feed>one</feed>", Some("vid1"), None)
        .await
        .unwrap();
    assert_eq!(
        projection::project(&database, event_one, &first).await.unwrap(),
        UpdateKind::NewVideo
    );

    let mut second = notification("vid1", "New");
    second.published_at = "2020-01-01T00:00:00Z".parse::<Timestamp>().unwrap();
    let event_two = WebhookEvents::insert(&database, "<feed>two</feed>", Some("vid1"), None)
        .await
        .unwrap();
    assert_eq!(
        projection::project(&database, event_two, &second).await.unwrap(),
        UpdateKind::TitleUpdate
    );

    let video = Videos::get(&database, "vid1").await.unwrap().unwrap();
    assert_eq!(video.title, "New");
    // The first-seen publish time survives the late notification's older one.
    assert_eq!(
        video.published_at.0,
        "2025-10-07T12:00:00Z".parse::<Timestamp>().unwrap()
    );

    let history = VideoUpdates::list_for_video(&database, "vid1", 10, 0)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].update_kind, UpdateKind::TitleUpdate);
    assert_eq!(history[1].title_at_event, "New");
}

#[tokio::test]
async fn unchanged_title_is_unknown() {
    let database = test_database().await;

    let incoming = notification("vid2", "Same");
    let event_one = WebhookEvents::insert(&database, "<feed>a</feed>", Some("vid2"), None)
        .await
        .unwrap();
    projection::project(&database, event_one, &incoming)
        .await
        .unwrap();

    let event_two = WebhookEvents::insert(&database, "<feed>b</feed>", Some("vid2"), None)
        .await
        .unwrap();
    assert_eq!(
        projection::project(&database, event_two, &incoming).await.unwrap(),
        UpdateKind::Unknown
    );
}

#[tokio::test]
async fn replayed_body_is_rejected_as_duplicate() {
    let database = test_database().await;
    let body = "<feed>exactly the same bytes</feed>";

    WebhookEvents::insert(&database, body, Some("vid3"), None)
        .await
        .unwrap();

    let replay = WebhookEvents::insert(&database, body, Some("vid3"), None).await;
    assert!(matches!(replay, Err(RepoError::DuplicateKey)));

    let events = WebhookEvents::list(&database, 10, 0).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn tombstone_event_stores_without_ids() {
    let database = test_database().await;

    let event_id = WebhookEvents::insert(&database, "<feed>deleted-entry</feed>", None, None)
        .await
        .unwrap();
    WebhookEvents::mark_processed(&database, event_id, None)
        .await
        .unwrap();

    let event = WebhookEvents::get(&database, event_id).await.unwrap().unwrap();
    assert_eq!(event.video_id, None);
    assert_eq!(event.channel_id, None);
    assert!(event.processed);
}
