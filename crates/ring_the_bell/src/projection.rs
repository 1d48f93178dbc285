use entity_types::update::UpdateKind;
use sea_orm::{DatabaseConnection, TransactionTrait as _};

use crate::{
    database::{Channels, RepoError, VideoUpdates, Videos},
    feed::VideoNotification,
};

/// Fold one stored notification into the current-state tables: channel and
/// video upserts plus an update-history row, committed together. The caller
/// marks the event row afterwards, outside this transaction.
pub async fn project(
    database: &DatabaseConnection,
    webhook_event_id: i64,
    notification: &VideoNotification,
) -> Result<UpdateKind, RepoError> {
    let txn = database.begin().await?;

    // Classification reads the pre-upsert state; the write below must not
    // influence it.
    let existing = Videos::get(&txn, &notification.video_id).await?;
    let update_kind = classify(
        existing.as_ref().map(|video| video.title.as_str()),
        &notification.title,
    );

    let channel_title = notification
        .channel_title
        .as_deref()
        .unwrap_or(&notification.channel_id);
    Channels::upsert(
        &txn,
        &notification.channel_id,
        channel_title,
        &notification.channel_url,
    )
    .await?;

    Videos::upsert(
        &txn,
        &notification.video_id,
        &notification.channel_id,
        &notification.title,
        &notification.video_url,
        notification.published_at,
    )
    .await?;

    VideoUpdates::append(&txn, webhook_event_id, notification, update_kind).await?;

    txn.commit().await?;

    Ok(update_kind)
}

pub fn classify(existing_title: Option<&str>, incoming_title: &str) -> UpdateKind {
    match existing_title {
        None => UpdateKind::NewVideo,
        Some(existing) if existing != incoming_title => UpdateKind::TitleUpdate,
        Some(_) => UpdateKind::Unknown,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn absent_video_is_new() {
        assert_eq!(classify(None, "Ex"), UpdateKind::NewVideo);
    }

    #[test]
    fn changed_title_is_title_update() {
        assert_eq!(classify(Some("Old"), "New"), UpdateKind::TitleUpdate);
    }

    #[test]
    fn same_title_is_unknown() {
        assert_eq!(classify(Some("Ex"), "Ex"), UpdateKind::Unknown);
    }
}
