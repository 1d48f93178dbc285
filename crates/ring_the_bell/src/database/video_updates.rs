use entity::video_updates;
use entity_types::{jiff_compat::JiffTimestampMilliseconds, update::UpdateKind};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, QueryOrder as _,
    QuerySelect as _,
};

use super::{RepoError, now_ms};
use crate::feed::VideoNotification;

pub struct VideoUpdates;

impl VideoUpdates {
    pub async fn append<C: ConnectionTrait>(
        db: &C,
        webhook_event_id: i64,
        notification: &VideoNotification,
        update_kind: UpdateKind,
    ) -> Result<(), RepoError> {
        video_updates::Entity::insert(video_updates::ActiveModel {
            id: NotSet,
            webhook_event_id: Set(webhook_event_id),
            video_id: Set(notification.video_id.clone()),
            channel_id: Set(notification.channel_id.clone()),
            title_at_event: Set(notification.title.clone()),
            published_at: Set(JiffTimestampMilliseconds(notification.published_at)),
            updated_at: Set(JiffTimestampMilliseconds(notification.updated_at)),
            update_kind: Set(update_kind),
            created_at: Set(now_ms()),
        })
        .exec(db)
        .await?;

        Ok(())
    }

    pub async fn list_for_video<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<video_updates::Model>, RepoError> {
        Ok(video_updates::Entity::find()
            .filter(video_updates::Column::VideoId.eq(video_id))
            .order_by_asc(video_updates::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?)
    }
}
