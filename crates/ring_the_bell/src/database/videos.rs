use entity::videos;
use entity_types::jiff_compat::JiffTimestampMilliseconds;
use jiff::Timestamp;
use sea_orm::{
    ActiveValue::Set, ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _,
    QueryOrder as _, QuerySelect as _, sea_query::OnConflict,
};

use super::{RepoError, now_ms};

pub struct Videos;

impl Videos {
    pub async fn get<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
    ) -> Result<Option<videos::Model>, RepoError> {
        Ok(videos::Entity::find_by_id(video_id).one(db).await?)
    }

    /// Insert-or-update by video id. Title and URL track the latest
    /// notification; `published_at` is pinned to whatever the first one said,
    /// so a late replay carrying an older value cannot rewrite it.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
        channel_id: &str,
        title: &str,
        video_url: &str,
        published_at: Timestamp,
    ) -> Result<(), RepoError> {
        videos::Entity::insert(videos::ActiveModel {
            video_id: Set(video_id.to_owned()),
            channel_id: Set(channel_id.to_owned()),
            title: Set(title.to_owned()),
            video_url: Set(video_url.to_owned()),
            published_at: Set(JiffTimestampMilliseconds(published_at)),
            last_updated_at: Set(now_ms()),
        })
        .on_conflict(
            OnConflict::column(videos::Column::VideoId)
                .update_columns([
                    videos::Column::Title,
                    videos::Column::VideoUrl,
                    videos::Column::LastUpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

        Ok(())
    }

    pub async fn list_for_channel<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<videos::Model>, RepoError> {
        Ok(videos::Entity::find()
            .filter(videos::Column::ChannelId.eq(channel_id))
            .order_by_desc(videos::Column::PublishedAt)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?)
    }
}
