use entity::channels;
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ConnectionTrait, EntityTrait as _, QueryOrder as _,
    QuerySelect as _, sea_query::OnConflict,
};

use super::{RepoError, now_ms};

pub struct Channels;

impl Channels {
    pub async fn get<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
    ) -> Result<Option<channels::Model>, RepoError> {
        Ok(channels::Entity::find_by_id(channel_id).one(db).await?)
    }

    /// Insert-or-update by channel id. `first_seen_at` keeps its original
    /// value on conflict.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        title: &str,
        channel_url: &str,
    ) -> Result<(), RepoError> {
        let now = now_ms();

        channels::Entity::insert(channels::ActiveModel {
            channel_id: Set(channel_id.to_owned()),
            title: Set(title.to_owned()),
            channel_url: Set(channel_url.to_owned()),
            first_seen_at: Set(now),
            last_updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(channels::Column::ChannelId)
                .update_columns([
                    channels::Column::Title,
                    channels::Column::ChannelUrl,
                    channels::Column::LastUpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

        Ok(())
    }

    /// Refresh only the display title, used when enrichment learns the
    /// canonical one. A channel we have never seen is left alone.
    pub async fn refresh_title<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        title: &str,
    ) -> Result<(), RepoError> {
        let Some(channel) = Self::get(db, channel_id).await? else {
            return Ok(());
        };

        let mut channel: channels::ActiveModel = channel.into();
        channel.title = Set(title.to_owned());
        channel.last_updated_at = Set(now_ms());
        channel.update(db).await?;

        Ok(())
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<channels::Model>, RepoError> {
        Ok(channels::Entity::find()
            .order_by_asc(channels::Column::ChannelId)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?)
    }
}
