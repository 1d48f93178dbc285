use entity::webhook_events;
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::{NotSet, Set},
    ConnectionTrait, EntityTrait as _, QueryOrder as _, QuerySelect as _,
};
use sha2::{Digest as _, Sha256};

use super::{RepoError, now_ms};

pub struct WebhookEvents;

impl WebhookEvents {
    /// Fingerprint over the raw delivery bytes; the unique index on this
    /// value is what collapses hub replays into a single stored event.
    pub fn content_hash(raw_payload: &[u8]) -> String {
        hex::encode(Sha256::digest(raw_payload))
    }

    /// Append an event, returning its assigned id. A replay of an
    /// already-stored payload comes back as [`RepoError::DuplicateKey`].
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        raw_payload: &str,
        video_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<i64, RepoError> {
        let result = webhook_events::Entity::insert(webhook_events::ActiveModel {
            id: NotSet,
            raw_payload: Set(raw_payload.to_owned()),
            content_hash: Set(Self::content_hash(raw_payload.as_bytes())),
            video_id: Set(video_id.map(str::to_owned)),
            channel_id: Set(channel_id.map(str::to_owned)),
            received_at: Set(now_ms()),
            processed: Set(false),
            processed_at: Set(None),
            processing_error: Set(None),
        })
        .exec(db)
        .await?;

        Ok(result.last_insert_id)
    }

    /// Flip the processing status. `error` carries the projection failure if
    /// there was one; the event row itself stays either way.
    pub async fn mark_processed<C: ConnectionTrait>(
        db: &C,
        id: i64,
        error: Option<String>,
    ) -> Result<(), RepoError> {
        webhook_events::ActiveModel {
            id: Set(id),
            processed: Set(true),
            processed_at: Set(Some(now_ms())),
            processing_error: Set(error),
            ..Default::default()
        }
        .update(db)
        .await?;

        Ok(())
    }

    pub async fn get<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<webhook_events::Model>, RepoError> {
        Ok(webhook_events::Entity::find_by_id(id).one(db).await?)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<webhook_events::Model>, RepoError> {
        Ok(webhook_events::Entity::find()
            .order_by_desc(webhook_events::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?)
    }
}
