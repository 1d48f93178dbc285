use entity::blocked_videos;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait as _, sea_query::OnConflict,
};

use super::{RepoError, now_ms};

pub struct BlockedVideoSet;

impl BlockedVideoSet {
    pub async fn list_all<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<blocked_videos::Model>, RepoError> {
        Ok(blocked_videos::Entity::find().all(db).await?)
    }

    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
        reason: &str,
    ) -> Result<(), RepoError> {
        match blocked_videos::Entity::insert(blocked_videos::ActiveModel {
            video_id: Set(video_id.to_owned()),
            reason: Set(reason.to_owned()),
            created_at: Set(now_ms()),
        })
        .on_conflict(
            OnConflict::column(blocked_videos::Column::VideoId)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn contains<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
    ) -> Result<bool, RepoError> {
        Ok(blocked_videos::Entity::find_by_id(video_id)
            .one(db)
            .await?
            .is_some())
    }
}
