use entity::{channel_enrichments, video_enrichments};
use sea_orm::{
    ConnectionTrait, EntityTrait as _, IntoActiveModel as _, sea_query::OnConflict,
};

use super::RepoError;

pub struct VideoEnrichments;

impl VideoEnrichments {
    /// Write-or-replace by video id, which is what makes a redelivered task
    /// converge instead of erroring.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        enrichment: video_enrichments::Model,
    ) -> Result<(), RepoError> {
        video_enrichments::Entity::insert(enrichment.into_active_model())
            .on_conflict(
                OnConflict::column(video_enrichments::Column::VideoId)
                    .update_columns([
                        video_enrichments::Column::Description,
                        video_enrichments::Column::Tags,
                        video_enrichments::Column::Duration,
                        video_enrichments::Column::ViewCount,
                        video_enrichments::Column::LikeCount,
                        video_enrichments::Column::CommentCount,
                        video_enrichments::Column::Thumbnails,
                        video_enrichments::Column::PrivacyStatus,
                        video_enrichments::Column::UploadStatus,
                        video_enrichments::Column::Embeddable,
                        video_enrichments::Column::LiveScheduledStart,
                        video_enrichments::Column::LiveActualStart,
                        video_enrichments::Column::LiveActualEnd,
                        video_enrichments::Column::LocationLatitude,
                        video_enrichments::Column::LocationLongitude,
                        video_enrichments::Column::LocationDescription,
                        video_enrichments::Column::ContentRating,
                        video_enrichments::Column::RawApiBody,
                        video_enrichments::Column::RequestedParts,
                        video_enrichments::Column::QuotaCost,
                        video_enrichments::Column::EnrichedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Ok(())
    }

    pub async fn get<C: ConnectionTrait>(
        db: &C,
        video_id: &str,
    ) -> Result<Option<video_enrichments::Model>, RepoError> {
        Ok(video_enrichments::Entity::find_by_id(video_id).one(db).await?)
    }
}

pub struct ChannelEnrichments;

impl ChannelEnrichments {
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        enrichment: channel_enrichments::Model,
    ) -> Result<(), RepoError> {
        channel_enrichments::Entity::insert(enrichment.into_active_model())
            .on_conflict(
                OnConflict::column(channel_enrichments::Column::ChannelId)
                    .update_columns([
                        channel_enrichments::Column::Title,
                        channel_enrichments::Column::Description,
                        channel_enrichments::Column::CustomUrl,
                        channel_enrichments::Column::Country,
                        channel_enrichments::Column::SubscriberCount,
                        channel_enrichments::Column::VideoCount,
                        channel_enrichments::Column::ViewCount,
                        channel_enrichments::Column::Thumbnails,
                        channel_enrichments::Column::Keywords,
                        channel_enrichments::Column::TopicCategories,
                        channel_enrichments::Column::PrivacyStatus,
                        channel_enrichments::Column::RawApiBody,
                        channel_enrichments::Column::RequestedParts,
                        channel_enrichments::Column::QuotaCost,
                        channel_enrichments::Column::EnrichedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Ok(())
    }

    pub async fn get<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
    ) -> Result<Option<channel_enrichments::Model>, RepoError> {
        Ok(channel_enrichments::Entity::find_by_id(channel_id)
            .one(db)
            .await?)
    }
}
