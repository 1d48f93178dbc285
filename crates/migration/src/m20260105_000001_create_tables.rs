use sea_orm_migration::{prelude::*, schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(Channels::create()).await?;
        manager.create_table(Videos::create()).await?;
        manager.create_table(WebhookEvents::create()).await?;
        manager.create_table(VideoUpdates::create()).await?;
        manager.create_table(Subscriptions::create()).await?;
        manager.create_table(EnrichmentJobs::create()).await?;
        manager.create_table(VideoEnrichments::create()).await?;
        manager.create_table(ChannelEnrichments::create()).await?;
        manager.create_table(QuotaDays::create()).await?;
        manager.create_table(BlockedVideos::create()).await?;
        manager.create_table(SponsorPrompts::create()).await?;
        manager.create_table(SponsorDetectionJobs::create()).await?;
        manager.create_table(SponsorDetectionResults::create()).await?;
        manager.create_table(SponsorFindings::create()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-enrichment_jobs-external_task_id")
                    .table(EnrichmentJobs::Table)
                    .col(EnrichmentJobs::ExternalTaskId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-enrichment_jobs-status")
                    .table(EnrichmentJobs::Table)
                    .col(EnrichmentJobs::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-video_updates-video_id")
                    .table(VideoUpdates::Table)
                    .col(VideoUpdates::VideoId)
                    .to_owned(),
            )
            .await?;

        // The event log is append-only. Everything except the processing
        // status columns is frozen at insert time, enforced here rather than
        // in application code so that ad-hoc operator SQL is covered too.
        let connection = manager.get_connection();
        connection
            .execute_unprepared(
                r#"
                CREATE TRIGGER IF NOT EXISTS webhook_events_forbid_delete
                BEFORE DELETE ON webhook_events
                BEGIN
                    SELECT RAISE(ABORT, 'webhook_events is immutable: delete forbidden');
                END;
                "#,
            )
            .await?;
        connection
            .execute_unprepared(
                r#"
                CREATE TRIGGER IF NOT EXISTS webhook_events_forbid_rewrite
                BEFORE UPDATE OF id, raw_payload, content_hash, video_id, channel_id, received_at
                ON webhook_events
                BEGIN
                    SELECT RAISE(ABORT, 'webhook_events is immutable: only processing status may change');
                END;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SponsorFindings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SponsorDetectionResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SponsorDetectionJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SponsorPrompts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BlockedVideos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuotaDays::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChannelEnrichments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VideoEnrichments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EnrichmentJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VideoUpdates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WebhookEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Videos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Channels::Table).to_owned())
            .await?;

        Ok(())
    }
}

trait TableTrait {
    fn create() -> TableCreateStatement;
}

#[derive(DeriveIden)]
enum Channels {
    Table,
    ChannelId,

    Title,
    ChannelUrl,
    FirstSeenAt,
    LastUpdatedAt,
}

impl TableTrait for Channels {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(Channels::Table)
            .if_not_exists()
            .col(schema::text(Channels::ChannelId).primary_key())
            .col(schema::text(Channels::Title))
            .col(schema::text(Channels::ChannelUrl))
            .col(schema::big_integer(Channels::FirstSeenAt))
            .col(schema::big_integer(Channels::LastUpdatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    VideoId,

    ChannelId,
    Title,
    VideoUrl,
    PublishedAt,
    LastUpdatedAt,
}

impl TableTrait for Videos {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(Videos::Table)
            .if_not_exists()
            .col(schema::text(Videos::VideoId).primary_key())
            .col(schema::text(Videos::ChannelId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk-videos-channel_id")
                    .from(Videos::Table, Videos::ChannelId)
                    .to(Channels::Table, Channels::ChannelId),
            )
            .col(schema::text(Videos::Title))
            .col(schema::text(Videos::VideoUrl))
            .col(schema::big_integer(Videos::PublishedAt))
            .col(schema::big_integer(Videos::LastUpdatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum WebhookEvents {
    Table,
    Id,

    RawPayload,
    ContentHash,
    VideoId,
    ChannelId,
    ReceivedAt,
    Processed,
    ProcessedAt,
    ProcessingError,
}

impl TableTrait for WebhookEvents {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(WebhookEvents::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(WebhookEvents::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(schema::text(WebhookEvents::RawPayload))
            .col(
                ColumnDef::new(WebhookEvents::ContentHash)
                    .text()
                    .not_null()
                    .unique_key(),
            )
            .col(schema::text_null(WebhookEvents::VideoId))
            .col(schema::text_null(WebhookEvents::ChannelId))
            .col(schema::big_integer(WebhookEvents::ReceivedAt))
            .col(schema::boolean(WebhookEvents::Processed))
            .col(schema::big_integer_null(WebhookEvents::ProcessedAt))
            .col(schema::text_null(WebhookEvents::ProcessingError))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum VideoUpdates {
    Table,
    Id,

    WebhookEventId,
    VideoId,
    ChannelId,
    TitleAtEvent,
    PublishedAt,
    UpdatedAt,
    UpdateKind,
    CreatedAt,
}

impl TableTrait for VideoUpdates {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(VideoUpdates::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(VideoUpdates::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(schema::big_integer(VideoUpdates::WebhookEventId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk-video_updates-webhook_event_id")
                    .from(VideoUpdates::Table, VideoUpdates::WebhookEventId)
                    .to(WebhookEvents::Table, WebhookEvents::Id),
            )
            .col(schema::text(VideoUpdates::VideoId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk-video_updates-video_id")
                    .from(VideoUpdates::Table, VideoUpdates::VideoId)
                    .to(Videos::Table, Videos::VideoId),
            )
            .col(schema::text(VideoUpdates::ChannelId))
            .col(schema::text(VideoUpdates::TitleAtEvent))
            .col(schema::big_integer(VideoUpdates::PublishedAt))
            .col(schema::big_integer(VideoUpdates::UpdatedAt))
            .col(schema::text(VideoUpdates::UpdateKind))
            .col(schema::big_integer(VideoUpdates::CreatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,

    ChannelId,
    TopicUrl,
    CallbackUrl,
    HubUrl,
    Secret,
    LeaseSeconds,
    ExpiresAt,
    Status,
    RenewalAttempts,
    NextRenewalAt,
    LastRenewalError,
}

impl TableTrait for Subscriptions {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(Subscriptions::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(Subscriptions::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(Subscriptions::ChannelId)
                    .text()
                    .not_null()
                    .unique_key(),
            )
            .col(schema::text(Subscriptions::TopicUrl))
            .col(schema::text(Subscriptions::CallbackUrl))
            .col(schema::text(Subscriptions::HubUrl))
            .col(schema::text(Subscriptions::Secret))
            .col(schema::big_integer(Subscriptions::LeaseSeconds))
            .col(schema::big_integer_null(Subscriptions::ExpiresAt))
            .col(schema::text(Subscriptions::Status))
            .col(schema::integer(Subscriptions::RenewalAttempts))
            .col(schema::big_integer_null(Subscriptions::NextRenewalAt))
            .col(schema::text_null(Subscriptions::LastRenewalError))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum EnrichmentJobs {
    Table,
    Id,

    ExternalTaskId,
    JobType,
    VideoId,
    ChannelId,
    Status,
    Priority,
    ScheduledAt,
    StartedAt,
    CompletedAt,
    Attempts,
    MaxAttempts,
    NextRetryAt,
    ErrorMessage,
    Metadata,
}

impl TableTrait for EnrichmentJobs {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(EnrichmentJobs::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(EnrichmentJobs::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(schema::text_null(EnrichmentJobs::ExternalTaskId))
            .col(schema::text(EnrichmentJobs::JobType))
            .col(schema::text_null(EnrichmentJobs::VideoId))
            .col(schema::text_null(EnrichmentJobs::ChannelId))
            .col(schema::text(EnrichmentJobs::Status))
            .col(schema::integer(EnrichmentJobs::Priority))
            .col(schema::big_integer(EnrichmentJobs::ScheduledAt))
            .col(schema::big_integer_null(EnrichmentJobs::StartedAt))
            .col(schema::big_integer_null(EnrichmentJobs::CompletedAt))
            .col(schema::integer(EnrichmentJobs::Attempts))
            .col(schema::integer(EnrichmentJobs::MaxAttempts))
            .col(schema::big_integer_null(EnrichmentJobs::NextRetryAt))
            .col(schema::text_null(EnrichmentJobs::ErrorMessage))
            .col(schema::json(EnrichmentJobs::Metadata))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum VideoEnrichments {
    Table,
    VideoId,

    Description,
    Tags,
    Duration,
    ViewCount,
    LikeCount,
    CommentCount,
    Thumbnails,
    PrivacyStatus,
    UploadStatus,
    Embeddable,
    LiveScheduledStart,
    LiveActualStart,
    LiveActualEnd,
    LocationLatitude,
    LocationLongitude,
    LocationDescription,
    ContentRating,
    RawApiBody,
    RequestedParts,
    QuotaCost,
    EnrichedAt,
}

impl TableTrait for VideoEnrichments {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(VideoEnrichments::Table)
            .if_not_exists()
            .col(schema::text(VideoEnrichments::VideoId).primary_key())
            .foreign_key(
                ForeignKey::create()
                    .name("fk-video_enrichments-video_id")
                    .from(VideoEnrichments::Table, VideoEnrichments::VideoId)
                    .to(Videos::Table, Videos::VideoId),
            )
            .col(schema::text_null(VideoEnrichments::Description))
            .col(schema::json_null(VideoEnrichments::Tags))
            .col(schema::text_null(VideoEnrichments::Duration))
            .col(schema::big_integer_null(VideoEnrichments::ViewCount))
            .col(schema::big_integer_null(VideoEnrichments::LikeCount))
            .col(schema::big_integer_null(VideoEnrichments::CommentCount))
            .col(schema::json_null(VideoEnrichments::Thumbnails))
            .col(schema::text_null(VideoEnrichments::PrivacyStatus))
            .col(schema::text_null(VideoEnrichments::UploadStatus))
            .col(schema::boolean_null(VideoEnrichments::Embeddable))
            .col(schema::big_integer_null(VideoEnrichments::LiveScheduledStart))
            .col(schema::big_integer_null(VideoEnrichments::LiveActualStart))
            .col(schema::big_integer_null(VideoEnrichments::LiveActualEnd))
            .col(schema::double_null(VideoEnrichments::LocationLatitude))
            .col(schema::double_null(VideoEnrichments::LocationLongitude))
            .col(schema::text_null(VideoEnrichments::LocationDescription))
            .col(schema::json_null(VideoEnrichments::ContentRating))
            .col(schema::json(VideoEnrichments::RawApiBody))
            .col(schema::text(VideoEnrichments::RequestedParts))
            .col(schema::integer(VideoEnrichments::QuotaCost))
            .col(schema::big_integer(VideoEnrichments::EnrichedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum ChannelEnrichments {
    Table,
    ChannelId,

    Title,
    Description,
    CustomUrl,
    Country,
    SubscriberCount,
    VideoCount,
    ViewCount,
    Thumbnails,
    Keywords,
    TopicCategories,
    PrivacyStatus,
    RawApiBody,
    RequestedParts,
    QuotaCost,
    EnrichedAt,
}

impl TableTrait for ChannelEnrichments {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(ChannelEnrichments::Table)
            .if_not_exists()
            .col(schema::text(ChannelEnrichments::ChannelId).primary_key())
            .foreign_key(
                ForeignKey::create()
                    .name("fk-channel_enrichments-channel_id")
                    .from(ChannelEnrichments::Table, ChannelEnrichments::ChannelId)
                    .to(Channels::Table, Channels::ChannelId),
            )
            .col(schema::text_null(ChannelEnrichments::Title))
            .col(schema::text_null(ChannelEnrichments::Description))
            .col(schema::text_null(ChannelEnrichments::CustomUrl))
            .col(schema::text_null(ChannelEnrichments::Country))
            .col(schema::big_integer_null(ChannelEnrichments::SubscriberCount))
            .col(schema::big_integer_null(ChannelEnrichments::VideoCount))
            .col(schema::big_integer_null(ChannelEnrichments::ViewCount))
            .col(schema::json_null(ChannelEnrichments::Thumbnails))
            .col(schema::text_null(ChannelEnrichments::Keywords))
            .col(schema::json_null(ChannelEnrichments::TopicCategories))
            .col(schema::text_null(ChannelEnrichments::PrivacyStatus))
            .col(schema::json(ChannelEnrichments::RawApiBody))
            .col(schema::text(ChannelEnrichments::RequestedParts))
            .col(schema::integer(ChannelEnrichments::QuotaCost))
            .col(schema::big_integer(ChannelEnrichments::EnrichedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum QuotaDays {
    Table,
    Date,

    QuotaUsed,
    QuotaLimit,
    OperationsCount,
    PerOperationCounts,
    UpdatedAt,
}

impl TableTrait for QuotaDays {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(QuotaDays::Table)
            .if_not_exists()
            .col(schema::text(QuotaDays::Date).primary_key())
            .col(schema::big_integer(QuotaDays::QuotaUsed))
            .col(schema::big_integer(QuotaDays::QuotaLimit))
            .col(schema::big_integer(QuotaDays::OperationsCount))
            .col(schema::json(QuotaDays::PerOperationCounts))
            .col(schema::big_integer(QuotaDays::UpdatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum BlockedVideos {
    Table,
    VideoId,

    Reason,
    CreatedAt,
}

impl TableTrait for BlockedVideos {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(BlockedVideos::Table)
            .if_not_exists()
            .col(schema::text(BlockedVideos::VideoId).primary_key())
            .col(schema::text(BlockedVideos::Reason))
            .col(schema::big_integer(BlockedVideos::CreatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum SponsorPrompts {
    Table,
    Id,

    TextHash,
    PromptText,
    CreatedAt,
}

impl TableTrait for SponsorPrompts {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(SponsorPrompts::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(SponsorPrompts::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SponsorPrompts::TextHash)
                    .text()
                    .not_null()
                    .unique_key(),
            )
            .col(schema::text(SponsorPrompts::PromptText))
            .col(schema::big_integer(SponsorPrompts::CreatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum SponsorDetectionJobs {
    Table,
    Id,

    VideoId,
    Status,
    ErrorMessage,
    CreatedAt,
    CompletedAt,
}

impl TableTrait for SponsorDetectionJobs {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(SponsorDetectionJobs::Table)
            .if_not_exists()
            .col(schema::text(SponsorDetectionJobs::Id).primary_key())
            .col(schema::text(SponsorDetectionJobs::VideoId))
            .col(schema::text(SponsorDetectionJobs::Status))
            .col(schema::text_null(SponsorDetectionJobs::ErrorMessage))
            .col(schema::big_integer(SponsorDetectionJobs::CreatedAt))
            .col(schema::big_integer_null(SponsorDetectionJobs::CompletedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum SponsorDetectionResults {
    Table,
    Id,

    DetectionJobId,
    VideoId,
    PromptId,
    RawLlmBody,
    DurationMs,
    CreatedAt,
}

impl TableTrait for SponsorDetectionResults {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(SponsorDetectionResults::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(SponsorDetectionResults::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SponsorDetectionResults::DetectionJobId)
                    .text()
                    .not_null()
                    .unique_key(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk-sponsor_detection_results-detection_job_id")
                    .from(
                        SponsorDetectionResults::Table,
                        SponsorDetectionResults::DetectionJobId,
                    )
                    .to(SponsorDetectionJobs::Table, SponsorDetectionJobs::Id),
            )
            .col(schema::text(SponsorDetectionResults::VideoId))
            .col(schema::big_integer(SponsorDetectionResults::PromptId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk-sponsor_detection_results-prompt_id")
                    .from(
                        SponsorDetectionResults::Table,
                        SponsorDetectionResults::PromptId,
                    )
                    .to(SponsorPrompts::Table, SponsorPrompts::Id),
            )
            .col(schema::text(SponsorDetectionResults::RawLlmBody))
            .col(schema::big_integer(SponsorDetectionResults::DurationMs))
            .col(schema::big_integer(SponsorDetectionResults::CreatedAt))
            .to_owned()
    }
}

#[derive(DeriveIden)]
enum SponsorFindings {
    Table,
    Id,

    DetectionJobId,
    Name,
    Confidence,
    EvidenceText,
}

impl TableTrait for SponsorFindings {
    fn create() -> TableCreateStatement {
        Table::create()
            .table(SponsorFindings::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(SponsorFindings::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(schema::text(SponsorFindings::DetectionJobId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk-sponsor_findings-detection_job_id")
                    .from(SponsorFindings::Table, SponsorFindings::DetectionJobId)
                    .to(SponsorDetectionJobs::Table, SponsorDetectionJobs::Id),
            )
            .col(schema::text(SponsorFindings::Name))
            .col(schema::double(SponsorFindings::Confidence))
            .col(schema::text(SponsorFindings::EvidenceText))
            .to_owned()
    }
}
