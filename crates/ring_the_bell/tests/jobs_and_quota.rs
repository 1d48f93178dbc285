use entity_types::job::{JobStatus, JobType};
use jiff::Timestamp;
use migration::{Migrator, MigratorTrait as _};
use ring_the_bell::{
    database::EnrichmentJobs,
    quota::{QuotaManager, op},
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

#[tokio::test]
async fn job_walks_the_happy_path() {
    let database = test_database().await;

    let job_id = EnrichmentJobs::create(
        &database,
        "task-1",
        JobType::VideoEnrich,
        Some("vid1"),
        Some("chan1"),
        0,
        3,
        serde_json::json!({}),
    )
    .await
    .unwrap();

    let job = EnrichmentJobs::get_by_task_id(&database, "task-1")
        .await
        .unwrap()
        .expect("mirrored job should exist");
    assert_eq!(job.id, job_id);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);

    EnrichmentJobs::mark_processing(&database, job_id).await.unwrap();
    let job = EnrichmentJobs::get_by_task_id(&database, "task-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.attempts, 1);
    assert!(job.started_at.is_some());

    EnrichmentJobs::mark_completed(&database, job_id).await.unwrap();
    let job = EnrichmentJobs::get_by_task_id(&database, "task-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn failed_job_reenters_pending_for_retry() {
    let database = test_database().await;

    let job_id = EnrichmentJobs::create(
        &database,
        "task-2",
        JobType::ChannelEnrich,
        None,
        Some("chan1"),
        0,
        3,
        serde_json::json!({}),
    )
    .await
    .unwrap();

    EnrichmentJobs::mark_processing(&database, job_id).await.unwrap();

    let next_retry = Timestamp::now();
    EnrichmentJobs::mark_failed(&database, job_id, "api returned 503", Some(next_retry))
        .await
        .unwrap();
    let job = EnrichmentJobs::get_by_task_id(&database, "task-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("api returned 503"));

    EnrichmentJobs::mark_pending_retry(&database, job_id, next_retry)
        .await
        .unwrap();
    let job = EnrichmentJobs::get_by_task_id(&database, "task-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    EnrichmentJobs::mark_processing(&database, job_id).await.unwrap();
    let job = EnrichmentJobs::get_by_task_id(&database, "task-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.attempts, 2);
}

#[tokio::test]
async fn quota_gate_denies_past_the_threshold() {
    let database = test_database().await;
    let quota = QuotaManager::new(database.clone(), 10_000, 90);

    // Spend right up to the threshold.
    quota.record_usage(8_995, op::VIDEOS_LIST).await.unwrap();
    for _ in 0..5 {
        let (allowed, _) = quota.check_available(1).await.unwrap();
        assert!(allowed);
        quota.record_usage(1, op::VIDEOS_LIST).await.unwrap();
    }

    let (allowed, info) = quota.check_available(1).await.unwrap();
    assert!(!allowed);
    assert_eq!(info.used, 9_000);
    assert_eq!(info.threshold, 9_000);
}

#[tokio::test]
async fn quota_tracks_per_operation_counts() {
    let database = test_database().await;
    let quota = QuotaManager::new(database.clone(), 10_000, 90);

    quota.record_usage(1, op::VIDEOS_LIST).await.unwrap();
    quota.record_usage(1, op::VIDEOS_LIST).await.unwrap();
    quota.record_usage(100, op::SEARCH_LIST).await.unwrap();

    let (_, info) = quota.check_available(1).await.unwrap();
    assert_eq!(info.used, 102);

    let today = ring_the_bell::database::QuotaDays::get_today(&database, 10_000)
        .await
        .unwrap();
    assert_eq!(today.operations_count, 3);
    assert_eq!(today.per_operation_counts[op::VIDEOS_LIST], 2);
    assert_eq!(today.per_operation_counts[op::SEARCH_LIST], 1);
}
