use entity::{sponsor_detection_results, sponsor_findings};
use entity_types::sponsor::DetectionStatus;
use migration::{Migrator, MigratorTrait as _};
use ring_the_bell::database::{SponsorDetection, sponsor_detection::FindingRecord};
use sea_orm::{ColumnTrait as _, Database, DatabaseConnection, EntityTrait as _, QueryFilter as _};

async fn test_database() -> DatabaseConnection {
    let database = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&database, None)
        .await
        .expect("migrations should apply");
    database
}

fn findings() -> Vec<FindingRecord> {
    vec![
        FindingRecord {
            name: "Acme VPN".to_owned(),
            confidence: 0.92,
            evidence_text: "This video is sponsored by Acme VPN".to_owned(),
        },
        FindingRecord {
            name: "Squarewave".to_owned(),
            confidence: 1.0,
            evidence_text: "use code SQUAREWAVE for 10% off".to_owned(),
        },
    ]
}

#[tokio::test]
async fn prompts_are_stored_once_per_text() {
    let database = test_database().await;

    let first = SponsorDetection::get_or_create_prompt(&database, "find the sponsors")
        .await
        .unwrap();
    let second = SponsorDetection::get_or_create_prompt(&database, "find the sponsors")
        .await
        .unwrap();
    let other = SponsorDetection::get_or_create_prompt(&database, "a different prompt")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_ne!(first.id, other.id);
    assert_eq!(first.prompt_text, "find the sponsors");
}

#[tokio::test]
async fn results_land_atomically_and_complete_the_job() {
    let database = test_database().await;

    let job = SponsorDetection::create_job(&database, "job-1", "vid1").await.unwrap();
    assert_eq!(job.status, DetectionStatus::Pending);

    let prompt = SponsorDetection::get_or_create_prompt(&database, "find the sponsors")
        .await
        .unwrap();

    SponsorDetection::save_results(
        &database,
        "job-1",
        "vid1",
        prompt.id,
        &findings(),
        r#"{"sponsors":[...]}"#,
        412,
    )
    .await
    .unwrap();

    let job = SponsorDetection::get_job(&database, "job-1").await.unwrap().unwrap();
    assert_eq!(job.status, DetectionStatus::Completed);
    assert!(job.completed_at.is_some());

    let rows = sponsor_findings::Entity::find()
        .filter(sponsor_findings::Column::DetectionJobId.eq("job-1"))
        .all(&database)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn redelivered_results_do_not_duplicate() {
    let database = test_database().await;

    SponsorDetection::create_job(&database, "job-2", "vid2").await.unwrap();
    let prompt = SponsorDetection::get_or_create_prompt(&database, "find the sponsors")
        .await
        .unwrap();

    for _ in 0..2 {
        SponsorDetection::save_results(
            &database,
            "job-2",
            "vid2",
            prompt.id,
            &findings(),
            "{}",
            100,
        )
        .await
        .unwrap();
    }

    let results = sponsor_detection_results::Entity::find()
        .filter(sponsor_detection_results::Column::DetectionJobId.eq("job-2"))
        .all(&database)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let rows = sponsor_findings::Entity::find()
        .filter(sponsor_findings::Column::DetectionJobId.eq("job-2"))
        .all(&database)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn empty_descriptions_skip() {
    let database = test_database().await;

    SponsorDetection::create_job(&database, "job-3", "vid3").await.unwrap();
    SponsorDetection::mark_job(&database, "job-3", DetectionStatus::Skipped, None)
        .await
        .unwrap();

    let job = SponsorDetection::get_job(&database, "job-3").await.unwrap().unwrap();
    assert_eq!(job.status, DetectionStatus::Skipped);
    assert!(job.completed_at.is_some());
}
