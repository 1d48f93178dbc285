use entity_types::sponsor::DetectionStatus;

use crate::{
    database::{RepoError, SponsorDetection, sponsor_detection::FindingRecord},
    queue::{SponsorDetectPayload, Task},
};

use super::{TaskError, WorkerContext};

/// System prompt for the detection call. Stored through the prompt table on
/// first use so result rows can reference the exact wording.
const DETECTION_PROMPT: &str = "\
You identify paid sponsorships in YouTube video descriptions.\n\
Return STRICT JSON only (no markdown, no commentary) with:\n\
{\"sponsors\":[{\"name\":\"...\",\"confidence\":0.0,\"evidence_text\":\"...\"}]}.\n\
`confidence` is between 0 and 1. `evidence_text` quotes the description\n\
verbatim. Affiliate links and discount codes count as sponsorships; the\n\
creator's own merchandise does not. Return {\"sponsors\":[]} when nothing\n\
qualifies.";

pub(crate) async fn process(context: &WorkerContext, task: &Task) -> Result<(), TaskError> {
    let payload = serde_json::from_value::<SponsorDetectPayload>(task.payload.clone())
        .map_err(|error| TaskError::Fatal(format!("undecodable payload: {error}")))?;

    if let Ok(Some(job)) =
        crate::database::EnrichmentJobs::get_by_task_id(&context.database, &task.id.to_string())
            .await
    {
        if let Err(error) =
            crate::database::EnrichmentJobs::mark_processing(&context.database, job.id).await
        {
            tracing::warn!(%error, task_id = %task.id, "failed to mark job processing");
        }
    }

    let detection_job_id = payload.detection_job_id.to_string();

    match SponsorDetection::mark_job(
        &context.database,
        &detection_job_id,
        DetectionStatus::Processing,
        None,
    )
    .await
    {
        Ok(()) => {}
        // Without its job row there is nowhere to attach results.
        Err(RepoError::NotFound) => {
            return Err(TaskError::Fatal(format!(
                "detection job {detection_job_id} does not exist"
            )));
        }
        Err(error) => return Err(TaskError::Retry(error.to_string())),
    }

    if payload.description.trim().is_empty() {
        SponsorDetection::mark_job(
            &context.database,
            &detection_job_id,
            DetectionStatus::Skipped,
            None,
        )
        .await
        .map_err(|error| TaskError::Retry(error.to_string()))?;

        tracing::debug!(video_id = payload.video_id, "empty description, detection skipped");
        return Ok(());
    }

    let Some(llm) = &context.llm else {
        let _ = SponsorDetection::mark_job(
            &context.database,
            &detection_job_id,
            DetectionStatus::Failed,
            Some("sponsor detection is not configured".to_owned()),
        )
        .await;
        return Err(TaskError::Fatal(
            "sponsor detection is not configured".to_owned(),
        ));
    };

    let prompt = SponsorDetection::get_or_create_prompt(&context.database, DETECTION_PROMPT)
        .await
        .map_err(|error| TaskError::Retry(error.to_string()))?;

    let outcome = match llm
        .detect_sponsors(&prompt.prompt_text, &payload.title, &payload.description)
        .await
    {
        Ok(outcome) => outcome,
        Err(error) => {
            let retryable = error.is_retryable();
            let _ = SponsorDetection::mark_job(
                &context.database,
                &detection_job_id,
                DetectionStatus::Failed,
                Some(error.to_string()),
            )
            .await;

            return Err(if retryable {
                TaskError::Retry(error.to_string())
            } else {
                TaskError::Fatal(error.to_string())
            });
        }
    };

    let findings: Vec<FindingRecord> = outcome
        .findings
        .into_iter()
        .map(|finding| FindingRecord {
            name: finding.name,
            confidence: finding.confidence.clamp(0.0, 1.0),
            evidence_text: finding.evidence_text,
        })
        .collect();

    SponsorDetection::save_results(
        &context.database,
        &detection_job_id,
        &payload.video_id,
        prompt.id,
        &findings,
        &outcome.raw_body,
        outcome.duration_ms,
    )
    .await
    .map_err(|error| TaskError::Retry(error.to_string()))?;

    tracing::info!(
        video_id = payload.video_id,
        sponsors = findings.len(),
        duration_ms = outcome.duration_ms,
        "sponsor detection finished"
    );

    Ok(())
}
