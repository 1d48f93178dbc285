use std::collections::HashMap;

use crate::{
    callbacks::CallbackContext,
    database::{ChannelEnrichments, Channels, EnrichmentJobs, VideoEnrichments},
    queue::{ChannelEnrichPayload, Task, VideoEnrichPayload},
    quota::{cost, op},
    youtube::{channel_enrichment_row, video_enrichment_row},
};

use super::{TaskError, WorkerContext, settle};

/// Enrich a batch of videos with one `videos.list` call. Each task is
/// settled individually: a video the API no longer returns fails alone
/// without dragging the rest of the batch down.
pub(crate) async fn process_video_batch(context: &WorkerContext, tasks: Vec<Task>) {
    let mut batch = Vec::with_capacity(tasks.len());

    for task in tasks {
        match serde_json::from_value::<VideoEnrichPayload>(task.payload.clone()) {
            Ok(payload) => batch.push((task, payload)),
            Err(error) => {
                settle(
                    context,
                    crate::queue::DEFAULT_QUEUE,
                    &task,
                    Err(TaskError::Fatal(format!("undecodable payload: {error}"))),
                )
                .await;
            }
        }
    }

    if batch.is_empty() {
        return;
    }

    for (task, _) in &batch {
        mark_processing(context, task).await;
    }

    let Some(api) = &context.youtube else {
        settle_all(
            context,
            &batch,
            |_| TaskError::Fatal("video enrichment is not configured".to_owned()),
        )
        .await;
        return;
    };

    match context.quota.check_available(cost::VIDEOS_LIST).await {
        Ok((true, _)) => {}
        Ok((false, info)) => {
            settle_all(context, &batch, |_| {
                TaskError::Fatal(format!(
                    "quota exhausted: {} of {} used against a threshold of {}",
                    info.used, info.limit, info.threshold
                ))
            })
            .await;
            return;
        }
        Err(error) => {
            settle_all(context, &batch, |_| TaskError::Retry(error.to_string())).await;
            return;
        }
    }

    let video_ids: Vec<String> = batch
        .iter()
        .map(|(_, payload)| payload.video_id.clone())
        .collect();

    let response = match api.list_videos(&video_ids).await {
        Ok(response) => response,
        Err(error) => {
            let message = error.to_string();
            let retryable = error.is_retryable();
            settle_all(context, &batch, |_| {
                if retryable {
                    TaskError::Retry(message.clone())
                } else {
                    TaskError::Fatal(message.clone())
                }
            })
            .await;
            return;
        }
    };

    if let Err(error) = context.quota.record_usage(cost::VIDEOS_LIST, op::VIDEOS_LIST).await {
        tracing::warn!(%error, "failed to record quota usage for videos.list");
    }

    let mut videos_by_id = HashMap::new();
    for video in response.items.unwrap_or_default() {
        if let Some(id) = video.id.clone() {
            videos_by_id.insert(id, video);
        }
    }

    for (task, payload) in batch {
        let outcome = match videos_by_id.get(&payload.video_id) {
            None => Err(TaskError::Fatal(format!(
                "video {} absent from api response",
                payload.video_id
            ))),
            Some(video) => match video_enrichment_row(video, cost::VIDEOS_LIST as i32) {
                None => Err(TaskError::Fatal(format!(
                    "api item for {} carried no id",
                    payload.video_id
                ))),
                Some(enrichment) => {
                    match VideoEnrichments::upsert(&context.database, enrichment.clone()).await {
                        Err(error) => Err(TaskError::Retry(error.to_string())),
                        Ok(()) => {
                            context
                                .callbacks
                                .dispatch(&CallbackContext {
                                    database: context.database.clone(),
                                    queue: context.queue.clone(),
                                    video_id: payload.video_id.clone(),
                                    channel_id: payload.channel_id.clone(),
                                    enrichment,
                                })
                                .await;
                            Ok(())
                        }
                    }
                }
            },
        };

        settle(context, crate::queue::DEFAULT_QUEUE, &task, outcome).await;
    }
}

/// Enrich a single channel, refreshing the projected channel title with the
/// API's canonical one along the way.
pub(crate) async fn process_channel(
    context: &WorkerContext,
    task: &Task,
) -> Result<(), TaskError> {
    let payload = serde_json::from_value::<ChannelEnrichPayload>(task.payload.clone())
        .map_err(|error| TaskError::Fatal(format!("undecodable payload: {error}")))?;

    mark_processing(context, task).await;

    let api = context
        .youtube
        .as_ref()
        .ok_or_else(|| TaskError::Fatal("channel enrichment is not configured".to_owned()))?;

    match context.quota.check_available(cost::CHANNEL_DETAILS).await {
        Ok((true, _)) => {}
        Ok((false, info)) => {
            return Err(TaskError::Fatal(format!(
                "quota exhausted: {} of {} used against a threshold of {}",
                info.used, info.limit, info.threshold
            )));
        }
        Err(error) => return Err(TaskError::Retry(error.to_string())),
    }

    let response = match api.channel_details(&payload.channel_id).await {
        Ok(response) => response,
        Err(error) if error.is_retryable() => return Err(TaskError::Retry(error.to_string())),
        Err(error) => return Err(TaskError::Fatal(error.to_string())),
    };

    if let Err(error) = context
        .quota
        .record_usage(cost::CHANNEL_DETAILS, op::CHANNELS_LIST)
        .await
    {
        tracing::warn!(%error, "failed to record quota usage for channels.list");
    }

    let channel = response
        .items
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| {
            TaskError::Fatal(format!(
                "channel {} absent from api response",
                payload.channel_id
            ))
        })?;

    let enrichment = channel_enrichment_row(&channel, cost::CHANNEL_DETAILS as i32)
        .ok_or_else(|| TaskError::Fatal("api item carried no channel id".to_owned()))?;

    if let Some(title) = &enrichment.title {
        if let Err(error) = Channels::refresh_title(&context.database, &payload.channel_id, title).await
        {
            tracing::warn!(%error, channel_id = payload.channel_id, "failed to refresh channel title");
        }
    }

    ChannelEnrichments::upsert(&context.database, enrichment)
        .await
        .map_err(|error| TaskError::Retry(error.to_string()))?;

    Ok(())
}

async fn mark_processing(context: &WorkerContext, task: &Task) {
    match EnrichmentJobs::get_by_task_id(&context.database, &task.id.to_string()).await {
        Ok(Some(job)) => {
            if let Err(error) = EnrichmentJobs::mark_processing(&context.database, job.id).await {
                tracing::warn!(%error, task_id = %task.id, "failed to mark job processing");
            }
        }
        // The mirror write is best-effort at enqueue time, so absence is a
        // warning rather than a reason to drop the task.
        Ok(None) => {
            tracing::warn!(task_id = %task.id, "no mirrored job row for reserved task");
        }
        Err(error) => {
            tracing::warn!(%error, task_id = %task.id, "failed to look up mirrored job");
        }
    }
}

async fn settle_all(
    context: &WorkerContext,
    batch: &[(Task, VideoEnrichPayload)],
    outcome: impl Fn(&VideoEnrichPayload) -> TaskError,
) {
    for (task, payload) in batch {
        settle(
            context,
            crate::queue::DEFAULT_QUEUE,
            task,
            Err(outcome(payload)),
        )
        .await;
    }
}
