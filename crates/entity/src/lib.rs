pub mod blocked_videos;
pub mod channel_enrichments;
pub mod channels;
pub mod enrichment_jobs;
pub mod quota_days;
pub mod sponsor_detection_jobs;
pub mod sponsor_detection_results;
pub mod sponsor_findings;
pub mod sponsor_prompts;
pub mod subscriptions;
pub mod video_enrichments;
pub mod video_updates;
pub mod videos;
pub mod webhook_events;
