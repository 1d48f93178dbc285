use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    database::SponsorDetection,
    queue::{QueueClient, SponsorDetectPayload, enqueue_sponsor_detection},
};

/// What a post-enrichment callback gets to look at. Owned clones so the
/// callbacks can run detached from the worker's borrow of the task.
#[derive(Clone)]
pub struct CallbackContext {
    pub database: DatabaseConnection,
    pub queue: QueueClient,
    pub video_id: String,
    pub channel_id: String,
    pub enrichment: entity::video_enrichments::Model,
}

struct Callback<C> {
    name: &'static str,
    run: Box<dyn Fn(C) -> BoxFuture<'static, color_eyre::Result<()>> + Send + Sync>,
}

/// Ordered list of hooks run after every successful video enrichment. A
/// failing callback is logged and skipped over; the ones after it still run
/// and the enrichment's fate is already sealed either way.
pub struct CallbackRegistry<C = CallbackContext> {
    callbacks: RwLock<Vec<Arc<Callback<C>>>>,
}

impl<C: Clone> CallbackRegistry<C> {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn register<F>(&self, name: &'static str, callback: F)
    where
        F: Fn(C) -> BoxFuture<'static, color_eyre::Result<()>> + Send + Sync + 'static,
    {
        self.callbacks
            .write()
            .expect("callback list lock should not be poisoned")
            .push(Arc::new(Callback {
                name,
                run: Box::new(callback),
            }));
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .expect("callback list lock should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn dispatch(&self, context: &C) {
        let callbacks = self
            .callbacks
            .read()
            .expect("callback list lock should not be poisoned")
            .clone();

        for callback in callbacks {
            if let Err(error) = (callback.run)(context.clone()).await {
                tracing::warn!(callback = callback.name, %error, "enrichment callback failed");
            }
        }
    }
}

impl<C: Clone> Default for CallbackRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in chain link: a fresh enrichment with words in its description
/// spawns a sponsor-detection job on the side queue. Description-less videos
/// have nothing to detect against and are left alone.
pub fn register_sponsor_detection(registry: &CallbackRegistry) {
    registry.register("sponsor_detection", |context: CallbackContext| {
        Box::pin(async move {
            let description = context
                .enrichment
                .description
                .as_deref()
                .unwrap_or_default();
            if description.is_empty() {
                return Ok(());
            }

            let detection_job_id = Uuid::new_v4();
            SponsorDetection::create_job(
                &context.database,
                &detection_job_id.to_string(),
                &context.video_id,
            )
            .await?;

            let title = context
                .enrichment
                .raw_api_body
                .pointer("/snippet/title")
                .and_then(|title| title.as_str())
                .unwrap_or_default()
                .to_owned();

            enqueue_sponsor_detection(
                &context.database,
                &context.queue,
                SponsorDetectPayload {
                    video_id: context.video_id.clone(),
                    title,
                    description: description.to_owned(),
                    detection_job_id,
                    metadata: serde_json::json!({}),
                },
            )
            .await?;

            tracing::debug!(video_id = context.video_id, %detection_job_id, "sponsor detection enqueued");

            Ok(())
        })
    });
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use color_eyre::eyre::eyre;

    use super::*;

    #[tokio::test]
    async fn a_failing_callback_does_not_stop_the_rest() {
        let registry = CallbackRegistry::<()>::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        registry.register("always_fails", |()| {
            Box::pin(async { Err(eyre!("deliberate failure")) })
        });

        let counter = invocations.clone();
        registry.register("counts", move |()| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        registry.dispatch(&()).await;

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn callbacks_run_in_registration_order() {
        let registry = CallbackRegistry::<()>::new();
        let order = Arc::new(RwLock::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = order.clone();
            registry.register(name, move |()| {
                let order = order.clone();
                Box::pin(async move {
                    order.write().unwrap().push(name);
                    Ok(())
                })
            });
        }

        registry.dispatch(&()).await;

        assert_eq!(*order.read().unwrap(), vec!["first", "second", "third"]);
    }
}
