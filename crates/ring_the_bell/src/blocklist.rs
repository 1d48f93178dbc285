use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
    time::Duration,
};

use redis::{AsyncCommands as _, aio::ConnectionManager};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::database::BlockedVideoSet;

const BLOCKED_SET_KEY: &str = "rtb:blocked_videos";
const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Membership check for blocked videos on the webhook hot path.
///
/// The database is the source of truth; `sync` copies it into the shared
/// redis set (for other processes) and into a local view that answers
/// `is_blocked` without leaving the process.
#[derive(Clone)]
pub struct Blocklist {
    database: DatabaseConnection,
    redis: ConnectionManager,
    view: Arc<RwLock<HashSet<String>>>,
}

impl Blocklist {
    pub fn new(database: DatabaseConnection, redis: ConnectionManager) -> Self {
        Self {
            database,
            redis,
            view: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn is_blocked(&self, video_id: &str) -> bool {
        self.view
            .read()
            .expect("blocklist view lock should not be poisoned")
            .contains(video_id)
    }

    /// Block a video: database first, then the remote set, then the local
    /// view. Failures after the database write leave the caches stale for at
    /// most one sync interval.
    pub async fn block(&self, video_id: &str, reason: &str) -> color_eyre::Result<()> {
        BlockedVideoSet::insert(&self.database, video_id, reason).await?;

        let mut redis = self.redis.clone();
        let _: () = redis.sadd(BLOCKED_SET_KEY, video_id).await?;

        self.view
            .write()
            .expect("blocklist view lock should not be poisoned")
            .insert(video_id.to_owned());

        Ok(())
    }

    /// Reload from the database into the remote set and the local view.
    pub async fn sync(&self) -> color_eyre::Result<usize> {
        let blocked = BlockedVideoSet::list_all(&self.database).await?;
        let ids: HashSet<String> = blocked.into_iter().map(|row| row.video_id).collect();

        let mut redis = self.redis.clone();
        let mut pipeline = redis::pipe();
        pipeline.atomic().del(BLOCKED_SET_KEY);
        if !ids.is_empty() {
            pipeline.sadd(BLOCKED_SET_KEY, ids.iter().collect::<Vec<_>>());
        }
        let _: () = pipeline.query_async(&mut redis).await?;

        let count = ids.len();
        *self
            .view
            .write()
            .expect("blocklist view lock should not be poisoned") = ids;

        tracing::debug!(count, "blocklist synced");

        Ok(count)
    }

    /// Periodic reload until shutdown.
    pub async fn sync_loop(self, shutdown: CancellationToken) -> color_eyre::Result<()> {
        let mut ticker = tokio::time::interval(SYNC_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {},
            }

            if let Err(error) = self.sync().await {
                tracing::error!(%error, "blocklist sync failed");
            }
        }

        tracing::info!("shutting down");

        Ok(())
    }
}
