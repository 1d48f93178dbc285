use entity::subscriptions;
use jiff::SignedDuration;
use sea_orm::DatabaseConnection;

use crate::{
    database::{RepoError, Subscriptions},
    error::HubError,
    hub::{HubClient, topic_for},
};

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Owns subscription rows and drives them against the hub. One instance is
/// shared by the sweeper and by ad-hoc subscribe requests.
#[derive(Clone)]
pub struct SubscriptionManager {
    database: DatabaseConnection,
    hub: HubClient,
    callback_url: String,
    hub_url: String,
    secret: String,
    lease_seconds: i64,
}

impl SubscriptionManager {
    pub fn new(
        database: DatabaseConnection,
        hub: HubClient,
        callback_url: String,
        hub_url: String,
        secret: String,
        lease_seconds: i64,
    ) -> Self {
        Self {
            database,
            hub,
            callback_url,
            hub_url,
            secret,
            lease_seconds,
        }
    }

    /// Subscribe (or re-subscribe) a channel. The row goes to pending before
    /// the hub is asked; acceptance starts the lease clock immediately, and
    /// the verification GET merely refreshes it with the hub's own number.
    pub async fn subscribe_channel(
        &self,
        channel_id: &str,
    ) -> Result<subscriptions::Model, SubscribeError> {
        Subscriptions::upsert_pending(
            &self.database,
            channel_id,
            &topic_for(channel_id),
            &self.callback_url,
            &self.hub_url,
            &self.secret,
            self.lease_seconds,
        )
        .await?;

        match self
            .hub
            .subscribe(channel_id, self.lease_seconds, &self.secret)
            .await
        {
            Ok(()) => {
                Subscriptions::mark_active(&self.database, channel_id, self.lease_seconds).await?;
            }
            Err(error) => {
                tracing::warn!(channel_id, %error, "hub refused subscribe request");
                Subscriptions::record_failure(
                    &self.database,
                    channel_id,
                    &error.to_string(),
                    error.is_permanent(),
                )
                .await?;
                return Err(error.into());
            }
        }

        Subscriptions::get_by_channel(&self.database, channel_id)
            .await?
            .ok_or(RepoError::NotFound)
            .map_err(SubscribeError::from)
    }

    pub async fn unsubscribe_channel(&self, channel_id: &str) -> Result<(), SubscribeError> {
        self.hub.unsubscribe(channel_id).await?;
        Subscriptions::mark_expired(&self.database, channel_id).await?;

        Ok(())
    }

    /// One sweep: renew every subscription inside its renewal margin.
    /// Failures are recorded per row and do not stop the sweep.
    pub async fn renew_due(&self, margin: SignedDuration) -> Result<usize, RepoError> {
        let due = Subscriptions::list_due(&self.database, margin).await?;
        let total = due.len();
        let mut renewed = 0;

        for subscription in due {
            match self.subscribe_channel(&subscription.channel_id).await {
                Ok(_) => renewed += 1,
                Err(SubscribeError::Repo(error)) => return Err(error),
                // Hub failure is already recorded on the row.
                Err(SubscribeError::Hub(_)) => {}
            }
        }

        if total > 0 {
            tracing::info!(total, renewed, "subscription sweep finished");
        }

        Ok(renewed)
    }
}
