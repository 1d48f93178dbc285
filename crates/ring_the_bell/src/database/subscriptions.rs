use entity::subscriptions;
use entity_types::{jiff_compat::JiffTimestampMilliseconds, subscription::SubscriptionStatus};
use jiff::{SignedDuration, Timestamp};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::{NotSet, Set},
    ColumnTrait as _, Condition, ConnectionTrait, EntityTrait as _, QueryFilter as _,
    sea_query::OnConflict,
};

use super::RepoError;

pub struct Subscriptions;

impl Subscriptions {
    pub async fn get_by_channel<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
    ) -> Result<Option<subscriptions::Model>, RepoError> {
        Ok(subscriptions::Entity::find()
            .filter(subscriptions::Column::ChannelId.eq(channel_id))
            .one(db)
            .await?)
    }

    pub async fn get_by_topic<C: ConnectionTrait>(
        db: &C,
        topic_url: &str,
    ) -> Result<Option<subscriptions::Model>, RepoError> {
        Ok(subscriptions::Entity::find()
            .filter(subscriptions::Column::TopicUrl.eq(topic_url))
            .one(db)
            .await?)
    }

    /// Create or reset the row for a channel ahead of a subscribe attempt.
    /// An existing row keeps its renewal history; only the request
    /// parameters and status change.
    pub async fn upsert_pending<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        topic_url: &str,
        callback_url: &str,
        hub_url: &str,
        secret: &str,
        lease_seconds: i64,
    ) -> Result<subscriptions::Model, RepoError> {
        subscriptions::Entity::insert(subscriptions::ActiveModel {
            id: NotSet,
            channel_id: Set(channel_id.to_owned()),
            topic_url: Set(topic_url.to_owned()),
            callback_url: Set(callback_url.to_owned()),
            hub_url: Set(hub_url.to_owned()),
            secret: Set(secret.to_owned()),
            lease_seconds: Set(lease_seconds),
            expires_at: Set(None),
            status: Set(SubscriptionStatus::Pending),
            renewal_attempts: Set(0),
            next_renewal_at: Set(None),
            last_renewal_error: Set(None),
        })
        .on_conflict(
            OnConflict::column(subscriptions::Column::ChannelId)
                .update_columns([
                    subscriptions::Column::TopicUrl,
                    subscriptions::Column::CallbackUrl,
                    subscriptions::Column::HubUrl,
                    subscriptions::Column::Secret,
                    subscriptions::Column::LeaseSeconds,
                    subscriptions::Column::Status,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

        Self::get_by_channel(db, channel_id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    /// The hub accepted (or verified) the subscription: start the lease
    /// clock and clear the failure bookkeeping.
    pub async fn mark_active<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        lease_seconds: i64,
    ) -> Result<(), RepoError> {
        let subscription = Self::get_by_channel(db, channel_id)
            .await?
            .ok_or(RepoError::NotFound)?;

        let expires_at = Timestamp::now() + SignedDuration::from_secs(lease_seconds);

        let mut subscription: subscriptions::ActiveModel = subscription.into();
        subscription.status = Set(SubscriptionStatus::Active);
        subscription.lease_seconds = Set(lease_seconds);
        subscription.expires_at = Set(Some(JiffTimestampMilliseconds(expires_at)));
        subscription.renewal_attempts = Set(0);
        subscription.next_renewal_at = Set(None);
        subscription.last_renewal_error = Set(None);
        subscription.update(db).await?;

        Ok(())
    }

    pub async fn mark_expired<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
    ) -> Result<(), RepoError> {
        let subscription = Self::get_by_channel(db, channel_id)
            .await?
            .ok_or(RepoError::NotFound)?;

        let mut subscription: subscriptions::ActiveModel = subscription.into();
        subscription.status = Set(SubscriptionStatus::Expired);
        subscription.update(db).await?;

        Ok(())
    }

    /// Record a failed subscribe attempt. Transient failures push the next
    /// attempt out exponentially; permanent ones park the row as failed so
    /// the sweeper stops touching it.
    pub async fn record_failure<C: ConnectionTrait>(
        db: &C,
        channel_id: &str,
        error: &str,
        permanent: bool,
    ) -> Result<(), RepoError> {
        let subscription = Self::get_by_channel(db, channel_id)
            .await?
            .ok_or(RepoError::NotFound)?;

        let attempts = subscription.renewal_attempts + 1;
        let backoff = renewal_backoff(attempts);

        let mut subscription: subscriptions::ActiveModel = subscription.into();
        subscription.renewal_attempts = Set(attempts);
        subscription.last_renewal_error = Set(Some(error.to_owned()));
        if permanent {
            subscription.status = Set(SubscriptionStatus::Failed);
            subscription.next_renewal_at = Set(None);
        } else {
            subscription.next_renewal_at = Set(Some(JiffTimestampMilliseconds(
                Timestamp::now() + backoff,
            )));
        }
        subscription.update(db).await?;

        Ok(())
    }

    /// Subscriptions whose lease runs out within `margin`, skipping rows
    /// whose backoff window has not elapsed and rows parked as failed.
    pub async fn list_due<C: ConnectionTrait>(
        db: &C,
        margin: SignedDuration,
    ) -> Result<Vec<subscriptions::Model>, RepoError> {
        let now = Timestamp::now();
        let deadline = JiffTimestampMilliseconds(now + margin);
        let now = JiffTimestampMilliseconds(now);

        Ok(subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.ne(SubscriptionStatus::Failed))
            .filter(
                Condition::any()
                    .add(subscriptions::Column::ExpiresAt.is_null())
                    .add(subscriptions::Column::ExpiresAt.lt(deadline)),
            )
            .filter(
                Condition::any()
                    .add(subscriptions::Column::NextRenewalAt.is_null())
                    .add(subscriptions::Column::NextRenewalAt.lte(now)),
            )
            .all(db)
            .await?)
    }
}

/// 2m, 4m, 8m, ... capped at about 17 hours.
fn renewal_backoff(attempts: i32) -> SignedDuration {
    SignedDuration::from_secs(60 * 2i64.saturating_pow(attempts.clamp(1, 10) as u32))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(renewal_backoff(1), SignedDuration::from_secs(120));
        assert_eq!(renewal_backoff(2), SignedDuration::from_secs(240));
        assert_eq!(renewal_backoff(3), SignedDuration::from_secs(480));
        assert_eq!(renewal_backoff(99), renewal_backoff(10));
    }
}
