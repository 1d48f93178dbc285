use sea_orm::DatabaseConnection;

use crate::database::{QuotaDays, RepoError};

/// Unit prices for the metered API, in the quota currency the daily limit is
/// denominated in. A `channels.list` asking for the full part set is priced
/// separately from a bare id lookup.
pub mod cost {
    pub const VIDEOS_LIST: i64 = 1;
    pub const CHANNELS_LIST: i64 = 1;
    pub const CHANNEL_DETAILS: i64 = 5;
    pub const SEARCH_LIST: i64 = 100;
}

pub mod op {
    pub const VIDEOS_LIST: &str = "videos.list";
    pub const CHANNELS_LIST: &str = "channels.list";
    pub const SEARCH_LIST: &str = "search.list";
}

/// Where today's spending stands, captured at check time.
#[derive(Debug, Clone, Copy)]
pub struct QuotaInfo {
    pub used: i64,
    pub limit: i64,
    pub threshold: i64,
}

/// Daily-bucket accounting over the `quota_days` table.
///
/// `check_available` is advisory: two workers racing past it may both get a
/// yes near the boundary. `record_usage` is the authoritative tally, and the
/// threshold sits below the hard limit precisely to absorb that slack.
#[derive(Clone)]
pub struct QuotaManager {
    database: DatabaseConnection,
    daily_limit: i64,
    threshold_percent: i64,
}

impl QuotaManager {
    pub fn new(database: DatabaseConnection, daily_limit: i64, threshold_percent: i64) -> Self {
        Self {
            database,
            daily_limit,
            threshold_percent,
        }
    }

    pub async fn check_available(&self, cost: i64) -> Result<(bool, QuotaInfo), RepoError> {
        let today = QuotaDays::get_today(&self.database, self.daily_limit).await?;
        let threshold = threshold(today.quota_limit, self.threshold_percent);

        let info = QuotaInfo {
            used: today.quota_used,
            limit: today.quota_limit,
            threshold,
        };

        Ok((allowed(today.quota_used, threshold, cost), info))
    }

    pub async fn record_usage(&self, cost: i64, op_kind: &str) -> Result<(), RepoError> {
        let today = QuotaDays::increment_by(&self.database, cost, op_kind, self.daily_limit).await?;

        tracing::debug!(
            op_kind,
            cost,
            quota_used = today.quota_used,
            quota_limit = today.quota_limit,
            "recorded api usage"
        );

        Ok(())
    }
}

fn threshold(limit: i64, percent: i64) -> i64 {
    limit * percent / 100
}

fn allowed(used: i64, threshold: i64, cost: i64) -> bool {
    used + cost <= threshold
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn threshold_is_a_percentage_of_the_limit() {
        assert_eq!(threshold(10_000, 90), 9_000);
        assert_eq!(threshold(10_000, 100), 10_000);
        assert_eq!(threshold(333, 90), 299);
    }

    #[test]
    fn spending_up_to_the_threshold_is_allowed() {
        let limit = threshold(10_000, 90);

        // k calls of cost 1 starting at threshold - k all fit.
        let k = 5;
        for step in 0..k {
            assert!(allowed(limit - k + step, limit, 1));
        }
        // The k+1th does not.
        assert!(!allowed(limit, limit, 1));
    }

    #[test]
    fn oversized_cost_is_denied_even_on_a_fresh_day() {
        assert!(!allowed(0, threshold(100, 90), 91));
    }
}
