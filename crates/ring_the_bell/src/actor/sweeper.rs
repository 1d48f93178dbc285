use std::time::Duration;

use jiff::SignedDuration;
use tokio_util::sync::CancellationToken;

use crate::subscription::SubscriptionManager;

const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Keep hub leases alive: every sweep re-subscribes whatever falls inside
/// the renewal margin. The first tick fires immediately, which also picks up
/// leases that lapsed while the process was down.
pub async fn subscription_sweeper(
    shutdown: CancellationToken,
    manager: SubscriptionManager,
    renewal_margin: SignedDuration,
) -> color_eyre::Result<()> {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {},
        }

        if let Err(error) = manager.renew_due(renewal_margin).await {
            tracing::error!(%error, "subscription sweep failed");
        }
    }

    tracing::info!("shutting down");

    Ok(())
}
