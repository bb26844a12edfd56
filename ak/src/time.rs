//! Timer primitive used between retry attempts

use std::time::Duration;

use tracing::trace;

/// Suspend the calling task for `duration`
pub async fn sleep(duration: Duration) {
    trace!(?duration, "sleep: called");
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}
