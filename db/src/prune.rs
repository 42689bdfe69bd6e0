//! Background session pruning.
//!
//! Periodically deletes expired sessions from the store. Expired sessions are
//! already invisible to reads, so this only reclaims storage.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::SessionStore;

impl SessionStore {
    /// Prunes expired sessions every `period`, forever.
    ///
    /// The first run happens one `period` after the call. Failures are logged
    /// by [`SessionStore::prune`] and the loop carries on.
    pub async fn continuously_prune(self, period: Duration) {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.prune().await;

            if let Ok(count) = self.length().await {
                debug!(stored_sessions = count, "session store status");
            }
        }
    }
}

/// Spawn a background task that periodically prunes expired sessions.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_prune_task(store: SessionStore, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(store.continuously_prune(period))
}
