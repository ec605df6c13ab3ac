use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use clandestine_db::{Database, StoreError};

use crate::auth::AppState;

/// Default period between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Remove posts that expired before `now`.
pub fn sweep(db: &Database, now: i64) -> Result<usize, StoreError> {
    let removed = db.sweep_expired(now)?;
    if removed > 0 {
        info!("Cleaned up {} expired post(s)", removed);
    }
    Ok(removed)
}

/// Background task that sweeps expired posts every `period`.
///
/// The first sweep runs one full period after the task starts; the server
/// sweeps once on its own before it begins accepting requests.
pub async fn run_sweep_loop(state: AppState, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let s = state.clone();
        match tokio::task::spawn_blocking(move || sweep(&s.db, s.clock.now_ms())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
