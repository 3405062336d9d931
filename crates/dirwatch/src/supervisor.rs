//! Restarts the watch agent whenever a native session fails.

use crate::{agent::WatchAgent, utils::sleep_or_cancel};
use std::time::Duration;
use tracing::{error, info};

/// Run sessions back to back until one ends by cancellation.
///
/// A failed session is reported and followed, after `restart_delay`, by a
/// fresh one. Cancellation during the delay ends supervision as well.
pub async fn supervise(mut agent: WatchAgent, restart_delay: Duration) {
    let cancel = agent.cancel_token();
    let mut failures: u64 = 0;

    loop {
        match agent.run_session().await {
            Ok(()) => break,
            Err(e) => {
                failures += 1;
                error!(
                    "Watch session failed ({} failure(s) so far), restarting in {:?}: {}",
                    failures, restart_delay, e
                );
                if !sleep_or_cancel(&cancel, restart_delay).await {
                    break;
                }
            }
        }
    }

    info!("Watch agent stopped ({} backend)", agent.backend_type());
}
