use crate::channels::{Channel, ChannelEvent};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const INITIAL_BACKOFF_SECS: u64 = 2;
pub(crate) const MAX_BACKOFF_SECS: u64 = 60;

/// Keep `ch.listen` running until the receiving side closes, restarting it
/// with exponential backoff.
pub(crate) fn spawn_supervised_listener(
    ch: Arc<dyn Channel>,
    tx: tokio::sync::mpsc::Sender<ChannelEvent>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);

        loop {
            tracing::debug!(channel = ch.name(), "channel listener starting");
            let result = ch.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => {
                    tracing::warn!(channel = ch.name(), "listener exited; restarting");
                    backoff = initial_backoff_secs.max(1);
                }
                Err(e) => {
                    tracing::error!(channel = ch.name(), error = %format!("{e:#}"), "listener failed; restarting");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}
