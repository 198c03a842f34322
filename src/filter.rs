//! Change filters and the poll loop that drives them.
//!
//! A [`Filter`] answers one question: "what is new since I last asked?". [`FilterPoller`] asks that
//! question on every tick of a fixed interval, on the scheduler it was started on, and forwards
//! every new item into a bounded channel.
//!
//! Cancelling a poller stops scheduling ticks. A poll that is already in flight is allowed to
//! finish, but its result is discarded. The filter is uninstalled once the loop exits.

use std::{fmt::Debug, time::Duration};

use tokio::{
    runtime::Handle,
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    FeedError,
    types::{FeedResult, TryStream},
};

/// Stateful detector of new chain items (block hashes, pending transaction hashes or logs).
///
/// A filter owns its cursor. It is never shared between two poll loops.
pub trait Filter: Send + 'static {
    type Item: Clone + Debug + Send + Sync + 'static;

    /// Registers the filter with its source. Called once, before the first poll.
    fn install(&mut self) -> impl Future<Output = Result<(), FeedError>> + Send;

    /// Returns the items observed since the previous poll, oldest first.
    fn poll_changes(&mut self) -> impl Future<Output = Result<Vec<Self::Item>, FeedError>> + Send;

    /// Releases the filter at its source. Must be idempotent.
    fn uninstall(&mut self) -> impl Future<Output = ()> + Send;
}

pub(crate) fn check_interval(interval: Duration) -> Result<(), FeedError> {
    if interval.is_zero() {
        return Err(FeedError::InvalidPollInterval);
    }
    Ok(())
}

/// Handle to a running filter poll loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct FilterPoller {
    token: CancellationToken,
}

impl FilterPoller {
    /// Starts polling `filter` every `interval` on `scheduler`, forwarding items to `sender`.
    ///
    /// A poll error is forwarded as the last item and stops the loop. The loop also stops once
    /// `sender`'s receiver is dropped.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidPollInterval`] if `interval` is zero. Nothing is spawned then.
    pub fn start<F: Filter>(
        filter: F,
        scheduler: &Handle,
        interval: Duration,
        sender: mpsc::Sender<FeedResult<F::Item>>,
    ) -> Result<Self, FeedError> {
        check_interval(interval)?;
        let token = CancellationToken::new();
        scheduler.spawn(poll_filter(filter, interval, sender, token.clone()));
        Ok(Self { token })
    }

    /// Stops scheduling further polls. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for FilterPoller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn poll_filter<F: Filter>(
    mut filter: F,
    poll_interval: Duration,
    sender: mpsc::Sender<FeedResult<F::Item>>,
    token: CancellationToken,
) {
    if let Err(err) = filter.install().await {
        _ = sender.try_stream(Err(err)).await;
        return;
    }
    debug!(interval_ms = poll_interval.as_millis(), "Filter installed, polling for changes");

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    'poll: loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let changes = filter.poll_changes().await;
        if token.is_cancelled() {
            trace!("Discarding filter changes received after cancellation");
            break;
        }

        match changes {
            Ok(items) => {
                for item in items {
                    let sent = tokio::select! {
                        biased;
                        () = token.cancelled() => false,
                        sent = sender.try_stream(Ok(item)) => sent,
                    };
                    if !sent {
                        break 'poll;
                    }
                }
            }
            Err(err) => {
                _ = sender.try_stream(Err(err)).await;
                break;
            }
        }
    }

    filter.uninstall().await;
    debug!("Filter uninstalled, poll loop stopped");
}
