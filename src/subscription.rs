use std::{
    fmt::Debug,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{FeedResult, FeedStream, TryStream};

/// A stream being driven on a [`BlockFeed`](crate::BlockFeed)'s scheduler.
///
/// Created by [`BlockFeed::subscribe`](crate::BlockFeed::subscribe). Items are buffered in a
/// bounded channel until read.
///
/// Once cancelled (or dropped) the subscription yields nothing more, buffered items included,
/// and the driven stream is dropped, which stops any filter polling behind it.
///
/// # Example
///
/// ```ignore
/// let feed = BlockFeed::builder().connect(provider)?;
///
/// let mut subscription = feed.subscribe(feed.blocks(false, DEFAULT_POLL_INTERVAL));
///
/// while let Some(block) = subscription.next().await {
///     // process block
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<T> {
    inner: ReceiverStream<FeedResult<T>>,
    token: CancellationToken,
}

impl<T: Debug + Send + 'static> Subscription<T> {
    pub(crate) fn spawn(stream: FeedStream<T>, scheduler: &Handle, buffer_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_capacity);
        let token = CancellationToken::new();
        scheduler.spawn(drive(stream, sender, token.clone()));
        Self { inner: ReceiverStream::new(receiver), token }
    }
}

impl<T> Subscription<T> {
    /// Stops the subscription. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = FeedResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn drive<T: Debug + Send + 'static>(
    mut stream: FeedStream<T>,
    sender: mpsc::Sender<FeedResult<T>>,
    token: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            biased;
            () = token.cancelled() => break,
            item = stream.next() => item,
        };
        let Some(item) = item else {
            debug!("Subscribed stream ended");
            break;
        };
        let sent = tokio::select! {
            biased;
            () = token.cancelled() => false,
            sent = sender.try_stream(item) => sent,
        };
        if !sent {
            break;
        }
    }
    debug!(cancelled = token.is_cancelled(), "Subscription driver stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::{
        FeedError, ReplayOrder, assert_closed, assert_heights, assert_next, assert_next_err,
        test_utils::{MockChain, mock_feed},
    };

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn forwards_a_finite_stream_and_closes() {
        let feed = mock_feed(MockChain::new(10));

        let mut subscription = feed.subscribe(feed.replay_blocks(1, 3, false, ReplayOrder::Ascending));

        assert_heights!(subscription, [1, 2, 3]);
        assert_closed!(subscription);
    }

    #[tokio::test]
    async fn forwards_errors() {
        let feed = mock_feed(MockChain::new(10));

        let mut subscription = feed.subscribe(feed.new_block_hashes(Duration::ZERO));

        assert_next_err!(subscription, FeedError::InvalidPollInterval);
        assert_closed!(subscription);
    }

    #[tokio::test]
    async fn cancel_stops_delivery_and_polling() -> anyhow::Result<()> {
        let chain = MockChain::new(0);
        let feed = mock_feed(chain.clone());

        let mut subscription = feed.subscribe(feed.new_block_hashes(INTERVAL));
        chain.filters_installed(1).await;
        chain.announce_block(1);
        assert_next!(subscription, MockChain::block_hash(1));

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());

        chain.announce_block(2);
        sleep(INTERVAL * 10).await;
        assert_closed!(subscription);

        tokio::time::timeout(Duration::from_secs(5), async {
            while chain.filter_uninstalls() == 0 {
                sleep(INTERVAL).await;
            }
        })
        .await?;
        let polls = chain.filter_polls();
        sleep(INTERVAL * 10).await;
        assert_eq!(chain.filter_polls(), polls);
        Ok(())
    }
}
