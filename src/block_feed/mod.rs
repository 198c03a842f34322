mod builder;
mod catch_up;
mod derived;
mod live;
mod replay;
mod resolver;

use alloy::primitives::BlockNumber;
use tokio::runtime::Handle;
use tokio_stream::Stream;

use crate::{
    BlockReference, FeedError,
    rpc::ChainRpc,
    subscription::Subscription,
    types::{FeedResult, FeedStream, boxed},
};

pub use builder::{BlockFeedBuilder, DEFAULT_POLL_INTERVAL, DEFAULT_STREAM_BUFFER_CAPACITY};
pub use derived::{block_to_transactions, flatten_transactions};

pub(crate) use resolver::resolve;

/// Turns a [`ChainRpc`] client into lazy block, transaction and log streams.
///
/// Every stream constructor returns immediately and performs no I/O. Work starts when the returned
/// stream is first polled, and stops when it is dropped. Wrap a stream with
/// [`subscribe`](Self::subscribe) to drive it on the feed's scheduler instead.
#[derive(Clone)]
pub struct BlockFeed<R> {
    rpc: R,
    scheduler: Handle,
    buffer_capacity: usize,
}

impl<R: ChainRpc> BlockFeed<R> {
    /// Returns a builder with default settings.
    #[must_use]
    pub fn builder() -> BlockFeedBuilder {
        BlockFeedBuilder::new()
    }

    /// Returns the underlying RPC client.
    #[must_use]
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Resolves `reference` to a concrete height.
    ///
    /// Concrete heights are returned as-is without touching the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the header lookup for a tag fails.
    pub async fn resolve(
        &self,
        reference: impl Into<BlockReference>,
    ) -> Result<BlockNumber, FeedError> {
        resolve(&self.rpc, reference.into()).await
    }

    /// Drives `stream` on the feed's scheduler and returns a handle to its output.
    ///
    /// The driver stops when the stream ends, when the subscription is cancelled or when it is
    /// dropped. Stopping drops `stream`, which cancels any filter polling behind it.
    pub fn subscribe<T, S>(&self, stream: S) -> Subscription<T>
    where
        T: std::fmt::Debug + Send + 'static,
        S: Stream<Item = FeedResult<T>> + Send + 'static,
    {
        Subscription::spawn(boxed(stream), &self.scheduler, self.buffer_capacity)
    }
}

/// A stream whose only item is `error`.
pub(crate) fn failed<T: Send + 'static>(error: FeedError) -> FeedStream<T> {
    boxed(tokio_stream::once(Err(error)))
}
