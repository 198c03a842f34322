use std::time::Duration;

use alloy::network::Network;
use tokio::runtime::Handle;

use crate::{
    FeedError,
    block_feed::BlockFeed,
    rpc::{ChainRpc, IntoRootProvider, RpcProvider, RpcProviderBuilder},
};

/// Default capacity of every channel created by a [`BlockFeed`].
pub const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 50_000;

/// Conventional poll interval for live streams.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Builder/configuration for [`BlockFeed`].
#[derive(Clone, Debug)]
pub struct BlockFeedBuilder {
    buffer_capacity: usize,
    scheduler: Option<Handle>,
}

impl Default for BlockFeedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockFeedBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY, scheduler: None }
    }

    /// Sets the stream buffer capacity.
    ///
    /// Bounds every channel between a poll loop (or a [`Subscription`](crate::Subscription)
    /// driver) and its consumer. When a channel is full the producer waits for the consumer.
    ///
    /// # Arguments
    ///
    /// * `buffer_capacity` - Maximum number of items to buffer (must be greater than 0)
    #[must_use]
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Sets the runtime that drives poll loops and subscriptions.
    ///
    /// Defaults to the runtime `build` is called from.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Handle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Builds a feed over `rpc`.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidBufferCapacity`] if the buffer capacity is zero.
    /// * [`FeedError::NoScheduler`] if no scheduler was set and no Tokio runtime is running.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn build<R: ChainRpc>(self, rpc: R) -> Result<BlockFeed<R>, FeedError> {
        if self.buffer_capacity == 0 {
            return Err(FeedError::InvalidBufferCapacity);
        }
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Handle::try_current().map_err(|_| FeedError::NoScheduler)?,
        };
        Ok(BlockFeed { rpc, scheduler, buffer_capacity: self.buffer_capacity })
    }

    /// Builds a feed over an Alloy provider, wrapped in an [`RpcProvider`] with default settings.
    ///
    /// Use [`RpcProviderBuilder`](crate::rpc::RpcProviderBuilder) and [`build`](Self::build) to
    /// set the call timeout.
    ///
    /// # Errors
    ///
    /// Any error [`build`](Self::build) returns.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn connect<N: Network>(
        self,
        provider: impl IntoRootProvider<N>,
    ) -> Result<BlockFeed<RpcProvider<N>>, FeedError>
    where
        RpcProvider<N>: ChainRpc,
    {
        self.build(RpcProviderBuilder::new(provider).build())
    }
}
