//! The RPC boundary of block-feed.
//!
//! [`ChainRpc`] is the only capability the stream layer needs from a node client: three lookups
//! plus a factory for fresh [`Filter`](crate::Filter) instances. The stream layer never locks
//! around it; implementations must be safe to call concurrently from several poll loops.
//!
//! [`RpcProvider`] implements [`ChainRpc`] on top of Alloy's
//! [`RootProvider`](alloy::providers::RootProvider). Every call is bounded by a timeout; there is
//! no retry and no failover at this layer, callers that want resilience re-subscribe.
//!
//! # Examples
//!
//! ```rust,no_run
//! use alloy::providers::ProviderBuilder;
//! use block_feed::rpc::RpcProviderBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
//!
//! let rpc = RpcProviderBuilder::new(provider).call_timeout(Duration::from_secs(10)).build();
//!
//! let head = rpc.get_block_by_number(alloy::eips::BlockNumberOrTag::Latest, false).await?;
//! println!("Current head: {}", head.header.number);
//! # Ok(()) }
//! ```

mod builder;
mod filters;
mod provider;
mod provider_conversion;

use std::sync::Arc;

use alloy::{
    eips::BlockId,
    primitives::B256,
    rpc::types::{Filter as LogFilterSpec, Log},
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::{BlockReference, ChainBlock, FeedError, filter::Filter};

pub use builder::{DEFAULT_CALL_TIMEOUT, RpcProviderBuilder};
pub use filters::{BlockFilter, LogFilter, PendingTransactionFilter};
pub use provider::RpcProvider;
pub use provider_conversion::IntoRootProvider;

/// Errors returned by [`RpcProvider`] calls.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Operation timed out")]
    Timeout,
    #[error("RPC call failed: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
    #[error("Block not found, Block Id: {0}")]
    BlockNotFound(BlockId),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::RpcError(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}

/// Node client capability consumed by [`BlockFeed`](crate::BlockFeed).
///
/// Filter factory methods must return a new, not yet installed filter on every call: each live
/// subscription owns its filter and its cursor.
pub trait ChainRpc: Clone + Send + Sync + 'static {
    type Block: ChainBlock<Transaction = Self::Transaction>;
    type Transaction: Clone + std::fmt::Debug + Send + Sync + 'static;
    type BlockFilter: Filter<Item = B256>;
    type PendingTransactionFilter: Filter<Item = B256>;
    type LogFilter: Filter<Item = Log>;

    /// `eth_getBlockByHash`
    fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> impl Future<Output = Result<Self::Block, FeedError>> + Send;

    /// `eth_getBlockByNumber`
    fn get_block_by_number(
        &self,
        number: BlockReference,
        full_transactions: bool,
    ) -> impl Future<Output = Result<Self::Block, FeedError>> + Send;

    /// `eth_getTransactionByHash`. `Ok(None)` means the node does not know the hash (anymore).
    fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<Self::Transaction>, FeedError>> + Send;

    fn block_filter(&self) -> Self::BlockFilter;

    fn pending_transaction_filter(&self) -> Self::PendingTransactionFilter;

    fn log_filter(&self, spec: &LogFilterSpec) -> Self::LogFilter;
}
