use std::{mem::discriminant, sync::Arc};

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    primitives::BlockNumber,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;

use crate::rpc::Error as RpcProviderError;

/// Errors emitted by block-feed streams.
///
/// `FeedError` values are returned by [`BlockFeedBuilder::build`](crate::BlockFeedBuilder::build)
/// and are also yielded by streams (as `Err(FeedError)` items).
///
/// Every error yielded by a stream is terminal: the stream ends right after it.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),

    /// A requested block (by number, hash or tag) could not be retrieved.
    #[error("Block not found, Block Id: {0}")]
    BlockNotFound(BlockId),

    /// A timeout elapsed while waiting for an RPC response.
    #[error("Operation timed out")]
    Timeout,

    /// A block that should carry full transaction objects only carried hashes.
    ///
    /// This means the node returned an inconsistent response. It cannot be repaired here; the node
    /// has to be resynchronized.
    #[error("Block {block} is missing its transaction bodies, the node needs to resync")]
    MissingTransactionBodies { block: BlockNumber },

    /// A replay was requested with a start height above its end height.
    #[error("Invalid block range: start {start} is greater than end {end}")]
    InvalidBlockRange { start: BlockNumber, end: BlockNumber },

    /// A live stream was requested with a zero poll interval.
    #[error("Poll interval must be greater than 0")]
    InvalidPollInterval,

    /// The configured stream buffer capacity is invalid (must be greater than zero).
    #[error("Stream buffer capacity must be greater than 0")]
    InvalidBufferCapacity,

    /// No scheduler was configured and the builder was not called from a Tokio runtime.
    #[error("No scheduler configured and no Tokio runtime is running")]
    NoScheduler,

    /// The block tag has no counterpart in [`BlockReference`](crate::BlockReference).
    #[error("Unsupported block tag: {0}")]
    UnsupportedBlockTag(BlockNumberOrTag),
}

impl From<RpcProviderError> for FeedError {
    fn from(error: RpcProviderError) -> FeedError {
        match error {
            RpcProviderError::Timeout => FeedError::Timeout,
            RpcProviderError::RpcError(err) => FeedError::RpcError(err),
            RpcProviderError::BlockNotFound(block) => FeedError::BlockNotFound(block),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for FeedError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        FeedError::RpcError(Arc::new(error))
    }
}

impl<T> PartialEq<FeedError> for Result<T, FeedError> {
    fn eq(&self, other: &FeedError) -> bool {
        match self {
            Ok(_) => false,
            Err(err) => discriminant(err) == discriminant(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_feed_errors() {
        assert!(matches!(FeedError::from(RpcProviderError::Timeout), FeedError::Timeout));
        assert!(matches!(
            FeedError::from(RpcProviderError::BlockNotFound(BlockId::number(3))),
            FeedError::BlockNotFound(_)
        ));

        let transport: RpcError<TransportErrorKind> = TransportErrorKind::BackendGone.into();
        assert!(matches!(
            FeedError::from(RpcProviderError::from(transport)),
            FeedError::RpcError(_)
        ));
    }

    #[test]
    fn results_compare_against_error_variants() {
        let err: Result<u64, FeedError> = Err(FeedError::InvalidBlockRange { start: 5, end: 1 });

        assert_eq!(err, FeedError::InvalidBlockRange { start: 0, end: 0 });
        assert_ne!(err, FeedError::Timeout);
        assert_ne!(Ok::<u64, FeedError>(1), FeedError::Timeout);
    }
}
