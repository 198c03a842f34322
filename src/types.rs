use std::{fmt::Debug, pin::Pin};

use alloy::{
    consensus::BlockHeader,
    eips::BlockNumberOrTag,
    primitives::BlockNumber,
    rpc::types::{Block, BlockTransactions},
};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::{trace, warn};

use crate::FeedError;

/// A lazy stream of items produced by [`BlockFeed`](crate::BlockFeed).
///
/// Nothing happens until the stream is polled for the first time. The first `Err` item is also the
/// last one.
pub type FeedStream<T> = Pin<Box<dyn Stream<Item = Result<T, FeedError>> + Send + 'static>>;

/// Result type yielded by feed streams.
pub type FeedResult<T> = Result<T, FeedError>;

/// Boxes a stream into a [`FeedStream`].
pub(crate) fn boxed<T, S>(stream: S) -> FeedStream<T>
where
    S: Stream<Item = FeedResult<T>> + Send + 'static,
{
    Box::pin(stream)
}

/// Symbolic block position that must be queried to learn its height.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
}

/// A pointer to a position on the chain, either a concrete height or a symbolic tag.
///
/// Concrete references resolve without any RPC round trip.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockReference {
    Number(BlockNumber),
    Tag(BlockTag),
}

impl BlockReference {
    /// Reference to the current chain head.
    pub const LATEST: Self = Self::Tag(BlockTag::Latest);

    /// Returns the height if this reference is concrete.
    #[must_use]
    pub const fn as_number(&self) -> Option<BlockNumber> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Tag(_) => None,
        }
    }
}

impl From<BlockNumber> for BlockReference {
    fn from(number: BlockNumber) -> Self {
        Self::Number(number)
    }
}

impl From<BlockTag> for BlockReference {
    fn from(tag: BlockTag) -> Self {
        Self::Tag(tag)
    }
}

impl From<BlockReference> for BlockNumberOrTag {
    fn from(reference: BlockReference) -> Self {
        match reference {
            BlockReference::Number(number) => BlockNumberOrTag::Number(number),
            BlockReference::Tag(BlockTag::Latest) => BlockNumberOrTag::Latest,
            BlockReference::Tag(BlockTag::Earliest) => BlockNumberOrTag::Earliest,
            BlockReference::Tag(BlockTag::Pending) => BlockNumberOrTag::Pending,
        }
    }
}

impl TryFrom<BlockNumberOrTag> for BlockReference {
    type Error = FeedError;

    fn try_from(value: BlockNumberOrTag) -> Result<Self, Self::Error> {
        match value {
            BlockNumberOrTag::Number(number) => Ok(Self::Number(number)),
            BlockNumberOrTag::Latest => Ok(Self::Tag(BlockTag::Latest)),
            BlockNumberOrTag::Earliest => Ok(Self::Tag(BlockTag::Earliest)),
            BlockNumberOrTag::Pending => Ok(Self::Tag(BlockTag::Pending)),
            other => Err(FeedError::UnsupportedBlockTag(other)),
        }
    }
}

/// Direction in which a replay walks its closed block range.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq)]
pub enum ReplayOrder {
    /// `start, start + 1, ..., end`
    #[default]
    Ascending,
    /// `end, end - 1, ..., start`
    Descending,
}

/// The view of a block this crate needs: its height and its transactions.
pub trait ChainBlock: Clone + Debug + Send + Sync + 'static {
    type Transaction: Clone + Debug + Send + Sync + 'static;

    fn number(&self) -> BlockNumber;

    /// Consumes the block and returns its transactions in block order.
    ///
    /// # Errors
    ///
    /// [`FeedError::MissingTransactionBodies`] if the block holds transaction hashes instead of
    /// full transaction objects.
    fn into_transactions(self) -> Result<Vec<Self::Transaction>, FeedError>;
}

impl<T, H> ChainBlock for Block<T, H>
where
    T: Clone + Debug + Send + Sync + 'static,
    H: BlockHeader + Clone + Debug + Send + Sync + 'static,
{
    type Transaction = T;

    fn number(&self) -> BlockNumber {
        self.header.number()
    }

    fn into_transactions(self) -> Result<Vec<T>, FeedError> {
        let block = self.number();
        match self.transactions {
            BlockTransactions::Full(transactions) => Ok(transactions),
            // an empty list deserializes as hashes
            BlockTransactions::Hashes(hashes) if hashes.is_empty() => Ok(Vec::new()),
            BlockTransactions::Hashes(_) => Err(FeedError::MissingTransactionBodies { block }),
            BlockTransactions::Uncle => Ok(Vec::new()),
        }
    }
}

pub(crate) trait TryStream<T> {
    async fn try_stream(&self, item: FeedResult<T>) -> bool;
}

impl<T: Debug> TryStream<T> for mpsc::Sender<FeedResult<T>> {
    async fn try_stream(&self, item: FeedResult<T>) -> bool {
        match &item {
            Ok(msg) => trace!(item = ?msg, "Sending item"),
            Err(err) => warn!(error = %err, "Sending error"),
        }
        if let Err(err) = self.send(item).await {
            warn!(error = %err, "Downstream channel closed, stopping stream");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::B256, rpc::types::Header};

    use super::*;

    fn block(number: BlockNumber, transactions: BlockTransactions<u64>) -> Block<u64, Header> {
        let inner = alloy::consensus::Header { number, ..Default::default() };
        Block {
            header: Header { hash: B256::ZERO, inner, total_difficulty: None, size: None },
            uncles: Vec::new(),
            transactions,
            withdrawals: None,
        }
    }

    #[test]
    fn block_reference_conversions() {
        assert_eq!(BlockReference::from(7), BlockReference::Number(7));
        assert_eq!(BlockReference::from(BlockTag::Latest), BlockReference::LATEST);
        assert_eq!(BlockNumberOrTag::from(BlockReference::Number(7)), BlockNumberOrTag::Number(7));
        assert_eq!(
            BlockNumberOrTag::from(BlockReference::Tag(BlockTag::Pending)),
            BlockNumberOrTag::Pending
        );
        assert_eq!(
            BlockReference::try_from(BlockNumberOrTag::Earliest).unwrap(),
            BlockReference::Tag(BlockTag::Earliest)
        );
        assert!(matches!(
            BlockReference::try_from(BlockNumberOrTag::Finalized),
            Err(FeedError::UnsupportedBlockTag(BlockNumberOrTag::Finalized))
        ));
        assert_eq!(BlockReference::LATEST.as_number(), None);
        assert_eq!(BlockReference::Number(3).as_number(), Some(3));
    }

    #[test]
    fn full_block_yields_transactions_in_order() {
        let block = block(4, BlockTransactions::Full(vec![10, 11, 12]));

        assert_eq!(block.number(), 4);
        assert_eq!(block.into_transactions().unwrap(), vec![10, 11, 12]);
    }

    #[test]
    fn hash_only_block_is_reported_as_missing_bodies() {
        let block = block(9, BlockTransactions::Hashes(vec![B256::repeat_byte(1)]));

        assert!(matches!(
            block.into_transactions(),
            Err(FeedError::MissingTransactionBodies { block: 9 })
        ));
    }

    #[test]
    fn empty_and_uncle_blocks_have_no_transactions() {
        assert!(block(1, BlockTransactions::Hashes(vec![])).into_transactions().unwrap().is_empty());
        assert!(block(2, BlockTransactions::Uncle).into_transactions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn try_stream_reports_closed_channel() {
        let (tx, rx) = mpsc::channel::<FeedResult<u64>>(1);

        assert!(tx.try_stream(Ok(1)).await);
        drop(rx);
        assert!(!tx.try_stream(Err(FeedError::Timeout)).await);
    }
}
