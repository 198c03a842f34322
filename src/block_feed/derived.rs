use async_stream::stream;
use tokio_stream::Stream;

use crate::{
    ChainBlock, FeedError,
    types::{FeedResult, FeedStream, boxed},
};

/// Returns the transactions of `block` in block order.
///
/// # Errors
///
/// [`FeedError::MissingTransactionBodies`] if the node returned transaction hashes where full
/// transactions were expected. The node has to be resynchronized; this is not retried.
pub fn block_to_transactions<B: ChainBlock>(block: B) -> Result<Vec<B::Transaction>, FeedError> {
    block.into_transactions()
}

/// Flattens a block stream into the transactions of each block.
///
/// Block order and in-block order are both preserved. Blocks without transactions contribute
/// nothing.
pub fn flatten_transactions<B, S>(blocks: S) -> FeedStream<B::Transaction>
where
    B: ChainBlock,
    S: Stream<Item = FeedResult<B>> + Send + 'static,
{
    boxed(stream! {
        for await block in blocks {
            match block.and_then(block_to_transactions) {
                Ok(transactions) => {
                    for transaction in transactions {
                        yield Ok(transaction);
                    }
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }
    })
}
