use alloy::primitives::BlockNumber;
use async_stream::stream;
use tokio_stream::Stream;
use tracing::debug;

use crate::{
    BlockReference, FeedError, ReplayOrder,
    block_feed::{BlockFeed, flatten_transactions, resolve},
    rpc::ChainRpc,
    types::{FeedResult, FeedStream, boxed},
};

impl<R: ChainRpc> BlockFeed<R> {
    /// Replays the closed range `[start, end]`, one block per height, in `order`.
    ///
    /// Both references are resolved once, when the stream is first polled. Heights are fetched one
    /// at a time, each only after the previous one has been yielded. A failed fetch ends the
    /// stream.
    ///
    /// A range whose resolved start is above its resolved end yields
    /// [`FeedError::InvalidBlockRange`].
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn replay_blocks(
        &self,
        start: impl Into<BlockReference>,
        end: impl Into<BlockReference>,
        full_transactions: bool,
        order: ReplayOrder,
    ) -> FeedStream<R::Block> {
        let rpc = self.rpc.clone();
        let (start, end) = (start.into(), end.into());

        boxed(stream! {
            let range = tokio::try_join!(resolve(&rpc, start), resolve(&rpc, end));
            let (start, end) = match range {
                Ok((start, end)) if start > end => {
                    yield Err(FeedError::InvalidBlockRange { start, end });
                    return;
                }
                Ok(range) => range,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            for await block in replay_range(rpc, start, end, full_transactions, order) {
                yield block;
            }
        })
    }

    /// Transactions of every block in `[start, end]`, ascending.
    pub fn replay_transactions(
        &self,
        start: impl Into<BlockReference>,
        end: impl Into<BlockReference>,
    ) -> FeedStream<R::Transaction> {
        flatten_transactions(self.replay_blocks(start, end, true, ReplayOrder::Ascending))
    }
}

/// Fetches every height of `[start, end]` in `order`, stopping after the first failure.
///
/// An empty range (`start > end`) yields nothing.
pub(crate) fn replay_range<R: ChainRpc>(
    rpc: R,
    start: BlockNumber,
    end: BlockNumber,
    full_transactions: bool,
    order: ReplayOrder,
) -> impl Stream<Item = FeedResult<R::Block>> + Send + 'static {
    stream! {
        debug!(start, end, ?order, "Replaying block range");
        let heights: Box<dyn Iterator<Item = BlockNumber> + Send> = match order {
            ReplayOrder::Ascending => Box::new(start..=end),
            ReplayOrder::Descending => Box::new((start..=end).rev()),
        };

        for height in heights {
            let block =
                rpc.get_block_by_number(BlockReference::Number(height), full_transactions).await;
            let is_err = block.is_err();
            yield block;
            if is_err {
                debug!(height, "Replay stopped at failed height");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use crate::{
        BlockTag, assert_closed, assert_heights, assert_next_err,
        test_utils::{MockChain, mock_feed},
    };

    use super::*;

    #[tokio::test]
    async fn ascending_replay_covers_the_closed_range() {
        let chain = MockChain::new(100);
        let feed = mock_feed(chain.clone());

        let mut stream = feed.replay_blocks(3, 7, false, ReplayOrder::Ascending);

        assert_heights!(stream, [3, 4, 5, 6, 7]);
        assert_closed!(stream);
        assert_eq!(chain.requested_heights(), vec![3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn descending_replay_walks_backwards() {
        let chain = MockChain::new(100);
        let feed = mock_feed(chain.clone());

        let mut stream = feed.replay_blocks(3, 7, false, ReplayOrder::Descending);

        assert_heights!(stream, [7, 6, 5, 4, 3]);
        assert_closed!(stream);
    }

    #[tokio::test]
    async fn single_height_range() {
        let feed = mock_feed(MockChain::new(10));

        let mut stream = feed.replay_blocks(4, 4, true, ReplayOrder::Descending);

        assert_heights!(stream, [4]);
        assert_closed!(stream);
    }

    #[tokio::test]
    async fn fault_stops_the_replay_at_that_height() {
        let chain = MockChain::new(100);
        chain.fail_at(5);
        let feed = mock_feed(chain.clone());

        let mut stream = feed.replay_blocks(3, 7, false, ReplayOrder::Ascending);

        assert_heights!(stream, [3, 4]);
        assert_next_err!(stream, FeedError::RpcError(MockChain::injected_fault()));
        assert_closed!(stream);
        assert_eq!(chain.requested_heights(), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn fault_in_descending_replay() {
        let chain = MockChain::new(100);
        chain.fail_at(5);
        let feed = mock_feed(chain.clone());

        let mut stream = feed.replay_blocks(3, 7, false, ReplayOrder::Descending);

        assert_heights!(stream, [7, 6]);
        assert_next_err!(stream, FeedError::RpcError(MockChain::injected_fault()));
        assert_closed!(stream);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let chain = MockChain::new(100);
        let feed = mock_feed(chain.clone());

        let mut stream = feed.replay_blocks(7, 3, false, ReplayOrder::Descending);

        assert_next_err!(stream, FeedError::InvalidBlockRange { start: 7, end: 3 });
        assert_closed!(stream);
        assert!(chain.requested_heights().is_empty());
    }

    #[tokio::test]
    async fn tags_are_resolved_once() {
        let chain = MockChain::new(4);
        chain.grow_head(1, 100);
        let feed = mock_feed(chain.clone());

        let mut stream =
            feed.replay_blocks(BlockTag::Earliest, BlockReference::LATEST, false, ReplayOrder::Ascending);

        assert_heights!(stream, [0, 1, 2, 3, 4]);
        assert_closed!(stream);
        assert_eq!(chain.head_queries(), 1);
    }

    #[tokio::test]
    async fn resolution_failure_is_the_only_item() {
        let chain = MockChain::new(100);
        chain.fail_head_queries(true);
        let feed = mock_feed(chain.clone());

        let mut stream =
            feed.replay_blocks(0, BlockReference::LATEST, false, ReplayOrder::Ascending);

        assert_next_err!(stream, FeedError::RpcError(MockChain::injected_fault()));
        assert_closed!(stream);
        assert!(chain.requested_heights().is_empty());
    }

    #[tokio::test]
    async fn replay_transactions_flattens_in_order() -> anyhow::Result<()> {
        let chain = MockChain::new(10);
        chain.set_transaction_count(1, 2);
        chain.set_transaction_count(3, 1);
        let feed = mock_feed(chain.clone());

        let transactions = feed
            .replay_transactions(1, 3)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(
            transactions,
            vec![chain.transaction(1, 0), chain.transaction(1, 1), chain.transaction(3, 0)]
        );
        Ok(())
    }
}
