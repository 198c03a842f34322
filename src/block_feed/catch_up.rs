use std::time::Duration;

use async_stream::stream;
use tokio_stream::Stream;
use tracing::{debug, info};

use crate::{
    BlockReference, ReplayOrder,
    block_feed::{BlockFeed, failed, flatten_transactions, replay::replay_range, resolve},
    filter::check_interval,
    rpc::ChainRpc,
    types::{FeedResult, FeedStream, boxed},
};

impl<R: ChainRpc> BlockFeed<R> {
    /// Replays from `start` up to the chain head, then yields everything `continuation` yields.
    ///
    /// The head is read again after every replayed range: blocks produced during the replay are
    /// replayed in the next round, starting right after the previous head. Once `start` is past
    /// the head the stream switches to `continuation`, which is not polled before that.
    ///
    /// The head is assumed to never move backwards.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn catch_up_to_latest_blocks_then<S>(
        &self,
        start: impl Into<BlockReference>,
        full_transactions: bool,
        continuation: S,
    ) -> FeedStream<R::Block>
    where
        S: Stream<Item = FeedResult<R::Block>> + Send + 'static,
    {
        let rpc = self.rpc.clone();
        let start = start.into();

        boxed(stream! {
            let mut next = match resolve(&rpc, start).await {
                Ok(next) => next,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut rounds = 0u64;
            loop {
                let head = match resolve(&rpc, BlockReference::LATEST).await {
                    Ok(head) => head,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                if next > head {
                    info!(head, rounds, "Caught up to chain head");
                    break;
                }

                rounds += 1;
                debug!(from = next, to = head, round = rounds, "Catching up");
                let backlog =
                    replay_range(rpc.clone(), next, head, full_transactions, ReplayOrder::Ascending);
                for await block in backlog {
                    let is_err = block.is_err();
                    yield block;
                    if is_err {
                        return;
                    }
                }
                let Some(after_head) = head.checked_add(1) else {
                    info!(head, rounds, "Caught up to the highest representable height");
                    break;
                };
                next = after_head;
            }

            for await block in continuation {
                yield block;
            }
        })
    }

    /// Replays from `start` up to the chain head and ends.
    pub fn catch_up_to_latest_blocks(
        &self,
        start: impl Into<BlockReference>,
        full_transactions: bool,
    ) -> FeedStream<R::Block> {
        self.catch_up_to_latest_blocks_then(start, full_transactions, tokio_stream::empty())
    }

    /// Transactions of every block from `start` up to the chain head.
    pub fn catch_up_to_latest_transactions(
        &self,
        start: impl Into<BlockReference>,
    ) -> FeedStream<R::Transaction> {
        flatten_transactions(self.catch_up_to_latest_blocks(start, true))
    }

    /// Replays from `start` up to the chain head, then follows new blocks as they are reported.
    pub fn catch_up_to_latest_and_subscribe_to_new_blocks(
        &self,
        start: impl Into<BlockReference>,
        full_transactions: bool,
        interval: Duration,
    ) -> FeedStream<R::Block> {
        if let Err(err) = check_interval(interval) {
            return failed(err);
        }
        self.catch_up_to_latest_blocks_then(
            start,
            full_transactions,
            self.blocks(full_transactions, interval),
        )
    }

    /// Transactions from `start` up to the chain head, then transactions of new blocks.
    pub fn catch_up_to_latest_and_subscribe_to_new_transactions(
        &self,
        start: impl Into<BlockReference>,
        interval: Duration,
    ) -> FeedStream<R::Transaction> {
        flatten_transactions(self.catch_up_to_latest_and_subscribe_to_new_blocks(
            start, true, interval,
        ))
    }
}
