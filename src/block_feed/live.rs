use std::time::Duration;

use alloy::{
    primitives::B256,
    rpc::types::{Filter as LogFilterSpec, Log},
};
use async_stream::stream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    block_feed::{BlockFeed, flatten_transactions},
    filter::{Filter, FilterPoller},
    rpc::ChainRpc,
    types::{FeedStream, boxed},
};

impl<R: ChainRpc> BlockFeed<R> {
    /// Hashes of new blocks, as reported by a block filter polled every `interval`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn new_block_hashes(&self, interval: Duration) -> FeedStream<B256> {
        self.poll(self.rpc.block_filter(), interval)
    }

    /// Hashes of new pending transactions, as reported by a pending transaction filter polled
    /// every `interval`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn new_pending_transaction_hashes(&self, interval: Duration) -> FeedStream<B256> {
        self.poll(self.rpc.pending_transaction_filter(), interval)
    }

    /// Logs matching `filter`, polled every `interval`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn logs(&self, filter: &LogFilterSpec, interval: Duration) -> FeedStream<Log> {
        self.poll(self.rpc.log_filter(filter), interval)
    }

    /// New blocks, each fetched by hash as soon as its hash is reported.
    pub fn blocks(&self, full_transactions: bool, interval: Duration) -> FeedStream<R::Block> {
        let hashes = self.new_block_hashes(interval);
        let rpc = self.rpc.clone();

        boxed(stream! {
            for await hash in hashes {
                let block = match hash {
                    Ok(hash) => rpc.get_block_by_hash(hash, full_transactions).await,
                    Err(err) => Err(err),
                };
                let is_err = block.is_err();
                yield block;
                if is_err {
                    return;
                }
            }
        })
    }

    /// Transactions of new blocks, in block order then in-block order.
    pub fn transactions(&self, interval: Duration) -> FeedStream<R::Transaction> {
        flatten_transactions(self.blocks(true, interval))
    }

    /// New pending transactions.
    ///
    /// A hash the node no longer knows when it is looked up (mined or evicted in between) is
    /// skipped.
    pub fn pending_transactions(&self, interval: Duration) -> FeedStream<R::Transaction> {
        let hashes = self.new_pending_transaction_hashes(interval);
        let rpc = self.rpc.clone();

        boxed(stream! {
            for await hash in hashes {
                let transaction = match hash {
                    Ok(hash) => rpc.get_transaction_by_hash(hash).await.map(|tx| (hash, tx)),
                    Err(err) => Err(err),
                };
                match transaction {
                    Ok((_, Some(transaction))) => yield Ok(transaction),
                    Ok((hash, None)) => debug!(%hash, "Pending transaction no longer known, skipping"),
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        })
    }

    /// Starts `filter` on the first poll of the returned stream and forwards what it reports.
    ///
    /// Dropping the stream cancels the poll loop.
    fn poll<F: Filter>(&self, filter: F, interval: Duration) -> FeedStream<F::Item> {
        let scheduler = self.scheduler.clone();
        let buffer_capacity = self.buffer_capacity;

        boxed(stream! {
            let (sender, mut receiver) = mpsc::channel(buffer_capacity);
            let poller = match FilterPoller::start(filter, &scheduler, interval, sender) {
                Ok(poller) => poller,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            info!(interval_ms = interval.as_millis(), "Live stream started");

            while let Some(item) = receiver.recv().await {
                let is_err = item.is_err();
                yield item;
                if is_err {
                    break;
                }
            }

            poller.cancel();
            info!("Live stream stopped");
        })
    }
}
