//! Block-Feed turns a polling EVM JSON-RPC client into composable block, transaction and log
//! streams.
//!
//! The main entry point is [`BlockFeed`], built via [`BlockFeedBuilder`] over anything that
//! implements [`ChainRpc`] (usually [`rpc::RpcProvider`]).
//!
//! It offers three kinds of streams:
//!
//! - **Live** streams polled from node filters: [`BlockFeed::new_block_hashes`],
//!   [`BlockFeed::new_pending_transaction_hashes`], [`BlockFeed::logs`], and the derived
//!   [`BlockFeed::blocks`], [`BlockFeed::transactions`] and [`BlockFeed::pending_transactions`].
//! - **Replay** of a closed block range: [`BlockFeed::replay_blocks`] and
//!   [`BlockFeed::replay_transactions`].
//! - **Catch-up**: replay from a start block up to the chain head, repeated until the head is
//!   reached, then switch to another stream: [`BlockFeed::catch_up_to_latest_blocks_then`] and the
//!   compositions built on it.
//!
//! # Laziness and cancellation
//!
//! Every constructor returns a [`FeedStream`] immediately, without any I/O. Block references are
//! resolved and filters are installed when the stream is first polled. Dropping a stream stops its
//! filter polling; a poll already in flight completes and its result is discarded.
//!
//! [`BlockFeed::subscribe`] drives a stream on the feed's scheduler and returns a [`Subscription`]
//! that can be cancelled explicitly.
//!
//! # Ordering
//!
//! Within one stream items are yielded in the order they are discovered or fetched. Replay and
//! catch-up fetch one block at a time, in height order. There is no ordering across streams: two
//! live streams each own their filter and their poll cadence.
//!
//! # Errors
//!
//! Failures are yielded as a single `Err(`[`FeedError`]`)` item that ends the stream. Nothing is
//! retried; callers that want to resume subscribe again from the last height they processed.
//! A pending transaction hash the node no longer knows is skipped, not reported.
//!
//! # Backpressure
//!
//! Every internal channel is bounded by [`BlockFeedBuilder::buffer_capacity`]. A consumer that
//! falls behind makes the poll loop wait instead of growing a queue.
//!
//! # Reorgs
//!
//! Chain reorganizations are not detected. Catch-up assumes the head never moves backwards.

pub mod rpc;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod block_feed;
mod error;
mod filter;
mod subscription;
mod types;

pub use block_feed::{
    BlockFeed, BlockFeedBuilder, DEFAULT_POLL_INTERVAL, DEFAULT_STREAM_BUFFER_CAPACITY,
    block_to_transactions, flatten_transactions,
};
pub use error::FeedError;
pub use filter::{Filter, FilterPoller};
pub use rpc::ChainRpc;
pub use subscription::Subscription;
pub use types::{BlockReference, BlockTag, ChainBlock, FeedResult, FeedStream, ReplayOrder};
