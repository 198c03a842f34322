//! Replays the last few blocks of a node, then keeps printing new ones as they are produced.
//!
//! ```text
//! RPC_URL=http://localhost:8545 RUST_LOG=block_feed=debug cargo run --example catch_up_and_follow
//! ```

use std::time::Duration;

use alloy::providers::ProviderBuilder;
use block_feed::{BlockFeedBuilder, rpc::RpcProviderBuilder};
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const BACKLOG: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let url = std::env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_owned());
    let provider = ProviderBuilder::new().connect(&url).await?;
    let rpc = RpcProviderBuilder::new(provider).call_timeout(Duration::from_secs(10)).build();
    let feed = BlockFeedBuilder::new().buffer_capacity(1_024).build(rpc)?;

    let head = feed.resolve(block_feed::BlockTag::Latest).await?;
    let start = head.saturating_sub(BACKLOG);
    info!(start, head, "Catching up, then following new blocks");

    let mut subscription = feed.subscribe(feed.catch_up_to_latest_and_subscribe_to_new_blocks(
        start,
        false,
        Duration::from_secs(2),
    ));

    while let Some(block) = subscription.next().await {
        match block {
            Ok(block) => {
                info!(
                    number = block.header.number,
                    hash = %block.header.hash,
                    transactions = block.transactions.len(),
                    "Block"
                );
            }
            Err(e) => {
                error!("Stream ended with an error: {e}");
                break;
            }
        }
    }

    Ok(())
}
