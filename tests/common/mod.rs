#![allow(dead_code)]

use std::time::Duration;

use alloy::primitives::BlockNumber;
use block_feed::{
    BlockFeed,
    test_utils::{MockChain, mock_feed},
};
use tracing_subscriber::EnvFilter;

pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub fn init_tracing() {
    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn setup(head: BlockNumber) -> (MockChain, BlockFeed<MockChain>) {
    init_tracing();
    let chain = MockChain::new(head);
    let feed = mock_feed(chain.clone());
    (chain, feed)
}

/// Waits until `condition` holds, polling every `POLL_INTERVAL`.
pub async fn eventually(condition: impl Fn() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await?;
    Ok(())
}
