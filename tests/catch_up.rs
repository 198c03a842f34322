mod common;

use std::collections::BTreeSet;

use block_feed::{
    FeedError, FeedResult, assert_closed, assert_heights, assert_next, assert_next_err,
    test_utils::{MockBlock, MockChain},
};
use common::{POLL_INTERVAL, setup};
use tokio_stream::{StreamExt, iter};

#[tokio::test]
async fn static_head_is_replay_then_continuation() {
    let (chain, feed) = setup(8);
    let continuation: Vec<FeedResult<MockBlock>> =
        vec![Ok(chain.block(100, false)), Ok(chain.block(101, false))];

    let mut stream = feed.catch_up_to_latest_blocks_then(3, false, iter(continuation));

    assert_heights!(stream, [3, 4, 5, 6, 7, 8, 100, 101]);
    assert_closed!(stream);
}

#[tokio::test]
async fn growing_head_is_absorbed_without_gaps_or_duplicates() -> anyhow::Result<()> {
    let (chain, feed) = setup(10);
    chain.grow_head(3, 40);

    let heights = feed
        .catch_up_to_latest_blocks(2, false)
        .map(|block| block.map(|block| block.number))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(heights, (2..=40).collect::<Vec<_>>());
    assert_eq!(heights.iter().collect::<BTreeSet<_>>().len(), heights.len());
    Ok(())
}

#[tokio::test]
async fn continuation_is_not_touched_while_catching_up() {
    let (chain, feed) = setup(4);

    let mut stream =
        feed.catch_up_to_latest_and_subscribe_to_new_blocks(2, false, POLL_INTERVAL);

    assert_heights!(stream, [2, 3, 4]);
    assert_eq!(chain.filter_installs(), 0);
}

#[tokio::test]
async fn catch_up_then_follow_new_blocks() -> anyhow::Result<()> {
    let (chain, feed) = setup(4);

    let mut subscription = feed
        .subscribe(feed.catch_up_to_latest_and_subscribe_to_new_blocks(2, false, POLL_INTERVAL));

    assert_heights!(subscription, [2, 3, 4]);
    chain.filters_installed(1).await;

    chain.announce_block(5);
    assert_next!(subscription, chain.block(5, false));
    chain.announce_block(6);
    assert_next!(subscription, chain.block(6, false));
    Ok(())
}

#[tokio::test]
async fn announced_backlog_is_not_repeated_after_the_hand_off() -> anyhow::Result<()> {
    let (chain, feed) = setup(0);
    for number in 1..=4 {
        chain.announce_block(number);
    }

    let mut subscription = feed
        .subscribe(feed.catch_up_to_latest_and_subscribe_to_new_blocks(2, false, POLL_INTERVAL));

    assert_heights!(subscription, [2, 3, 4]);
    chain.filters_installed(1).await;
    // let the live filter poll a few times before anything new is announced
    tokio::time::sleep(POLL_INTERVAL * 10).await;

    chain.announce_block(5);
    chain.announce_block(6);
    assert_heights!(subscription, [5, 6]);
    Ok(())
}

#[tokio::test]
async fn catch_up_then_follow_transactions() -> anyhow::Result<()> {
    let (chain, feed) = setup(2);
    chain.set_transaction_count(1, 1);
    chain.set_transaction_count(2, 2);
    chain.set_transaction_count(3, 1);

    let mut subscription = feed
        .subscribe(feed.catch_up_to_latest_and_subscribe_to_new_transactions(1, POLL_INTERVAL));

    assert_next!(subscription, chain.transaction(1, 0));
    assert_next!(subscription, chain.transaction(2, 0));
    assert_next!(subscription, chain.transaction(2, 1));
    chain.filters_installed(1).await;

    chain.announce_block(3);
    assert_next!(subscription, chain.transaction(3, 0));
    Ok(())
}

#[tokio::test]
async fn one_shot_transaction_backfill_ends_at_the_head() {
    let (chain, feed) = setup(3);
    chain.set_transaction_count(0, 1);
    chain.set_transaction_count(3, 1);

    let mut stream = feed.catch_up_to_latest_transactions(0);

    assert_next!(stream, chain.transaction(0, 0));
    assert_next!(stream, chain.transaction(3, 0));
    assert_closed!(stream);
}

#[tokio::test]
async fn start_beyond_the_head_goes_straight_to_the_continuation() {
    let (chain, feed) = setup(3);

    let mut stream = feed.catch_up_to_latest_blocks(10, true);

    assert_closed!(stream);
    assert!(chain.requested_heights().is_empty());
    assert_eq!(chain.head_queries(), 1);
}

#[tokio::test]
async fn head_lookup_failure_ends_the_stream() {
    let (chain, feed) = setup(3);
    chain.fail_head_queries(true);

    let mut stream =
        feed.catch_up_to_latest_and_subscribe_to_new_blocks(0, true, POLL_INTERVAL);

    assert_next_err!(stream, FeedError::RpcError(MockChain::injected_fault()));
    assert_closed!(stream);
    assert_eq!(chain.filter_installs(), 0);
}
