use std::time::Duration;

use alloy::primitives::BlockNumber;
use tokio_stream::{Stream, StreamExt};

use crate::{ChainBlock, types::FeedResult};

#[macro_export]
macro_rules! assert_next {
    // 1. Explicit Error Matching (Value based) - uses the PartialEq implementation on Result
    ($stream: expr, Err($expected_err:expr)) => {
        $crate::assert_next!($stream, Err($expected_err), timeout = 5)
    };
    ($stream: expr, Err($expected_err:expr), timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        if let Some(msg) = message {
            let expected = &$expected_err;
            assert_eq!(&msg, expected, "Expected error {:?}, got {:?}", expected, msg);
        } else {
            panic!("Expected error {:?}, but channel was closed", $expected_err);
        }
    };

    // 2. Success Matching (Implicit unwrapping)
    ($stream: expr, $expected: expr) => {
        $crate::assert_next!($stream, $expected, timeout = 5)
    };
    ($stream: expr, $expected: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        let expected = $expected;
        match message {
            std::option::Option::Some(std::result::Result::Ok(msg)) => {
                assert_eq!(msg, expected, "Expected {:?}, got {:?}", expected, msg);
            }
            std::option::Option::Some(std::result::Result::Err(e)) => {
                panic!("Expected Ok({:?}), got Err({:?})", expected, e);
            }
            std::option::Option::None => {
                panic!("Expected Ok({:?}), but channel was closed", expected);
            }
        }
    };
}

/// Asserts that the next item is an error of the same variant as the given
/// [`FeedError`](crate::FeedError). Fields are not compared.
#[macro_export]
macro_rules! assert_next_err {
    ($stream: expr, $expected_err: expr) => {
        $crate::assert_next!($stream, Err($expected_err), timeout = 5)
    };
    ($stream: expr, $expected_err: expr, timeout = $secs: expr) => {
        $crate::assert_next!($stream, Err($expected_err), timeout = $secs)
    };
}

#[macro_export]
macro_rules! assert_closed {
    ($stream: expr) => {
        $crate::assert_closed!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        assert!(message.is_none(), "Expected closed stream, got {:?}", message)
    };
}

/// Asserts that the next blocks of a stream have exactly the given heights, in order.
///
/// # Examples
///
/// ```ignore
/// # use block_feed::{ReplayOrder, assert_heights, test_utils::{MockChain, mock_feed}};
/// # async fn example() {
/// let feed = mock_feed(MockChain::new(10));
/// let mut stream = feed.replay_blocks(3, 5, false, ReplayOrder::Descending);
///
/// assert_heights!(stream, [5, 4, 3]);
/// # }
/// ```
///
/// # Panics
///
/// * **Timeout**: a block does not arrive within the timeout (default 5 seconds, configurable via
///   `timeout = N`).
/// * **Wrong height**: the heights differ from the expected ones.
/// * **Error or close**: the stream yields an error or ends before all heights are seen.
#[macro_export]
macro_rules! assert_heights {
    ($stream: expr, $heights: expr) => {
        $crate::assert_heights!($stream, $heights, timeout = 5)
    };
    ($stream: expr, $heights: expr, timeout = $secs: expr) => {
        let expected: std::vec::Vec<u64> = $heights.into_iter().collect();
        let actual =
            $crate::test_utils::macros::next_heights(&mut $stream, expected.len(), $secs).await;
        assert_eq!(actual, expected, "Unexpected block heights");
    };
}

#[allow(clippy::missing_panics_doc)]
pub async fn next_heights<S, B>(stream: &mut S, count: usize, timeout_secs: u64) -> Vec<BlockNumber>
where
    S: Stream<Item = FeedResult<B>> + Unpin,
    B: ChainBlock,
{
    let timeout_duration = Duration::from_secs(timeout_secs);
    let mut heights = Vec::with_capacity(count);
    while heights.len() < count {
        let message = tokio::time::timeout(timeout_duration, stream.next()).await.unwrap_or_else(
            |_| panic!("Timed out waiting for block, received heights so far: {heights:?}"),
        );
        match message {
            Some(Ok(block)) => heights.push(block.number()),
            Some(Err(e)) => panic!("Expected block, got Err({e:?}) after heights {heights:?}"),
            None => panic!("Stream closed after heights {heights:?}"),
        }
    }
    heights
}
