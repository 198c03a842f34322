mod common;

use std::sync::{Arc, Mutex, PoisonError};

use block_feed::{
    ReplayOrder,
    test_utils::{MockChain, mock_feed},
};
use common::POLL_INTERVAL;
use tracing::{Subscriber, span};
use tracing_subscriber::{
    Layer, Registry,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
};

#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

impl SpanNames {
    fn recorded(&self) -> Vec<&'static str> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<S> Layer<S> for SpanNames
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, _id: &span::Id, _ctx: Context<'_, S>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(attrs.metadata().name());
    }
}

#[tokio::test]
async fn stream_constructors_open_trace_spans() {
    let names = SpanNames::default();
    let subscriber = Registry::default().with(names.clone());
    let feed = mock_feed(MockChain::new(5));

    tracing::subscriber::with_default(subscriber, || {
        let _replay = feed.replay_blocks(1, 2, false, ReplayOrder::Ascending);
        let _catch_up = feed.catch_up_to_latest_blocks(1, false);
        let _hashes = feed.new_block_hashes(POLL_INTERVAL);
        let _pending = feed.new_pending_transaction_hashes(POLL_INTERVAL);
    });

    let recorded = names.recorded();
    for name in [
        "replay_blocks",
        "catch_up_to_latest_blocks_then",
        "new_block_hashes",
        "new_pending_transaction_hashes",
    ] {
        assert!(recorded.contains(&name), "no span for {name} in {recorded:?}");
    }
}
