use alloy::primitives::BlockNumber;
use tracing::trace;

use crate::{BlockReference, ChainBlock, FeedError, rpc::ChainRpc};

/// Resolves `reference` to a height.
///
/// Concrete heights are returned without any RPC call. Tags cost one header-only block lookup.
pub(crate) async fn resolve<R: ChainRpc>(
    rpc: &R,
    reference: BlockReference,
) -> Result<BlockNumber, FeedError> {
    if let Some(number) = reference.as_number() {
        return Ok(number);
    }
    let block = rpc.get_block_by_number(reference, false).await?;
    let number = block.number();
    trace!(?reference, number, "Resolved block reference");
    Ok(number)
}

#[cfg(test)]
mod tests {
    use crate::{BlockTag, test_utils::MockChain};

    use super::*;

    #[tokio::test]
    async fn concrete_reference_needs_no_rpc_call() -> anyhow::Result<()> {
        let chain = MockChain::new(100);

        for height in [0, 1, 42, 100, 1_000, BlockNumber::MAX] {
            assert_eq!(resolve(&chain, BlockReference::Number(height)).await?, height);
        }
        assert_eq!(chain.rpc_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn tags_are_resolved_with_one_lookup_each() -> anyhow::Result<()> {
        let chain = MockChain::new(100);

        assert_eq!(resolve(&chain, BlockReference::LATEST).await?, 100);
        assert_eq!(resolve(&chain, BlockTag::Earliest.into()).await?, 0);
        assert_eq!(resolve(&chain, BlockTag::Pending.into()).await?, 101);
        assert_eq!(chain.rpc_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_failure_is_returned() {
        let chain = MockChain::new(100);
        chain.fail_head_queries(true);

        let result = resolve(&chain, BlockReference::LATEST).await;

        assert!(matches!(result, Err(FeedError::RpcError(_))));
    }
}
