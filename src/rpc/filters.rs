use alloy::{
    network::{Ethereum, Network},
    primitives::{B256, U256},
    rpc::{
        json_rpc::RpcRecv,
        types::{Filter as LogFilterSpec, Log},
    },
};
use tracing::{debug, warn};

use crate::{
    FeedError,
    filter::Filter,
    rpc::{Error, RpcProvider},
};

/// Installed node filter id plus the provider it lives on.
#[derive(Debug)]
struct NodeFilter<N: Network> {
    rpc: RpcProvider<N>,
    id: Option<U256>,
}

impl<N: Network> NodeFilter<N> {
    fn new(rpc: RpcProvider<N>) -> Self {
        Self { rpc, id: None }
    }

    fn installed(&mut self, result: Result<U256, Error>) -> Result<(), FeedError> {
        let id = result?;
        debug!(%id, "Node filter installed");
        self.id = Some(id);
        Ok(())
    }

    async fn changes<R: RpcRecv>(&self) -> Result<Vec<R>, FeedError> {
        let Some(id) = self.id else {
            return Ok(Vec::new());
        };
        Ok(self.rpc.get_filter_changes::<R>(id).await?)
    }

    async fn uninstall(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match self.rpc.uninstall_filter(id).await {
            Ok(true) => debug!(%id, "Node filter uninstalled"),
            Ok(false) => debug!(%id, "Node filter was already gone"),
            Err(e) => warn!(error = %e, %id, "Failed to uninstall node filter"),
        }
    }
}

/// `eth_newBlockFilter` backed filter yielding new block hashes.
#[derive(Debug)]
pub struct BlockFilter<N: Network = Ethereum> {
    inner: NodeFilter<N>,
}

impl<N: Network> BlockFilter<N> {
    #[must_use]
    pub fn new(rpc: RpcProvider<N>) -> Self {
        Self { inner: NodeFilter::new(rpc) }
    }
}

impl<N: Network> Filter for BlockFilter<N> {
    type Item = B256;

    async fn install(&mut self) -> Result<(), FeedError> {
        let result = self.inner.rpc.new_block_filter().await;
        self.inner.installed(result)
    }

    async fn poll_changes(&mut self) -> Result<Vec<B256>, FeedError> {
        self.inner.changes::<B256>().await
    }

    async fn uninstall(&mut self) {
        self.inner.uninstall().await;
    }
}

/// `eth_newPendingTransactionFilter` backed filter yielding pending transaction hashes.
#[derive(Debug)]
pub struct PendingTransactionFilter<N: Network = Ethereum> {
    inner: NodeFilter<N>,
}

impl<N: Network> PendingTransactionFilter<N> {
    #[must_use]
    pub fn new(rpc: RpcProvider<N>) -> Self {
        Self { inner: NodeFilter::new(rpc) }
    }
}

impl<N: Network> Filter for PendingTransactionFilter<N> {
    type Item = B256;

    async fn install(&mut self) -> Result<(), FeedError> {
        let result = self.inner.rpc.new_pending_transactions_filter().await;
        self.inner.installed(result)
    }

    async fn poll_changes(&mut self) -> Result<Vec<B256>, FeedError> {
        self.inner.changes::<B256>().await
    }

    async fn uninstall(&mut self) {
        self.inner.uninstall().await;
    }
}

/// `eth_newFilter` backed filter yielding logs matching a criteria.
#[derive(Debug)]
pub struct LogFilter<N: Network = Ethereum> {
    inner: NodeFilter<N>,
    spec: LogFilterSpec,
}

impl<N: Network> LogFilter<N> {
    #[must_use]
    pub fn new(rpc: RpcProvider<N>, spec: LogFilterSpec) -> Self {
        Self { inner: NodeFilter::new(rpc), spec }
    }
}

impl<N: Network> Filter for LogFilter<N> {
    type Item = Log;

    async fn install(&mut self) -> Result<(), FeedError> {
        let result = self.inner.rpc.new_log_filter(&self.spec).await;
        self.inner.installed(result)
    }

    async fn poll_changes(&mut self) -> Result<Vec<Log>, FeedError> {
        self.inner.changes::<Log>().await
    }

    async fn uninstall(&mut self) {
        self.inner.uninstall().await;
    }
}
