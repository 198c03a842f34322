use std::{fmt::Debug, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, Network},
    primitives::{B256, U256},
    providers::{Provider, RootProvider},
    rpc::{json_rpc::RpcRecv, types::Filter as LogFilterSpec},
    transports::TransportResult,
};
use tokio::time::timeout;
use tracing::{debug, error, trace};

use crate::{
    BlockReference, ChainBlock, FeedError,
    rpc::{BlockFilter, ChainRpc, Error, LogFilter, PendingTransactionFilter},
};

/// Alloy provider wrapper that bounds every call with a timeout.
///
/// Failed calls are logged and returned as-is; retry policy belongs to the caller.
#[derive(Clone, Debug)]
pub struct RpcProvider<N: Network = Ethereum> {
    pub(crate) provider: RootProvider<N>,
    pub(crate) call_timeout: Duration,
}

impl<N: Network> RpcProvider<N> {
    /// Get a reference to the wrapped provider
    #[must_use]
    pub fn inner(&self) -> &RootProvider<N> {
        &self.provider
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Fetch a block by [`BlockNumberOrTag`].
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn get_block_by_number(
        &self,
        number: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<N::BlockResponse, Error> {
        trace!(block = %number, full_transactions, "eth_getBlockByNumber called");
        let result = self
            .call(move |provider| async move {
                let request = provider.get_block_by_number(number);
                if full_transactions { request.full().await } else { request.hashes().await }
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, block = %number, "eth_getBlockByNumber failed");
        }

        result?.ok_or_else(|| Error::BlockNotFound(number.into()))
    }

    /// Fetch a block by hash.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> Result<N::BlockResponse, Error> {
        trace!(%hash, full_transactions, "eth_getBlockByHash called");
        let result = self
            .call(move |provider| async move {
                let request = provider.get_block_by_hash(hash);
                if full_transactions { request.full().await } else { request.hashes().await }
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, %hash, "eth_getBlockByHash failed");
        }

        result?.ok_or_else(|| Error::BlockNotFound(hash.into()))
    }

    /// Fetch a transaction by hash. Unknown hashes yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<N::TransactionResponse>, Error> {
        trace!(%hash, "eth_getTransactionByHash called");
        let result = self
            .call(move |provider| async move { provider.get_transaction_by_hash(hash).await })
            .await;
        if let Err(e) = &result {
            error!(error = %e, %hash, "eth_getTransactionByHash failed");
        }
        result
    }

    /// Install a new-block filter and return its id.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn new_block_filter(&self) -> Result<U256, Error> {
        debug!("eth_newBlockFilter called");
        self.call(|provider| async move { provider.new_block_filter().await }).await
    }

    /// Install a pending-transaction filter (hashes only) and return its id.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn new_pending_transactions_filter(&self) -> Result<U256, Error> {
        debug!("eth_newPendingTransactionFilter called");
        self.call(|provider| async move { provider.new_pending_transactions_filter(false).await })
            .await
    }

    /// Install a log filter and return its id.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn new_log_filter(&self, spec: &LogFilterSpec) -> Result<U256, Error> {
        debug!(?spec, "eth_newFilter called");
        self.call(move |provider| async move { provider.new_filter(spec).await }).await
    }

    /// Fetch everything the filter observed since the previous call.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn get_filter_changes<R: RpcRecv>(&self, id: U256) -> Result<Vec<R>, Error> {
        trace!(%id, "eth_getFilterChanges called");
        let result = self
            .call(move |provider| async move { provider.get_filter_changes::<R>(id).await })
            .await;
        if let Err(e) = &result {
            error!(error = %e, %id, "eth_getFilterChanges failed");
        }
        result
    }

    /// Remove a filter from the node.
    ///
    /// # Errors
    ///
    /// See [call errors](#call-errors).
    pub async fn uninstall_filter(&self, id: U256) -> Result<bool, Error> {
        debug!(%id, "eth_uninstallFilter called");
        self.call(move |provider| async move { provider.uninstall_filter(id).await }).await
    }

    /// Execute `operation` against the wrapped provider within `call_timeout`.
    ///
    /// # Errors
    /// <a name="call-errors"></a>
    ///
    /// * [`Error::Timeout`] if the call does not complete within `call_timeout`.
    /// * [`Error::RpcError`] for any transport or node error.
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(RootProvider<N>) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        timeout(self.call_timeout, operation(self.provider.clone())).await?.map_err(Error::from)
    }
}

impl<N: Network> ChainRpc for RpcProvider<N>
where
    N::BlockResponse: ChainBlock<Transaction = N::TransactionResponse>,
    N::TransactionResponse: Clone + Debug + Send + Sync + 'static,
{
    type Block = N::BlockResponse;
    type Transaction = N::TransactionResponse;
    type BlockFilter = BlockFilter<N>;
    type PendingTransactionFilter = PendingTransactionFilter<N>;
    type LogFilter = LogFilter<N>;

    async fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> Result<Self::Block, FeedError> {
        Ok(RpcProvider::get_block_by_hash(self, hash, full_transactions).await?)
    }

    async fn get_block_by_number(
        &self,
        number: BlockReference,
        full_transactions: bool,
    ) -> Result<Self::Block, FeedError> {
        Ok(RpcProvider::get_block_by_number(self, number.into(), full_transactions).await?)
    }

    async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<Self::Transaction>, FeedError> {
        Ok(RpcProvider::get_transaction_by_hash(self, hash).await?)
    }

    fn block_filter(&self) -> Self::BlockFilter {
        BlockFilter::new(self.clone())
    }

    fn pending_transaction_filter(&self) -> Self::PendingTransactionFilter {
        PendingTransactionFilter::new(self.clone())
    }

    fn log_filter(&self, spec: &LogFilterSpec) -> Self::LogFilter {
        LogFilter::new(self.clone(), spec.clone())
    }
}
