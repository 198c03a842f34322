use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alloy::{
    eips::BlockId,
    primitives::{B256, BlockNumber, keccak256},
    rpc::types::{Filter as LogFilterSpec, Log},
    transports::{RpcError, TransportErrorKind},
};

use crate::{
    BlockFeed, BlockFeedBuilder, BlockReference, BlockTag, ChainBlock, FeedError, filter::Filter,
    rpc::ChainRpc,
};

/// Transaction served by [`MockChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockTransaction {
    pub hash: B256,
    /// `None` for pending transactions.
    pub block_number: Option<BlockNumber>,
    pub index: u64,
}

/// Block served by [`MockChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockBlock {
    pub number: BlockNumber,
    pub hash: B256,
    /// Whether `transactions` stands for full bodies or only for their hashes.
    pub full_transactions: bool,
    pub transactions: Vec<MockTransaction>,
}

impl ChainBlock for MockBlock {
    type Transaction = MockTransaction;

    fn number(&self) -> BlockNumber {
        self.number
    }

    fn into_transactions(self) -> Result<Vec<MockTransaction>, FeedError> {
        if !self.full_transactions && !self.transactions.is_empty() {
            return Err(FeedError::MissingTransactionBodies { block: self.number });
        }
        Ok(self.transactions)
    }
}

#[derive(Debug, Default)]
struct ChainState {
    head: BlockNumber,
    head_step: u64,
    head_limit: BlockNumber,
    transaction_counts: HashMap<BlockNumber, u64>,
    faults: HashSet<BlockNumber>,
    fail_head_queries: bool,
    fail_filter_polls: bool,
    block_hashes: Vec<B256>,
    pending_hashes: Vec<B256>,
    logs: Vec<Log>,
    pending: HashMap<B256, MockTransaction>,
    rpc_calls: usize,
    head_queries: usize,
    requested_heights: Vec<BlockNumber>,
    filter_installs: usize,
    filter_polls: usize,
    filter_uninstalls: usize,
}

/// In-memory [`ChainRpc`] with a controllable head.
///
/// Blocks `0..=head` exist. Their hashes are derived from their height (see
/// [`block_hash`](Self::block_hash)) and their transaction count defaults to zero.
///
/// Like a node filter, a filter created by the mock reports only items announced after it was
/// installed, each filter through its own cursor.
#[derive(Clone, Debug, Default)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    #[must_use]
    pub fn new(head: BlockNumber) -> Self {
        let state = ChainState { head, head_limit: head, ..Default::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hash of the block at `number`.
    #[must_use]
    pub fn block_hash(number: BlockNumber) -> B256 {
        B256::left_padding_from(&number.to_be_bytes())
    }

    fn block_number_of(hash: B256) -> Option<BlockNumber> {
        let (prefix, suffix) = hash.0.split_at(24);
        if prefix.iter().any(|byte| *byte != 0) {
            return None;
        }
        Some(BlockNumber::from_be_bytes(suffix.try_into().ok()?))
    }

    /// The error returned for injected faults.
    #[must_use]
    pub fn injected_fault() -> Arc<RpcError<TransportErrorKind>> {
        Arc::new(TransportErrorKind::custom_str("injected fault"))
    }

    /// Expected transaction `index` of block `number`.
    #[must_use]
    pub fn transaction(&self, number: BlockNumber, index: u64) -> MockTransaction {
        let mut preimage = number.to_be_bytes().to_vec();
        preimage.extend_from_slice(&index.to_be_bytes());
        MockTransaction { hash: keccak256(preimage), block_number: Some(number), index }
    }

    /// Expected block at `number`, built without any RPC bookkeeping.
    #[must_use]
    pub fn block(&self, number: BlockNumber, full_transactions: bool) -> MockBlock {
        let count = self.state().transaction_counts.get(&number).copied().unwrap_or_default();
        MockBlock {
            number,
            hash: Self::block_hash(number),
            full_transactions,
            transactions: (0..count).map(|index| self.transaction(number, index)).collect(),
        }
    }

    /// Expected pending transaction with `hash`.
    #[must_use]
    pub fn pending_transaction(hash: B256) -> MockTransaction {
        MockTransaction { hash, block_number: None, index: 0 }
    }

    pub fn set_head(&self, head: BlockNumber) {
        let mut state = self.state();
        state.head = head;
        state.head_limit = state.head_limit.max(head);
    }

    /// Makes every "latest" lookup advance the head by `step` after answering, up to `limit`.
    pub fn grow_head(&self, step: u64, limit: BlockNumber) {
        let mut state = self.state();
        state.head_step = step;
        state.head_limit = limit;
    }

    pub fn set_transaction_count(&self, number: BlockNumber, count: u64) {
        self.state().transaction_counts.insert(number, count);
    }

    /// Makes every lookup of the block at `number` fail.
    pub fn fail_at(&self, number: BlockNumber) {
        self.state().faults.insert(number);
    }

    /// Makes every tag lookup fail.
    pub fn fail_head_queries(&self, fail: bool) {
        self.state().fail_head_queries = fail;
    }

    /// Makes every filter poll fail.
    pub fn fail_filter_polls(&self, fail: bool) {
        self.state().fail_filter_polls = fail;
    }

    /// Reports a new block to block filters, raising the head to `number` if needed.
    pub fn announce_block(&self, number: BlockNumber) {
        let mut state = self.state();
        state.head = state.head.max(number);
        state.head_limit = state.head_limit.max(number);
        state.block_hashes.push(Self::block_hash(number));
    }

    /// Reports a pending transaction the node can look up.
    pub fn announce_pending(&self, hash: B256) {
        let mut state = self.state();
        state.pending.insert(hash, Self::pending_transaction(hash));
        state.pending_hashes.push(hash);
    }

    /// Reports a pending transaction hash that is gone by the time it is looked up.
    pub fn announce_dropped_pending(&self, hash: B256) {
        self.state().pending_hashes.push(hash);
    }

    pub fn announce_log(&self, log: Log) {
        self.state().logs.push(log);
    }

    /// Number of block and transaction lookups served so far.
    #[must_use]
    pub fn rpc_calls(&self) -> usize {
        self.state().rpc_calls
    }

    /// Number of "latest" lookups served so far.
    #[must_use]
    pub fn head_queries(&self) -> usize {
        self.state().head_queries
    }

    /// Heights looked up by number, in request order.
    #[must_use]
    pub fn requested_heights(&self) -> Vec<BlockNumber> {
        self.state().requested_heights.clone()
    }

    #[must_use]
    pub fn filter_installs(&self) -> usize {
        self.state().filter_installs
    }

    /// Waits until at least `count` filters have been installed.
    ///
    /// Items announced before a filter is installed are never reported by it, so tests announce
    /// only after this returns.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within five seconds.
    pub async fn filters_installed(&self, count: usize) {
        let installed = tokio::time::timeout(Duration::from_secs(5), async {
            while self.filter_installs() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(
            installed.is_ok(),
            "expected {count} installed filters, got {}",
            self.filter_installs()
        );
    }

    #[must_use]
    pub fn filter_polls(&self) -> usize {
        self.state().filter_polls
    }

    #[must_use]
    pub fn filter_uninstalls(&self) -> usize {
        self.state().filter_uninstalls
    }

    fn lookup_by_number(
        &self,
        reference: BlockReference,
        full_transactions: bool,
    ) -> Result<MockBlock, FeedError> {
        let number = {
            let mut state = self.state();
            state.rpc_calls += 1;
            match reference {
                BlockReference::Number(number) => {
                    state.requested_heights.push(number);
                    if state.faults.contains(&number) {
                        return Err(FeedError::RpcError(Self::injected_fault()));
                    }
                    if number > state.head {
                        return Err(FeedError::BlockNotFound(BlockId::number(number)));
                    }
                    number
                }
                BlockReference::Tag(_) if state.fail_head_queries => {
                    return Err(FeedError::RpcError(Self::injected_fault()));
                }
                BlockReference::Tag(BlockTag::Latest) => {
                    state.head_queries += 1;
                    let head = state.head;
                    if head < state.head_limit {
                        state.head = head.saturating_add(state.head_step).min(state.head_limit);
                    }
                    head
                }
                BlockReference::Tag(BlockTag::Earliest) => 0,
                BlockReference::Tag(BlockTag::Pending) => state.head.saturating_add(1),
            }
        };
        Ok(self.block(number, full_transactions))
    }

    fn lookup_by_hash(&self, hash: B256, full_transactions: bool) -> Result<MockBlock, FeedError> {
        let number = {
            let mut state = self.state();
            state.rpc_calls += 1;
            let number = Self::block_number_of(hash)
                .filter(|number| *number <= state.head)
                .ok_or(FeedError::BlockNotFound(BlockId::hash(hash)))?;
            if state.faults.contains(&number) {
                return Err(FeedError::RpcError(Self::injected_fault()));
            }
            number
        };
        Ok(self.block(number, full_transactions))
    }

    fn lookup_transaction(&self, hash: B256) -> Option<MockTransaction> {
        let mut state = self.state();
        state.rpc_calls += 1;
        state.pending.get(&hash).cloned()
    }

    fn filter<T>(&self, items: fn(&ChainState) -> &[T]) -> MockFilter<T> {
        MockFilter { chain: self.clone(), items, cursor: 0, installed: false }
    }
}

impl ChainRpc for MockChain {
    type Block = MockBlock;
    type Transaction = MockTransaction;
    type BlockFilter = MockFilter<B256>;
    type PendingTransactionFilter = MockFilter<B256>;
    type LogFilter = MockFilter<Log>;

    async fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> Result<MockBlock, FeedError> {
        self.lookup_by_hash(hash, full_transactions)
    }

    async fn get_block_by_number(
        &self,
        number: BlockReference,
        full_transactions: bool,
    ) -> Result<MockBlock, FeedError> {
        self.lookup_by_number(number, full_transactions)
    }

    async fn get_transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<MockTransaction>, FeedError> {
        Ok(self.lookup_transaction(hash))
    }

    fn block_filter(&self) -> MockFilter<B256> {
        self.filter(|state| state.block_hashes.as_slice())
    }

    fn pending_transaction_filter(&self) -> MockFilter<B256> {
        self.filter(|state| state.pending_hashes.as_slice())
    }

    // announced logs are not matched against the criteria
    fn log_filter(&self, _spec: &LogFilterSpec) -> MockFilter<Log> {
        self.filter(|state| state.logs.as_slice())
    }
}

/// Filter over one of [`MockChain`]'s announcement lists.
pub struct MockFilter<T> {
    chain: MockChain,
    items: fn(&ChainState) -> &[T],
    cursor: usize,
    installed: bool,
}

impl<T: Clone> MockFilter<T> {
    fn changes(&mut self) -> Result<Vec<T>, FeedError> {
        let mut state = self.chain.state();
        state.filter_polls += 1;
        if state.fail_filter_polls {
            return Err(FeedError::RpcError(MockChain::injected_fault()));
        }
        let items = (self.items)(&state);
        let changes = items.get(self.cursor..).unwrap_or_default().to_vec();
        self.cursor = items.len();
        Ok(changes)
    }
}

impl<T> Filter for MockFilter<T>
where
    T: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    type Item = T;

    async fn install(&mut self) -> Result<(), FeedError> {
        let mut state = self.chain.state();
        state.filter_installs += 1;
        self.cursor = (self.items)(&state).len();
        self.installed = true;
        Ok(())
    }

    async fn poll_changes(&mut self) -> Result<Vec<T>, FeedError> {
        self.changes()
    }

    async fn uninstall(&mut self) {
        if std::mem::take(&mut self.installed) {
            self.chain.state().filter_uninstalls += 1;
        }
    }
}

/// Builds a feed over `chain` on the current runtime.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
#[must_use]
pub fn mock_feed(chain: MockChain) -> BlockFeed<MockChain> {
    BlockFeedBuilder::new().build(chain).expect("mock feed requires a Tokio runtime")
}
