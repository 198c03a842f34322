use std::time::Duration;

use alloy::network::Network;
use tracing::{debug, info};

use crate::rpc::{IntoRootProvider, RpcProvider};

/// Default timeout applied to every call made through [`RpcProvider`].
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for constructing an [`RpcProvider`].
pub struct RpcProviderBuilder<N: Network, P: IntoRootProvider<N>> {
    provider: P,
    call_timeout: Duration,
    _network: std::marker::PhantomData<N>,
}

impl<N: Network, P: IntoRootProvider<N>> RpcProviderBuilder<N, P> {
    /// Create a new builder with default settings.
    ///
    /// Any type implementing [`IntoRootProvider`] can be used.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider, call_timeout: DEFAULT_CALL_TIMEOUT, _network: std::marker::PhantomData }
    }

    /// Set the maximum time a single RPC call may take.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Build the `RpcProvider`.
    #[must_use]
    pub fn build(self) -> RpcProvider<N> {
        debug!(call_timeout_ms = self.call_timeout.as_millis(), "Building RpcProvider");

        let provider = self.provider.into_root_provider();

        info!("RpcProvider initialized");

        RpcProvider { provider, call_timeout: self.call_timeout }
    }
}
