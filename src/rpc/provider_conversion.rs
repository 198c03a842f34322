use alloy::{
    network::{Ethereum, Network},
    providers::{
        Provider, RootProvider,
        fillers::{FillProvider, TxFiller},
    },
};

use crate::rpc::RpcProvider;

/// Alloy providers an [`RpcProvider`] can be built over.
///
/// Only the root transport is kept. Fillers only matter when sending transactions, and the feed
/// never sends any.
pub trait IntoRootProvider<N: Network = Ethereum> {
    fn into_root_provider(self) -> RootProvider<N>;
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    fn into_root_provider(self) -> RootProvider<N> {
        self
    }
}

/// What [`ProviderBuilder::connect`](alloy::providers::ProviderBuilder::connect) returns.
impl<F, P, N> IntoRootProvider<N> for FillProvider<F, P, N>
where
    F: TxFiller<N>,
    P: Provider<N>,
    N: Network,
{
    fn into_root_provider(self) -> RootProvider<N> {
        self.root().clone()
    }
}

/// Rebuilding an [`RpcProvider`] reuses its connection, e.g. to change the call timeout.
impl<N: Network> IntoRootProvider<N> for RpcProvider<N> {
    fn into_root_provider(self) -> RootProvider<N> {
        self.provider
    }
}
