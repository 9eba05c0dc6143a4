//! Ranked Solana wallet detection.
//!
//! Hosts register one [`WalletProbe`] per wallet they can reach. Probes are
//! kept in [`DEFAULT_RANKING`] order and the first one that detects an
//! available wallet wins.

use std::sync::Arc;

use chain_sol::wallet::SolanaWallet;
use tracing::debug;

/// Preference order when several wallets are available.
pub const DEFAULT_RANKING: [&str; 5] = ["phantom", "solflare", "backpack", "okx", "coinbase"];

/// Detects one wallet adapter.
pub trait WalletProbe: Send + Sync {
    fn kind(&self) -> &str;

    /// The wallet, when it is installed and reachable.
    fn detect(&self) -> Option<Arc<dyn SolanaWallet>>;
}

/// A probe over an adapter the host already holds (or knows is absent).
pub struct StaticProbe {
    kind: String,
    wallet: Option<Arc<dyn SolanaWallet>>,
}

impl StaticProbe {
    pub fn new(kind: impl Into<String>, wallet: Option<Arc<dyn SolanaWallet>>) -> Self {
        Self {
            kind: kind.into(),
            wallet,
        }
    }

    /// A probe for `wallet`, named after its adapter kind.
    pub fn available(wallet: Arc<dyn SolanaWallet>) -> Self {
        Self::new(wallet.kind().to_string(), Some(wallet))
    }
}

impl WalletProbe for StaticProbe {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn detect(&self) -> Option<Arc<dyn SolanaWallet>> {
        self.wallet.clone()
    }
}

fn rank(kind: &str) -> usize {
    DEFAULT_RANKING
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(DEFAULT_RANKING.len())
}

#[derive(Default)]
pub struct ProviderRegistry {
    probes: Vec<Box<dyn WalletProbe>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a probe. Known kinds follow [`DEFAULT_RANKING`]; unknown kinds
    /// go last in registration order.
    pub fn register(&mut self, probe: impl WalletProbe + 'static) {
        let position = self
            .probes
            .iter()
            .position(|p| rank(p.kind()) > rank(probe.kind()))
            .unwrap_or(self.probes.len());
        self.probes.insert(position, Box::new(probe));
    }

    pub fn with_probe(mut self, probe: impl WalletProbe + 'static) -> Self {
        self.register(probe);
        self
    }

    /// Registered kinds in rank order.
    pub fn kinds(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.kind()).collect()
    }

    /// The highest-ranked available wallet.
    pub fn detect(&self) -> Option<Arc<dyn SolanaWallet>> {
        self.probes.iter().find_map(|probe| {
            let wallet = probe.detect();
            debug!(kind = probe.kind(), found = wallet.is_some(), "probed Solana wallet");
            wallet
        })
    }

    /// Every available wallet, in rank order.
    pub fn available(&self) -> Vec<Arc<dyn SolanaWallet>> {
        self.probes.iter().filter_map(|p| p.detect()).collect()
    }

    /// The wallet of a specific kind, if available.
    pub fn find(&self, kind: &str) -> Option<Arc<dyn SolanaWallet>> {
        self.probes
            .iter()
            .filter(|p| p.kind() == kind)
            .find_map(|p| p.detect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::testing::{sol_key, MockSolWallet};

    fn wallet(kind: &str) -> Arc<dyn SolanaWallet> {
        Arc::new(MockSolWallet::new(kind, sol_key(1)))
    }

    #[test]
    fn probes_are_ranked() {
        let registry = ProviderRegistry::new()
            .with_probe(StaticProbe::new("custom", None))
            .with_probe(StaticProbe::new("backpack", None))
            .with_probe(StaticProbe::new("phantom", None))
            .with_probe(StaticProbe::new("solflare", None));
        assert_eq!(registry.kinds(), ["phantom", "solflare", "backpack", "custom"]);
    }

    #[test]
    fn first_available_wins() {
        let registry = ProviderRegistry::new()
            .with_probe(StaticProbe::available(wallet("solflare")))
            .with_probe(StaticProbe::new("phantom", None))
            .with_probe(StaticProbe::available(wallet("backpack")));

        assert_eq!(registry.detect().unwrap().kind(), "solflare");
        assert_eq!(registry.available().len(), 2);
        assert_eq!(registry.find("backpack").unwrap().kind(), "backpack");
        assert!(registry.find("phantom").is_none());
    }

    #[test]
    fn empty_registry_detects_nothing() {
        assert!(ProviderRegistry::new().detect().is_none());
    }
}
