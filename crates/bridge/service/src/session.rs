use derive_more::Display;

/// The parts of a miner session the node needs to build a block template for it.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{remote_app}@{wallet_addr}")]
pub struct SessionContext {
    /// Payout address of the miner.
    pub wallet_addr: String,
    /// Name of the mining software reported by the miner.
    pub remote_app: String,
}

impl SessionContext {
    /// Creates a new [`SessionContext`].
    pub fn new(wallet_addr: impl Into<String>, remote_app: impl Into<String>) -> Self {
        Self { wallet_addr: wallet_addr.into(), remote_app: remote_app.into() }
    }

    /// The extra data string attached to block templates built for this session.
    pub fn client_description(&self) -> String {
        format!("'{}' via stratum-bridge_{}", self.remote_app, env!("CARGO_PKG_VERSION"))
    }
}
