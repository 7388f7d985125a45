use async_trait::async_trait;

/// The [`BridgeActor`] trait is a long running task of the bridge, driven until cancellation.
#[async_trait]
pub trait BridgeActor: Send + 'static {
    /// The error type for the actor.
    type Error: std::fmt::Debug;
    /// Starts the actor.
    async fn start(self) -> Result<(), Self::Error>;
}
