//! The node connection and block template feed of the stratum bridge.
//!
//! [`NodeManager`] keeps a synced connection to the node and tells the session layer, through a
//! [`WorkReadyHandler`], whenever fresh work should be handed to miners. Work is announced as
//! soon as the node pushes a new block template notification, and at the latest once the
//! configured maximum work staleness has elapsed.

mod actors;
pub use actors::{
    BlockTemplateFeed, BridgeActor, FeedMode, FeedState, NetworkStatsSample, StatsPoller,
    WorkTrigger,
};

mod config;
pub use config::{BridgeConfig, ConfigError};

mod error;
pub use error::{ManagerError, StatsError};

mod handler;
pub use handler::WorkReadyHandler;

mod manager;
pub use manager::{BlockTemplateSource, NodeManager};

mod metrics;
pub use metrics::Metrics;

mod session;
pub use session::SessionContext;
