//! Node client abstraction, connection supervision and sync monitoring for the stratum bridge.

mod types;
pub use types::{
    BlockDagInfo, BlockTemplate, ConnectionState, NetworkHashRate, NewBlockTemplateNotification,
    NodeAddress, NodeInfo,
};

mod error;
pub use error::{ClientError, NodeError};

mod client;
pub use client::{NewBlockTemplateHandler, NodeClient, NodeConnector, NotificationSubscription};

mod ws;
pub use ws::{ClientConfig, WsConnector, WsNodeClient};

mod connection;
pub use connection::{ConnectionSupervisor, ReconnectOutcome};

mod sync;
pub use sync::SyncMonitor;

pub(crate) mod metrics;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
