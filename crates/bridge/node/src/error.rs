use crate::NodeAddress;
use thiserror::Error;

/// Represents errors that can occur while interacting with the node client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An error reported by the JSON-RPC client, either from the transport or from the node.
    #[error(transparent)]
    Client(#[from] jsonrpsee::core::ClientError),

    /// The node address could not be turned into a URL.
    #[error("invalid node address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    /// The client has no open transport.
    #[error("client is disconnected")]
    Disconnected,
}

impl ClientError {
    /// Returns `true` if the error comes from the transport rather than from the node rejecting
    /// a well formed request.
    pub const fn is_connection_error(&self) -> bool {
        match self {
            Self::Client(err) => !matches!(err, jsonrpsee::core::ClientError::Call(_)),
            Self::InvalidAddress(_) | Self::Disconnected => true,
        }
    }
}

/// Errors surfaced by the connection supervisor and the sync monitor.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node could not be reached or the transport could not be re-established.
    #[error("failed to connect to node @ {address}: {source}")]
    Connection {
        /// The address that was dialed.
        address: NodeAddress,
        /// The underlying client error.
        source: ClientError,
    },

    /// A request to the node failed.
    #[error("error fetching server info from node @ {address}: {source}")]
    Rpc {
        /// The address of the node.
        address: NodeAddress,
        /// The underlying client error.
        source: ClientError,
    },

    /// Subscribing to new block template notifications failed.
    #[error("failed to register for block template notifications: {0}")]
    Registration(#[source] ClientError),

    /// The node did not hand out a block template.
    #[error("failed fetching new block template from node: {0}")]
    BlockTemplate(#[source] ClientError),

    /// The supervisor holds no client.
    #[error("node client is not connected")]
    NotConnected,

    /// The operation was interrupted by cancellation.
    #[error("operation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    #[test]
    fn test_call_error_is_not_a_connection_error() {
        let err = ClientError::Client(jsonrpsee::core::ClientError::Call(ErrorObjectOwned::owned(
            -32000,
            "not synced",
            None::<()>,
        )));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_transport_errors_are_connection_errors() {
        assert!(ClientError::Disconnected.is_connection_error());
        assert!(
            ClientError::Client(jsonrpsee::core::ClientError::RequestTimeout).is_connection_error()
        );
    }

    #[test]
    fn test_rpc_error_message_names_the_node() {
        let err = NodeError::Rpc {
            address: NodeAddress::new("localhost:13110"),
            source: ClientError::Disconnected,
        };
        assert_eq!(
            err.to_string(),
            "error fetching server info from node @ localhost:13110: client is disconnected"
        );
    }
}
