//! [BridgeActor] services for the bridge.
//!
//! [BridgeActor]: super::BridgeActor

mod traits;
pub use traits::BridgeActor;

mod feed;
pub use feed::{BlockTemplateFeed, FeedMode, FeedState, WorkTrigger};

mod stats;
pub use stats::{NetworkStatsSample, StatsPoller};
