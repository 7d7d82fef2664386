pub mod broker;
pub mod connection;
pub mod dedup;
pub mod delivery;

pub use broker::NatsBroker;
pub use connection::{connect_with_retry, ConnectOptions};
pub use dedup::DedupCache;
