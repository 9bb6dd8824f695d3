pub mod cli;
pub mod config;
pub mod connection_pool;
pub mod error;
pub mod load_driver;
pub mod logging;
pub mod message;
pub mod producer_worker;
pub mod stats_collector;
pub mod transport;

pub use error::{LoadError, TransportError, BatchFailure};
