// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fallback;
pub mod merger;
pub mod metrics;
pub mod models;
pub mod operations;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod transport;
pub mod version;
