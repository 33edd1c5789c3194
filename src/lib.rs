pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod graphql;
pub mod http_client;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod store;
