//! Library exports for hopsworks-sdk, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod connection;
pub mod opensearch;
pub mod usage;
pub mod utils;
