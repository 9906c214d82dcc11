//! REST access to the Hopsworks backend.

pub mod credentials;
pub mod error;
pub mod rest_client;

pub use error::RestApiError;
pub use rest_client::RestClient;
