pub mod opensearch_api;

pub use opensearch_api::{
    OpenSearchApi, OpenSearchConfig, OpenSearchError, OpenSearchHost, ELASTIC_ENDPOINT_ENV_VAR,
};
