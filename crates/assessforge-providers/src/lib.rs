//! assessforge-providers — Upload, submission and draft-storage collaborators.
//!
//! Implements the core's `Uploader`, `Submitter` and `KeyValueStore` traits
//! for an HTTP backend, a local draft directory, and in-memory mocks.

pub mod config;
pub mod error;
pub mod file_store;
pub mod http;
pub mod mock;

pub use config::{
    create_submitter, create_uploader, load_config, load_config_from, AssessforgeConfig,
    BackendConfig,
};
pub use error::CollaboratorError;
pub use file_store::FileStore;
pub use http::HttpBackend;
