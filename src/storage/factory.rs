use std::sync::Arc;

use super::client::B2Client;
use super::config::BucketConfig;
use super::error::StorageResult;
use super::provider::B2Api;

/// Factory for creating B2 API backends
pub struct ApiFactory;

impl ApiFactory {
    /// Create the HTTP backend for a configuration.
    ///
    /// No network call is made here; authorization happens lazily on the
    /// first bucket operation.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Credentials are missing from the configuration
    /// * The configured API URL is invalid
    pub fn from_config(config: &BucketConfig) -> StorageResult<Arc<dyn B2Api>> {
        let client = B2Client::new(config.clone())?;
        Ok(Arc::new(client))
    }
}
