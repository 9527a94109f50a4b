// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// Default host used for `b2_authorize_account`
pub const DEFAULT_API_URL: &str = "https://api.backblazeb2.com";

/// Largest page the B2 listing endpoints will return
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Environment variable holding the application key id
pub const ENV_KEY_ID: &str = "B2_ID";

/// Environment variable holding the application key
pub const ENV_KEY: &str = "B2_KEY";

const SECRET_OPTIONS: [&str; 1] = ["key"];

/// Configuration for a bucket handle
///
/// Credentials and tuning knobs are kept in an options map, the same way
/// for every backend, so a config can be built from code, from the
/// environment or deserialized from a file.
///
/// # Examples
///
/// ```
/// use b2_bucket::storage::BucketConfig;
///
/// let config = BucketConfig::new("bucket-demo")
///     .with_option("key_id", "0012345")
///     .with_option("key", "K001secret");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Name of the bucket every operation is scoped to
    pub bucket_name: String,

    /// Backend options
    ///
    /// - key_id: application key id
    /// - key: application key
    /// - api_url: authorization host (default `https://api.backblazeb2.com`)
    /// - timeout: request timeout in seconds (`0` or `disabled` for none)
    /// - connect_timeout: connect timeout in seconds
    /// - page_size: file listing page size (at most 10000)
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl BucketConfig {
    /// Create a configuration for the given bucket with no options set.
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            options: HashMap::new(),
        }
    }

    /// Create a configuration for the given bucket, reading the credentials
    /// from the `B2_ID` and `B2_KEY` environment variables.
    ///
    /// Variables that are not set are simply left out; the error surfaces
    /// when the client is built.
    pub fn from_env(bucket_name: impl Into<String>) -> Self {
        let mut config = Self::new(bucket_name);
        if let Ok(key_id) = std::env::var(ENV_KEY_ID) {
            config = config.with_option("key_id", key_id);
        }
        if let Ok(key) = std::env::var(ENV_KEY) {
            config = config.with_option("key", key);
        }
        config
    }

    /// Add a configuration option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Get a configuration option.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Authorization host, without a trailing slash.
    pub fn api_url(&self) -> &str {
        self.get_option("api_url")
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Listing page size, clamped to `1..=10000`.
    pub fn page_size(&self) -> u32 {
        self.get_option("page_size")
            .and_then(|s| s.parse::<u32>().ok())
            .map(|size| size.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(MAX_PAGE_SIZE)
    }

    /// Options with credentials masked, suitable for logging.
    pub fn clean_options(&self) -> HashMap<String, String> {
        self.options
            .iter()
            .map(|(k, v)| {
                if SECRET_OPTIONS.contains(&k.as_str()) {
                    (k.clone(), "***".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

impl Debug for BucketConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BucketConfig")
            .field("bucket_name", &self.bucket_name)
            .field("options", &self.clean_options())
            .finish()
    }
}
