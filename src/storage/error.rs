// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::string::FromUtf8Error;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during bucket operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("File not found: {0}")]
    NotFound(String),

    /// Error body returned by the B2 API (`{"status", "code", "message"}`)
    #[error("B2 API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("File is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Failure of the memoized bucket resolution, shared by every caller
    #[error(transparent)]
    Resolution(Arc<StorageError>),
}

impl StorageError {
    /// Whether this error means the requested file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Api { status, .. } => *status == 404,
            StorageError::Resolution(inner) => inner.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for bucket operations
pub type StorageResult<T> = Result<T, StorageError>;
