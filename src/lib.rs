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

//! # B2 Bucket
//!
//! A thin, bucket-scoped wrapper around the Backblaze B2 native API.
//!
//! A [`Bucket`] handle authorizes lazily, once, and exposes a small set of
//! operations: `info`, `list`, `count`, `exists`, `file`, `upload`,
//! `download`, `read` and `remove`. Files are described by a flat
//! [`FileDescriptor`] (name, type, size, url, timestamp).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use b2_bucket::{Bucket, BucketConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Credentials come from B2_ID / B2_KEY
//! let bucket = Bucket::new(BucketConfig::from_env("bucket-demo"))?;
//!
//! let file = bucket.upload("./example.png", Some("demo/")).await?;
//! println!("{} -> {}", file.name, file.url);
//!
//! let text = bucket.read("data.json").await?;
//! bucket.remove(&file).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Offline use
//!
//! ```rust
//! use std::sync::Arc;
//! use b2_bucket::{Bucket, BucketConfig};
//! use b2_bucket::storage::MemoryApi;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let bucket = Bucket::builder(BucketConfig::new("bucket-demo"))
//!     .with_api(Arc::new(MemoryApi::new("bucket-demo")))
//!     .build()?;
//! assert_eq!(bucket.count(None).await?, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`bucket`] - The bucket handle
//! - [`storage`] - B2 API access, configuration and errors
//! - [`util`] - Utility functions and helpers

pub mod bucket;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use bucket::{Bucket, BucketBuilder, BucketInfo};
pub use storage::{BucketConfig, FileDescriptor, FileRef, StorageError, StorageResult};
