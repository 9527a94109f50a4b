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

//! Backblaze B2 access layer
//!
//! The [`B2Api`] trait covers the handful of native API calls the bucket
//! handle needs. [`B2Client`] talks to B2 over HTTP; [`MemoryApi`] keeps
//! everything in process.

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod memory;
pub mod models;
pub mod provider;

// Public exports
pub use client::B2Client;
pub use config::BucketConfig;
pub use error::{StorageError, StorageResult};
pub use factory::ApiFactory;
pub use memory::MemoryApi;
pub use provider::{B2Api, FileDescriptor, FileRef};
