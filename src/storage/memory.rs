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

//! In-process implementation of [`B2Api`].
//!
//! Keeps every uploaded version in memory and mimics the listing
//! semantics of B2: names are returned in lexicographic order, only the
//! newest version of each name is listed, and pages are chained through
//! an inclusive `startFileName` cursor.

use super::config::MAX_PAGE_SIZE;
use super::error::{StorageError, StorageResult};
use super::models::{Authorization, FileNamesPage, RawBucket, RawFile, UploadTarget};
use super::provider::B2Api;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const ACCOUNT_ID: &str = "memory-account";
const SESSION_TOKEN: &str = "memory-session";
const UPLOAD_TOKEN: &str = "memory-upload";

#[derive(Debug, Clone)]
struct StoredVersion {
    file_id: String,
    bucket_id: String,
    file_name: String,
    content_type: String,
    data: Bytes,
    upload_timestamp: i64,
}

impl StoredVersion {
    fn to_raw(&self) -> RawFile {
        RawFile {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            content_type: Some(self.content_type.clone()),
            content_length: self.data.len() as u64,
            content_sha1: Some(hex::encode(Sha1::digest(&self.data))),
            action: "upload".to_string(),
            upload_timestamp: self.upload_timestamp,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: Vec<RawBucket>,
    versions: Vec<StoredVersion>,
    next_id: u64,
    last_timestamp: i64,
}

/// In-memory B2 account
#[derive(Debug)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
    max_page_size: u32,
    authorize_calls: AtomicUsize,
    list_calls: AtomicUsize,
    reject_authorization: bool,
}

impl MemoryApi {
    /// Create an account holding a single, empty bucket.
    pub fn new(bucket_name: impl Into<String>) -> Self {
        let api = Self {
            state: Mutex::new(MemoryState::default()),
            max_page_size: MAX_PAGE_SIZE,
            authorize_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            reject_authorization: false,
        };
        api.add_bucket(bucket_name);
        api
    }

    /// Cap the number of names returned per listing page.
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Make every authorization attempt fail with a 401.
    pub fn with_rejected_authorization(mut self) -> Self {
        self.reject_authorization = true;
        self
    }

    /// Add another empty bucket to the account.
    pub fn add_bucket(&self, bucket_name: impl Into<String>) {
        let mut state = self.lock();
        let bucket_id = format!("memory-bucket-{}", state.buckets.len() + 1);
        state.buckets.push(RawBucket {
            account_id: ACCOUNT_ID.to_string(),
            bucket_id,
            bucket_name: bucket_name.into(),
            bucket_type: Some("allPrivate".to_string()),
        });
    }

    /// Number of `authorize` calls received so far.
    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_file_names` pages served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of stored versions of a name, across all buckets.
    pub fn version_count(&self, file_name: &str) -> usize {
        self.lock()
            .versions
            .iter()
            .filter(|v| v.file_name == file_name)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_token(token: &str, expected: &str) -> StorageResult<()> {
        if token == expected {
            Ok(())
        } else {
            Err(api_error(401, "bad_auth_token", "Invalid authorization token"))
        }
    }

    fn check_bucket(state: &MemoryState, bucket_id: &str) -> StorageResult<()> {
        if state.buckets.iter().any(|b| b.bucket_id == bucket_id) {
            Ok(())
        } else {
            Err(api_error(400, "bad_request", "Invalid bucketId"))
        }
    }
}

fn api_error(status: u16, code: &str, message: &str) -> StorageError {
    StorageError::Api {
        status,
        code: code.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl B2Api for MemoryApi {
    async fn authorize(&self) -> StorageResult<Authorization> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers pile up behind the first resolution.
        tokio::task::yield_now().await;
        if self.reject_authorization {
            return Err(api_error(401, "unauthorized", "Invalid key id or key"));
        }
        Ok(Authorization {
            account_id: ACCOUNT_ID.to_string(),
            authorization_token: SESSION_TOKEN.to_string(),
            api_url: "memory://api".to_string(),
            download_url: "memory://download".to_string(),
        })
    }

    async fn list_buckets(
        &self,
        auth: &Authorization,
        bucket_name: &str,
    ) -> StorageResult<Vec<RawBucket>> {
        Self::check_token(&auth.authorization_token, SESSION_TOKEN)?;
        Ok(self
            .lock()
            .buckets
            .iter()
            .filter(|b| b.bucket_name == bucket_name)
            .cloned()
            .collect())
    }

    async fn list_file_names(
        &self,
        auth: &Authorization,
        bucket_id: &str,
        prefix: Option<&str>,
        start_file_name: Option<&str>,
        max_file_count: u32,
    ) -> StorageResult<FileNamesPage> {
        Self::check_token(&auth.authorization_token, SESSION_TOKEN)?;
        if max_file_count == 0 || max_file_count > MAX_PAGE_SIZE {
            return Err(api_error(400, "bad_request", "maxFileCount out of range"));
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let state = self.lock();
        Self::check_bucket(&state, bucket_id)?;

        let prefix = prefix.unwrap_or("");
        let start = start_file_name.unwrap_or("");
        // Later versions overwrite earlier ones, leaving the newest per name.
        let mut newest: BTreeMap<&str, &StoredVersion> = BTreeMap::new();
        for version in state.versions.iter().filter(|v| {
            v.bucket_id == bucket_id
                && v.file_name.starts_with(prefix)
                && v.file_name.as_str() >= start
        }) {
            newest.insert(version.file_name.as_str(), version);
        }

        let page_size = max_file_count.min(self.max_page_size) as usize;
        let mut names = newest.into_values();
        let files: Vec<RawFile> = names.by_ref().take(page_size).map(|v| v.to_raw()).collect();
        let next_file_name = names.next().map(|v| v.file_name.clone());

        Ok(FileNamesPage {
            files,
            next_file_name,
        })
    }

    async fn get_upload_url(
        &self,
        auth: &Authorization,
        bucket_id: &str,
    ) -> StorageResult<UploadTarget> {
        Self::check_token(&auth.authorization_token, SESSION_TOKEN)?;
        Self::check_bucket(&self.lock(), bucket_id)?;
        Ok(UploadTarget {
            bucket_id: bucket_id.to_string(),
            upload_url: format!("memory://upload/{}", bucket_id),
            authorization_token: UPLOAD_TOKEN.to_string(),
        })
    }

    async fn upload_file(
        &self,
        target: &UploadTarget,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<RawFile> {
        Self::check_token(&target.authorization_token, UPLOAD_TOKEN)?;
        if file_name.is_empty() || file_name.starts_with('/') {
            return Err(api_error(400, "bad_request", "Invalid file name"));
        }

        let mut state = self.lock();
        Self::check_bucket(&state, &target.bucket_id)?;
        state.next_id += 1;
        let upload_timestamp = Utc::now().timestamp_millis().max(state.last_timestamp + 1);
        state.last_timestamp = upload_timestamp;

        let version = StoredVersion {
            file_id: format!("4_memory_{:08}", state.next_id),
            bucket_id: target.bucket_id.clone(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
            upload_timestamp,
        };
        let raw = version.to_raw();
        state.versions.push(version);
        Ok(raw)
    }

    async fn download_file_by_name(
        &self,
        auth: &Authorization,
        bucket_name: &str,
        file_name: &str,
    ) -> StorageResult<Bytes> {
        Self::check_token(&auth.authorization_token, SESSION_TOKEN)?;
        let state = self.lock();
        let bucket = state
            .buckets
            .iter()
            .find(|b| b.bucket_name == bucket_name)
            .ok_or_else(|| api_error(404, "not_found", "Bucket does not exist"))?;
        state
            .versions
            .iter()
            .rev()
            .find(|v| v.bucket_id == bucket.bucket_id && v.file_name == file_name)
            .map(|v| v.data.clone())
            .ok_or_else(|| api_error(404, "not_found", "File with such name does not exist."))
    }

    async fn delete_file_version(
        &self,
        auth: &Authorization,
        file_id: &str,
        file_name: &str,
    ) -> StorageResult<()> {
        Self::check_token(&auth.authorization_token, SESSION_TOKEN)?;
        let mut state = self.lock();
        let position = state
            .versions
            .iter()
            .position(|v| v.file_id == file_id && v.file_name == file_name)
            .ok_or_else(|| api_error(400, "file_not_present", "File not present"))?;
        state.versions.remove(position);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
