// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::StorageResult;
use super::models::{Authorization, FileNamesPage, RawBucket, RawFile, UploadTarget};

/// Normalized description of a stored file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Full name of the file inside the bucket
    pub name: String,

    /// MIME type
    #[serde(rename = "type")]
    pub content_type: String,

    /// File size in bytes
    pub size: u64,

    /// Public download URL
    pub url: String,

    /// Upload time
    pub timestamp: DateTime<Utc>,
}

impl FileDescriptor {
    /// Build a descriptor from a raw B2 file record.
    ///
    /// # Arguments
    ///
    /// * `raw` - The record returned by the listing or upload endpoint
    /// * `base_url` - The bucket download base URL, ending with a slash
    pub fn from_raw(raw: &RawFile, base_url: &str) -> Self {
        let content_type = match raw.content_type.as_deref() {
            Some(t) if !t.is_empty() && t != "b2/x-auto" => t.to_string(),
            _ => guess_content_type(&raw.file_name),
        };
        let timestamp = Utc
            .timestamp_millis_opt(raw.upload_timestamp)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            name: raw.file_name.clone(),
            content_type,
            size: raw.content_length,
            url: format!("{}{}", base_url, raw.file_name),
            timestamp,
        }
    }
}

/// Either a plain file name or a descriptor whose name is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    Name(String),
    Descriptor(FileDescriptor),
}

impl FileRef {
    /// Name to send to the provider, with a single leading slash stripped.
    pub fn name(&self) -> &str {
        match self {
            FileRef::Name(name) => normalize_name(name),
            FileRef::Descriptor(file) => normalize_name(&file.name),
        }
    }
}

impl From<&str> for FileRef {
    fn from(name: &str) -> Self {
        FileRef::Name(name.to_string())
    }
}

impl From<String> for FileRef {
    fn from(name: String) -> Self {
        FileRef::Name(name)
    }
}

impl From<&String> for FileRef {
    fn from(name: &String) -> Self {
        FileRef::Name(name.clone())
    }
}

impl From<FileDescriptor> for FileRef {
    fn from(file: FileDescriptor) -> Self {
        FileRef::Descriptor(file)
    }
}

impl From<&FileDescriptor> for FileRef {
    fn from(file: &FileDescriptor) -> Self {
        FileRef::Descriptor(file.clone())
    }
}

/// The calls consumed from the B2 native API
///
/// Implemented over HTTP by [`super::client::B2Client`] and in process by
/// [`super::memory::MemoryApi`].
#[async_trait]
pub trait B2Api: Send + Sync {
    /// Authorize the account and open a session.
    async fn authorize(&self) -> StorageResult<Authorization>;

    /// List the buckets of the account, filtered by name.
    async fn list_buckets(
        &self,
        auth: &Authorization,
        bucket_name: &str,
    ) -> StorageResult<Vec<RawBucket>>;

    /// Fetch one page of file names.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Only names starting with this prefix are returned
    /// * `start_file_name` - Continuation cursor from the previous page
    /// * `max_file_count` - Page size
    async fn list_file_names(
        &self,
        auth: &Authorization,
        bucket_id: &str,
        prefix: Option<&str>,
        start_file_name: Option<&str>,
        max_file_count: u32,
    ) -> StorageResult<FileNamesPage>;

    /// Request a single-use upload endpoint.
    async fn get_upload_url(
        &self,
        auth: &Authorization,
        bucket_id: &str,
    ) -> StorageResult<UploadTarget>;

    /// Push a whole file to an upload endpoint.
    async fn upload_file(
        &self,
        target: &UploadTarget,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<RawFile>;

    /// Download the newest version of a file.
    async fn download_file_by_name(
        &self,
        auth: &Authorization,
        bucket_name: &str,
        file_name: &str,
    ) -> StorageResult<Bytes>;

    /// Delete one version of a file.
    async fn delete_file_version(
        &self,
        auth: &Authorization,
        file_id: &str,
        file_name: &str,
    ) -> StorageResult<()>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}

impl Debug for dyn B2Api {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "B2Api({})", self.describe())
    }
}

/// Strip a single leading slash; nothing else is normalized.
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// MIME type guessed from a file name's extension.
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, content_type: Option<&str>) -> RawFile {
        RawFile {
            file_id: "4_z1".to_string(),
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            content_length: 1024,
            content_sha1: None,
            action: "upload".to_string(),
            upload_timestamp: 1_600_000_000_000,
        }
    }

    #[test]
    fn test_descriptor_from_raw() {
        let file = FileDescriptor::from_raw(
            &raw("demo/a.png", Some("image/png")),
            "https://f001.backblazeb2.com/file/bucket-demo/",
        );

        assert_eq!(file.name, "demo/a.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size, 1024);
        assert_eq!(
            file.url,
            "https://f001.backblazeb2.com/file/bucket-demo/demo/a.png"
        );
        assert_eq!(file.timestamp.timestamp_millis(), 1_600_000_000_000);
    }

    #[test]
    fn test_descriptor_guesses_missing_type() {
        let file = FileDescriptor::from_raw(&raw("data.json", None), "base/");
        assert_eq!(file.content_type, "application/json");

        let file = FileDescriptor::from_raw(&raw("x.png", Some("b2/x-auto")), "base/");
        assert_eq!(file.content_type, "image/png");

        let file = FileDescriptor::from_raw(&raw("noext", None), "base/");
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[test]
    fn test_descriptor_serializes_type_field() {
        let file = FileDescriptor::from_raw(&raw("a.png", Some("image/png")), "base/");
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["name"], "a.png");
        assert_eq!(json["url"], "base/a.png");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("/demo/"), "demo/");
        assert_eq!(normalize_name("demo/"), "demo/");
        assert_eq!(normalize_name("//demo"), "/demo");
        assert_eq!(normalize_name("Demo//A.PNG"), "Demo//A.PNG");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_file_ref_from_name() {
        assert_eq!(FileRef::from("/a.png").name(), "a.png");
        assert_eq!(FileRef::from("a.png".to_string()).name(), "a.png");
    }

    #[test]
    fn test_file_ref_from_descriptor() {
        let file = FileDescriptor::from_raw(&raw("demo/a.png", None), "base/");
        assert_eq!(FileRef::from(&file).name(), "demo/a.png");
        assert_eq!(FileRef::from(file).name(), "demo/a.png");
    }
}
