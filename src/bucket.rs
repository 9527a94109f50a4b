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

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::storage::models::{Authorization, RawFile};
use crate::storage::provider::{guess_content_type, normalize_name};
use crate::storage::{
    ApiFactory, B2Api, BucketConfig, FileDescriptor, FileRef, StorageError, StorageResult,
};
use crate::util::naming::{default_local_path, remote_name_for};
use crate::util::timing::measure_dur_async;

/// Resolved bucket metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub bucket_id: String,
    pub bucket_name: String,
    pub account_id: String,
    /// Download base URL, `<downloadUrl>/file/<bucketName>/`
    #[serde(rename = "baseURL")]
    pub base_url: String,
}

/// Session and bucket metadata shared by every operation of a handle
#[derive(Debug)]
struct Resolved {
    auth: Authorization,
    info: BucketInfo,
}

/// Builder for [`Bucket`].
///
/// # Examples
///
/// ```no_run
/// use b2_bucket::{Bucket, BucketConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let bucket = Bucket::builder(BucketConfig::from_env("bucket-demo")).build()?;
/// let files = bucket.list(Some("demo/")).await?;
/// # Ok(())
/// # }
/// ```
pub struct BucketBuilder {
    config: BucketConfig,
    api: Option<Arc<dyn B2Api>>,
}

impl BucketBuilder {
    /// Creates a new `BucketBuilder` with the given configuration.
    pub fn new(config: BucketConfig) -> Self {
        Self { config, api: None }
    }

    /// Use an already constructed backend instead of the HTTP client.
    pub fn with_api(mut self, api: Arc<dyn B2Api>) -> Self {
        self.api = Some(api);
        self
    }

    /// Builds the `Bucket` handle.
    ///
    /// Nothing is sent to B2 yet; the first operation authorizes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no backend was given and the
    /// HTTP client cannot be created from the configuration.
    pub fn build(self) -> StorageResult<Bucket> {
        let api = match self.api {
            Some(api) => api,
            None => ApiFactory::from_config(&self.config)?,
        };
        Ok(Bucket {
            name: self.config.bucket_name.clone(),
            page_size: self.config.page_size(),
            api,
            resolved: OnceCell::new(),
        })
    }
}

/// Handle on a single B2 bucket
///
/// Authorization and bucket lookup run once, on first use, and the
/// outcome is shared by every later call and by concurrent first callers.
/// A failed resolution is kept as well: every operation of the handle then
/// fails with that same error.
///
/// File names are path-like; a single leading slash is stripped before
/// anything is sent to B2.
pub struct Bucket {
    name: String,
    page_size: u32,
    api: Arc<dyn B2Api>,
    resolved: OnceCell<Result<Resolved, Arc<StorageError>>>,
}

fn describe_files(files: &Vec<FileDescriptor>) -> String {
    format!("count={}", files.len())
}

fn describe_file(file: &FileDescriptor) -> String {
    format!("name={} size={}", file.name, file.size)
}

impl Bucket {
    /// Creates a new `BucketBuilder` for the given configuration.
    pub fn builder(config: BucketConfig) -> BucketBuilder {
        BucketBuilder::new(config)
    }

    /// Creates a handle talking to B2 over HTTP.
    pub fn new(config: BucketConfig) -> StorageResult<Self> {
        BucketBuilder::new(config).build()
    }

    /// Name of the bucket this handle is scoped to.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self) -> StorageResult<&Resolved> {
        self.resolved
            .get_or_init(|| async { self.authenticate().await.map_err(Arc::new) })
            .await
            .as_ref()
            .map_err(|e| StorageError::Resolution(Arc::clone(e)))
    }

    async fn authenticate(&self) -> StorageResult<Resolved> {
        info!("Authorizing bucket={} api={:?}", self.name, self.api);
        let auth = self.api.authorize().await?;
        let bucket = self
            .api
            .list_buckets(&auth, &self.name)
            .await?
            .into_iter()
            .find(|b| b.bucket_name == self.name)
            .ok_or_else(|| StorageError::BucketNotFound(self.name.clone()))?;

        let info = BucketInfo {
            base_url: format!(
                "{}/file/{}/",
                auth.download_url.trim_end_matches('/'),
                bucket.bucket_name
            ),
            bucket_id: bucket.bucket_id,
            bucket_name: bucket.bucket_name,
            account_id: bucket.account_id,
        };
        info!(
            "Resolved bucket={} bucket_id={} base_url={}",
            info.bucket_name, info.bucket_id, info.base_url
        );
        Ok(Resolved { auth, info })
    }

    /// Bucket metadata: id, name, account id and download base URL.
    pub async fn info(&self) -> StorageResult<BucketInfo> {
        Ok(self.resolve().await?.info.clone())
    }

    /// Every stored file record under an already normalized `prefix`,
    /// following the continuation cursor until the listing is exhausted.
    async fn list_raw(
        &self,
        resolved: &Resolved,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<RawFile>> {
        let prefix = prefix.filter(|p| !p.is_empty());
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .list_file_names(
                    &resolved.auth,
                    &resolved.info.bucket_id,
                    prefix,
                    cursor.as_deref(),
                    self.page_size,
                )
                .await?;
            pages += 1;
            files.extend(page.files.into_iter().filter(RawFile::is_upload));
            match page.next_file_name {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            "Listed prefix={:?} pages={} file_count={}",
            prefix,
            pages,
            files.len()
        );
        Ok(files)
    }

    /// Newest stored version of exactly `name`, if any.
    async fn find_raw(&self, resolved: &Resolved, name: &str) -> StorageResult<Option<RawFile>> {
        Ok(self
            .list_raw(resolved, Some(name))
            .await?
            .into_iter()
            .find(|f| f.file_name == name))
    }

    /// List the files of the bucket, optionally under a name prefix.
    ///
    /// Order is the provider's (lexicographic by name); nothing is sorted
    /// or deduplicated. `"/demo/"` and `"demo/"` list the same files.
    pub async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<FileDescriptor>> {
        let prefix = prefix.map(normalize_name);
        measure_dur_async(
            "list",
            || async {
                let resolved = self.resolve().await?;
                let base_url = &resolved.info.base_url;
                let files: Vec<FileDescriptor> = self
                    .list_raw(resolved, prefix)
                    .await?
                    .iter()
                    .map(|raw| FileDescriptor::from_raw(raw, base_url))
                    .collect();
                Ok::<_, StorageError>(files)
            },
            Some(describe_files as fn(&Vec<FileDescriptor>) -> String),
        )
        .await
    }

    /// Number of files under `prefix`; always equal to `list(prefix).len()`.
    pub async fn count(&self, prefix: Option<&str>) -> StorageResult<usize> {
        Ok(self.list(prefix).await?.len())
    }

    /// Descriptor of the file with exactly this name, if it exists.
    pub async fn file(&self, file: impl Into<FileRef>) -> StorageResult<Option<FileDescriptor>> {
        let file = file.into();
        let name = file.name();
        let resolved = self.resolve().await?;
        Ok(self
            .find_raw(resolved, name)
            .await?
            .map(|raw| FileDescriptor::from_raw(&raw, &resolved.info.base_url)))
    }

    /// Whether a file with exactly this name exists.
    pub async fn exists(&self, file: impl Into<FileRef>) -> StorageResult<bool> {
        Ok(self.file(file).await?.is_some())
    }

    /// Upload a local file.
    ///
    /// # Arguments
    ///
    /// * `local` - Path of the file to read
    /// * `remote` - Remote name. `None` picks a random 10 character name with
    ///   the local extension; a value ending in `/` picks such a name inside
    ///   that folder.
    ///
    /// The whole file is read into memory and sent in a single request.
    pub async fn upload(
        &self,
        local: impl AsRef<Path>,
        remote: Option<&str>,
    ) -> StorageResult<FileDescriptor> {
        let local = local.as_ref();
        let remote_name = remote_name_for(local, remote);

        measure_dur_async(
            "upload",
            || async {
                let resolved = self.resolve().await?;
                let read_local = async { Ok::<_, StorageError>(tokio::fs::read(local).await?) };
                let (target, data) = futures::try_join!(
                    self.api
                        .get_upload_url(&resolved.auth, &resolved.info.bucket_id),
                    read_local
                )?;

                let content_type = guess_content_type(&remote_name);
                debug!(
                    "Uploading local={} remote={} size={} type={}",
                    local.display(),
                    remote_name,
                    data.len(),
                    content_type
                );
                let raw = self
                    .api
                    .upload_file(&target, &remote_name, &content_type, Bytes::from(data))
                    .await?;
                Ok::<_, StorageError>(FileDescriptor::from_raw(&raw, &resolved.info.base_url))
            },
            Some(describe_file as fn(&FileDescriptor) -> String),
        )
        .await
    }

    /// Fetch the full content of a file.
    pub async fn read_bytes(&self, file: impl Into<FileRef>) -> StorageResult<Bytes> {
        let file = file.into();
        let name = file.name();
        let resolved = self.resolve().await?;
        self.api
            .download_file_by_name(&resolved.auth, &resolved.info.bucket_name, name)
            .await
    }

    /// Fetch a file and decode it as UTF-8 text.
    pub async fn read(&self, file: impl Into<FileRef>) -> StorageResult<String> {
        let data = self.read_bytes(file).await?;
        Ok(String::from_utf8(data.to_vec())?)
    }

    /// Download a file to disk.
    ///
    /// # Arguments
    ///
    /// * `file` - Name or descriptor of the remote file
    /// * `local` - Destination; defaults to the last segment of the remote
    ///   name in the current working directory. Missing parent directories
    ///   are created.
    ///
    /// # Returns
    ///
    /// The absolute path of the written file.
    pub async fn download(
        &self,
        file: impl Into<FileRef>,
        local: Option<&Path>,
    ) -> StorageResult<PathBuf> {
        let file = file.into();
        let name = file.name().to_string();

        measure_dur_async(
            "download",
            || async {
                let data = self.read_bytes(name.as_str()).await?;
                let local = match local {
                    Some(path) => path.to_path_buf(),
                    None => default_local_path(&name),
                };
                let local = if local.is_absolute() {
                    local
                } else {
                    std::env::current_dir()?.join(local)
                };
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&local, &data).await?;
                debug!("Wrote remote={} local={} size={}", name, local.display(), data.len());
                Ok::<_, StorageError>(local)
            },
            None,
        )
        .await
    }

    /// Delete every stored version of a file.
    ///
    /// Versions are removed newest first until the name no longer lists.
    ///
    /// # Returns
    ///
    /// The descriptor of the newest version, as it was before removal.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no file has this name.
    pub async fn remove(&self, file: impl Into<FileRef>) -> StorageResult<FileDescriptor> {
        let file = file.into();
        let name = file.name();

        measure_dur_async(
            "remove",
            || async {
                let resolved = self.resolve().await?;
                let mut removed: Option<FileDescriptor> = None;
                let mut versions = 0usize;

                while let Some(raw) = self.find_raw(resolved, name).await? {
                    self.api
                        .delete_file_version(&resolved.auth, &raw.file_id, &raw.file_name)
                        .await?;
                    versions += 1;
                    if removed.is_none() {
                        removed = Some(FileDescriptor::from_raw(&raw, &resolved.info.base_url));
                    }
                }

                if versions > 1 {
                    info!("Removed name={} versions={}", name, versions);
                }
                removed.ok_or_else(|| StorageError::NotFound(name.to_string()))
            },
            Some(describe_file as fn(&FileDescriptor) -> String),
        )
        .await
    }
}

impl Debug for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bucket(name={}, api={:?}, resolved={})",
            self.name,
            self.api,
            self.resolved.initialized()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryApi;
    use std::fs;
    use tempfile::TempDir;

    fn bucket_with(api: MemoryApi) -> (Bucket, Arc<MemoryApi>) {
        let api = Arc::new(api);
        let bucket = Bucket::builder(BucketConfig::new("bucket-demo"))
            .with_api(api.clone())
            .build()
            .unwrap();
        (bucket, api)
    }

    fn local_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_info() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let info = bucket.info().await.unwrap();

        assert_eq!(info.bucket_name, "bucket-demo");
        assert_eq!(info.account_id, "memory-account");
        assert!(!info.bucket_id.is_empty());
        assert_eq!(info.base_url, "memory://download/file/bucket-demo/");
    }

    #[tokio::test]
    async fn test_info_serializes_base_url_key() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let json = serde_json::to_value(bucket.info().await.unwrap()).unwrap();
        assert!(json.get("bucketId").is_some());
        assert!(json.get("bucketName").is_some());
        assert!(json.get("accountId").is_some());
        assert!(json.get("baseURL").is_some());
    }

    #[tokio::test]
    async fn test_build_does_not_authorize() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo"));
        assert_eq!(api.authorize_calls(), 0);
        assert!(format!("{:?}", bucket).contains("resolved=false"));
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo"));
        bucket.info().await.unwrap();
        bucket.list(None).await.unwrap();
        bucket.exists("x").await.unwrap();
        assert_eq!(api.authorize_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_authorizes_once() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo"));
        let bucket = Arc::new(bucket);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                tokio::spawn(async move { bucket.info().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(api.authorize_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_bucket() {
        let api = Arc::new(MemoryApi::new("other"));
        let bucket = Bucket::builder(BucketConfig::new("bucket-demo"))
            .with_api(api)
            .build()
            .unwrap();
        let error = bucket.info().await.unwrap_err();
        assert_eq!(error.to_string(), "Bucket not found: bucket-demo");
    }

    #[tokio::test]
    async fn test_failed_resolution_is_shared() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo").with_rejected_authorization());

        let first = bucket.list(None).await.unwrap_err();
        let second = bucket.exists("a.png").await.unwrap_err();
        assert!(matches!(first, StorageError::Resolution(_)));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(api.authorize_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_follows_cursor() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo").with_max_page_size(2));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "a.txt", b"a");
        for name in ["1.txt", "2.txt", "3.txt", "4.txt", "5.txt"] {
            bucket.upload(&path, Some(name)).await.unwrap();
        }

        let files = bucket.list(None).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["1.txt", "2.txt", "3.txt", "4.txt", "5.txt"]);
        assert_eq!(api.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_list_uses_configured_page_size() {
        let api = Arc::new(MemoryApi::new("bucket-demo"));
        let bucket = Bucket::builder(BucketConfig::new("bucket-demo").with_option("page_size", "1"))
            .with_api(api.clone())
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "a.txt", b"a");
        bucket.upload(&path, Some("x.txt")).await.unwrap();
        bucket.upload(&path, Some("y.txt")).await.unwrap();

        assert_eq!(bucket.count(None).await.unwrap(), 2);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_upload_descriptor() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "example.png", b"\x89PNG....");

        let file = bucket.upload(&path, Some("/AmZmqtAgTA.png")).await.unwrap();
        assert_eq!(file.name, "AmZmqtAgTA.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size, 8);
        assert_eq!(file.url, "memory://download/file/bucket-demo/AmZmqtAgTA.png");
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let error = bucket
            .upload("/definitely/not/here.png", None)
            .await
            .unwrap_err();
        assert!(matches!(error, StorageError::IoError(_)));
    }

    #[tokio::test]
    async fn test_file_exact_match_only() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "data.json", b"{}");
        bucket.upload(&path, Some("data.json.bak")).await.unwrap();

        assert!(bucket.file("data.json").await.unwrap().is_none());
        assert!(!bucket.exists("data.json").await.unwrap());
        assert!(bucket.exists("/data.json.bak").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_accepts_descriptor() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "data.json", b"{\n  \"hello\": \"world\"\n}\n");
        let file = bucket.upload(&path, Some("data.json")).await.unwrap();

        let text = bucket.read(&file).await.unwrap();
        assert_eq!(text.len(), 23);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["hello"], "world");
    }

    #[tokio::test]
    async fn test_read_invalid_utf8() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "bin.dat", &[0xff, 0xfe, 0x00]);
        bucket.upload(&path, Some("bin.dat")).await.unwrap();

        assert!(matches!(
            bucket.read("bin.dat").await,
            Err(StorageError::Utf8(_))
        ));
        assert_eq!(&bucket.read_bytes("bin.dat").await.unwrap()[..], &[0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_download_to_explicit_path() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let path = local_file(&dir, "example.png", b"pixels");
        let file = bucket.upload(&path, Some("demo/pic.png")).await.unwrap();

        let target = dir.path().join("nested/out/example2.png");
        let written = bucket.download(file, Some(target.as_path())).await.unwrap();
        assert_eq!(written, target);
        assert_eq!(fs::read(&written).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nothing.png");
        let error = bucket.download("nothing.png", Some(target.as_path())).await.unwrap_err();
        assert!(error.is_not_found());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (bucket, _) = bucket_with(MemoryApi::new("bucket-demo"));
        let error = bucket.remove("abc.png").await.unwrap_err();
        assert!(matches!(error, StorageError::NotFound(ref name) if name == "abc.png"));
    }

    #[tokio::test]
    async fn test_remove_deletes_all_versions() {
        let (bucket, api) = bucket_with(MemoryApi::new("bucket-demo"));
        let dir = TempDir::new().unwrap();
        let old = local_file(&dir, "v1.txt", b"old");
        let new = local_file(&dir, "v2.txt", b"newer");
        bucket.upload(&old, Some("notes.txt")).await.unwrap();
        bucket.upload(&new, Some("notes.txt")).await.unwrap();
        assert_eq!(api.version_count("notes.txt"), 2);

        let removed = bucket.remove("/notes.txt").await.unwrap();
        assert_eq!(removed.name, "notes.txt");
        assert_eq!(removed.size, 5);
        assert_eq!(api.version_count("notes.txt"), 0);
        assert!(!bucket.exists("notes.txt").await.unwrap());
    }
}
