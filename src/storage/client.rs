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

use super::config::BucketConfig;
use super::error::{StorageError, StorageResult};
use super::models::{
    ApiErrorBody, Authorization, FileNamesPage, ListBucketsResponse, RawBucket, RawFile,
    UploadTarget,
};
use super::provider::B2Api;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use sha1::{Digest, Sha1};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const API_VERSION: &str = "b2api/v2";

/// HTTP client for the B2 native API
pub struct B2Client {
    config: BucketConfig,
    http: Client,
    key_id: String,
    key: String,
}

impl B2Client {
    /// Create a new client from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Bucket configuration carrying the `key_id` and `key` options
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The `key_id` or `key` option is missing
    /// * The `api_url` option is not a valid URL
    /// * The underlying HTTP client cannot be built
    pub fn new(config: BucketConfig) -> StorageResult<Self> {
        let key_id = config.get_option("key_id").cloned().ok_or_else(|| {
            StorageError::ConfigError(
                "B2 requires 'key_id' option (or the B2_ID environment variable)".to_string(),
            )
        })?;
        let key = config.get_option("key").cloned().ok_or_else(|| {
            StorageError::ConfigError(
                "B2 requires 'key' option (or the B2_KEY environment variable)".to_string(),
            )
        })?;
        Url::parse(config.api_url())?;

        for option in config.options.keys() {
            match option.as_str() {
                "key_id" | "key" | "api_url" | "timeout" | "connect_timeout" | "page_size" => (),
                _ => warn!("Unknown B2 option: {}", option),
            }
        }

        let http = Self::build_connection_options(&config).build()?;

        Ok(Self {
            config,
            http,
            key_id,
            key,
        })
    }

    /// Build the HTTP client settings from configuration.
    ///
    /// Timeouts are only applied when configured; otherwise the client's
    /// defaults are kept.
    fn build_connection_options(config: &BucketConfig) -> ClientBuilder {
        let mut builder = Client::builder();
        if let Some(timeout_str) = config.get_option("timeout") {
            if timeout_str != "0" && timeout_str != "disabled" {
                if let Ok(sec) = timeout_str.parse::<u64>() {
                    builder = builder.timeout(Duration::from_secs(sec));
                }
            }
        }
        if let Some(connect_timeout_str) = config.get_option("connect_timeout") {
            if connect_timeout_str != "0" && connect_timeout_str != "disabled" {
                if let Ok(sec) = connect_timeout_str.parse::<u64>() {
                    builder = builder.connect_timeout(Duration::from_secs(sec));
                }
            }
        }
        builder
    }

    /// URL of a native API call on the host returned by authorization.
    fn api_endpoint(api_url: &str, call: &str) -> StorageResult<Url> {
        let url = format!("{}/{}/{}", api_url.trim_end_matches('/'), API_VERSION, call);
        Ok(Url::parse(&url)?)
    }

    /// URL used to download a file by name.
    fn download_endpoint(
        download_url: &str,
        bucket_name: &str,
        file_name: &str,
    ) -> StorageResult<Url> {
        let url = format!(
            "{}/file/{}/{}",
            download_url.trim_end_matches('/'),
            bucket_name,
            encode_file_name(file_name)
        );
        Ok(Url::parse(&url)?)
    }

    /// POST a JSON body to an authorized API call and decode the JSON response.
    async fn api_call<B, T>(&self, auth: &Authorization, call: &str, body: &B) -> StorageResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = Self::api_endpoint(&auth.api_url, call)?;
        debug!("B2 call={} url={}", call, url);
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, &auth.authorization_token)
            .json(body)
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-2xx response into a [`StorageError::Api`].
async fn check_response(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(parse_error_body(status.as_u16(), &text))
}

fn parse_error_body(status: u16, text: &str) -> StorageError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => StorageError::Api {
            status: body.status,
            code: body.code,
            message: body.message,
        },
        Err(_) => StorageError::Api {
            status,
            code: "unknown".to_string(),
            message: text.to_string(),
        },
    }
}

/// Percent-encode each path segment of a file name, keeping the slashes.
fn encode_file_name(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

#[async_trait]
impl B2Api for B2Client {
    async fn authorize(&self) -> StorageResult<Authorization> {
        let url = Self::api_endpoint(self.config.api_url(), "b2_authorize_account")?;
        debug!("Authorizing key_id={} url={}", self.key_id, url);
        let response = self
            .http
            .get(url)
            .basic_auth(&self.key_id, Some(&self.key))
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn list_buckets(
        &self,
        auth: &Authorization,
        bucket_name: &str,
    ) -> StorageResult<Vec<RawBucket>> {
        let body = json!({
            "accountId": auth.account_id,
            "bucketName": bucket_name,
        });
        let response: ListBucketsResponse = self.api_call(auth, "b2_list_buckets", &body).await?;
        Ok(response.buckets)
    }

    async fn list_file_names(
        &self,
        auth: &Authorization,
        bucket_id: &str,
        prefix: Option<&str>,
        start_file_name: Option<&str>,
        max_file_count: u32,
    ) -> StorageResult<FileNamesPage> {
        let mut body = json!({
            "bucketId": bucket_id,
            "maxFileCount": max_file_count,
        });
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            body["prefix"] = json!(prefix);
        }
        if let Some(start) = start_file_name {
            body["startFileName"] = json!(start);
        }
        self.api_call(auth, "b2_list_file_names", &body).await
    }

    async fn get_upload_url(
        &self,
        auth: &Authorization,
        bucket_id: &str,
    ) -> StorageResult<UploadTarget> {
        let body = json!({ "bucketId": bucket_id });
        self.api_call(auth, "b2_get_upload_url", &body).await
    }

    async fn upload_file(
        &self,
        target: &UploadTarget,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<RawFile> {
        let url = Url::parse(&target.upload_url)?;
        debug!("Uploading file={} size={}", file_name, data.len());
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, &target.authorization_token)
            .header("X-Bz-File-Name", encode_file_name(file_name))
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, data.len())
            .header("X-Bz-Content-Sha1", sha1_hex(&data))
            .body(data)
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    async fn download_file_by_name(
        &self,
        auth: &Authorization,
        bucket_name: &str,
        file_name: &str,
    ) -> StorageResult<Bytes> {
        let url = Self::download_endpoint(&auth.download_url, bucket_name, file_name)?;
        debug!("Downloading url={}", url);
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, &auth.authorization_token)
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.bytes().await?)
    }

    async fn delete_file_version(
        &self,
        auth: &Authorization,
        file_id: &str,
        file_name: &str,
    ) -> StorageResult<()> {
        let body = json!({
            "fileId": file_id,
            "fileName": file_name,
        });
        let _: serde_json::Value = self.api_call(auth, "b2_delete_file_version", &body).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http, api_url={}", self.config.api_url())
    }
}

impl Debug for B2Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "B2Client(api_url={}, key_id={}, config={:?})",
            self.config.api_url(),
            self.key_id,
            self.config
        )
    }
}
