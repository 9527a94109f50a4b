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

//! Raw records exchanged with the B2 native API (v2).

use serde::{Deserialize, Deserializer, Serialize};

/// Response of `b2_authorize_account`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub account_id: String,
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
}

/// A bucket as returned by `b2_list_buckets`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawBucket {
    pub account_id: String,
    pub bucket_id: String,
    pub bucket_name: String,
    #[serde(default)]
    pub bucket_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListBucketsResponse {
    pub buckets: Vec<RawBucket>,
}

/// A file version as returned by the listing and upload endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawFile {
    /// Empty for folder records, which B2 reports with a null id
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_id: String,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_length: u64,
    #[serde(default)]
    pub content_sha1: Option<String>,
    /// `upload`, `folder`, `hide` or `start`
    #[serde(default = "default_action")]
    pub action: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub upload_timestamp: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_action() -> String {
    "upload".to_string()
}

impl RawFile {
    /// Whether this record is a stored file rather than a folder or marker.
    pub fn is_upload(&self) -> bool {
        self.action == "upload"
    }
}

/// One page of `b2_list_file_names`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileNamesPage {
    pub files: Vec<RawFile>,
    /// Continuation cursor; `None` once the listing is exhausted
    #[serde(default)]
    pub next_file_name: Option<String>,
}

/// Response of `b2_get_upload_url`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub bucket_id: String,
    pub upload_url: String,
    pub authorization_token: String,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub status: u16,
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_deserialization() {
        let json = r#"{
            "accountId": "acc1",
            "authorizationToken": "tok",
            "apiUrl": "https://api001.backblazeb2.com",
            "downloadUrl": "https://f001.backblazeb2.com",
            "recommendedPartSize": 100000000,
            "absoluteMinimumPartSize": 5000000
        }"#;
        let auth: Authorization = serde_json::from_str(json).unwrap();
        assert_eq!(auth.account_id, "acc1");
        assert_eq!(auth.download_url, "https://f001.backblazeb2.com");
    }

    #[test]
    fn test_list_buckets_deserialization() {
        let json = r#"{"buckets":[{"accountId":"a","bucketId":"b1","bucketName":"bucket-demo","bucketType":"allPublic","lifecycleRules":[]}]}"#;
        let response: ListBucketsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.buckets.len(), 1);
        assert_eq!(response.buckets[0].bucket_id, "b1");
        assert_eq!(
            response.buckets[0].bucket_type.as_deref(),
            Some("allPublic")
        );
    }

    #[test]
    fn test_file_names_page_deserialization() {
        let json = r#"{
            "files": [{
                "accountId": "a",
                "action": "upload",
                "bucketId": "b1",
                "contentLength": 23,
                "contentSha1": "abc",
                "contentType": "application/json",
                "fileId": "4_z1",
                "fileInfo": {},
                "fileName": "data.json",
                "uploadTimestamp": 1600000000000
            }],
            "nextFileName": "demo/"
        }"#;
        let page: FileNamesPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].file_name, "data.json");
        assert_eq!(page.files[0].content_length, 23);
        assert!(page.files[0].is_upload());
        assert_eq!(page.next_file_name.as_deref(), Some("demo/"));
    }

    #[test]
    fn test_file_names_page_last_page() {
        let page: FileNamesPage =
            serde_json::from_str(r#"{"files":[],"nextFileName":null}"#).unwrap();
        assert!(page.files.is_empty());
        assert!(page.next_file_name.is_none());
    }

    #[test]
    fn test_folder_record_is_not_upload() {
        let json = r#"{"fileId":null,"fileName":"demo/","action":"folder","contentLength":0,"uploadTimestamp":0}"#;
        let folder: RawFile = serde_json::from_str(json).unwrap();
        assert!(folder.file_id.is_empty());
        assert!(!folder.is_upload());

        let json = r#"{"fileId":"x","fileName":"old.png","action":"hide"}"#;
        let file: RawFile = serde_json::from_str(json).unwrap();
        assert!(!file.is_upload());
    }

    #[test]
    fn test_error_body_deserialization() {
        let json = r#"{"status":400,"code":"bad_request","message":"Invalid bucketId"}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.status, 400);
        assert_eq!(body.code, "bad_request");
    }
}
