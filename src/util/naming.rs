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

use crate::storage::provider::normalize_name;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Length of generated file ids
pub const RANDOM_ID_LEN: usize = 10;

/// Random identifier made of `[0-9A-Za-z]`.
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ID_LEN)
        .map(char::from)
        .collect()
}

/// Random file name keeping the extension of `local`, e.g. `Ul25dvOx00.png`.
pub fn random_file_name(local: &Path) -> String {
    match local.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", random_id(), ext),
        _ => random_id(),
    }
}

/// Resolve the remote name of an upload.
///
/// * `None` - a random name with the local extension
/// * a name ending in `/` - a random name inside that folder
/// * anything else - the name itself
///
/// A single leading slash is stripped in every case.
pub fn remote_name_for(local: &Path, remote: Option<&str>) -> String {
    match remote {
        None => random_file_name(local),
        Some(folder) if folder.ends_with('/') => {
            format!("{}{}", normalize_name(folder), random_file_name(local))
        }
        Some(name) => normalize_name(name).to_string(),
    }
}

/// Default local destination of a download: the last segment of the remote
/// name, in the current working directory.
pub fn default_local_path(remote: &str) -> PathBuf {
    let file_name = remote.rsplit('/').next().unwrap_or(remote);
    PathBuf::from(file_name)
}
