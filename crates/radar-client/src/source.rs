// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote radar origin access.
//!
//! The origin exposes nothing but time-indexed PNG files, so the only
//! operations needed are an existence check and a plain download.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::error::{RadarError, Result};

/// Buienradar forecast run directory.
pub const DEFAULT_BASE_URL: &str =
    "https://processing-cdn.buienradar.nl/processing/nl/rain/forecast/runs/webm";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("rainradar-desktop/", env!("CARGO_PKG_VERSION"));

/// Source of radar images.
///
/// Implement this to serve frames from somewhere other than HTTP, e.g. a
/// local mirror or a test fixture.
#[async_trait]
pub trait RadarSource: Send + Sync {
    /// Check whether a resource exists without downloading it.
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Download a resource. Non-success responses are errors.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`RadarSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RadarSource for HttpSource {
    async fn exists(&self, url: &str) -> Result<bool> {
        let response = self.client.head(url).send().await?;
        debug!("HEAD {} -> {}", url, response.status());
        Ok(response.status().is_success())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RadarError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
