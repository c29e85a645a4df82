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

//! Error types for the radar client.

use thiserror::Error;

/// Errors produced while talking to the radar origin or handling its data.
#[derive(Debug, Error)]
pub enum RadarError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: &'static str },

    #[error("invalid card configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cache directory unavailable")]
    CacheUnavailable,

    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for radar operations.
pub type Result<T> = std::result::Result<T, RadarError>;
