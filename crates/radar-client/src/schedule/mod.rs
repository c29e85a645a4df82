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

//! Forecast runs, frames and the frame schedule.
//!
//! A forecast run is published every five minutes and covers the following
//! three hours in 37 frames. Everything here is pure: building a schedule
//! never touches the network, so frame ordering is fixed before any image
//! request is issued.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::error::{RadarError, Result};

/// Spacing between runs and between frames within a run.
pub const FRAME_STEP_MINUTES: i64 = 5;

/// Frames per run (indices 0..=36, three hours ahead).
pub const FRAME_COUNT: usize = 37;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Encode an instant as the radar origin's canonical `YYYYMMDDHHmm` (UTC).
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode a canonical `YYYYMMDDHHmm` string back into a UTC instant.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let invalid = |reason| RadarError::InvalidTimestamp {
        value: value.to_string(),
        reason,
    };

    if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected 12 digits (YYYYMMDDHHmm)"));
    }

    let digits = |start: usize, len: usize| {
        value.as_bytes()[start..start + len]
            .iter()
            .fold(0_u32, |acc, b| acc * 10 + u32::from(b - b'0'))
    };

    i32::try_from(digits(0, 4))
        .ok()
        .and_then(|year| {
            Utc.with_ymd_and_hms(year, digits(4, 2), digits(6, 2), digits(8, 2), digits(10, 2), 0)
                .single()
        })
        .ok_or_else(|| invalid("not a valid calendar date"))
}

/// Round an instant down to the previous five-minute boundary.
#[must_use]
pub fn floor_to_step(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let step = FRAME_STEP_MINUTES * 60;
    let seconds = timestamp.timestamp();
    DateTime::from_timestamp(seconds - seconds.rem_euclid(step), 0).unwrap_or(timestamp)
}

/// Format a frame timestamp as an `HH:MM` label in the given time zone.
#[must_use]
pub fn time_label<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(tz).format("%H:%M").to_string()
}

/// One forecast generation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    run_time: DateTime<Utc>,
    run_id: String,
}

impl Run {
    /// Create a run, aligning `run_time` to a five-minute boundary.
    #[must_use]
    pub fn new(run_time: DateTime<Utc>) -> Self {
        let run_time = floor_to_step(run_time);
        Self {
            run_id: format_timestamp(run_time),
            run_time,
        }
    }

    #[must_use]
    pub fn run_time(&self) -> DateTime<Utc> {
        self.run_time
    }

    /// Canonical `YYYYMMDDHHmm` identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// URL whose existence proves the run has been published.
    #[must_use]
    pub fn probe_url(&self, base_url: &str) -> String {
        self.frame_url(base_url, self.run_time)
    }

    /// URL of the frame valid at `timestamp` within this run.
    #[must_use]
    pub fn frame_url(&self, base_url: &str, timestamp: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}.png",
            base_url.trim_end_matches('/'),
            self.run_id,
            format_timestamp(timestamp)
        )
    }
}

/// A single time step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position within the run (0-based).
    pub index: usize,
    /// Instant the frame is valid for.
    pub timestamp: DateTime<Utc>,
    /// Image location on the radar origin.
    pub url: String,
    /// Whether the image fetch succeeded during preload.
    pub loaded: bool,
}

/// Ordered frames of the current run.
///
/// Schedules are replaced wholesale on refresh; a live schedule is never
/// edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    run: Option<Run>,
    frames: Vec<Frame>,
}

impl Schedule {
    /// Expand a run into its 37 frames.
    #[must_use]
    pub fn build(run: Run, base_url: &str) -> Self {
        let frames = (0..FRAME_COUNT)
            .map(|index| {
                #[allow(clippy::cast_possible_wrap, reason = "index < FRAME_COUNT")]
                let offset = TimeDelta::minutes(index as i64 * FRAME_STEP_MINUTES);
                let timestamp = run.run_time + offset;
                Frame {
                    index,
                    timestamp,
                    url: run.frame_url(base_url, timestamp),
                    loaded: false,
                }
            })
            .collect();

        Self {
            run: Some(run),
            frames,
        }
    }

    /// A schedule with no run, used until the first run resolves.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames whose image loaded successfully.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.frames.iter().filter(|f| f.loaded).count()
    }

    /// Index of the frame closest to `target`.
    ///
    /// Scans left to right and only replaces the best candidate on a strictly
    /// smaller distance, so ties resolve to the earlier frame.
    #[must_use]
    pub fn nearest_frame(&self, target: DateTime<Utc>) -> Option<usize> {
        let mut best: Option<(usize, TimeDelta)> = None;
        for frame in &self.frames {
            let diff = (frame.timestamp - target).abs();
            match best {
                Some((_, best_diff)) if diff >= best_diff => {}
                _ => best = Some((frame.index, diff)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Fractional timeline position of `index` (0.0 at the first frame, 1.0 at the last).
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "frame counts are small")]
    pub fn position_of(&self, index: usize) -> f32 {
        if self.frames.len() <= 1 {
            return 0.0;
        }
        index.min(self.frames.len() - 1) as f32 / (self.frames.len() - 1) as f32
    }

    /// Frame index for a fractional timeline position, rounded and clamped.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is clamped to 0..=len-1 before the cast"
    )]
    pub fn index_at(&self, fraction: f32) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            f64::from(fraction).clamp(0.0, 1.0)
        };
        Some(((fraction * last as f64).round() as usize).min(last))
    }

    pub(crate) fn set_loaded(&mut self, index: usize, loaded: bool) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.loaded = loaded;
        }
    }
}
