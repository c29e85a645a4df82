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

//! Discovery of the most recently published forecast run.
//!
//! Runs appear on the origin a few minutes after they are generated, with a
//! variable lag and no directory listing. The resolver therefore walks
//! backwards from the current time and probes each candidate in turn.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};

use crate::schedule::{floor_to_step, Run};
use crate::source::RadarSource;

/// Minutes subtracted from the rounded current time, most recent first.
pub const RUN_PROBE_OFFSETS_MINUTES: [i64; 6] = [5, 10, 15, 20, 25, 30];

/// Candidate runs for `now`, in the order they are probed.
#[must_use]
pub fn candidate_runs(now: DateTime<Utc>) -> [Run; 6] {
    let base = floor_to_step(now);
    RUN_PROBE_OFFSETS_MINUTES.map(|offset| Run::new(base - TimeDelta::minutes(offset)))
}

/// Finds the latest run available on a [`RadarSource`].
pub struct RunResolver {
    source: Arc<dyn RadarSource>,
    base_url: String,
}

impl std::fmt::Debug for RunResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunResolver")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RunResolver {
    pub fn new(source: Arc<dyn RadarSource>, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the candidates for `now` and return the first one that exists.
    ///
    /// Transport errors count as "not published". Returns `None` when no
    /// candidate could be confirmed.
    pub async fn resolve_latest(&self, now: DateTime<Utc>) -> Option<Run> {
        for run in candidate_runs(now) {
            let url = run.probe_url(&self.base_url);
            match self.source.exists(&url).await {
                Ok(true) => {
                    info!("Latest radar run is {}", run.run_id());
                    return Some(run);
                }
                Ok(false) => debug!("Run {} not published", run.run_id()),
                Err(e) => debug!("Probe for run {} failed: {}", run.run_id(), e),
            }
        }

        warn!(
            "No radar run found within {} minutes of {}",
            RUN_PROBE_OFFSETS_MINUTES[RUN_PROBE_OFFSETS_MINUTES.len() - 1],
            now
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;
    use chrono::TimeZone;

    const BASE: &str = "https://radar.test/runs";

    fn utc(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, mi, s).unwrap()
    }

    #[test]
    fn test_candidates_step_back_from_rounded_now() {
        let ids: Vec<String> = candidate_runs(utc(10, 13, 42))
            .iter()
            .map(|r| r.run_id().to_string())
            .collect();
        assert_eq!(
            ids,
            [
                "202401011005",
                "202401011000",
                "202401010955",
                "202401010950",
                "202401010945",
                "202401010940"
            ]
        );
    }

    #[test]
    fn test_candidates_roll_back_over_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 12, 0).unwrap();
        let runs = candidate_runs(now);
        assert_eq!(runs[0].run_id(), "202403010005");
        assert_eq!(runs[1].run_id(), "202403010000");
        assert_eq!(runs[2].run_id(), "202402292355");
        assert_eq!(runs[5].run_id(), "202402292340");
    }

    #[tokio::test]
    async fn test_resolve_returns_first_existing_and_stops() {
        let runs = candidate_runs(utc(10, 13, 0));
        let source = Arc::new(MockSource::new().with_run(&runs[2], BASE).with_run(&runs[4], BASE));
        let resolver = RunResolver::new(source.clone(), BASE);

        let run = resolver.resolve_latest(utc(10, 13, 0)).await.unwrap();

        assert_eq!(run, runs[2]);
        assert_eq!(source.probes().len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_probes_in_decreasing_recency() {
        let source = Arc::new(MockSource::new());
        let resolver = RunResolver::new(source.clone(), BASE);

        assert!(resolver.resolve_latest(utc(10, 13, 0)).await.is_none());

        let expected: Vec<String> = candidate_runs(utc(10, 13, 0))
            .iter()
            .map(|r| r.probe_url(BASE))
            .collect();
        assert_eq!(source.probes(), expected);
    }

    #[tokio::test]
    async fn test_resolve_treats_errors_as_missing() {
        let runs = candidate_runs(utc(10, 13, 0));
        let source = Arc::new(
            MockSource::new()
                .with_run(&runs[0], BASE)
                .with_probe_error(&runs[0].probe_url(BASE))
                .with_run(&runs[1], BASE),
        );
        let resolver = RunResolver::new(source.clone(), BASE);

        assert_eq!(resolver.resolve_latest(utc(10, 13, 0)).await, Some(runs[1].clone()));
        assert_eq!(source.probes().len(), 2);
    }
}
