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

//! Cancellable periodic timer with a single owner.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A periodic tick source that is either running or stopped.
///
/// The handle is not `Clone`: whoever owns it is the only one able to start
/// or cancel it, and starting again replaces the previous interval, so at
/// most one timer is ever live. Must be started from within a Tokio runtime.
#[derive(Debug, Default)]
pub struct PeriodicTimer {
    interval: Option<Interval>,
}

impl PeriodicTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `period`, first tick one period from now.
    pub fn start(&mut self, period: Duration) {
        let period = period.max(MIN_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Cancel the timer. Pending `tick()` calls never complete afterwards.
    pub fn stop(&mut self) {
        self.interval = None;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }

    /// Wait for the next tick. Pends forever while stopped, which makes it
    /// safe to use as a `tokio::select!` branch.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
