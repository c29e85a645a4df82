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

//! Frame playback state machine.
//!
//! The controller is either paused or playing, in both cases pointing at one
//! frame of the installed schedule. Playing advances one frame per timer tick
//! and wraps around at the end of the run. Every index change is pushed to a
//! [`FrameDisplay`].

mod timer;

pub use timer::PeriodicTimer;

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::debug;

use crate::schedule::{time_label, Frame, Schedule};

/// Default time each frame stays on screen while playing.
pub const DEFAULT_ANIMATION_SPEED: Duration = Duration::from_millis(200);

/// How a seek was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Single click on the timeline; play state is left alone.
    Click,
    /// Dragging the timeline handle; always pauses first.
    Drag,
}

/// Everything a UI needs to present the active frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub index: usize,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
    /// `HH:MM` in the local time zone.
    pub label: String,
    /// Timeline position in 0.0..=1.0.
    pub position: f32,
    pub url: String,
    pub loaded: bool,
}

impl FrameView {
    fn new(frame: &Frame, schedule: &Schedule) -> Self {
        Self {
            index: frame.index,
            total: schedule.len(),
            timestamp: frame.timestamp,
            label: time_label(frame.timestamp, &Local),
            position: schedule.position_of(frame.index),
            url: frame.url.clone(),
            loaded: frame.loaded,
        }
    }
}

/// Receives the active frame whenever it changes.
pub trait FrameDisplay {
    fn show_frame(&mut self, view: &FrameView);
}

/// Playing/paused state over a [`Schedule`].
#[derive(Debug)]
pub struct PlaybackController<D> {
    schedule: Schedule,
    current_index: usize,
    playing: bool,
    speed: Duration,
    timer: PeriodicTimer,
    display: D,
}

impl<D: FrameDisplay> PlaybackController<D> {
    pub fn new(display: D, speed: Duration) -> Self {
        Self {
            schedule: Schedule::empty(),
            current_index: 0,
            playing: false,
            speed,
            timer: PeriodicTimer::new(),
            display,
        }
    }

    /// Replace the schedule and jump to the frame nearest `target`.
    ///
    /// The playing flag carries over; the timer itself is left to
    /// [`suspend`](Self::suspend) / [`resume`](Self::resume).
    pub fn install(&mut self, schedule: Schedule, target: DateTime<Utc>) {
        self.schedule = schedule;
        self.current_index = self.schedule.nearest_frame(target).unwrap_or(0);
        if self.schedule.is_empty() {
            self.timer.stop();
            return;
        }
        debug!(
            "Installed schedule of {} frames at index {}",
            self.schedule.len(),
            self.current_index
        );
        self.show_current();
    }

    pub fn play(&mut self) {
        if self.playing || self.schedule.is_empty() {
            return;
        }
        self.playing = true;
        self.timer.start(self.speed);
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.timer.stop();
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop the timer without changing the playing flag.
    pub fn suspend(&mut self) {
        self.timer.stop();
    }

    /// Restart the timer if playback was playing before a [`suspend`](Self::suspend).
    pub fn resume(&mut self) {
        if self.playing && !self.timer.is_active() && !self.schedule.is_empty() {
            self.timer.start(self.speed);
        }
    }

    /// Advance one frame, wrapping to the first after the last.
    pub fn tick(&mut self) {
        if self.schedule.is_empty() {
            return;
        }
        self.show((self.current_index + 1) % self.schedule.len());
    }

    /// Jump to a fractional timeline position. Returns the new index.
    pub fn seek(&mut self, fraction: f32, mode: SeekMode) -> Option<usize> {
        if mode == SeekMode::Drag {
            self.pause();
        }
        let index = self.schedule.index_at(fraction)?;
        self.show(index);
        Some(index)
    }

    /// Make `index` the active frame. Out of range indices are ignored.
    pub fn show(&mut self, index: usize) {
        if index >= self.schedule.len() {
            return;
        }
        self.current_index = index;
        self.show_current();
    }

    /// Change the frame period, restarting a live timer.
    pub fn set_speed(&mut self, speed: Duration) {
        self.speed = speed;
        if self.timer.is_active() {
            self.timer.start(speed);
        }
    }

    /// Wait for the next animation tick; pends forever while paused.
    pub async fn next_tick(&mut self) {
        self.timer.tick().await;
    }

    fn show_current(&mut self) {
        if let Some(view) = self.current_view() {
            self.display.show_frame(&view);
        }
    }

    #[must_use]
    pub fn current_view(&self) -> Option<FrameView> {
        self.schedule
            .frame(self.current_index)
            .map(|frame| FrameView::new(frame, &self.schedule))
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn is_timer_active(&self) -> bool {
        self.timer.is_active()
    }

    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}
