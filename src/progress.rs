// Copyright 2020 Red Hat, Inc.
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

//! Progress/Logging sink (spec.md §4.8). Human-readable only; nothing here
//! is a machine-parsed contract, so plain `eprintln!`-style formatting
//! (as `osmet::osmet_pack` uses for its own status lines) is enough.

use std::time::Instant;

#[derive(Debug, Clone)]
pub enum Event<'a> {
    HashingImage,
    HashingFile { path: &'a str },
    MatchingFile { path: &'a str, progress_pct: u8 },
    ExtentFound {
        path: &'a str,
        file_offset: u64,
        image_offset: u64,
        length: u64,
    },
    BuildingPlan,
    Emitting,
}

pub trait ProgressSink {
    fn emit(&self, event: Event<'_>);
}

/// Discards every event. Used when `--verbose` is absent, and in tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: Event<'_>) {}
}

/// Prints each event to stderr, prefixed with the elapsed time since the
/// sink was created.
pub struct StderrSink {
    start: Instant,
}

impl StderrSink {
    pub fn new() -> Self {
        StderrSink {
            start: Instant::now(),
        }
    }

    fn stamp(&self) -> String {
        format!("[+{:.3}s]", self.start.elapsed().as_secs_f64())
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for StderrSink {
    fn emit(&self, event: Event<'_>) {
        match event {
            Event::HashingImage => eprintln!("{} hashing image", self.stamp()),
            Event::HashingFile { path } => eprintln!("{} hashing {}", self.stamp(), path),
            Event::MatchingFile { path, progress_pct } => {
                eprintln!("{} matching {} ({}%)", self.stamp(), path, progress_pct)
            }
            Event::ExtentFound {
                path,
                file_offset,
                image_offset,
                length,
            } => eprintln!(
                "{} extent in {}: file@{} -> image@{} ({} bytes)",
                self.stamp(),
                path,
                file_offset,
                image_offset,
                length
            ),
            Event::BuildingPlan => eprintln!("{} building plan", self.stamp()),
            Event::Emitting => eprintln!("{} emitting script", self.stamp()),
        }
    }
}
