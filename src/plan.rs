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

//! Plan Builder (spec.md §4.7): merges extents from every extracted file
//! with gap-fill literal ranges drawn from the image, producing a totally
//! ordered sequence of segments that partitions `[0, N)` exactly once.
//!
//! The overlap-resolution step here plays the same role as
//! `osmet::canonicalize()` in the teacher's OSTree-object packer, which
//! also sorts mappings and drops/clamps ones that overlap a
//! previously-accepted one in physical-offset space. This builder differs
//! in two ways the spec calls for: it rejects an overlapping extent outright
//! rather than clamping it, and ties are broken by ascending `image_offset`
//! (then by path) rather than by sort stability alone.

use serde::{Deserialize, Serialize};

use crate::discover::VerifiedExtent;
use crate::progress::{Event, ProgressSink};

/// A segment of the reconstruction plan. Derives `Serialize`/`Deserialize`
/// so a plan can be dumped to JSON for inspection or diffing between runs
/// (spec.md §8's determinism property is otherwise hard to eyeball) without
/// the core depending on any particular dump format or CLI surface for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Literal {
        image_offset: u64,
        length: u64,
    },
    Copy {
        file_path: String,
        file_offset: u64,
        image_offset: u64,
        length: u64,
    },
}

impl Segment {
    pub fn image_offset(&self) -> u64 {
        match self {
            Segment::Literal { image_offset, .. } => *image_offset,
            Segment::Copy { image_offset, .. } => *image_offset,
        }
    }

    pub fn length(&self) -> u64 {
        match self {
            Segment::Literal { length, .. } => *length,
            Segment::Copy { length, .. } => *length,
        }
    }
}

/// Builds the ordered segment sequence covering `[0, image_size)` from the
/// pool of per-file verified extents.
///
/// Extents are sorted by descending length, then ascending image offset,
/// then path, before greedy acceptance -- this is also the ordering the
/// spec mandates for deterministic output when extent discovery itself runs
/// in parallel across files (spec.md §5).
pub fn build_plan(
    image_size: u64,
    mut extents: Vec<VerifiedExtent>,
    progress: &dyn ProgressSink,
) -> Vec<Segment> {
    progress.emit(Event::BuildingPlan);

    extents.sort_by(|a, b| {
        b.length
            .cmp(&a.length)
            .then_with(|| a.image_offset.cmp(&b.image_offset))
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    // Greedily accept non-overlapping extents (in image-offset space),
    // keeping accepted ranges sorted by start so overlap can be checked
    // with a binary search rather than a linear scan.
    let mut accepted: Vec<VerifiedExtent> = Vec::new();
    for extent in extents {
        let start = extent.image_offset;
        let end = extent.image_offset + extent.length;
        if start >= end {
            continue; // zero-length extent, nothing to place
        }

        let insert_at = accepted.partition_point(|a| a.image_offset < start);
        let overlaps_left = insert_at > 0 && {
            let prev = &accepted[insert_at - 1];
            prev.image_offset + prev.length > start
        };
        let overlaps_right = insert_at < accepted.len() && accepted[insert_at].image_offset < end;

        if overlaps_left || overlaps_right {
            continue;
        }

        accepted.insert(insert_at, extent);
    }

    // accepted is already sorted by ascending image_offset.
    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0u64;
    for extent in &accepted {
        if extent.image_offset > cursor {
            segments.push(Segment::Literal {
                image_offset: cursor,
                length: extent.image_offset - cursor,
            });
        }
        segments.push(Segment::Copy {
            file_path: extent.file_path.clone(),
            file_offset: extent.file_offset,
            image_offset: extent.image_offset,
            length: extent.length,
        });
        cursor = extent.image_offset + extent.length;
    }
    if cursor < image_size {
        segments.push(Segment::Literal {
            image_offset: cursor,
            length: image_size - cursor,
        });
    }

    segments
}
