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

//! End-to-end scenarios from spec.md §8, run against in-memory sources
//! through the whole pipeline (index -> discover -> plan) rather than unit
//! by unit.

use libimgrecon::config::Config;
use libimgrecon::generate_plan;
use libimgrecon::plan::Segment;
use libimgrecon::progress::NullSink;
use libimgrecon::source::ByteSource;

fn linear_image(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i * 37 % 251) as u8).collect()
}

fn boxed(name: &str, data: Vec<u8>) -> (String, Box<dyn ByteSource>) {
    (
        name.to_string(),
        Box::new(libimgrecon::source::test_support::InMemorySource::new(
            name, data,
        )),
    )
}

fn cfg(block_size: u64, min_extent_size: u64, step_size: u64) -> Config {
    Config::new(block_size, min_extent_size, step_size, 4096).unwrap()
}

fn assert_covers(segments: &[Segment], image_size: u64) {
    let mut cursor = 0u64;
    for seg in segments {
        assert_eq!(seg.image_offset(), cursor);
        cursor += seg.length();
    }
    assert_eq!(cursor, image_size);
}

#[test]
fn scenario_exact_overlay() {
    let image_data = linear_image(256);
    let file_data = image_data[64..192].to_vec();
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_covers(&segments, 256);
    assert_eq!(
        segments,
        vec![
            Segment::Literal { image_offset: 0, length: 64 },
            Segment::Copy {
                file_path: "f".into(),
                file_offset: 0,
                image_offset: 64,
                length: 128,
            },
            Segment::Literal { image_offset: 192, length: 64 },
        ]
    );
}

#[test]
fn scenario_no_match() {
    let image_data = linear_image(128);
    let file_data = vec![0u8; 128];
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(segments, vec![Segment::Literal { image_offset: 0, length: 128 }]);
}

#[test]
fn scenario_two_files_overlap_in_image_space() {
    let image_data = linear_image(256);
    let f1 = image_data[0..128].to_vec();
    let f2 = image_data[64..192].to_vec();
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f1", f1), boxed("f2", f2)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_covers(&segments, 256);
    assert_eq!(
        segments,
        vec![
            Segment::Copy {
                file_path: "f1".into(),
                file_offset: 0,
                image_offset: 0,
                length: 128,
            },
            Segment::Literal { image_offset: 128, length: 128 },
        ]
    );
}

#[test]
fn scenario_extension_beyond_minimum() {
    let image_data = linear_image(512);
    let file_data = image_data[0..300].to_vec();
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_covers(&segments, 512);
    assert_eq!(
        segments,
        vec![
            Segment::Copy {
                file_path: "f".into(),
                file_offset: 0,
                image_offset: 0,
                length: 300,
            },
            Segment::Literal { image_offset: 300, length: 212 },
        ]
    );
}

#[test]
fn scenario_misaligned_file_produces_no_copy() {
    let image_data = linear_image(256);
    let file_data = image_data[5..5 + 74].to_vec();
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(segments, vec![Segment::Literal { image_offset: 0, length: 256 }]);
}

#[test]
fn scenario_multiple_extents_per_file() {
    let m = 64u64;
    let image_data = linear_image((4 * m) as usize);
    let mut file_data = image_data[0..m as usize].to_vec();
    file_data.extend((0..m).map(|i| (200u64 + i) as u8));
    file_data.extend(image_data[(3 * m) as usize..(4 * m) as usize].to_vec());

    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, m, m);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_covers(&segments, 4 * m);
    let copies: Vec<_> = segments
        .iter()
        .filter(|s| matches!(s, Segment::Copy { .. }))
        .collect();
    assert_eq!(copies.len(), 2);
}

#[test]
fn scenario_empty_file_list() {
    let image_data = linear_image(300);
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files: Vec<(String, Box<dyn ByteSource>)> = vec![];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(segments, vec![Segment::Literal { image_offset: 0, length: 300 }]);
}

#[test]
fn scenario_image_smaller_than_minimum_extent() {
    // N < M: plan is a single Literal(0, N); no matching attempted.
    let image_data = linear_image(40);
    let file_data = image_data.clone();
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(segments, vec![Segment::Literal { image_offset: 0, length: 40 }]);
}

#[test]
fn scenario_candidate_within_minimum_of_image_end_is_not_fatal() {
    // N=256, B=16, M=64: the file's first block matches the image's very
    // last block, a candidate that can never carry an M-length extent.
    // This must not abort the run with an out-of-range read.
    let image_data = linear_image(256);
    let mut file_data = image_data[240..256].to_vec();
    file_data.extend(vec![0xAAu8; 64]);
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(segments, vec![Segment::Literal { image_offset: 0, length: 256 }]);
}

#[test]
fn scenario_file_longer_than_image() {
    // Extension must be bounded by N; no out-of-range reads past the
    // image's end even though the file keeps going.
    let image_data = linear_image(64);
    let mut file_data = image_data.clone();
    file_data.extend(vec![0xFFu8; 32]);
    let image = libimgrecon::source::test_support::InMemorySource::new("img", image_data);
    let files = vec![boxed("f", file_data)];
    let config = cfg(16, 64, 64);

    let segments = generate_plan(&image, &files, &config, &NullSink).unwrap();
    assert_eq!(
        segments,
        vec![Segment::Copy {
            file_path: "f".into(),
            file_offset: 0,
            image_offset: 0,
            length: 64,
        }]
    );
}
