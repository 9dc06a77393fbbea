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

use anyhow::{Context, Result};
use clap::Parser;

use libimgrecon::cli::Args;
use libimgrecon::config::Config;
use libimgrecon::filelist::read_file_list;
use libimgrecon::generate_plan_from_paths;
use libimgrecon::metadata::{self, MetadataOptions};
use libimgrecon::progress::{NullSink, ProgressSink, StderrSink};
use libimgrecon::script::write_script;
use libimgrecon::source::Image;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::new(
        args.block_size,
        args.min_extent_size,
        args.step_size(),
        args.write_chunk_size,
    )
    .context("validating configuration")?;

    let sink: Box<dyn ProgressSink> = if args.verbose {
        Box::new(StderrSink::new())
    } else {
        Box::new(NullSink)
    };

    let file_list = read_file_list(args.input.as_deref(), args.null)
        .context("reading extracted-file list")?;

    let mut file_paths = Vec::with_capacity(file_list.len());
    for path in &file_list {
        let len = std::fs::metadata(path)
            .with_context(|| format!("stat {:?}", path))?
            .len();
        file_paths.push((
            path.to_str()
                .with_context(|| format!("{:?} is not valid UTF-8", path))?
                .to_string(),
            len,
        ));
    }

    let segments =
        generate_plan_from_paths(&args.image, &file_paths, &config, sink.as_ref())?;

    let metadata_options = MetadataOptions {
        ownership: !args.no_ownership,
        acl: !args.no_acl,
        md5: !args.no_md5,
        sha256: !args.no_sha256,
    };
    let image_metadata = metadata::collect(std::path::Path::new(&args.image), metadata_options)
        .context("collecting image metadata")?;

    sink.emit(libimgrecon::progress::Event::Emitting);
    let image = Image::open(&args.image).context("re-opening image for script emission")?;
    write_script(
        std::path::Path::new(&args.output),
        &image,
        &segments,
        Some(&image_metadata),
    )
    .context("writing reconstruction script")?;

    Ok(())
}
