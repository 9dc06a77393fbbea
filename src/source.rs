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

//! Byte-sequence abstraction over the image and extracted files.
//!
//! The original tool this was distilled from treats both as duck-typed
//! file-like objects; here the two concrete sources (the image, an
//! extracted file) implement one explicit trait instead.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A read-only, randomly-addressable byte sequence of known length.
pub trait ByteSource {
    /// Path used for error messages.
    fn path(&self) -> &Path;

    /// Total length of the sequence in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` completely from `offset`. A short read is a fatal
    /// [`Error::ShortRead`] -- callers are expected to have already bounded
    /// `offset + buf.len()` by [`ByteSource::len`].
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

fn pread_exact(file: &File, path: &Path, offset: u64, buf: &mut [u8]) -> Result<()> {
    let mut got = 0;
    while got < buf.len() {
        let n = file
            .read_at(&mut buf[got..], offset + got as u64)
            .map_err(|source| Error::Io {
                path: path.to_owned(),
                offset: offset + got as u64,
                source,
            })?;
        if n == 0 {
            return Err(Error::ShortRead {
                path: path.to_owned(),
                offset,
                expected: buf.len(),
                got,
            });
        }
        got += n;
    }
    Ok(())
}

/// The original binary image being reconstructed.
pub struct Image {
    path: PathBuf,
    file: File,
    len: u64,
}

impl Image {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| Error::InputMissing {
            path: path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| Error::Io {
                path: path.clone(),
                offset: 0,
                source,
            })?
            .len();
        Ok(Image { path, file, len })
    }
}

impl ByteSource for Image {
    fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        pread_exact(&self.file, &self.path, offset, buf)
    }
}

/// A file already present on the target, which may share content with the
/// image. `expected_len` is the length recorded when the file was listed;
/// it is compared against the length observed on open to catch the file
/// having changed underneath us (`Size-mismatch`, spec.md §7).
pub struct ExtractedFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl ExtractedFile {
    pub fn open(path: impl Into<PathBuf>, expected_len: u64) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| Error::InputMissing {
            path: path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| Error::Io {
                path: path.clone(),
                offset: 0,
                source,
            })?
            .len();
        if len != expected_len {
            return Err(Error::SizeMismatch {
                path,
                expected: expected_len,
                found: len,
            });
        }
        Ok(ExtractedFile { path, file, len })
    }
}

impl ByteSource for ExtractedFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        pread_exact(&self.file, &self.path, offset, buf)
    }
}

/// In-memory [`ByteSource`] used by this crate's own tests and by
/// downstream integration tests (`tests/plan.rs`) that want to exercise
/// discovery/plan logic without touching disk.
pub mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// An in-memory [`ByteSource`], used by unit and integration tests so
    /// the discovery/plan logic can be exercised without touching disk.
    pub struct InMemorySource {
        path: PathBuf,
        data: Vec<u8>,
        // records offsets read, for tests that want to assert access patterns
        pub reads: RefCell<Vec<(u64, usize)>>,
    }

    impl InMemorySource {
        pub fn new(name: &str, data: Vec<u8>) -> Self {
            InMemorySource {
                path: PathBuf::from(name),
                data,
                reads: RefCell::new(Vec::new()),
            }
        }
    }

    impl ByteSource for InMemorySource {
        fn path(&self) -> &Path {
            &self.path
        }

        fn len(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
            let offset = offset as usize;
            if offset + buf.len() > self.data.len() {
                return Err(Error::ShortRead {
                    path: self.path.clone(),
                    offset: offset as u64,
                    expected: buf.len(),
                    got: self.data.len().saturating_sub(offset),
                });
            }
            self.reads.borrow_mut().push((offset as u64, buf.len()));
            buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
            Ok(())
        }
    }
}
