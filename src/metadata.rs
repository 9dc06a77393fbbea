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

//! Metadata collection -- one of the "thin adapters" spec.md §1 explicitly
//! scopes out of the core. The core only ever passes a [`FileMetadata`]
//! record through opaquely (attached to an extracted file); it never
//! inspects it.

use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, Result};
use openssl::hash::{Hasher, MessageDigest};
use std::io::copy;

/// Which optional metadata fields to collect, mirroring the CLI's
/// `--no-ownership` / `--no-acl` / `--no-md5` / `--no-sha256` toggles.
#[derive(Debug, Clone, Copy)]
pub struct MetadataOptions {
    pub ownership: bool,
    pub acl: bool,
    pub md5: bool,
    pub sha256: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        MetadataOptions {
            ownership: true,
            acl: true,
            md5: true,
            sha256: true,
        }
    }
}

/// Opaque per-file metadata, passed through by the core untouched.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub mode: u32,
    pub owner: Option<u32>,
    pub group: Option<u32>,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub acl: Option<Vec<u8>>,
    pub md5: Option<[u8; 16]>,
    pub sha256: Option<[u8; 32]>,
}

const ACL_ACCESS_XATTR: &str = "system.posix_acl_access";

/// Reads the `system.posix_acl_access` extended attribute, if any. Returns
/// `None` when the attribute is absent (the common case for files with only
/// the standard owner/group/other permission bits).
fn read_acl(path: &Path) -> Result<Option<Vec<u8>>> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .with_context(|| format!("{:?}: path contains a NUL byte", path))?;
    let c_attr = CString::new(ACL_ACCESS_XATTR).expect("static string has no NUL");

    let needed = unsafe {
        libc::getxattr(
            c_path.as_ptr(),
            c_attr.as_ptr(),
            std::ptr::null_mut(),
            0,
        )
    };
    if needed < 0 {
        // ENODATA/ENOTSUP both mean "no ACL"; anything else we surface.
        let errno = std::io::Error::last_os_error();
        match errno.raw_os_error() {
            Some(libc::ENODATA) | Some(libc::ENOTSUP) => return Ok(None),
            _ => return Err(errno).with_context(|| format!("reading ACL of {:?}", path)),
        }
    }
    if needed == 0 {
        return Ok(None);
    }

    let mut buf = vec![0u8; needed as usize];
    let got = unsafe {
        libc::getxattr(
            c_path.as_ptr(),
            c_attr.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if got < 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("reading ACL of {:?}", path));
    }
    buf.truncate(got as usize);
    Ok(Some(buf))
}

fn digest(path: &Path, algorithm: MessageDigest) -> Result<Vec<u8>> {
    let mut f = fs::File::open(path).with_context(|| format!("opening {:?}", path))?;
    let mut hasher = Hasher::new(algorithm).context("creating hasher")?;
    copy(&mut f, &mut hasher).with_context(|| format!("hashing {:?}", path))?;
    Ok(hasher.finish().context("finishing hash")?.to_vec())
}

/// Collects metadata for one extracted file, honoring `options`.
pub fn collect(path: &Path, options: MetadataOptions) -> Result<FileMetadata> {
    let meta = fs::symlink_metadata(path).with_context(|| format!("stat {:?}", path))?;

    let (owner, group) = if options.ownership {
        (Some(meta.uid()), Some(meta.gid()))
    } else {
        (None, None)
    };

    let acl = if options.acl {
        read_acl(path)?
    } else {
        None
    };

    let md5 = if options.md5 {
        let raw = digest(path, MessageDigest::md5())?;
        let mut out = [0u8; 16];
        out.copy_from_slice(&raw);
        Some(out)
    } else {
        None
    };

    let sha256 = if options.sha256 {
        let raw = digest(path, MessageDigest::sha256())?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&raw);
        Some(out)
    } else {
        None
    };

    Ok(FileMetadata {
        mode: meta.mode(),
        owner,
        group,
        mtime: meta.mtime(),
        mtime_nsec: meta.mtime_nsec(),
        acl,
        md5,
        sha256,
    })
}
