//! Filesystem helpers shared by the container and engine layers

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use tracing::debug;

use crate::error::{MkError, Result};

const MODE: u32 = 0o700;

/// Create `dir` and any missing parents. An existing directory is not an error.
pub fn create_dir_all(dir: &Path) -> io::Result<()> {
    DirBuilder::new().recursive(true).mode(MODE).create(dir)
}

/// Write `content` to `dst`, creating missing parent directories.
/// The file is truncated if it already exists.
pub fn write_file(dst: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(MODE)
        .open(dst)?;
    f.write_all(content.as_bytes())
}

/// Return the contents of the file at `src`.
pub fn read_file(src: &Path) -> io::Result<String> {
    fs::read_to_string(src)
}

/// Claim the lowest-numbered free child directory of `parent` and return its name.
///
/// A slot is claimed by a single non-recursive `mkdir`, which the filesystem
/// guarantees to succeed for exactly one caller. That makes allocation safe
/// across threads and processes sharing `parent`. Scanning always restarts
/// from 0, so the cost grows with the number of existing entries.
pub fn mk_unique_dir(parent: &Path) -> Result<String> {
    create_dir_all(parent)?;
    let mut single = DirBuilder::new();
    single.mode(MODE);
    for i in 0..i64::MAX {
        let name = i.to_string();
        match single.create(parent.join(&name)) {
            Ok(()) => {
                debug!("Allocated {} in {}", name, parent.display());
                return Ok(name);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(MkError::Allocation(parent.display().to_string()))
}
