//! Write-to-temp-then-rename helpers for pipeline outputs.
//!
//! Outputs that belong together are staged first and only renamed into place
//! once every one of them has been written.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Fully written sibling temp file waiting to replace its target.
///
/// Dropping it without [`Staged::commit`] removes the temp file.
#[derive(Debug)]
pub(crate) struct Staged {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl Staged {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temp file over the target.
    pub(crate) fn commit(self) -> io::Result<()> {
        self.tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

/// Write and sync a sibling temp file for `path` without touching `path`.
pub(crate) fn stage_with<F>(path: &Path, write: F) -> io::Result<Staged>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(Staged {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Write `path` through a sibling temp file, replacing it only once `write`
/// succeeded and the data is flushed.
pub(crate) fn write_with<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    stage_with(path, write)?.commit()
}

/// Stage `bytes` for `path`.
pub(crate) fn stage_bytes(path: &Path, bytes: &[u8]) -> io::Result<Staged> {
    stage_with(path, |writer| writer.write_all(bytes))
}
