//! Writing the aggregated results CSV.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::Builder;

/// Write `content` verbatim to `path`, replacing any existing file.
///
/// The bytes go to a temporary file next to `path` which is renamed over it
/// only after a successful flush, so a failed write leaves `path` untouched.
/// Missing parent directories are created. The file gets the same
/// permissions a plain create would: those of the file it replaces, or the
/// default mode under the process umask.
pub fn write_results(content: &str, path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut builder = Builder::new();
    builder.prefix(".mlanalyzer-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // The umask still applies, as it does for `File::create`.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let tmp = builder.tempfile_in(dir)?;
    if let Ok(existing) = std::fs::metadata(path) {
        if existing.is_file() {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
    }

    let mut writer = BufWriter::new(tmp);
    writer.write_all(content.as_bytes())?;
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
