//! Disk-space preflight check: refuses to start work on a volume that
//! is already critically full, and logs a warning once it gets close.

use std::path::Path;

use crate::error::{Result, WrapperError};

const REJECT_THRESHOLD_PCT: f64 = 95.0;
const WARN_THRESHOLD_PCT: f64 = 90.0;

/// Checks free space on the filesystem backing `path`, failing with
/// [`WrapperError::InsufficientDisk`] at or above `REJECT_THRESHOLD_PCT` used.
pub fn check_disk_space(path: &Path) -> Result<()> {
    let used_pct = percent_used(path)?;
    if used_pct >= REJECT_THRESHOLD_PCT {
        return Err(WrapperError::InsufficientDisk {
            path: path.display().to_string(),
            used_pct,
        });
    }
    if used_pct >= WARN_THRESHOLD_PCT {
        tracing::warn!(path = %path.display(), used_pct, "disk usage is high");
    }
    Ok(())
}

#[cfg(unix)]
fn percent_used(path: &Path) -> Result<f64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        WrapperError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"))
    })?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(WrapperError::Io(std::io::Error::last_os_error()));
    }
    let stat = unsafe { stat.assume_init() };
    let total = stat.f_blocks as f64 * stat.f_frsize as f64;
    if total == 0.0 {
        return Ok(0.0);
    }
    let free = stat.f_bfree as f64 * stat.f_frsize as f64;
    Ok((1.0 - free / total) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_filesystem_reports_a_plausible_percentage() {
        let used = percent_used(Path::new("/")).expect("statvfs should succeed on /");
        assert!((0.0..=100.0).contains(&used));
    }
}
