use std::time::Duration;

/// Delay in the form the native program takes on its command line, or
/// `None` when it does not fit.
pub fn whole_millis(delay: Duration) -> Option<u32> {
    delay.as_millis().try_into().ok()
}

#[cfg(windows)]
pub fn to_wide_nul(path: &std::path::Path) -> crate::error::Result<Vec<u16>> {
    use std::os::windows::ffi::OsStrExt;

    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        return Err(crate::error::Error::InvalidPath(path.to_path_buf()));
    }
    wide.push(0);
    Ok(wide)
}
