use std::path::Path;

/// Mark a file as hidden.
///
/// On Windows this sets `FILE_ATTRIBUTE_HIDDEN`. Elsewhere the dot-prefixed
/// sidecar names are already hidden, so only existence is checked.
///
/// # Errors
/// Returns an error if the file does not exist or its attributes cannot be
/// updated.
#[cfg(windows)]
pub fn hide_file(path: &Path) -> std::io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_HIDDEN, GetFileAttributesW, INVALID_FILE_ATTRIBUTES, SetFileAttributesW,
    };

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives both calls.
    let attributes = unsafe { GetFileAttributesW(wide.as_ptr()) };
    if attributes == INVALID_FILE_ATTRIBUTES {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: see above.
    let ok = unsafe { SetFileAttributesW(wide.as_ptr(), attributes | FILE_ATTRIBUTE_HIDDEN) };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn hide_file(path: &Path) -> std::io::Result<()> {
    std::fs::symlink_metadata(path).map(|_| ())
}
