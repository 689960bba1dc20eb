// newtype for HANDLE values

/// An OS handle value passed between the launcher and the OS primitives.
///
/// It does not close anything on drop; whoever obtained it closes it
/// explicitly, in the order the launcher dictates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawHandle(usize);

impl RawHandle {
    pub const fn from_raw(value: usize) -> Self {
        Self(value)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    #[cfg(windows)]
    pub(crate) fn from_ptr(handle: *mut std::ffi::c_void) -> Self {
        Self(handle as usize)
    }

    #[cfg(windows)]
    pub(crate) fn as_ptr(self) -> *mut std::ffi::c_void {
        self.0 as *mut _
    }
}

