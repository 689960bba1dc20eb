//! The narrow set of process and file primitives the harness issues.
//!
//! [`Win32`] is the only production implementation. Everything above this
//! module is written against [`OsPrimitives`] so the call order can be
//! checked on any host.

use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::handles::StdHandleSet;
use crate::raw_handle::RawHandle;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::Win32;

/// One of the three standard streams of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdStream {
    Input,
    Output,
    Error,
}

impl StdStream {
    pub const ALL: [StdStream; 3] = [StdStream::Input, StdStream::Output, StdStream::Error];
}

/// Handles returned by a successful process creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHandles {
    pub process: RawHandle,
    pub thread: RawHandle,
}

/// Result of an infinite wait that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Signaled,
    /// Any other value, e.g. `WAIT_ABANDONED`.
    Other(u32),
}

pub trait OsPrimitives {
    /// `GetStdHandle`.
    fn std_handle(&self, stream: StdStream) -> Result<RawHandle>;

    /// Pseudo handle of the calling process.
    fn current_process(&self) -> RawHandle;

    /// `DuplicateHandle` within `process`, same access, inheritable.
    fn duplicate_inheritable(&self, process: RawHandle, handle: RawHandle) -> Result<RawHandle>;

    /// `CreateProcess` with inherited handles, the given standard handles
    /// and an empty wide-character environment block.
    fn create_process(&self, executable: &Path, stdio: &StdHandleSet) -> Result<ChildHandles>;

    /// `WaitForSingleObject` with no timeout. A `WAIT_FAILED` is an `Err`.
    fn wait_infinite(&self, handle: RawHandle) -> Result<WaitStatus>;

    fn exit_code(&self, process: RawHandle) -> Result<u32>;

    fn close(&self, handle: RawHandle) -> Result<()>;

    /// `CopyFile` with overwrite permitted.
    fn copy_file(&self, source: &Path, destination: &Path) -> Result<()>;

    fn delete_file(&self, path: &Path) -> Result<()>;

    /// `GetProcessHandleCount` for the calling process.
    fn handle_count(&self) -> Result<u32>;

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: OsPrimitives + ?Sized> OsPrimitives for &T {
    fn std_handle(&self, stream: StdStream) -> Result<RawHandle> {
        (**self).std_handle(stream)
    }

    fn current_process(&self) -> RawHandle {
        (**self).current_process()
    }

    fn duplicate_inheritable(&self, process: RawHandle, handle: RawHandle) -> Result<RawHandle> {
        (**self).duplicate_inheritable(process, handle)
    }

    fn create_process(&self, executable: &Path, stdio: &StdHandleSet) -> Result<ChildHandles> {
        (**self).create_process(executable, stdio)
    }

    fn wait_infinite(&self, handle: RawHandle) -> Result<WaitStatus> {
        (**self).wait_infinite(handle)
    }

    fn exit_code(&self, process: RawHandle) -> Result<u32> {
        (**self).exit_code(process)
    }

    fn close(&self, handle: RawHandle) -> Result<()> {
        (**self).close(handle)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> Result<()> {
        (**self).copy_file(source, destination)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        (**self).delete_file(path)
    }

    fn handle_count(&self) -> Result<u32> {
        (**self).handle_count()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
