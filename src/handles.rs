use log::{trace, warn};

use crate::error::Result;
use crate::os::{OsPrimitives, StdStream};
use crate::raw_handle::RawHandle;

/// Returns an inheritable duplicate of the current process's handle for
/// `which`, with the same access rights.
pub fn duplicate<O: OsPrimitives>(os: &O, which: StdStream) -> Result<RawHandle> {
    let handle = os.std_handle(which)?;
    let process = os.current_process();
    let dup = os.duplicate_inheritable(process, handle)?;
    trace!("duplicated {which:?} handle {handle:?} as {dup:?}");
    Ok(dup)
}

/// The three duplicated standard handles handed to one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdHandleSet {
    pub input: RawHandle,
    pub output: RawHandle,
    pub error: RawHandle,
}

impl StdHandleSet {
    /// Duplicates input, output and error in that order. If a later
    /// duplication fails, the ones already made are closed.
    pub fn duplicate<O: OsPrimitives>(os: &O) -> Result<Self> {
        let input = duplicate(os, StdStream::Input)?;
        let output = match duplicate(os, StdStream::Output) {
            Ok(handle) => handle,
            Err(err) => {
                close_quietly(os, input);
                return Err(err);
            }
        };
        let error = match duplicate(os, StdStream::Error) {
            Ok(handle) => handle,
            Err(err) => {
                close_quietly(os, output);
                close_quietly(os, input);
                return Err(err);
            }
        };
        Ok(Self {
            input,
            output,
            error,
        })
    }

    pub fn get(&self, which: StdStream) -> RawHandle {
        match which {
            StdStream::Input => self.input,
            StdStream::Output => self.output,
            StdStream::Error => self.error,
        }
    }

    /// Closes error, output, then input. A failing close is logged and the
    /// remaining handles are still closed.
    pub fn release<O: OsPrimitives>(self, os: &O) {
        close_quietly(os, self.error);
        close_quietly(os, self.output);
        close_quietly(os, self.input);
    }
}

pub(crate) fn close_quietly<O: OsPrimitives>(os: &O, handle: RawHandle) {
    if let Err(err) = os.close(handle) {
        warn!("closing handle {handle:?}: {err}");
    }
}
