use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::handles::{StdHandleSet, close_quietly};
use crate::os::{OsPrimitives, WaitStatus};
use crate::raw_handle::RawHandle;

/// Runs one executable to completion with the same sequence of handle
/// operations the runtime's own launcher uses.
pub struct Launcher<O> {
    os: O,
    delay: Duration,
}

impl<O: OsPrimitives> Launcher<O> {
    pub fn new(os: O, delay: Duration) -> Self {
        Self { os, delay }
    }

    /// Starts `executable`, waits for it without a timeout and returns its
    /// exit code. The code is not interpreted.
    ///
    /// The thread handle and the three standard handles are closed right
    /// after creation, in that order; the process handle is closed last,
    /// after the optional delay.
    pub fn launch(&self, executable: &Path) -> Result<u32> {
        if executable.as_os_str().as_encoded_bytes().contains(&0) {
            return Err(Error::InvalidPath(executable.to_path_buf()));
        }

        let stdio = StdHandleSet::duplicate(&self.os)?;
        let child = match self.os.create_process(executable, &stdio) {
            Ok(child) => child,
            Err(err) => {
                stdio.release(&self.os);
                return Err(err);
            }
        };
        debug!(
            "started {} (process {:?}, thread {:?})",
            executable.display(),
            child.process,
            child.thread
        );

        close_quietly(&self.os, child.thread);
        stdio.release(&self.os);

        let process = child.process;
        let exit_code = match self.wait_and_query(process) {
            Ok(code) => code,
            Err(err) => {
                close_quietly(&self.os, process);
                return Err(err);
            }
        };
        debug!("{} exited with {exit_code}", executable.display());

        if !self.delay.is_zero() {
            self.os.sleep(self.delay);
        }

        self.os.close(process)?;
        Ok(exit_code)
    }

    fn wait_and_query(&self, process: RawHandle) -> Result<u32> {
        match self.os.wait_infinite(process)? {
            WaitStatus::Signaled => {}
            WaitStatus::Other(value) => {
                return Err(Error::UnexpectedResult {
                    function: "WaitForSingleObject",
                    value,
                });
            }
        }
        self.os.exit_code(process)
    }
}
