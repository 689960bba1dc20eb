use std::path::Path;

use log::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::{CycleError, Step};
use crate::launcher::Launcher;
use crate::os::OsPrimitives;

/// Number of copy/run/delete rounds per side.
pub const ITERATIONS: usize = 100;

/// Summary of a cycle that completed every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub iterations: usize,
    /// Exit code of the last child; never checked.
    pub last_exit_code: Option<u32>,
    /// Handle count after the run minus the count before it, when both
    /// samples could be taken.
    pub leaked_handles: Option<i64>,
}

/// Copies, runs and deletes an executable over and over.
pub struct Driver<O> {
    os: O,
    config: RunConfig,
}

impl<O: OsPrimitives> Driver<O> {
    pub fn new(os: O, config: RunConfig) -> Self {
        Self { os, config }
    }

    /// Runs `iterations` rounds of copy `source` to `destination`, launch
    /// `destination`, delete `destination`, stopping at the first failure.
    pub fn run_cycle(
        &self,
        destination: &Path,
        source: &Path,
        iterations: usize,
    ) -> Result<CycleReport, CycleError> {
        let launcher = Launcher::new(&self.os, self.config.delay);
        let baseline = self.sample_handle_count();
        let mut last_exit_code = None;

        for iteration in 0..iterations {
            let fail = |step, err| CycleError {
                iteration,
                step,
                source: err,
            };

            self.os
                .copy_file(source, destination)
                .map_err(|e| fail(Step::CopyFile, e))?;
            let code = launcher
                .launch(destination)
                .map_err(|e| fail(Step::Launch, e))?;
            self.os
                .delete_file(destination)
                .map_err(|e| fail(Step::DeleteFile, e))?;

            debug!("iteration {iteration}: exit code {code}");
            last_exit_code = Some(code);
        }

        let leaked_handles = match (baseline, self.sample_handle_count()) {
            (Some(before), Some(after)) => Some(i64::from(after) - i64::from(before)),
            _ => None,
        };
        match leaked_handles {
            Some(leaked) if leaked > 0 => {
                warn!("{leaked} handle(s) still open after {iterations} iterations")
            }
            _ => info!("{iterations} iterations completed"),
        }

        Ok(CycleReport {
            iterations,
            last_exit_code,
            leaked_handles,
        })
    }

    fn sample_handle_count(&self) -> Option<u32> {
        match self.os.handle_count() {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("cannot sample handle count: {err}");
                None
            }
        }
    }
}
