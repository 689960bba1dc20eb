//! Reproduction harness for golang.org/issue/25965: deleting an executable
//! right after the process running it has exited sometimes fails on
//! Windows, because the OS releases its last reference to the image file
//! asynchronously.
//!
//! The [`cycle::Driver`] copies an executable, runs it through the
//! [`launcher::Launcher`] and deletes it, a hundred times. The
//! [`harness::Harness`] runs that loop in-process and then through the
//! separately built `native-cycle` program, so a failure can be pinned on
//! either the runtime or the OS.

pub mod config;
pub mod cycle;
pub mod error;
pub mod handles;
pub mod harness;
pub mod launcher;
pub mod os;
pub mod raw_handle;
pub mod utils;

pub use config::RunConfig;
pub use cycle::{CycleReport, Driver, ITERATIONS};
pub use error::{CycleError, Error, Step};
pub use harness::{Comparison, Harness, Verdict};
pub use launcher::Launcher;
pub use os::{OsPrimitives, StdStream};
