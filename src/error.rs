use std::fmt;
use std::path::PathBuf;

/// Errors raised by the OS primitives and the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An OS call reported failure.
    SystemCall {
        /// Name of the failing call, e.g. `"DeleteFile"`.
        function: &'static str,
        /// `GetLastError()` value captured right after the call.
        code: u32,
    },

    /// A call returned something other than its documented success or
    /// failure value.
    UnexpectedResult { function: &'static str, value: u32 },

    /// The path cannot be encoded as a NUL-terminated wide string.
    InvalidPath(PathBuf),
}

impl Error {
    pub fn system_call(function: &'static str, code: u32) -> Self {
        Self::SystemCall { function, code }
    }
}

/// Short description for the codes this harness runs into.
pub fn describe_code(code: u32) -> Option<&'static str> {
    match code {
        2 => Some("file not found"),
        5 => Some("access denied"),
        32 => Some("sharing violation"),
        _ => None,
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemCall { function, code } => match describe_code(*code) {
                Some(what) => write!(f, "{function} failed (error {code}: {what})"),
                None => write!(f, "{function} failed (error {code})"),
            },
            Self::UnexpectedResult { function, value } => {
                write!(f, "unexpected result {value:#x} from {function}")
            }
            Self::InvalidPath(path) => {
                write!(f, "path {} contains an interior NUL", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// The step of a cycle iteration that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CopyFile,
    Launch,
    DeleteFile,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CopyFile => "copy",
            Self::Launch => "run",
            Self::DeleteFile => "delete",
        })
    }
}

/// First failure observed by the lifecycle driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Zero-based iteration index.
    pub iteration: usize,
    pub step: Step,
    pub source: Error,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {} failed: {}: {}",
            self.iteration, self.step, self.source
        )
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
