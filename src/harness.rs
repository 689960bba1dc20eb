//! Runs the managed driver and the native comparison program against the
//! same paths and compares the outcomes.

use std::env::consts::EXE_SUFFIX;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, bail};
use log::{info, warn};

use crate::config::RunConfig;
use crate::cycle::{CycleReport, Driver, ITERATIONS};
use crate::error::CycleError;
use crate::os::OsPrimitives;
use crate::utils::whole_millis;

const TARGET_SOURCE: &str = "fn main() {}\n";

/// What the native comparison program reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeOutcome {
    /// `None` when the program was terminated without an exit code.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

impl NativeOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    BothPassed,
    /// Only the managed side failed: the runtime's handle handling differs
    /// from the plain OS call sequence.
    ManagedOnly,
    NativeOnly,
    /// Both failed, which points at the OS itself.
    BothFailed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BothPassed => "both sides passed",
            Self::ManagedOnly => "only the managed side failed",
            Self::NativeOnly => "only the native side failed",
            Self::BothFailed => "both sides failed",
        })
    }
}

#[derive(Debug)]
pub struct Comparison {
    pub managed: Result<CycleReport, CycleError>,
    pub native: NativeOutcome,
}

impl Comparison {
    pub fn verdict(&self) -> Verdict {
        match (self.managed.is_ok(), self.native.passed()) {
            (true, true) => Verdict::BothPassed,
            (false, true) => Verdict::ManagedOnly,
            (true, false) => Verdict::NativeOnly,
            (false, false) => Verdict::BothFailed,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::BothPassed
    }
}

/// Builds the throwaway target, then runs the managed side followed by the
/// native side.
pub struct Harness<O> {
    os: O,
    config: RunConfig,
    native_exe: PathBuf,
    rustc: OsString,
    keep_temp: bool,
}

impl<O: OsPrimitives> Harness<O> {
    pub fn new(os: O, config: RunConfig, native_exe: PathBuf) -> Self {
        Self {
            os,
            config,
            native_exe,
            rustc: std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into()),
            keep_temp: false,
        }
    }

    pub fn rustc(mut self, rustc: impl Into<OsString>) -> Self {
        self.rustc = rustc.into();
        self
    }

    pub fn keep_temp(mut self, keep: bool) -> Self {
        self.keep_temp = keep;
        self
    }

    pub fn run(&self) -> anyhow::Result<Comparison> {
        let workdir = tempfile::Builder::new()
            .prefix("TestIssue25965")
            .tempdir()
            .context("creating work directory")?;

        let source = build_target_exe(&self.rustc, workdir.path())?;
        let destination = workdir.path().join(format!("a2{EXE_SUFFIX}"));

        info!(
            "managed side: {ITERATIONS} iterations on {}",
            destination.display()
        );
        let managed =
            Driver::new(&self.os, self.config).run_cycle(&destination, &source, ITERATIONS);
        if let Err(err) = &managed {
            warn!("managed side: {err}");
        }

        info!("native side: {}", self.native_exe.display());
        let native = run_native(&self.native_exe, &destination, &source, self.config)?;
        if !native.passed() {
            warn!("native side: {}", native.output.trim_end());
        }

        if self.keep_temp {
            let kept = workdir.keep();
            info!("work directory kept at {}", kept.display());
        }

        Ok(Comparison { managed, native })
    }
}

/// `native-cycle` next to the running executable.
pub fn default_native_exe() -> anyhow::Result<PathBuf> {
    let current = std::env::current_exe().context("locating current executable")?;
    Ok(current.with_file_name(format!("native-cycle{EXE_SUFFIX}")))
}

/// Compiles an empty program into `dir` and returns its path.
pub fn build_target_exe(rustc: &OsString, dir: &Path) -> anyhow::Result<PathBuf> {
    let src = dir.join("a.rs");
    std::fs::write(&src, TARGET_SOURCE)
        .with_context(|| format!("writing {}", src.display()))?;

    let exe = dir.join(format!("a_rs{EXE_SUFFIX}"));
    let output = Command::new(rustc)
        .arg("-o")
        .arg(&exe)
        .arg(&src)
        .output()
        .with_context(|| format!("running {}", rustc.to_string_lossy()))?;
    if !output.status.success() {
        bail!(
            "building test executable failed: {} {}",
            output.status,
            combined(&output)
        );
    }
    Ok(exe)
}

/// Runs the native program with `<destination> <source> <delay-ms>`.
pub fn run_native(
    native_exe: &Path,
    destination: &Path,
    source: &Path,
    config: RunConfig,
) -> anyhow::Result<NativeOutcome> {
    let Some(delay_ms) = whole_millis(config.delay) else {
        bail!(
            "delay of {:?} does not fit the native program's millisecond argument",
            config.delay
        );
    };
    let output = Command::new(native_exe)
        .arg(destination)
        .arg(source)
        .arg(delay_ms.to_string())
        .output()
        .with_context(|| format!("running {}", native_exe.display()))?;
    Ok(NativeOutcome {
        exit_code: output.status.code(),
        output: combined(&output),
    })
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
