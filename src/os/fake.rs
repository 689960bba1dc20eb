//! Scripted in-memory primitives that record every call.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ChildHandles, OsPrimitives, StdStream, WaitStatus};
use crate::error::{Error, Result};
use crate::handles::StdHandleSet;
use crate::raw_handle::RawHandle;

const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_INVALID_HANDLE: u32 = 6;
const BASE_HANDLE_COUNT: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    StdHandle(StdStream),
    Duplicate(RawHandle),
    CreateProcess(PathBuf, StdHandleSet),
    Wait(RawHandle),
    ExitCode(RawHandle),
    Close(RawHandle),
    Copy(PathBuf, PathBuf),
    Delete(PathBuf),
    HandleCount,
    Sleep(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    StdHandle,
    Duplicate,
    CreateProcess,
    Wait,
    ExitCode,
    Close,
    Copy,
    Delete,
}

impl Op {
    fn function(self) -> &'static str {
        match self {
            Op::StdHandle => "GetStdHandle",
            Op::Duplicate => "DuplicateHandle",
            Op::CreateProcess => "CreateProcess",
            Op::Wait => "WaitForSingleObject",
            Op::ExitCode => "GetExitCodeProcess",
            Op::Close => "CloseHandle",
            Op::Copy => "CopyFile",
            Op::Delete => "DeleteFile",
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    counts: HashMap<Op, usize>,
    faults: HashMap<(Op, usize), u32>,
    wait_status: Option<WaitStatus>,
    exit_code: u32,
    next_handle: usize,
    open: HashSet<RawHandle>,
    processes: HashSet<RawHandle>,
    files: HashSet<PathBuf>,
    leak_on_create: bool,
    read_disk: bool,
    overwrites: usize,
    watched: Option<PathBuf>,
    sightings: Vec<bool>,
}

pub(crate) struct FakeOs {
    state: RefCell<State>,
}

impl FakeOs {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_handle: 0x100,
                ..State::default()
            }),
        }
    }

    /// The handle `GetStdHandle` reports for `stream`.
    pub fn std_handle_of(stream: StdStream) -> RawHandle {
        RawHandle::from_raw(match stream {
            StdStream::Input => 0x10,
            StdStream::Output => 0x14,
            StdStream::Error => 0x18,
        })
    }

    /// Fails the `occurrence`-th (zero-based) call of `op` with `code`.
    pub fn fail_on(&self, op: Op, occurrence: usize, code: u32) {
        self.state.borrow_mut().faults.insert((op, occurrence), code);
    }

    pub fn set_wait_status(&self, status: WaitStatus) {
        self.state.borrow_mut().wait_status = Some(status);
    }

    pub fn set_exit_code(&self, code: u32) {
        self.state.borrow_mut().exit_code = code;
    }

    /// Every process creation leaves one extra handle open.
    pub fn leak_on_create(&self) {
        self.state.borrow_mut().leak_on_create = true;
    }

    /// Sources that exist on the real filesystem count as present.
    pub fn read_disk(&self) {
        self.state.borrow_mut().read_disk = true;
    }

    /// On every copy, note whether `path` exists on the real filesystem.
    pub fn watch(&self, path: &Path) {
        self.state.borrow_mut().watched = Some(path.to_path_buf());
    }

    /// One entry per copy since [`FakeOs::watch`] was called.
    pub fn sightings(&self) -> Vec<bool> {
        self.state.borrow().sightings.clone()
    }

    /// Copies that found the destination still in place.
    pub fn overwrites(&self) -> usize {
        self.state.borrow().overwrites
    }

    pub fn add_file(&self, path: &Path) {
        self.state.borrow_mut().files.insert(path.to_path_buf());
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        self.state.borrow().files.contains(path)
    }

    pub fn is_open(&self, handle: RawHandle) -> bool {
        self.state.borrow().open.contains(&handle)
    }

    pub fn open_handles(&self) -> usize {
        self.state.borrow().open.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of times `op` was attempted.
    pub fn count(&self, op: Op) -> usize {
        self.state.borrow().counts.get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: Op, call: Call) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        let seen = state.counts.entry(op).or_insert(0);
        let occurrence = *seen;
        *seen += 1;
        match state.faults.get(&(op, occurrence)) {
            Some(&code) => Err(Error::system_call(op.function(), code)),
            None => Ok(()),
        }
    }

    fn allocate(state: &mut State) -> RawHandle {
        let handle = RawHandle::from_raw(state.next_handle);
        state.next_handle += 4;
        state.open.insert(handle);
        handle
    }
}

impl OsPrimitives for FakeOs {
    fn std_handle(&self, stream: StdStream) -> Result<RawHandle> {
        self.enter(Op::StdHandle, Call::StdHandle(stream))?;
        Ok(Self::std_handle_of(stream))
    }

    fn current_process(&self) -> RawHandle {
        RawHandle::from_raw(usize::MAX)
    }

    fn duplicate_inheritable(&self, process: RawHandle, handle: RawHandle) -> Result<RawHandle> {
        assert_eq!(process, self.current_process());
        self.enter(Op::Duplicate, Call::Duplicate(handle))?;
        Ok(Self::allocate(&mut self.state.borrow_mut()))
    }

    fn create_process(&self, executable: &Path, stdio: &StdHandleSet) -> Result<ChildHandles> {
        self.enter(
            Op::CreateProcess,
            Call::CreateProcess(executable.to_path_buf(), *stdio),
        )?;
        let mut state = self.state.borrow_mut();
        for stream in StdStream::ALL {
            if !state.open.contains(&stdio.get(stream)) {
                return Err(Error::system_call("CreateProcess", ERROR_INVALID_HANDLE));
            }
        }
        if !state.files.contains(executable) {
            return Err(Error::system_call("CreateProcess", ERROR_FILE_NOT_FOUND));
        }
        let process = Self::allocate(&mut state);
        let thread = Self::allocate(&mut state);
        state.processes.insert(process);
        if state.leak_on_create {
            Self::allocate(&mut state);
        }
        Ok(ChildHandles { process, thread })
    }

    fn wait_infinite(&self, handle: RawHandle) -> Result<WaitStatus> {
        self.enter(Op::Wait, Call::Wait(handle))?;
        let state = self.state.borrow();
        if !state.processes.contains(&handle) || !state.open.contains(&handle) {
            return Err(Error::system_call("WaitForSingleObject", ERROR_INVALID_HANDLE));
        }
        Ok(state.wait_status.unwrap_or(WaitStatus::Signaled))
    }

    fn exit_code(&self, process: RawHandle) -> Result<u32> {
        self.enter(Op::ExitCode, Call::ExitCode(process))?;
        let state = self.state.borrow();
        if !state.open.contains(&process) {
            return Err(Error::system_call("GetExitCodeProcess", ERROR_INVALID_HANDLE));
        }
        Ok(state.exit_code)
    }

    fn close(&self, handle: RawHandle) -> Result<()> {
        self.enter(Op::Close, Call::Close(handle))?;
        let mut state = self.state.borrow_mut();
        if !state.open.remove(&handle) {
            return Err(Error::system_call("CloseHandle", ERROR_INVALID_HANDLE));
        }
        state.processes.remove(&handle);
        Ok(())
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> Result<()> {
        self.enter(
            Op::Copy,
            Call::Copy(source.to_path_buf(), destination.to_path_buf()),
        )?;
        let mut state = self.state.borrow_mut();
        if let Some(watched) = state.watched.clone() {
            state.sightings.push(watched.exists());
        }
        if !state.files.contains(source) && !(state.read_disk && source.exists()) {
            return Err(Error::system_call("CopyFile", ERROR_FILE_NOT_FOUND));
        }
        if !state.files.insert(destination.to_path_buf()) {
            state.overwrites += 1;
        }
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        self.enter(Op::Delete, Call::Delete(path.to_path_buf()))?;
        if !self.state.borrow_mut().files.remove(path) {
            return Err(Error::system_call("DeleteFile", ERROR_FILE_NOT_FOUND));
        }
        Ok(())
    }

    fn handle_count(&self) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::HandleCount);
        Ok(BASE_HANDLE_COUNT + state.open.len() as u32)
    }

    fn sleep(&self, duration: Duration) {
        self.state.borrow_mut().calls.push(Call::Sleep(duration));
    }
}
