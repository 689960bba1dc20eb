use std::path::Path;
use std::ptr::{null, null_mut};

use windows_sys::Win32::{
    Foundation::{
        CloseHandle, DUPLICATE_SAME_ACCESS, DuplicateHandle, GetLastError, HANDLE,
        INVALID_HANDLE_VALUE, WAIT_FAILED, WAIT_OBJECT_0,
    },
    Storage::FileSystem::{CopyFileW, DeleteFileW},
    System::{
        Console::{GetStdHandle, STD_ERROR_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE},
        Threading::{
            CREATE_UNICODE_ENVIRONMENT, CreateProcessW, GetCurrentProcess, GetExitCodeProcess,
            GetProcessHandleCount, INFINITE, PROCESS_INFORMATION, STARTF_USESTDHANDLES,
            STARTUPINFOW, WaitForSingleObject,
        },
    },
};

use super::{ChildHandles, OsPrimitives, StdStream, WaitStatus};
use crate::error::{Error, Result};
use crate::handles::StdHandleSet;
use crate::raw_handle::RawHandle;
use crate::utils::to_wide_nul;

/// An empty environment block in the wide-character format: the block is
/// terminated by two NULs.
const EMPTY_ENVIRONMENT: [u16; 2] = [0, 0];

/// The Win32 implementation of the primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32;

fn last_error(function: &'static str) -> Error {
    Error::system_call(function, unsafe { GetLastError() })
}

impl OsPrimitives for Win32 {
    fn std_handle(&self, stream: StdStream) -> Result<RawHandle> {
        let id = match stream {
            StdStream::Input => STD_INPUT_HANDLE,
            StdStream::Output => STD_OUTPUT_HANDLE,
            StdStream::Error => STD_ERROR_HANDLE,
        };
        let handle = unsafe { GetStdHandle(id) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(last_error("GetStdHandle"));
        }
        Ok(RawHandle::from_ptr(handle))
    }

    fn current_process(&self) -> RawHandle {
        RawHandle::from_ptr(unsafe { GetCurrentProcess() })
    }

    fn duplicate_inheritable(&self, process: RawHandle, handle: RawHandle) -> Result<RawHandle> {
        let mut dup: HANDLE = null_mut();
        let ok = unsafe {
            DuplicateHandle(
                process.as_ptr(),
                handle.as_ptr(),
                process.as_ptr(),
                &mut dup,
                0,
                1,
                DUPLICATE_SAME_ACCESS,
            )
        };
        if ok == 0 {
            return Err(last_error("DuplicateHandle"));
        }
        Ok(RawHandle::from_ptr(dup))
    }

    fn create_process(&self, executable: &Path, stdio: &StdHandleSet) -> Result<ChildHandles> {
        let application = to_wide_nul(executable)?;
        let environment = EMPTY_ENVIRONMENT;

        let mut si = unsafe { std::mem::zeroed::<STARTUPINFOW>() };
        si.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
        si.dwFlags = STARTF_USESTDHANDLES;
        si.hStdInput = stdio.input.as_ptr();
        si.hStdOutput = stdio.output.as_ptr();
        si.hStdError = stdio.error.as_ptr();

        let mut pi = unsafe { std::mem::zeroed::<PROCESS_INFORMATION>() };
        let ok = unsafe {
            CreateProcessW(
                application.as_ptr(),
                null_mut(),
                null(),
                null(),
                1,
                CREATE_UNICODE_ENVIRONMENT,
                environment.as_ptr() as *const _,
                null(),
                &si,
                &mut pi,
            )
        };
        if ok == 0 {
            return Err(last_error("CreateProcess"));
        }
        Ok(ChildHandles {
            process: RawHandle::from_ptr(pi.hProcess),
            thread: RawHandle::from_ptr(pi.hThread),
        })
    }

    fn wait_infinite(&self, handle: RawHandle) -> Result<WaitStatus> {
        let status = unsafe { WaitForSingleObject(handle.as_ptr(), INFINITE) };
        if status == WAIT_OBJECT_0 {
            Ok(WaitStatus::Signaled)
        } else if status == WAIT_FAILED {
            Err(last_error("WaitForSingleObject"))
        } else {
            Ok(WaitStatus::Other(status))
        }
    }

    fn exit_code(&self, process: RawHandle) -> Result<u32> {
        let mut code = 0u32;
        if unsafe { GetExitCodeProcess(process.as_ptr(), &mut code) } == 0 {
            return Err(last_error("GetExitCodeProcess"));
        }
        Ok(code)
    }

    fn close(&self, handle: RawHandle) -> Result<()> {
        if unsafe { CloseHandle(handle.as_ptr()) } == 0 {
            return Err(last_error("CloseHandle"));
        }
        Ok(())
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> Result<()> {
        let source = to_wide_nul(source)?;
        let destination = to_wide_nul(destination)?;
        if unsafe { CopyFileW(source.as_ptr(), destination.as_ptr(), 0) } == 0 {
            return Err(last_error("CopyFile"));
        }
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        let path = to_wide_nul(path)?;
        if unsafe { DeleteFileW(path.as_ptr()) } == 0 {
            return Err(last_error("DeleteFile"));
        }
        Ok(())
    }

    fn handle_count(&self) -> Result<u32> {
        let mut count = 0u32;
        if unsafe { GetProcessHandleCount(GetCurrentProcess(), &mut count) } == 0 {
            return Err(last_error("GetProcessHandleCount"));
        }
        Ok(count)
    }
}
