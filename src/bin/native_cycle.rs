//! The comparison side of the harness: the same copy, run, delete loop,
//! issued straight through `winapi` with none of the library's code in
//! between.
//!
//! Usage: `native-cycle <destination> <source> <delay-ms>`. Exits 0 when all
//! iterations pass and 1 at the first failure, with the failing iteration and
//! call on stderr.

use std::ffi::OsString;
use std::process::ExitCode;

use issue25965::ITERATIONS;

#[cfg(windows)]
mod native {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr::null_mut;

    use winapi::shared::minwindef::{DWORD, FALSE, TRUE};
    use winapi::um::errhandlingapi::GetLastError;
    use winapi::um::fileapi::DeleteFileW;
    use winapi::um::handleapi::{CloseHandle, DuplicateHandle, INVALID_HANDLE_VALUE};
    use winapi::um::processenv::GetStdHandle;
    use winapi::um::processthreadsapi::{
        CreateProcessW, GetCurrentProcess, GetExitCodeProcess, PROCESS_INFORMATION, STARTUPINFOW,
    };
    use winapi::um::synchapi::{Sleep, WaitForSingleObject};
    use winapi::um::winbase::{
        CREATE_UNICODE_ENVIRONMENT, CopyFileW, INFINITE, STARTF_USESTDHANDLES, STD_ERROR_HANDLE,
        STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, WAIT_OBJECT_0,
    };
    use winapi::um::winnt::{DUPLICATE_SAME_ACCESS, HANDLE};

    pub fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(Some(0)).collect()
    }

    fn dup_std_handle(which: DWORD) -> Result<HANDLE, String> {
        unsafe {
            let h = GetStdHandle(which);
            let p = GetCurrentProcess();
            let mut dup: HANDLE = null_mut();
            if h == INVALID_HANDLE_VALUE
                || DuplicateHandle(p, h, p, &mut dup, 0, TRUE, DUPLICATE_SAME_ACCESS) == FALSE
            {
                return Err(format!("DuplicateHandle failed ({})", GetLastError()));
            }
            Ok(dup)
        }
    }

    fn run_exe(argv0: &[u16], ms: u32) -> Result<(), String> {
        unsafe {
            let mut si: STARTUPINFOW = std::mem::zeroed();
            si.cb = std::mem::size_of::<STARTUPINFOW>() as DWORD;
            si.dwFlags = STARTF_USESTDHANDLES;
            si.hStdInput = dup_std_handle(STD_INPUT_HANDLE)?;
            si.hStdOutput = dup_std_handle(STD_OUTPUT_HANDLE)?;
            si.hStdError = dup_std_handle(STD_ERROR_HANDLE)?;

            let mut pi: PROCESS_INFORMATION = std::mem::zeroed();
            let mut env = [0u16; 2];

            if CreateProcessW(
                argv0.as_ptr(),
                null_mut(),
                null_mut(),
                null_mut(),
                TRUE,
                CREATE_UNICODE_ENVIRONMENT,
                env.as_mut_ptr() as *mut _,
                std::ptr::null(),
                &mut si,
                &mut pi,
            ) == FALSE
            {
                return Err(format!("CreateProcess failed ({})", GetLastError()));
            }

            CloseHandle(pi.hThread);
            CloseHandle(si.hStdError);
            CloseHandle(si.hStdOutput);
            CloseHandle(si.hStdInput);

            let h = pi.hProcess;

            if WaitForSingleObject(h, INFINITE) != WAIT_OBJECT_0 {
                return Err(format!("WaitForSingleObject failed ({})", GetLastError()));
            }

            let mut ec: DWORD = 0;
            if GetExitCodeProcess(h, &mut ec) == FALSE {
                return Err(format!("GetExitCodeProcess failed ({})", GetLastError()));
            }

            if ms > 0 {
                Sleep(ms);
            }

            if CloseHandle(h) == FALSE {
                return Err(format!("CloseHandle failed ({})", GetLastError()));
            }
        }
        Ok(())
    }

    pub fn run_cycle(
        dstexe: &[u16],
        srcexe: &[u16],
        ms: u32,
        iterations: usize,
    ) -> Result<(), String> {
        for i in 0..iterations {
            unsafe {
                if CopyFileW(srcexe.as_ptr(), dstexe.as_ptr(), FALSE) == FALSE {
                    return Err(format!(
                        "iteration {i}: CopyFile failed ({})",
                        GetLastError()
                    ));
                }
            }

            run_exe(dstexe, ms).map_err(|e| format!("{e}\nduring iteration {i}"))?;

            unsafe {
                if DeleteFileW(dstexe.as_ptr()) == FALSE {
                    return Err(format!(
                        "iteration {i}: DeleteFile failed ({})",
                        GetLastError()
                    ));
                }
            }
        }
        Ok(())
    }
}

struct Args {
    destination: OsString,
    source: OsString,
    delay_ms: u32,
}

fn parse_args(args: Vec<OsString>) -> Result<Args, String> {
    let [destination, source, delay] = <[OsString; 3]>::try_from(args)
        .map_err(|_| "usage: native-cycle <destination> <source> <delay-ms>".to_string())?;
    let delay_ms = delay
        .to_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("invalid delay {delay:?}"))?;
    Ok(Args {
        destination,
        source,
        delay_ms,
    })
}

#[cfg(windows)]
fn run(args: Args) -> Result<(), String> {
    let dstexe = native::wide(&args.destination);
    let srcexe = native::wide(&args.source);
    native::run_cycle(&dstexe, &srcexe, args.delay_ms, ITERATIONS)
}

#[cfg(not(windows))]
fn run(args: Args) -> Result<(), String> {
    Err(format!(
        "cannot run {ITERATIONS} iterations on {:?}: Windows only",
        args.destination
    ))
}

fn main() -> ExitCode {
    let result = parse_args(std::env::args_os().skip(1).collect()).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
