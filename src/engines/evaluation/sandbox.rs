//! Isolated, time-bounded execution of candidate machine code.
//!
//! Every trial maps the candidate into a fresh execute-only page and runs it
//! in a forked child process, so arithmetic traps, wild memory accesses and
//! illegal instructions only ever kill the child. A `sandbox-worker` thread
//! waits for the child without reaping it and reports through a one-shot
//! channel; the calling thread is the watchdog and kills the child once the
//! deadline passes. The child is reaped only after that decision, so the
//! kill can never hit a recycled pid.

use super::exec_page::{system_page_size, ExecutablePage};
use crate::config::SandboxConfig;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Exit status of a child that could not report its result
const CHILD_WRITE_FAILED: libc::c_int = 70;

/// Why a trial produced no return value
#[derive(Error, Debug)]
pub enum Fault {
    #[error("Code of {size} bytes exceeds the {limit} byte page")]
    CodeTooLarge { size: usize, limit: usize },

    #[error("Executable memory unavailable: {0}")]
    UnmappableMemory(#[source] io::Error),

    #[error("Arithmetic fault")]
    ArithmeticFault,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Crashed with signal {signal}")]
    Crashed { signal: i32 },

    #[error("Worker exited with status {code}")]
    Exited { code: i32 },

    #[error("Could not isolate trial: {0}")]
    Isolation(#[source] io::Error),
}

/// Runs a flat machine-code buffer and returns its rax
pub trait Executor {
    fn execute(&self, code: &[u8]) -> Result<u64, Fault>;
}

pub struct Sandbox {
    timeout: Duration,
    args: [u64; 3],
    page_size: usize,
}

impl Sandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            timeout: config.timeout(),
            args: config.args,
            page_size: config.page_size.unwrap_or_else(system_page_size),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Execute `code` as `extern "C" fn(u64, u64, u64) -> u64`
    pub fn run(&self, code: &[u8]) -> Result<u64, Fault> {
        if code.len() > self.page_size {
            return Err(Fault::CodeTooLarge {
                size: code.len(),
                limit: self.page_size,
            });
        }

        let mut page = ExecutablePage::map(self.page_size).map_err(Fault::UnmappableMemory)?;
        page.load(code).map_err(Fault::UnmappableMemory)?;

        let (reader, writer) = result_pipe().map_err(Fault::Isolation)?;

        // SAFETY: the child only makes async-signal-safe calls before _exit
        match unsafe { libc::fork() } {
            -1 => Err(Fault::Isolation(io::Error::last_os_error())),
            0 => unsafe { run_child(page.entry(), self.args, writer.as_raw_fd()) },
            pid => {
                drop(writer);
                self.supervise(pid, reader)
            }
        }
        // page is unmapped here on every path
    }

    fn supervise(&self, pid: libc::pid_t, reader: File) -> Result<u64, Fault> {
        let (done_tx, done_rx) = mpsc::sync_channel::<io::Result<()>>(1);

        let worker = thread::Builder::new()
            .name("sandbox-worker".to_string())
            .spawn(move || {
                let _ = done_tx.send(wait_for_exit(pid));
            });

        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                kill(pid);
                let _ = reap(pid);
                return Err(Fault::Isolation(e));
            }
        };

        let verdict = match done_rx.recv_timeout(self.timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                kill(pid);
                Err(Fault::Isolation(e))
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!("trial pid {} exceeded {:?}, killing", pid, self.timeout);
                kill(pid);
                let _ = done_rx.recv();
                Err(Fault::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                kill(pid);
                Err(Fault::Isolation(io::Error::new(
                    io::ErrorKind::Other,
                    "sandbox worker exited without reporting",
                )))
            }
        };

        let _ = worker.join();
        let status = reap(pid).map_err(Fault::Isolation)?;
        verdict?;

        decode_status(status, reader)
    }
}

impl Executor for Sandbox {
    fn execute(&self, code: &[u8]) -> Result<u64, Fault> {
        self.run(code)
    }
}

fn result_pipe() -> io::Result<(File, File)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: fds has room for the two descriptors pipe2 writes
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: both descriptors are freshly created and owned by nobody else
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((File::from(read), File::from(write)))
}

/// Block until the child has terminated, leaving it unreaped
fn wait_for_exit(pid: libc::pid_t) -> io::Result<()> {
    loop {
        // SAFETY: a zeroed siginfo_t is a valid out-parameter
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn reap(pid: libc::pid_t) -> io::Result<libc::c_int> {
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: pid is a child of this process
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn kill(pid: libc::pid_t) {
    // SAFETY: pid is an unreaped child, so it cannot have been recycled
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
}

fn decode_status(status: libc::c_int, mut reader: File) -> Result<u64, Fault> {
    if libc::WIFSIGNALED(status) {
        return match libc::WTERMSIG(status) {
            libc::SIGFPE => Err(Fault::ArithmeticFault),
            signal => Err(Fault::Crashed { signal }),
        };
    }

    let code = if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else {
        -1
    };
    if code != 0 {
        return Err(Fault::Exited { code });
    }

    let mut raw = [0u8; 8];
    reader.read_exact(&mut raw).map_err(Fault::Isolation)?;
    Ok(u64::from_le_bytes(raw))
}

/// Body of the forked child. Never returns.
unsafe fn run_child(entry: *const u8, args: [u64; 3], fd: RawFd) -> ! {
    libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
    for signal in [
        libc::SIGFPE,
        libc::SIGSEGV,
        libc::SIGBUS,
        libc::SIGILL,
        libc::SIGTRAP,
    ] {
        libc::signal(signal, libc::SIG_DFL);
    }

    let value = enter(entry, args);

    let bytes = value.to_le_bytes();
    let written = libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len());
    libc::_exit(if written == bytes.len() as isize {
        0
    } else {
        CHILD_WRITE_FAILED
    })
}

/// Call the candidate with a zeroed register file apart from the three
/// arguments. Callee-saved registers are restored afterwards regardless of
/// what the candidate did to them.
unsafe fn enter(entry: *const u8, args: [u64; 3]) -> u64 {
    let value: u64;
    std::arch::asm!(
        "push rbx",
        "push rbp",
        "push {entry}",
        "sub rsp, 8",
        "xor eax, eax",
        "xor ebx, ebx",
        "xor ecx, ecx",
        "xor r8d, r8d",
        "xor r9d, r9d",
        "xor r10d, r10d",
        "xor r11d, r11d",
        "xor r12d, r12d",
        "xor r13d, r13d",
        "xor r14d, r14d",
        "xor r15d, r15d",
        "call qword ptr [rsp + 8]",
        "add rsp, 16",
        "pop rbp",
        "pop rbx",
        entry = in(reg) entry,
        inlateout("rdi") args[0] => _,
        inlateout("rsi") args[1] => _,
        inlateout("rdx") args[2] => _,
        lateout("rax") value,
        out("r12") _,
        out("r13") _,
        out("r14") _,
        out("r15") _,
        clobber_abi("C"),
    );
    value
}
