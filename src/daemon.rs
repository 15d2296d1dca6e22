//! Daemonizing
//!
//! Detaches the process from its controlling terminal. Must run before any
//! thread is spawned: only the calling thread survives `fork`.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;

use crate::error::{Result, ServerError};

/// Fork into the background
///
/// The parent exits with status 0. The child starts a new session, moves
/// to `/` and points stdin, stdout and stderr at `/dev/null`.
pub fn daemonize() -> Result<()> {
    // SAFETY: single-threaded at this point; the child only continues with
    // ordinary Rust code.
    match unsafe { libc::fork() } {
        -1 => return Err(os_error("fork")),
        0 => {}
        _ => std::process::exit(0),
    }

    // SAFETY: no preconditions beyond not already being a group leader,
    // which a freshly forked child never is.
    if unsafe { libc::setsid() } < 0 {
        return Err(os_error("setsid"));
    }

    std::env::set_current_dir("/")
        .map_err(|e| ServerError::Daemonize(format!("chdir: {}", e)))?;

    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| ServerError::Daemonize(format!("open /dev/null: {}", e)))?;

    for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        // SAFETY: both descriptors are open; dup2 atomically replaces `fd`.
        if unsafe { libc::dup2(devnull.as_raw_fd(), fd) } < 0 {
            return Err(os_error("dup2"));
        }
    }

    Ok(())
}

fn os_error(call: &str) -> ServerError {
    ServerError::Daemonize(format!("{}: {}", call, io::Error::last_os_error()))
}
