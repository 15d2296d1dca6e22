//! Signal Listener
//!
//! SIGINT and SIGTERM are blocked in every thread and collected
//! synchronously by one dedicated thread, which then drives the server's
//! shutdown. No work happens inside an asynchronous signal handler.
//!
//! [`SignalListener::install`] must run before any other thread is spawned
//! so every thread inherits the mask.

use std::io;
use std::mem::MaybeUninit;
use std::ptr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, ServerError};
use crate::network::ShutdownHandle;

/// How long one `sigtimedwait` call blocks before re-checking the flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Termination signals and their names
const HANDLED: [(libc::c_int, &str); 2] = [(libc::SIGINT, "SIGINT"), (libc::SIGTERM, "SIGTERM")];

/// Owner of the blocked termination-signal set
pub struct SignalListener {
    set: libc::sigset_t,
}

impl SignalListener {
    /// Block SIGINT and SIGTERM for the calling thread and its future
    /// children
    pub fn install() -> Result<Self> {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();

        // SAFETY: sigemptyset initialises the set before it is read.
        let set = unsafe {
            if libc::sigemptyset(set.as_mut_ptr()) != 0 {
                return Err(ServerError::Signal(io::Error::last_os_error()));
            }
            set.assume_init()
        };

        let mut listener = Self { set };
        for (signo, _) in HANDLED {
            // SAFETY: `set` is an initialised sigset_t.
            if unsafe { libc::sigaddset(&mut listener.set, signo) } != 0 {
                return Err(ServerError::Signal(io::Error::last_os_error()));
            }
        }

        // SAFETY: `set` is initialised; the old mask is not requested.
        let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &listener.set, ptr::null_mut()) };
        if rc != 0 {
            return Err(ServerError::Signal(io::Error::from_raw_os_error(rc)));
        }

        tracing::debug!("Termination signals blocked");
        Ok(listener)
    }

    /// Start the listener thread
    ///
    /// The thread triggers `handle` on the first SIGINT/SIGTERM and exits
    /// once shutdown has started for any reason.
    pub fn spawn(self, handle: ShutdownHandle) -> Result<JoinHandle<()>> {
        let thread = thread::Builder::new()
            .name("signal-listener".to_string())
            .spawn(move || self.run(&handle))?;
        Ok(thread)
    }

    fn run(&self, handle: &ShutdownHandle) {
        while !handle.is_triggered() {
            if let Some(signo) = self.wait(POLL_INTERVAL) {
                tracing::info!(signal = signal_name(signo), "Caught signal, exiting");
                handle.trigger();
            }
        }
    }

    /// Wait up to `timeout` for one of the blocked signals
    fn wait(&self, timeout: Duration) -> Option<libc::c_int> {
        let ts = libc::timespec {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_nsec: timeout.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `set` and `ts` are valid for the call; siginfo is not requested.
        let signo = unsafe { libc::sigtimedwait(&self.set, ptr::null_mut(), &ts) };
        (signo > 0).then_some(signo)
    }
}

fn signal_name(signo: libc::c_int) -> &'static str {
    HANDLED
        .iter()
        .find(|(n, _)| *n == signo)
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}
