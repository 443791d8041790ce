//! Process-wide signal capture for the control socket
//!
//! Every catchable asynchronous signal stops the accept loop, not only
//! SIGINT and SIGTERM. Fault signals, uncatchable signals and the ones the
//! engine triggers itself while running (SIGCHLD, SIGPIPE, ...) keep their
//! default behavior.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::{MkError, Result};

static CAUGHT: AtomicI32 = AtomicI32::new(0);

const PASSED_THROUGH: [Signal; 14] = [
    Signal::SIGKILL,
    Signal::SIGSTOP,
    Signal::SIGSEGV,
    Signal::SIGBUS,
    Signal::SIGFPE,
    Signal::SIGILL,
    Signal::SIGTRAP,
    Signal::SIGABRT,
    Signal::SIGSYS,
    Signal::SIGCHLD,
    Signal::SIGPIPE,
    Signal::SIGWINCH,
    Signal::SIGURG,
    Signal::SIGCONT,
];

extern "C" fn record(sig: libc::c_int) {
    CAUGHT.store(sig, Ordering::SeqCst);
}

/// Signals that shut the engine down
pub fn shutdown_signals() -> impl Iterator<Item = Signal> {
    Signal::iterator().filter(|sig| !PASSED_THROUGH.contains(sig))
}

/// Install the recording handler for every shutdown signal.
pub fn install() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(record),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in shutdown_signals() {
        // SAFETY: the handler only performs an atomic store.
        unsafe { signal::sigaction(sig, &action) }
            .map_err(|e| MkError::Socket(format!("cannot handle {}: {}", sig, e)))?;
    }
    Ok(())
}

/// The most recent shutdown signal received, if any.
pub fn caught() -> Option<Signal> {
    match CAUGHT.load(Ordering::SeqCst) {
        0 => None,
        n => Signal::try_from(n).ok(),
    }
}
