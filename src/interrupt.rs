//! Ctrl+C bookkeeping.
//!
//! The terminal delivers SIGINT to terraform as well, and terraform shuts down
//! on its own. The wrapper only records the signal: the run stops at the next
//! step, after switching back to the default workspace.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(test)]
thread_local! {
    static SIMULATED: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

#[cfg(unix)]
pub fn install() -> anyhow::Result<()> {
    // A handler (unlike SIG_IGN) is reset on exec, so children still get the default behavior.
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        anyhow::bail!(
            "cannot install SIGINT handler: {}",
            std::io::Error::last_os_error()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> anyhow::Result<()> {
    Ok(())
}

#[cfg(unix)]
extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether SIGINT arrived. Once set, it stays set for the rest of the run.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst) || simulated()
}

#[cfg(not(test))]
fn simulated() -> bool {
    false
}

#[cfg(test)]
fn simulated() -> bool {
    SIMULATED.with(|s| s.get())
}

/// Behave as if Ctrl+C was pressed, for the current test thread only.
#[cfg(test)]
pub fn simulate() {
    SIMULATED.with(|s| s.set(true));
}

/// Error returned by the step that noticed the interruption.
pub fn ensure_not_interrupted() -> anyhow::Result<()> {
    anyhow::ensure!(!interrupted(), "interrupted by the user");
    Ok(())
}
