//! SIGINT wiring for cooperative cancellation.
//!
//! The handler only stores into an atomic flag; the job observes the flag
//! between actions and finalizes the run. A second Ctrl-C therefore still
//! terminates promptly once the current file operation finishes.
#![allow(unsafe_code)]

use engine::CancelFlag;

#[cfg(unix)]
pub fn install() -> CancelFlag {
    use std::sync::OnceLock;

    static FLAG: OnceLock<CancelFlag> = OnceLock::new();

    extern "C" fn handle_sigint(_signal: libc::c_int) {
        if let Some(flag) = FLAG.get() {
            flag.cancel();
        }
    }

    let flag = FLAG.get_or_init(CancelFlag::new).clone();
    let handler: extern "C" fn(libc::c_int) = handle_sigint;
    // SAFETY: the handler is async-signal-safe; it performs a single
    // atomic store and no allocation or locking.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
    flag
}

#[cfg(not(unix))]
pub fn install() -> CancelFlag {
    CancelFlag::new()
}
