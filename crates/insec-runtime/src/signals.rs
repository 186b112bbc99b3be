//! Terminal signal handling around a launch.
//!
//! While a child runs, `SIGINT` and `SIGQUIT` typed at the terminal belong
//! to the shell, so the supervisor ignores them. Dispositions are process
//! wide: overlapping launches share one shield, the first holder saves the
//! previous dispositions and the last one restores them.

use std::sync::{Mutex, PoisonError};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

/// Terminal signals meant for the interactive shell, not the supervisor.
pub const SHIELDED_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

struct ShieldState {
    holders: usize,
    saved: Vec<(Signal, SigAction)>,
}

static SHIELD: Mutex<ShieldState> = Mutex::new(ShieldState {
    holders: 0,
    saved: Vec::new(),
});

/// Ignores [`SHIELDED_SIGNALS`] while at least one guard is alive.
#[derive(Debug)]
#[must_use = "signals are only ignored while the guard is alive"]
pub struct SignalShield {
    _private: (),
}

impl SignalShield {
    /// Starts ignoring terminal signals, or joins an already engaged shield.
    pub fn engage() -> Self {
        let mut state = SHIELD.lock().unwrap_or_else(PoisonError::into_inner);
        if state.holders == 0 {
            let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
            for signal in SHIELDED_SIGNALS {
                // SAFETY: SIG_IGN installs no handler code.
                match unsafe { sigaction(signal, &ignore) } {
                    Ok(previous) => state.saved.push((signal, previous)),
                    Err(e) => {
                        tracing::warn!(?signal, error = %e, "cannot ignore signal while waiting");
                    }
                }
            }
        }
        state.holders += 1;
        Self { _private: () }
    }
}

impl Drop for SignalShield {
    fn drop(&mut self) {
        let mut state = SHIELD.lock().unwrap_or_else(PoisonError::into_inner);
        state.holders = state.holders.saturating_sub(1);
        if state.holders > 0 {
            return;
        }
        for (signal, previous) in state.saved.drain(..) {
            // SAFETY: reinstalls the exact disposition that was active
            // before the first `engage`.
            if let Err(e) = unsafe { sigaction(signal, &previous) } {
                tracing::warn!(?signal, error = %e, "cannot restore signal disposition");
            }
        }
    }
}

/// Puts [`SHIELDED_SIGNALS`] back to their default action.
///
/// Called by the child before exec: an ignored disposition survives
/// `execve(2)`, and the shell must see the terminal's signals. Takes no
/// locks and does not allocate.
pub fn reset_for_exec() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in SHIELDED_SIGNALS {
        // SAFETY: SIG_DFL installs no handler code. Setting a valid,
        // catchable signal to its default cannot fail.
        let _ = unsafe { sigaction(signal, &default) };
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    fn current_handler(signal: Signal) -> libc::sighandler_t {
        // SAFETY: a null new action only queries the disposition; `old`
        // is a valid, writable sigaction.
        unsafe {
            let mut old: libc::sigaction = std::mem::zeroed();
            assert_eq!(libc::sigaction(signal as libc::c_int, ptr::null(), &mut old), 0);
            old.sa_sigaction
        }
    }

    // One test owns the process-wide dispositions; splitting it would let
    // the harness run the pieces concurrently.
    #[test]
    fn overlapping_shields_restore_once_and_child_reset_clears_ignore() {
        let before = SHIELDED_SIGNALS.map(current_handler);

        let first = SignalShield::engage();
        let second = SignalShield::engage();
        assert_eq!(current_handler(Signal::SIGINT), libc::SIG_IGN);
        assert_eq!(current_handler(Signal::SIGQUIT), libc::SIG_IGN);

        drop(first);
        assert_eq!(current_handler(Signal::SIGINT), libc::SIG_IGN);
        assert_eq!(current_handler(Signal::SIGQUIT), libc::SIG_IGN);

        drop(second);
        assert_eq!(SHIELDED_SIGNALS.map(current_handler), before);

        let shield = SignalShield::engage();
        reset_for_exec();
        assert_eq!(current_handler(Signal::SIGINT), libc::SIG_DFL);
        assert_eq!(current_handler(Signal::SIGQUIT), libc::SIG_DFL);
        drop(shield);
        assert_eq!(SHIELDED_SIGNALS.map(current_handler), before);
    }
}
