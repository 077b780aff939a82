//! Terminal capability detection.
//!
//! Deciding whether escape sequences are welcome takes two answers: is the
//! handle a terminal at all, and does the environment allow colors on it.
//! Windows consoles additionally need to be switched into virtual terminal
//! mode before they interpret escapes instead of printing them.

use std::env;
use std::io::{self, IsTerminal};

#[cfg(windows)]
use winapi_util::console as wincon;

/// One of the process's standard output streams.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StandardKind {
    Stdout,
    Stderr,
}

/// Returns true if escape sequences written to `handle` will be interpreted.
pub fn supports_ansi<T: IsTerminal + ?Sized>(handle: &T) -> bool {
    let supported = handle.is_terminal() && env_allows_color();
    tracing::debug!(supported, "ansi support for handle");
    supported
}

/// Like `supports_ansi`, for stdout or stderr.
///
/// On Windows the console is also switched to virtual terminal processing,
/// and support is denied if that fails.
pub fn standard_supports_ansi(kind: StandardKind) -> bool {
    let is_terminal = match kind {
        StandardKind::Stdout => io::stdout().is_terminal(),
        StandardKind::Stderr => io::stderr().is_terminal(),
    };
    let supported =
        is_terminal && env_allows_color() && enable_virtual_terminal(kind);
    tracing::debug!(?kind, supported, "ansi support for standard stream");
    supported
}

/// Opts the console behind `kind` into virtual terminal processing.
///
/// Always succeeds outside of Windows.
#[cfg(not(windows))]
pub fn enable_virtual_terminal(_kind: StandardKind) -> bool {
    true
}

/// Opts the console behind `kind` into virtual terminal processing.
#[cfg(windows)]
pub fn enable_virtual_terminal(kind: StandardKind) -> bool {
    let con_res = match kind {
        StandardKind::Stdout => wincon::Console::stdout(),
        StandardKind::Stderr => wincon::Console::stderr(),
    };
    match con_res {
        Ok(mut con) => match con.set_virtual_terminal_processing(true) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(?kind, %err, "virtual terminal unavailable");
                false
            }
        },
        Err(_) => false,
    }
}

#[cfg(not(windows))]
fn env_allows_color() -> bool {
    match env::var_os("TERM") {
        // If TERM isn't set, then we are in a weird environment that
        // probably doesn't support colors.
        None => return false,
        Some(k) => {
            if k == "dumb" {
                return false;
            }
        }
    }
    // If TERM != dumb, then the only way we don't allow colors at this
    // point is if NO_COLOR is set.
    env::var_os("NO_COLOR").is_none()
}

#[cfg(windows)]
fn env_allows_color() -> bool {
    // On Windows, if TERM isn't set, then we shouldn't automatically
    // assume that colors aren't allowed. This is unlike Unix environments
    // where TERM is more rigorously set.
    if let Some(k) = env::var_os("TERM") {
        if k == "dumb" {
            return false;
        }
    }
    env::var_os("NO_COLOR").is_none()
}
