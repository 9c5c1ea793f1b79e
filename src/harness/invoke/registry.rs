//! In-process generator registration and exit signaling.
//!
//! Generators bundled for in-process use register a typed entry function
//! under the fully qualified entry symbol their launcher names. The harness
//! looks the symbol up here instead of loading code reflectively.
//!
//! An entry function reports termination by returning an exit status, or by
//! calling [`request_exit`] from any depth of its call stack. The exit signal
//! travels as a typed unwind payload on the calling worker's own stack, so
//! concurrent invocations on other workers are unaffected.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Entry routine of an in-process generator.
///
/// Receives the combined argument list a subprocess would have received on
/// its command line and returns the exit status it would have exited with.
pub type GeneratorEntry = fn(&[String]) -> i32;

/// Unwind payload carrying a requested exit status.
pub struct ExitRequest(pub i32);

/// Terminates the current in-process generator invocation with `status`.
///
/// The host process keeps running; the invocation runner converts the signal
/// into the same success/failure outcome a subprocess exit would produce.
pub fn request_exit(status: i32) -> ! {
    panic::panic_any(ExitRequest(status));
}

/// Registry of in-process generator entry functions, keyed by entry symbol.
#[derive(Default)]
pub struct GeneratorRegistry {
    entries: HashMap<String, GeneratorEntry>,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry` under a fully qualified entry symbol.
    ///
    /// A later registration for the same symbol replaces the earlier one.
    pub fn register(&mut self, entry_symbol: impl Into<String>, entry: GeneratorEntry) {
        self.entries.insert(entry_symbol.into(), entry);
    }

    /// Looks up the entry function registered for `entry_symbol`.
    pub fn lookup(&self, entry_symbol: &str) -> Option<GeneratorEntry> {
        self.entries.get(entry_symbol).copied()
    }

    /// Number of registered entry functions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no generators are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("entry_symbols", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Runs an entry function, converting exit signals and faults into an
/// exit-status-or-fault outcome.
pub(crate) fn run_entry(entry: GeneratorEntry, args: &[String]) -> Result<i32, String> {
    install_exit_signal_filter();
    match panic::catch_unwind(AssertUnwindSafe(|| entry(args))) {
        Ok(status) => Ok(status),
        Err(payload) => match payload.downcast::<ExitRequest>() {
            Ok(request) => Ok(request.0),
            Err(payload) => Err(fault_message(payload.as_ref())),
        },
    }
}

fn fault_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "generator raised an uncaught fault".to_string()
    }
}

/// Keeps exit signals out of the default panic report.
///
/// Installed once per process; the filter is stateless (it only inspects the
/// payload type), so invocations running concurrently on other workers see no
/// shared mutable interception state.
fn install_exit_signal_filter() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<ExitRequest>().is_none() {
                previous(info);
            }
        }));
    });
}
