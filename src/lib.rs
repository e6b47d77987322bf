/// Macro for prefixed status logging to stderr.
///
/// Prints when stderr is a terminal or when running under CI (`CI` set), so
/// job logs show which stage a run reached.
///
/// Usage:
/// ```ignore
/// log_status!("build", "Running '{}' in {}", command, dir.display());
/// log_status!("publish", "Pushing {} to {}", commit, branch);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr())
            || ::std::env::var_os("CI").is_some()
        {
            eprintln!("[{}] {}", $prefix, format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `docship::publish` instead of `docship::core::publish`
pub use core::*;
pub use utils::*;
