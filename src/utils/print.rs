//! Logging helpers: process-identity prefixed log macros.

use std::sync::OnceLock;

use env_logger::Env;

/// Identity of this process used as logging prefix, e.g. `"b:127.0.0.1:9001"`
/// for a backend or `"k0"` for a keeper. Set once at startup by executables;
/// lines logged before that (and in library tests) carry `"-"`.
pub static ME: OnceLock<String> = OnceLock::new();

/// Current logging prefix.
#[doc(hidden)]
pub fn me_prefix() -> &'static str {
    ME.get().map_or("-", String::as_str)
}

/// Log a message at `$level` with the parenthesized identity prefix. Backs
/// all the `pf_*` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! pf_log {
    ($level:ident, $($fmt_args:tt)*) => {
        log::$level!("({}) {}", $crate::me_prefix(), format!($($fmt_args)*))
    };
}

/// Log TRACE message with identity prefix.
///
/// Example:
/// ```no_compile
/// pf_trace!("round {} done", round);
/// ```
#[macro_export]
macro_rules! pf_trace {
    ($($fmt_args:tt)*) => { $crate::pf_log!(trace, $($fmt_args)*) };
}

/// Log DEBUG message with identity prefix.
#[macro_export]
macro_rules! pf_debug {
    ($($fmt_args:tt)*) => { $crate::pf_log!(debug, $($fmt_args)*) };
}

/// Log INFO message with identity prefix.
#[macro_export]
macro_rules! pf_info {
    ($($fmt_args:tt)*) => { $crate::pf_log!(info, $($fmt_args)*) };
}

/// Log WARN message with identity prefix.
#[macro_export]
macro_rules! pf_warn {
    ($($fmt_args:tt)*) => { $crate::pf_log!(warn, $($fmt_args)*) };
}

/// Log ERROR message with identity prefix.
#[macro_export]
macro_rules! pf_error {
    ($($fmt_args:tt)*) => { $crate::pf_log!(error, $($fmt_args)*) };
}

/// Initializes `env_logger` (default level INFO, bare lines) unless a logger
/// is already installed.
pub fn logger_init() {
    let _ =
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init();
}

/// Logs an error message and evaluates to `Err(TribError::Msg)` carrying the
/// same message.
///
/// Example:
/// ```no_compile
/// return logged_err!("error appending trib of {:?}", who);
/// ```
#[macro_export]
macro_rules! logged_err {
    ($($fmt_args:tt)*) => {{
        let msg = format!($($fmt_args)*);
        $crate::pf_error!("{}", msg);
        Err($crate::TribError::Msg(msg))
    }};
}
