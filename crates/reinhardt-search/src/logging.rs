//! Console logging for the search widget
//!
//! Output goes to `web_sys::console` in the browser and to stderr natively.
//! Every macro compiles to nothing in release builds.
//!
//! | Macro | Needs | WASM | Native |
//! |-------|-------|------|--------|
//! | `debug_log!` | `debug_assertions` + `debug-logging` | `console.debug` | `eprintln!` |
//! | `info_log!` | `debug_assertions` | `console.info` | `eprintln!` |
//! | `warn_log!` | `debug_assertions` | `console.warn` | `eprintln!` |
//! | `error_log!` | `debug_assertions` | `console.error` | `eprintln!` |
//!
//! ```ignore
//! use reinhardt_search::{debug_log, error_log};
//!
//! debug_log!("submit routed to {}", action);
//! error_log!("submit cycle failed: {}", err);
//! ```

/// Shared sink behind the level macros.
#[doc(hidden)]
#[macro_export]
#[cfg(target_arch = "wasm32")]
macro_rules! __search_console {
	(debug, $msg:expr) => {
		$crate::__web_sys::console::debug_1(&$msg.into())
	};
	(info, $msg:expr) => {
		$crate::__web_sys::console::info_1(&$msg.into())
	};
	(warn, $msg:expr) => {
		$crate::__web_sys::console::warn_1(&$msg.into())
	};
	(error, $msg:expr) => {
		$crate::__web_sys::console::error_1(&$msg.into())
	};
}

/// Shared sink behind the level macros.
#[doc(hidden)]
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! __search_console {
	(debug, $msg:expr) => {
		eprintln!("[DEBUG] reinhardt-search: {}", $msg)
	};
	(info, $msg:expr) => {
		eprintln!("[INFO] reinhardt-search: {}", $msg)
	};
	(warn, $msg:expr) => {
		eprintln!("[WARN] reinhardt-search: {}", $msg)
	};
	(error, $msg:expr) => {
		eprintln!("[ERROR] reinhardt-search: {}", $msg)
	};
}

/// Logs a debug message (requires `debug-logging` feature + `debug_assertions`)
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-logging"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__search_console!(debug, format!($($arg)*));
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-logging")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message (requires `debug_assertions`)
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__search_console!(info, format!($($arg)*));
	}};
}

/// No-op info_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! info_log {
	($($arg:tt)*) => {{}};
}

/// Logs a warning (requires `debug_assertions`)
///
/// Used for browser errors that are deliberately swallowed, e.g. a failed
/// `setAttribute` while mirroring.
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__search_console!(warn, format!($($arg)*));
	}};
}

/// No-op warn_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! warn_log {
	($($arg:tt)*) => {{}};
}

/// Logs an error (requires `debug_assertions`)
///
/// Spawned submit cycles have no caller to return to; their failures end up here.
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__search_console!(error, format!($($arg)*));
	}};
}

/// No-op error_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! error_log {
	($($arg:tt)*) => {{}};
}

#[cfg(test)]
mod tests {
	use crate::{debug_log, error_log, info_log, warn_log};
	use rstest::rstest;

	#[rstest]
	fn test_logging_macros_accept_format_args() {
		debug_log!("route: {}", "/api/items");
		info_log!("mounted {}", "search");
		warn_log!("attribute {:?} not mirrored", Some("rel"));
		error_log!("submit failed: {}", 500);
	}

	#[rstest]
	fn test_logging_macros_accept_plain_literal() {
		debug_log!("debug");
		info_log!("info");
		warn_log!("warn");
		error_log!("error");
	}
}
