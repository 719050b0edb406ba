//! # cerror: Coded Errors
//!
//! Errors tagged with an application-defined code, carrying the call stack
//! at the point they were raised, and annotated with context on the way up
//! without losing the original.
//!
//! ## Design
//!
//! - **`CodedError<C>`**: message + optional code + raw frames. The code is
//!   any `PartialEq + Display` type (integers, string tags, enums). Frames
//!   are captured as return addresses at construction and symbolized only
//!   when `stack_lines()` / `stack_text()` are called.
//!
//! - **`WrappedError`**: one layer of context around any error. Displays as
//!   `"<annotation>: <cause>"` and exposes the cause via `source()`.
//!
//! - **`cause()` / `code()`**: walk `source()` to the root and, if the root is
//!   a `CodedError<C>`, return its code, however many layers were added.
//!
//! ## Quick Start
//!
//! ```rust
//! use cerror::{cause, code, wrap, CodedError};
//!
//! const ETIMEDOUT: i32 = 110;
//!
//! let err = CodedError::new(ETIMEDOUT, "operation timed out");
//! if err.code_is(&ETIMEDOUT) {
//!     // retry
//! }
//! println!("{}", err.stack_text());
//!
//! let err = wrap(Some(err), "read from disk a").unwrap();
//! assert_eq!(err.to_string(), "read from disk a: Error 110: operation timed out");
//! assert_eq!(code::<i32, _>(&err), Some(&ETIMEDOUT));
//! assert_eq!(cause(&err).to_string(), "Error 110: operation timed out");
//! ```
//!
//! ## Environment
//!
//! | Variable             | Effect |
//! |----------------------|--------|
//! | `CERR_STACK_CAPTURE` | `0` disables stack capture |
//! | `CERR_STACK_DEPTH`   | Frames kept per error (max `MAX_FRAMES`) |
//! | `CERR_LOG_LEVEL`     | Level for the `k*!` log macros |
//! | `CERR_FLUSH_EPRINT`  | Flush stderr after each log line |

#[macro_use]
mod macros;
pub mod kprint;
pub mod env;
pub mod config;
pub mod stack;
mod error;
mod wrap;
mod cause;

// ── Public API ────────────────────────────────────────────────────

pub use config::{StackConfig, MAX_FRAMES};
pub use stack::{Frame, Stack};
pub use error::{CResult, CodedError, ErrorCode, HasCode};
pub use wrap::{wrap, wrapf, BoxError, ResultExt, WrappedError};
pub use cause::{cause, chain, code, code_of, AsDynError, Chain, MAX_CAUSE_DEPTH};
pub use kprint::{set_log_level, LogLevel};
