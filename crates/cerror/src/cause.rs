//! Cause-chain resolution.
//!
//! The one-step cause accessor is `std::error::Error::source`. Any error type
//! that implements it takes part: `WrappedError` always does, `CodedError`
//! never does (it is a root), and third-party errors do whatever they
//! declare.
//!
//! ```text
//! WrappedError("b") ──source──▶ WrappedError("a") ──source──▶ CodedError(123)
//!        │                                                        ▲
//!        └──────────────────────── cause() ───────────────────────┘
//! ```

use std::error::Error;

use crate::error::{CodedError, ErrorCode, HasCode};
use crate::kwarn;

/// Links walked before giving up on a chain. Library-built chains cannot
/// cycle; a hand-written `source()` can.
pub const MAX_CAUSE_DEPTH: usize = 256;

/// Borrow any error, sized or trait object, as `&dyn Error`.
pub trait AsDynError {
    fn as_dyn_error(&self) -> &(dyn Error + 'static);
}

impl<E: Error + 'static> AsDynError for E {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + Send + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + Send + Sync + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

/// Iterator over a cause chain, outermost first. Ends at the root or after
/// `MAX_CAUSE_DEPTH` links.
pub struct Chain<'a> {
    next: Option<&'a (dyn Error + 'static)>,
    remaining: usize,
    truncated: bool,
}

impl<'a> Chain<'a> {
    /// True if iteration stopped at the depth bound rather than at a root.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if self.remaining == 0 {
            self.truncated = true;
            self.next = None;
            return None;
        }
        self.remaining -= 1;
        self.next = current.source();
        Some(current)
    }
}

/// Walk `err` and its sources, outermost first.
///
/// ```
/// use cerror::{chain, wrap, CodedError};
///
/// let err = wrap(wrap(Some(CodedError::new(1, "root")), "a"), "b").unwrap();
/// let texts: Vec<String> = chain(&err).map(|e| e.to_string()).collect();
/// assert_eq!(texts, ["b: a: Error 1: root", "a: Error 1: root", "Error 1: root"]);
/// ```
pub fn chain<E>(err: &E) -> Chain<'_>
where
    E: AsDynError + ?Sized,
{
    Chain {
        next: Some(err.as_dyn_error()),
        remaining: MAX_CAUSE_DEPTH,
        truncated: false,
    }
}

/// The innermost error reachable through `source()`.
///
/// Returns `err` itself when it has no source.
pub fn cause<E>(err: &E) -> &(dyn Error + 'static)
where
    E: AsDynError + ?Sized,
{
    let mut links = chain(err);
    let mut root = err.as_dyn_error();
    for link in links.by_ref() {
        root = link;
    }
    if links.truncated() {
        kwarn!(
            "cerror: cause chain longer than {} links, stopping at: {}",
            MAX_CAUSE_DEPTH,
            root
        );
    }
    root
}

/// The code of the root cause, if it is a `CodedError<C>`.
///
/// `None` for an absent input, a non-coded root, a root with a different
/// code type, or a coded root whose code is absent.
///
/// ```
/// use cerror::{code, wrap, CodedError};
///
/// let err = wrap(wrap(Some(CodedError::new(123, "m")), "a"), "b").unwrap();
/// assert_eq!(code::<i32, _>(&err), Some(&123));
/// assert_eq!(code::<&str, _>(&err), None);
/// ```
pub fn code<'a, C, E>(err: impl Into<Option<&'a E>>) -> Option<&'a C>
where
    C: ErrorCode,
    E: AsDynError + ?Sized + 'a,
{
    code_of::<CodedError<C>, E>(err)
}

/// The code of the root cause, for any error type that implements `HasCode`.
pub fn code_of<'a, T, E>(err: impl Into<Option<&'a E>>) -> Option<&'a T::Code>
where
    T: HasCode + Error + 'static,
    E: AsDynError + ?Sized + 'a,
{
    let err = err.into()?;
    cause(err).downcast_ref::<T>()?.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrap::{wrap, BoxError, WrappedError};
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    struct Plain;

    impl fmt::Display for Plain {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("simple error")
        }
    }

    impl Error for Plain {}

    /// Application error with its own code type, opting into `HasCode`.
    #[derive(Debug)]
    struct HttpError(u16);

    impl fmt::Display for HttpError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "http {}", self.0)
        }
    }

    impl Error for HttpError {}

    impl HasCode for HttpError {
        type Code = u16;

        fn code(&self) -> Option<&u16> {
            Some(&self.0)
        }
    }

    /// Points at itself through `source()`.
    #[derive(Debug)]
    struct Loop;

    impl fmt::Display for Loop {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("loop")
        }
    }

    impl Error for Loop {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self)
        }
    }

    #[test]
    fn cause_without_source_is_identity() {
        let err = Plain;
        assert!(std::ptr::eq(
            cause(&err) as *const dyn Error as *const u8,
            &err as *const Plain as *const u8
        ));
    }

    #[test]
    fn cause_unwraps_two_layers() {
        let err = wrap(wrap(Some(CodedError::new(7, "root")), "a"), "b").unwrap();
        let root = cause(&err);
        assert_eq!(root.to_string(), "Error 7: root");
        assert!(root.downcast_ref::<CodedError<i32>>().is_some());
    }

    #[test]
    fn cause_on_trait_objects() {
        let err: BoxError = Box::new(WrappedError::new(Plain, "ctx"));
        assert_eq!(cause(&*err).to_string(), "simple error");

        let err: &(dyn Error + 'static) = &Plain;
        assert_eq!(cause(err).to_string(), "simple error");
    }

    #[test]
    fn code_table() {
        assert_eq!(code::<i32, WrappedError>(None), None);
        assert_eq!(code::<i32, _>(&Plain), None);

        let eof = wrap(wrap(Some(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF")), "read error"), "client error").unwrap();
        assert_eq!(code::<i32, _>(&eof), None);

        assert_eq!(code::<i32, _>(&CodedError::new(123, "error with an int code")), Some(&123));

        let bad = wrap(Some(CodedError::new("EBADF", "error with a string code")), "read error").unwrap();
        assert_eq!(code::<&str, _>(&bad), Some(&"EBADF"));
    }

    #[test]
    fn code_wrong_type_is_none() {
        let err = wrap(Some(CodedError::new(123, "m")), "ctx").unwrap();
        assert_eq!(code::<u64, _>(&err), None);
    }

    #[test]
    fn code_absent_on_uncoded_root() {
        let err = wrap(Some(CodedError::<i32>::uncoded("m")), "ctx").unwrap();
        assert_eq!(code::<i32, _>(&err), None);
    }

    #[test]
    fn code_of_custom_type() {
        let err = wrap(wrap(Some(HttpError(503)), "fetch"), "sync").unwrap();
        assert_eq!(code_of::<HttpError, _>(&err), Some(&503));
        assert_eq!(code::<u16, _>(&err), None);
    }

    #[test]
    fn chain_lists_every_layer() {
        let err = wrap(wrap(Some(Plain), "a"), "b").unwrap();
        let links = chain(&err);
        assert_eq!(links.count(), 3);
    }

    #[test]
    fn cyclic_chain_is_bounded() {
        let mut links = chain(&Loop);
        assert_eq!(links.by_ref().count(), MAX_CAUSE_DEPTH);
        assert!(links.truncated());
        assert_eq!(cause(&Loop).to_string(), "loop");
    }
}
