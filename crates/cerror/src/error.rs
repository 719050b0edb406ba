use std::error::Error;
use std::fmt;
use std::hint::black_box;

use crate::stack::Stack;

/// Anything usable as an error code.
///
/// Blanket-implemented: small integers, `&'static str` tags and
/// application enums all qualify as long as they compare, print, and cross
/// threads.
pub trait ErrorCode: PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> ErrorCode for T where T: PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static {}

/// Capability: an error that carries a code.
///
/// `code_of` downcasts the root of a cause chain to the implementing type
/// and asks it for its code.
pub trait HasCode {
    type Code: ErrorCode;

    fn code(&self) -> Option<&Self::Code>;
}

/// Coded Error: a message, an optional application-defined code, and the
/// call stack at the point of construction.
///
/// Immutable once built. Frames are stored raw and resolved only when
/// `stack_lines()` / `stack_text()` are called.
///
/// ```
/// use cerror::CodedError;
///
/// let err = CodedError::new(404, "missing");
/// assert_eq!(err.to_string(), "Error 404: missing");
/// assert!(err.code_is(&404));
/// assert!(err.code_in(&[500, 404]));
/// ```
///
/// # Display
///
/// | code    | message   | text                   |
/// |---------|-----------|------------------------|
/// | `None`  | any       | `<message>`            |
/// | `Some`  | empty     | `Error <code>`         |
/// | `Some`  | non-empty | `Error <code>: <message>` |
pub struct CodedError<C> {
    code: Option<C>,
    message: String,
    stack: Stack,
}

/// Convenience Result alias.
pub type CResult<T, C> = Result<T, CodedError<C>>;

// ── Constructors ──────────────────────────────────────────────────
//
// Every constructor is `#[inline(never)]` and passes its own frame count to
// `with_skip`, so the first captured frame is always the caller's. The
// `black_box` keeps each frame from being turned into a tail call.

impl<C: ErrorCode> CodedError<C> {
    /// Create an error with `code` and `message`, capturing the caller's stack.
    #[inline(never)]
    pub fn new(code: C, message: impl Into<String>) -> Self {
        black_box(Self::with_skip(Some(code), message.into(), 1))
    }

    /// Like `new`, with a formatted message.
    ///
    /// ```
    /// use cerror::CodedError;
    ///
    /// let err = CodedError::newf("EBADF", format_args!("read error on fd {}", 3));
    /// assert_eq!(err.to_string(), "Error EBADF: read error on fd 3");
    /// ```
    #[inline(never)]
    pub fn newf(code: C, args: fmt::Arguments<'_>) -> Self {
        black_box(Self::with_skip(Some(code), fmt::format(args), 1))
    }

    /// An error without a code; displays as the bare message.
    #[inline(never)]
    pub fn uncoded(message: impl Into<String>) -> Self {
        black_box(Self::with_skip(None, message.into(), 1))
    }

    /// An error whose code may be absent.
    #[inline(never)]
    pub fn from_parts(code: Option<C>, message: impl Into<String>) -> Self {
        black_box(Self::with_skip(code, message.into(), 1))
    }

    /// Construct, hiding `skip` frames above this call from the stack.
    ///
    /// Helpers that build errors on behalf of their caller pass the number
    /// of helper frames between the real call site and here:
    ///
    /// ```
    /// use cerror::CodedError;
    ///
    /// #[inline(never)]
    /// fn not_found(what: &str) -> CodedError<u16> {
    ///     // one helper frame (this function) to hide
    ///     CodedError::with_skip(Some(404), format!("{} not found", what), 1)
    /// }
    ///
    /// let err = not_found("user");
    /// assert_eq!(err.to_string(), "Error 404: user not found");
    /// ```
    #[inline(never)]
    pub fn with_skip(code: Option<C>, message: String, skip: usize) -> Self {
        let stack = Stack::capture(skip + 1);
        Self {
            code,
            message,
            stack,
        }
    }
}

// ── Accessors ─────────────────────────────────────────────────────

impl<C: ErrorCode> CodedError<C> {
    /// The raw message, independent of the code.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn code(&self) -> Option<&C> {
        self.code.as_ref()
    }

    /// True if the stored code equals `code`. Always false when absent.
    #[inline]
    pub fn code_is(&self, code: &C) -> bool {
        self.code.as_ref() == Some(code)
    }

    /// True if the stored code equals any of `codes`.
    pub fn code_in(&self, codes: &[C]) -> bool {
        codes.iter().any(|code| self.code_is(code))
    }

    /// The raw captured frames.
    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// One `<file>:<line>\t<function>` line per captured frame, call site first.
    pub fn stack_lines(&self) -> Vec<String> {
        self.stack.lines()
    }

    /// `stack_lines()` joined with `\n`.
    pub fn stack_text(&self) -> String {
        self.stack_lines().join("\n")
    }
}

impl<C: ErrorCode> HasCode for CodedError<C> {
    type Code = C;

    fn code(&self) -> Option<&C> {
        self.code.as_ref()
    }
}

impl<C: ErrorCode + Clone> Clone for CodedError<C> {
    fn clone(&self) -> Self {
        Self {
            code: self.code.clone(),
            message: self.message.clone(),
            stack: self.stack,
        }
    }
}

// ── std::error::Error ─────────────────────────────────────────────

impl<C: ErrorCode> Error for CodedError<C> {}

// ── Display ───────────────────────────────────────────────────────

impl<C: ErrorCode> fmt::Display for CodedError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            None => f.write_str(&self.message),
            Some(code) if self.message.is_empty() => write!(f, "Error {}", code),
            Some(code) => write!(f, "Error {}: {}", code, self.message),
        }
    }
}

// ── Debug ─────────────────────────────────────────────────────────

impl<C: ErrorCode> fmt::Debug for CodedError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodedError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("stack", &self.stack)
            .finish()
    }
}
