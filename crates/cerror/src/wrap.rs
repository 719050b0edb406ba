use std::error::Error;
use std::fmt;

/// Owned, thread-safe error trait object.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// An error annotated with one layer of context.
///
/// Displays as `"<annotation>: <cause>"`. `source()` returns the annotated
/// error, which is how `cause()` and `code()` see through the wrapper.
pub struct WrappedError {
    annotation: String,
    cause: BoxError,
}

impl WrappedError {
    pub fn new<E>(err: E, annotation: impl Into<String>) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            annotation: annotation.into(),
            cause: err.into(),
        }
    }

    /// The context added at this layer.
    #[inline]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// The error one layer down.
    #[inline]
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    pub fn into_inner(self) -> BoxError {
        self.cause
    }
}

impl Error for WrappedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl fmt::Display for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.annotation, self.cause)
    }
}

impl fmt::Debug for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedError")
            .field("annotation", &self.annotation)
            .field("cause", &self.cause)
            .finish()
    }
}

/// Annotate `err` with `message`. `None` stays `None`.
///
/// ```
/// use cerror::{wrap, CodedError};
///
/// let err = wrap(Some(CodedError::new("EBADF", "bad file descriptor")), "read failed");
/// assert_eq!(
///     err.map(|e| e.to_string()).as_deref(),
///     Some("read failed: Error EBADF: bad file descriptor"),
/// );
/// assert!(wrap(None::<std::io::Error>, "read failed").is_none());
/// ```
pub fn wrap<E>(err: Option<E>, message: impl Into<String>) -> Option<WrappedError>
where
    E: Into<BoxError>,
{
    err.map(|err| WrappedError::new(err, message))
}

/// Like `wrap`, with a formatted annotation. See also `wrapf!`.
pub fn wrapf<E>(err: Option<E>, args: fmt::Arguments<'_>) -> Option<WrappedError>
where
    E: Into<BoxError>,
{
    wrap(err, fmt::format(args))
}

// ── ResultExt: annotation on Results ──────────────────────────────

/// Wrap the error side of a `Result` during propagation.
///
/// ```
/// use cerror::{code, CodedError, ResultExt, WrappedError};
///
/// fn open() -> Result<(), CodedError<i32>> {
///     Err(CodedError::new(2, "no such file"))
/// }
///
/// fn load() -> Result<(), WrappedError> {
///     open().wrap_err("loading config")?;
///     Ok(())
/// }
///
/// let err = load().unwrap_err();
/// assert_eq!(err.to_string(), "loading config: Error 2: no such file");
/// assert_eq!(code::<i32, _>(&err), Some(&2));
/// ```
pub trait ResultExt<T> {
    fn wrap_err<M>(self, message: M) -> Result<T, WrappedError>
    where
        M: Into<String>;

    /// Lazily built annotation; `f` runs only on `Err`.
    fn wrap_err_with<M, F>(self, f: F) -> Result<T, WrappedError>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn wrap_err<M>(self, message: M) -> Result<T, WrappedError>
    where
        M: Into<String>,
    {
        self.map_err(|e| WrappedError::new(e, message))
    }

    fn wrap_err_with<M, F>(self, f: F) -> Result<T, WrappedError>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        self.map_err(|e| WrappedError::new(e, f()))
    }
}
