/// Construct a `CodedError` with a formatted message.
///
/// Expands to `CodedError::newf`, so the captured stack starts at the line
/// using the macro. Debug info is collapsed to the call site, including for
/// uses inside this crate.
///
/// ```
/// use cerror::cerr;
///
/// let err = cerr!("EBADF", "read error with {} format specifier", 1);
/// assert_eq!(err.to_string(), "Error EBADF: read error with 1 format specifier");
/// ```
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! cerr {
    ($code:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::CodedError::newf($code, format_args!($fmt $(, $arg)*))
    };
}

/// Annotate an `Option` of an error with a formatted message.
///
/// ```
/// use cerror::{cerr, wrapf};
///
/// let err = wrapf!(Some(cerr!(5, "denied")), "open {}", "/etc/shadow").unwrap();
/// assert_eq!(err.to_string(), "open /etc/shadow: Error 5: denied");
/// assert!(wrapf!(None::<std::io::Error>, "x={}", 1).is_none());
/// ```
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! wrapf {
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::wrapf($err, format_args!($fmt $(, $arg)*))
    };
}

/// Early-return a `CodedError` if a condition is false.
///
/// The error is passed through `.into()`, so any error type convertible
/// from `CodedError` works as the function's error type.
///
/// ```ignore
/// ensure!(user_id > 0, "EINVAL", "bad user id {}", user_id);
/// ```
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! ensure {
    ($cond:expr, $code:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        if !$cond {
            return Err($crate::CodedError::newf($code, format_args!($fmt $(, $arg)*)).into());
        }
    };
}
