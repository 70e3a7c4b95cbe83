//! Utility macros used across the codec.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// Like `assert!`, but for recoverable wire conditions:
///
/// ```ignore
/// ensure!(section_size <= max_size, ParseError::too_large_header(section_size, max_size));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
