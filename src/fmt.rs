//! Debug formatting helpers for [`custom_debug_derive`].

use std::fmt;

/// Prints a fixed placeholder instead of the value.
///
/// Use with `#[debug(with = redacted)]` on secret fields.
pub fn redacted<T>(_value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"***\"")
}

/// Formats an `Option<T>` by printing the inner value directly (no `Some(...)` wrapper).
///
/// Use with `#[debug(with = opt)]` on fields that are
/// already gated by `#[debug(skip_if = Option::is_none)]`.
pub fn opt<T: fmt::Debug>(value: &Option<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Some(inner) => fmt::Debug::fmt(inner, f),
        None => f.write_str("None"),
    }
}
