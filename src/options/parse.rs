//! Typed parsing of secure header values.
//!
//! One generic entry point, [`fill_option`], overlays a header onto a field
//! of any type implementing [`FromHeaderValue`]. A header that is absent,
//! empty, or unparseable leaves the field untouched.

use bumpalo::Bump;

use crate::headers::{HeaderTable, HeaderView};

/// Conversion from a raw header value.
pub trait FromHeaderValue: Sized {
    /// Parse a non-empty value. `None` keeps the baseline.
    fn from_header_value<'a>(view: &HeaderView<'a>, arena: &'a Bump) -> Option<Self>;
}

impl FromHeaderValue for String {
    fn from_header_value<'a>(view: &HeaderView<'a>, arena: &'a Bump) -> Option<Self> {
        Some(view.to_str_lossy(arena).into_owned())
    }
}

/// Booleans are true when the value starts with `t`.
impl FromHeaderValue for bool {
    fn from_header_value<'a>(view: &HeaderView<'a>, _arena: &'a Bump) -> Option<Self> {
        view.first_byte().map(|b| b == b't')
    }
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {
        $(
            impl FromHeaderValue for $ty {
                fn from_header_value<'a>(view: &HeaderView<'a>, arena: &'a Bump) -> Option<Self> {
                    parse_leading_digits(view.make_contiguous(arena))
                        .and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

impl_unsigned!(u32, u64);

impl FromHeaderValue for i64 {
    fn from_header_value<'a>(view: &HeaderView<'a>, arena: &'a Bump) -> Option<Self> {
        let bytes = trim_start(view.make_contiguous(arena));
        match bytes.split_first() {
            Some((&b'-', rest)) => parse_leading_digits(rest)
                .and_then(|n| i64::try_from(n).ok())
                .map(|n| -n),
            Some((&b'+', rest)) => parse_leading_digits(rest).and_then(|n| i64::try_from(n).ok()),
            _ => parse_leading_digits(bytes).and_then(|n| i64::try_from(n).ok()),
        }
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Parse the decimal digits at the start of `bytes`, after leading
/// whitespace. Stops at the first non-digit; `None` when there are no digits
/// or the value overflows.
pub fn parse_leading_digits(bytes: &[u8]) -> Option<u64> {
    let digits: &[u8] = {
        let trimmed = trim_start(bytes);
        let end = trimmed
            .iter()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &b| {
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

/// Read header `name` as `T`, returning `None` when absent, empty or
/// unparseable.
pub fn header_value<'a, T: FromHeaderValue>(
    headers: &HeaderTable<'a>,
    name: &str,
    arena: &'a Bump,
) -> Option<T> {
    let view = headers.lookup_non_empty(name)?;
    let parsed = T::from_header_value(view, arena);
    if parsed.is_none() {
        tracing::debug!(header = %name, "Ignoring unparseable header value");
    }
    parsed
}

/// Overlay header `name` onto `field` when it carries a usable value.
pub fn fill_option<'a, T: FromHeaderValue>(
    field: &mut T,
    headers: &HeaderTable<'a>,
    name: &str,
    arena: &'a Bump,
) {
    if let Some(value) = header_value(headers, name, arena) {
        *field = value;
    }
}

/// Overlay a header expressed in seconds onto a millisecond field.
pub fn fill_option_sec_to_msec<'a>(
    field: &mut u64,
    headers: &HeaderTable<'a>,
    name: &str,
    arena: &'a Bump,
) {
    if let Some(secs) = header_value::<u64>(headers, name, arena) {
        *field = secs.saturating_mul(1000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table<'a>(name: &str, value: &'a [u8]) -> HeaderTable<'a> {
        let mut t = HeaderTable::new();
        t.insert(name, value);
        t
    }

    #[test]
    fn test_parse_leading_digits() {
        assert_eq!(parse_leading_digits(b"42"), Some(42));
        assert_eq!(parse_leading_digits(b"  7abc"), Some(7));
        assert_eq!(parse_leading_digits(b"abc"), None);
        assert_eq!(parse_leading_digits(b""), None);
        assert_eq!(parse_leading_digits(b"99999999999999999999999"), None);
    }

    #[test]
    fn test_bool_uses_first_byte() {
        let arena = Bump::new();
        let mut flag = false;
        fill_option(&mut flag, &table("x", b"true"), "x", &arena);
        assert!(flag);
        fill_option(&mut flag, &table("x", b"false"), "x", &arena);
        assert!(!flag);
    }

    #[test]
    fn test_empty_value_keeps_baseline() {
        let arena = Bump::new();
        let mut name = "baseline".to_string();
        fill_option(&mut name, &table("x", b""), "x", &arena);
        assert_eq!(name, "baseline");

        let mut count = 3u32;
        fill_option(&mut count, &table("x", b""), "x", &arena);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_unparseable_number_keeps_baseline() {
        let arena = Bump::new();
        let mut count = 3u32;
        fill_option(&mut count, &table("x", b"many"), "x", &arena);
        assert_eq!(count, 3);
        fill_option(&mut count, &table("x", b"8"), "x", &arena);
        assert_eq!(count, 8);
    }

    #[test]
    fn test_signed_values() {
        let arena = Bump::new();
        let mut value = 0i64;
        fill_option(&mut value, &table("x", b"-15"), "x", &arena);
        assert_eq!(value, -15);
    }

    #[test]
    fn test_seconds_become_milliseconds() {
        let arena = Bump::new();
        let mut timeout = 90_000u64;
        fill_option_sec_to_msec(&mut timeout, &table("x", b"30"), "x", &arena);
        assert_eq!(timeout, 30_000);
    }

    #[test]
    fn test_absent_header() {
        let arena = Bump::new();
        let headers = HeaderTable::new();
        assert_eq!(header_value::<u64>(&headers, "x", &arena), None);
    }
}
