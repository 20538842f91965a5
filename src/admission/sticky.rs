//! Sticky session resolution from the Cookie header.
//!
//! # Design Decisions
//! - Cookie names compare byte-exact; `PSC` does not match `psc`
//! - The first cookie with a matching name decides the outcome
//! - A matching cookie whose value is not a plain unsigned integer yields
//!   no sticky id, so the request routes as if affinity were off

/// Iterate over `name=value` pairs of a Cookie header.
///
/// Pairs are separated by `;`, surrounding spaces are trimmed, and a value
/// wrapped in double quotes is unquoted. Entries without `=` are skipped.
pub fn parse_cookie_header(header: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    header.split(|&b| b == b';').filter_map(|pair| {
        let pair = trim(pair);
        let eq = pair.iter().position(|&b| b == b'=')?;
        let name = trim(&pair[..eq]);
        let value = unquote(trim(&pair[eq + 1..]));
        if name.is_empty() {
            None
        } else {
            Some((name, value))
        }
    })
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t'))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t'))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn unquote(value: &[u8]) -> &[u8] {
    match value {
        [b'"', inner @ .., b'"'] => inner,
        _ => value,
    }
}

/// Parse a sticky session id. Only a non-empty run of ASCII digits that
/// fits in `u32` is accepted.
pub fn parse_session_id(value: &[u8]) -> Option<u32> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(value).ok()?.parse().ok()
}

/// Resolve the sticky session id for `cookie_name` from a Cookie header.
pub fn resolve_sticky_session_id(cookie_header: Option<&[u8]>, cookie_name: &[u8]) -> Option<u32> {
    let header = cookie_header?;
    let (_, value) = parse_cookie_header(header).find(|(name, _)| *name == cookie_name)?;
    let id = parse_session_id(value);
    if id.is_none() {
        tracing::debug!(
            cookie = %String::from_utf8_lossy(cookie_name),
            "Ignoring malformed sticky session cookie"
        );
    }
    id
}
