//! Flags header scanning.

use crate::admission::request::RequestFlags;
use crate::headers::HeaderView;

/// Apply every recognized flag character in `view` to `flags`.
///
/// Order and repetition do not matter; unknown characters are ignored.
/// Flags are only ever switched on.
pub fn apply_flags(view: &HeaderView<'_>, flags: &mut RequestFlags) {
    for segment in view.segments() {
        for &byte in segment {
            match byte {
                b'D' => flags.dechunk_response = true,
                b'B' => flags.request_body_buffering = true,
                b'S' => flags.https = true,
                b'C' => flags.strip_100_continue_header = true,
                _ => {}
            }
        }
    }

    if flags.dechunk_response {
        tracing::trace!("Dechunk flag detected");
    }
    if flags.request_body_buffering {
        tracing::trace!("Request body buffering enabled");
    }
    if flags.https {
        tracing::trace!("HTTPS flag detected");
    }
    if flags.strip_100_continue_header {
        tracing::trace!("Stripping 100 Continue header");
    }
}

/// Parse a flags string from scratch.
pub fn parse_flags(view: &HeaderView<'_>) -> RequestFlags {
    let mut flags = RequestFlags::default();
    apply_flags(view, &mut flags);
    flags
}
