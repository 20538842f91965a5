//! Case-insensitive header tables.
//!
//! # Responsibilities
//! - Map lowercase header names to borrowed [`HeaderView`]s
//! - Offer cell lookups so a caller can materialize later without a
//!   second hash probe
//! - Split an incoming `HeaderMap` into client and secure tables
//!
//! # Design Decisions
//! - Keys are lowercased on insert; lookups with lowercase names hash the
//!   caller's string directly
//! - Only the first value of a repeated header is kept

use std::borrow::Cow;
use std::collections::HashMap;

use axum::http::HeaderMap;
use bumpalo::Bump;

use crate::headers::names::SECURE_PREFIX;
use crate::headers::view::HeaderView;

/// A handle to one table entry.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCell<'t, 'a> {
    name: &'t str,
    view: &'t HeaderView<'a>,
}

impl<'t, 'a> HeaderCell<'t, 'a> {
    /// Lowercased header name.
    pub fn name(&self) -> &'t str {
        self.name
    }

    /// The header value.
    pub fn value(&self) -> &'t HeaderView<'a> {
        self.view
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Materialize the value in the request arena.
    pub fn make_contiguous(&self, arena: &'a Bump) -> &'a [u8] {
        self.view.make_contiguous(arena)
    }
}

/// Header name to value mapping with case-insensitive keys.
#[derive(Debug, Clone, Default)]
pub struct HeaderTable<'a> {
    entries: HashMap<String, HeaderView<'a>>,
}

fn normalize(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

impl<'a> HeaderTable<'a> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single-segment value, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: &'a [u8]) {
        self.entries
            .insert(normalize(name).into_owned(), HeaderView::new(value));
    }

    /// Append a segment to a value, creating the entry if needed.
    pub fn append_segment(&mut self, name: &str, bytes: &'a [u8]) {
        self.entries
            .entry(normalize(name).into_owned())
            .or_insert_with(|| HeaderView::from_segments(std::iter::empty()))
            .push_segment(bytes);
    }

    /// Look up a header value by name.
    pub fn lookup(&self, name: &str) -> Option<&HeaderView<'a>> {
        self.entries.get(normalize(name).as_ref())
    }

    /// Look up a header and return a cell handle.
    pub fn lookup_cell(&self, name: &str) -> Option<HeaderCell<'_, 'a>> {
        self.entries
            .get_key_value(normalize(name).as_ref())
            .map(|(name, view)| HeaderCell {
                name: name.as_str(),
                view,
            })
    }

    /// Return the only entry. `None` unless the table holds exactly one.
    pub fn lookup_sole(&self) -> Option<HeaderCell<'_, 'a>> {
        if self.entries.len() != 1 {
            return None;
        }
        self.entries.iter().next().map(|(name, view)| HeaderCell {
            name: name.as_str(),
            view,
        })
    }

    /// Look up a header and return it only when non-empty.
    pub fn lookup_non_empty(&self, name: &str) -> Option<&HeaderView<'a>> {
        self.lookup(name).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split a parsed header map into client headers and secure headers.
    ///
    /// Names starting with `secure_prefix` go to the secure table when
    /// `trust_secure` is set and are dropped otherwise.
    pub fn split_from_map(
        map: &'a HeaderMap,
        secure_prefix: &str,
        trust_secure: bool,
    ) -> (HeaderTable<'a>, HeaderTable<'a>) {
        let mut client = HeaderTable::new();
        let mut secure = HeaderTable::new();

        for name in map.keys() {
            let Some(value) = map.get(name) else {
                continue;
            };
            let name = name.as_str();
            if name.starts_with(secure_prefix) {
                if trust_secure {
                    secure.insert(name, value.as_bytes());
                } else {
                    tracing::debug!(header = %name, "Dropping secure header from untrusted listener");
                }
            } else {
                client.insert(name, value.as_bytes());
            }
        }

        (client, secure)
    }

    /// Split using the default secure prefix.
    pub fn split_default(map: &'a HeaderMap, trust_secure: bool) -> (HeaderTable<'a>, HeaderTable<'a>) {
        Self::split_from_map(map, SECURE_PREFIX, trust_secure)
    }
}
