//! Fragmented header values.
//!
//! # Responsibilities
//! - Hold one header value as borrowed windows into the receive buffer
//! - Materialize a contiguous copy in the request arena on demand
//!
//! # Design Decisions
//! - Segments are never copied at parse time; most values arrive in one piece
//! - Materialization is memoized so a second call returns the same bytes
//! - The arena is owned by the request, so copies die with it

use std::cell::OnceCell;

use bumpalo::Bump;
use smallvec::SmallVec;

/// Segments stored inline before spilling to the heap.
const INLINE_SEGMENTS: usize = 2;

/// A read-only view over one header value, possibly split across buffers.
#[derive(Debug, Clone, Default)]
pub struct HeaderView<'a> {
    segments: SmallVec<[&'a [u8]; INLINE_SEGMENTS]>,
    contiguous: OnceCell<&'a [u8]>,
}

impl<'a> HeaderView<'a> {
    /// Create a view over a single segment.
    pub fn new(bytes: &'a [u8]) -> Self {
        let mut segments = SmallVec::new();
        segments.push(bytes);
        Self {
            segments,
            contiguous: OnceCell::new(),
        }
    }

    /// Create a view from several segments, in order.
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        Self {
            segments: segments.into_iter().collect(),
            contiguous: OnceCell::new(),
        }
    }

    /// Append a segment to the end of the value.
    pub fn push_segment(&mut self, bytes: &'a [u8]) {
        self.segments.push(bytes);
        self.contiguous = OnceCell::new();
    }

    /// Total byte length across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    /// True when the header is present but carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of underlying segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over the raw segments.
    pub fn segments(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.segments.iter().copied()
    }

    /// First byte of the value, if any.
    pub fn first_byte(&self) -> Option<u8> {
        self.segments.iter().find_map(|s| s.first().copied())
    }

    /// Return the value as one slice, copying into `arena` only when the
    /// value is fragmented.
    pub fn make_contiguous(&self, arena: &'a Bump) -> &'a [u8] {
        match self.segments.as_slice() {
            [] => &[],
            [single] => *single,
            segments => *self.contiguous.get_or_init(|| {
                let buf = arena.alloc_slice_fill_copy(self.len(), 0u8);
                let mut offset = 0;
                for segment in segments {
                    buf[offset..offset + segment.len()].copy_from_slice(segment);
                    offset += segment.len();
                }
                &*buf
            }),
        }
    }

    /// Materialize and interpret as UTF-8, replacing invalid sequences.
    pub fn to_str_lossy(&self, arena: &'a Bump) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.make_contiguous(arena))
    }

    /// Byte-exact comparison against `other` without materializing.
    pub fn eq_bytes(&self, other: &[u8]) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut rest = other;
        for segment in &self.segments {
            let (head, tail) = rest.split_at(segment.len());
            if head != *segment {
                return false;
            }
            rest = tail;
        }
        true
    }
}

impl PartialEq for HeaderView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .segments
                .iter()
                .flat_map(|s| s.iter())
                .eq(other.segments.iter().flat_map(|s| s.iter()))
    }
}

impl Eq for HeaderView<'_> {}
