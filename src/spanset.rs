//! Sets of code points, represented as sorted, disjoint, nonempty spans.

use std::cmp::Ordering;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: u32 = 0x10FFFF;

/// An inclusive range of code points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub first: u32,
    pub last: u32,
}

impl Span {
    pub const fn new(first: u32, last: u32) -> Span {
        Span { first, last }
    }

    pub const fn single(cp: u32) -> Span {
        Span { first: cp, last: cp }
    }

    /// \return whether this span contains a code point.
    #[inline(always)]
    pub fn contains(&self, cp: u32) -> bool {
        self.first <= cp && cp <= self.last
    }

    /// \return the number of contained code points.
    pub fn count(&self) -> u32 {
        self.last - self.first + 1
    }

    /// \return whether this span overlaps or directly abuts \p rhs, so that
    /// the two may be replaced by a single span.
    fn mergeable(&self, rhs: &Span) -> bool {
        self.first <= rhs.last.saturating_add(1) && rhs.first <= self.last.saturating_add(1)
    }

    /// Order two spans, with mergeable spans comparing equal.
    fn merge_cmp(&self, rhs: &Span) -> Ordering {
        if self.mergeable(rhs) {
            Ordering::Equal
        } else if self.last < rhs.first {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

/// A set of code points stored as sorted, disjoint, nonempty spans.
/// Adjacent spans are always coalesced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Vec<Span>,
}

impl SpanSet {
    pub fn new() -> SpanSet {
        SpanSet { spans: Vec::new() }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// \return the smallest contained code point.
    pub fn first(&self) -> Option<u32> {
        self.spans.first().map(|s| s.first)
    }

    /// \return the largest contained code point.
    pub fn last(&self) -> Option<u32> {
        self.spans.last().map(|s| s.last)
    }

    /// \return the total number of contained code points.
    pub fn count(&self) -> usize {
        self.spans.iter().map(|s| s.count() as usize).sum()
    }

    /// \return whether a code point is contained.
    pub fn contains(&self, cp: u32) -> bool {
        self.spans
            .binary_search_by(|s| {
                if cp < s.first {
                    Ordering::Greater
                } else if cp > s.last {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Add a span, merging with any overlapping or abutting spans.
    pub fn add(&mut self, span: Span) {
        debug_assert!(span.first <= span.last);
        let lo = self.spans.partition_point(|s| s.merge_cmp(&span) == Ordering::Less);
        let hi = lo + self.spans[lo..].partition_point(|s| s.merge_cmp(&span) == Ordering::Equal);
        if lo == hi {
            self.spans.insert(lo, span);
        } else {
            let first = self.spans[lo].first.min(span.first);
            let last = self.spans[hi - 1].last.max(span.last);
            self.spans[lo] = Span::new(first, last);
            self.spans.drain(lo + 1..hi);
        }
    }

    /// Add a single code point.
    pub fn add_one(&mut self, cp: u32) {
        self.add(Span::single(cp))
    }

    /// Add every span of another set.
    pub fn add_set(&mut self, rhs: &SpanSet) {
        // Add the larger set to the smaller would be better, but callers
        // mutate in place; spans lists are short in practice.
        for span in rhs.spans() {
            self.add(*span);
        }
    }

    /// \return the complement of this set over [0, CODE_POINT_MAX].
    pub fn negated(&self) -> SpanSet {
        let mut result = SpanSet::new();
        let mut start = 0u32;
        for span in &self.spans {
            if span.first > start {
                result.spans.push(Span::new(start, span.first - 1));
            }
            match span.last.checked_add(1) {
                Some(next) => start = next,
                None => return result,
            }
        }
        if start <= CODE_POINT_MAX {
            result.spans.push(Span::new(start, CODE_POINT_MAX));
        }
        result
    }

    /// \return the intersection of two sets.
    pub fn intersected(&self, rhs: &SpanSet) -> SpanSet {
        let mut result = SpanSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < rhs.spans.len() {
            let a = self.spans[i];
            let b = rhs.spans[j];
            let first = a.first.max(b.first);
            let last = a.last.min(b.last);
            if first <= last {
                result.spans.push(Span::new(first, last));
            }
            if a.last < b.last {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }
}
