//! The public API: compiled patterns, flags, and convenience searches.
//!
//! Supports the usual pattern surface: literals, classes with union,
//! intersection, and negation, predefined classes, greedy, reluctant,
//! and possessive quantifiers, capturing and named groups, alternation,
//! backreferences, lookahead and bounded lookbehind, atomic groups,
//! anchors, and inline flags.
//!
//! # Example
//!
//! ```rust
//! use retrack::Pattern;
//! let pattern = Pattern::compile(r"(\w+)@(\w+)").unwrap();
//! let mut matcher = pattern.matcher("write to user@example");
//! assert!(matcher.find());
//! assert_eq!(matcher.group(1).unwrap(), Some("user"));
//! assert_eq!(matcher.group(2).unwrap(), Some("example"));
//! ```

use crate::matcher::Matcher;
use crate::node::{Arena, NodeId};
use crate::parse::{self, Error};
use crate::search::{self, Scanner};
use std::collections::HashMap;
use std::fmt;
use std::ops::{BitOr, Range};
use std::sync::OnceLock;

/// Pattern compilation flags, combinable with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Only `\n` terminates a line for `.`, `^`, and `$`.
    pub const UNIX_LINES: Flags = Flags(0x01);
    /// Case-insensitive matching; ASCII-only unless [`Flags::UNICODE_CASE`]
    /// is also set.
    pub const CASE_INSENSITIVE: Flags = Flags(0x02);
    /// Ignore whitespace and `#` comments in the pattern.
    pub const COMMENTS: Flags = Flags(0x04);
    /// `^` and `$` match at line boundaries.
    pub const MULTILINE: Flags = Flags(0x08);
    /// Treat the pattern as literal text.
    pub const LITERAL: Flags = Flags(0x10);
    /// `.` matches line terminators too.
    pub const DOT_ALL: Flags = Flags(0x20);
    /// Unicode-aware case folding.
    pub const UNICODE_CASE: Flags = Flags(0x40);
    /// Canonical equivalence. Recognized but not supported; compilation
    /// rejects it.
    pub const CANON_EQ: Flags = Flags(0x80);
    /// Unicode definitions for the predefined classes and boundaries.
    /// Implies [`Flags::UNICODE_CASE`].
    pub const UNICODE_CLASSES: Flags = Flags(0x100);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Flags {
        Flags(bits)
    }

    /// \return whether every flag of \p rhs is set.
    pub fn contains(self, rhs: Flags) -> bool {
        self.0 & rhs.0 == rhs.0
    }

    pub fn with(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }

    pub fn without(self, rhs: Flags) -> Flags {
        Flags(self.0 & !rhs.0)
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.with(rhs)
    }
}

/// A compiled pattern, immutable and shareable across matchers.
pub struct Pattern {
    pattern: String,
    flags: Flags,
    root: NodeId,
    arena: Arena,
    group_count: u16,
    group_names: HashMap<String, u16>,
    loop_count: u16,
    /// Built on first search.
    scanner: OnceLock<Scanner>,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("pattern", &self.pattern)
            .field("flags", &self.flags)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl Pattern {
    /// Compile \p pattern with default flags.
    pub fn compile(pattern: &str) -> Result<Pattern, Error> {
        Pattern::compile_with_flags(pattern, Flags::NONE)
    }

    /// Compile \p pattern under \p flags.
    pub fn compile_with_flags(pattern: &str, flags: Flags) -> Result<Pattern, Error> {
        if flags.contains(Flags::CANON_EQ) {
            return Err(Error {
                message: "canonical equivalence is not supported".to_string(),
                offset: 0,
            });
        }
        let mut flags = flags;
        if flags.contains(Flags::UNICODE_CLASSES) {
            flags = flags | Flags::UNICODE_CASE;
        }
        let out = parse::parse(pattern, flags)?;
        Ok(Pattern {
            pattern: pattern.to_string(),
            flags,
            root: out.root,
            arena: out.arena,
            group_count: out.group_count,
            group_names: out.group_names,
            loop_count: out.loop_count,
            scanner: OnceLock::new(),
        })
    }

    /// The source text this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Number of capturing groups, excluding the whole-match group 0.
    pub fn group_count(&self) -> usize {
        self.group_count as usize
    }

    /// The index of a named capturing group.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.group_names.get(name).map(|&g| g as usize)
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn loop_count(&self) -> u16 {
        self.loop_count
    }

    pub(crate) fn scanner(&self) -> &Scanner {
        self.scanner
            .get_or_init(|| search::build(&self.arena, self.root))
    }

    /// A matcher over \p text.
    pub fn matcher<'p, 's>(&'p self, text: &'s str) -> Matcher<'p, 's> {
        Matcher::new(self, text)
    }

    /// \return whether the pattern matches anywhere in \p text.
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher(text).find()
    }

    /// Iterate over non-overlapping match ranges in \p text.
    pub fn find_iter<'p, 's>(&'p self, text: &'s str) -> Matches<'p, 's> {
        Matches {
            matcher: self.matcher(text),
        }
    }

    /// Split \p text around matches of this pattern, with trailing empty
    /// pieces removed.
    pub fn split<'p, 's>(&'p self, text: &'s str) -> Vec<&'s str> {
        self.split_n(text, 0)
    }

    /// Split \p text around matches of this pattern.
    ///
    /// A positive \p limit caps the number of pieces, leaving the
    /// remainder unsplit in the last one. A limit of zero removes
    /// trailing empty pieces; a negative limit keeps them.
    pub fn split_n<'s>(&self, text: &'s str, limit: i32) -> Vec<&'s str> {
        let mut pieces: Vec<&'s str> = Vec::new();
        let mut m = self.matcher(text);
        let mut from = 0;
        while m.find() {
            if limit > 0 && pieces.len() as i32 == limit - 1 {
                break;
            }
            let (start, end) = m.span(0).ok().flatten().unwrap_or((from, from));
            // A zero-width match at the front never yields a leading
            // empty piece.
            if start == end && start == 0 {
                continue;
            }
            pieces.push(&text[from..start]);
            from = end;
        }
        if pieces.is_empty() && from == 0 {
            return vec![text];
        }
        pieces.push(&text[from..]);
        if limit == 0 {
            while pieces.last() == Some(&"") {
                pieces.pop();
            }
        }
        pieces
    }

    /// Escape \p text so it matches itself as a pattern.
    pub fn quote(text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 4);
        out.push_str(r"\Q");
        let mut rest = text;
        while let Some(i) = rest.find(r"\E") {
            out.push_str(&rest[..i]);
            out.push_str(r"\E\\E\Q");
            rest = &rest[i + 2..];
        }
        out.push_str(rest);
        out.push_str(r"\E");
        out
    }
}

/// Iterator over the non-overlapping match ranges of one pattern in one
/// subject, in order.
pub struct Matches<'p, 's> {
    matcher: Matcher<'p, 's>,
}

impl<'p, 's> Iterator for Matches<'p, 's> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if !self.matcher.find() {
            return None;
        }
        let (start, end) = self.matcher.span(0).ok().flatten()?;
        Some(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_errors_are_reported() {
        let err = Pattern::compile("a(b").unwrap_err();
        assert_eq!(err.offset, 1);
        let err = Pattern::compile_with_flags("a", Flags::CANON_EQ).unwrap_err();
        assert!(err.message.contains("canonical equivalence"));
    }

    #[test]
    fn test_unicode_classes_implies_unicode_case() {
        let p = Pattern::compile_with_flags("a", Flags::UNICODE_CLASSES).unwrap();
        assert!(p.flags().contains(Flags::UNICODE_CASE));
    }

    #[test]
    fn test_find_iter() {
        let p = Pattern::compile("[0-9]+").unwrap();
        let ranges: Vec<_> = p.find_iter("a1b22c333").collect();
        assert_eq!(ranges, vec![1..2, 3..5, 6..9]);
    }

    #[test]
    fn test_is_match() {
        let p = Pattern::compile("b.d").unwrap();
        assert!(p.is_match("abcde"));
        assert!(!p.is_match("abde"));
    }

    #[test]
    fn test_split() {
        let p = Pattern::compile(",").unwrap();
        assert_eq!(p.split("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(p.split("a,b,,,"), vec!["a", "b"]);
        assert_eq!(p.split_n("a,b,,,", -1), vec!["a", "b", "", "", ""]);
        assert_eq!(p.split_n("a,b,c", 2), vec!["a", "b,c"]);
        assert_eq!(p.split("no separators"), vec!["no separators"]);
        let p = Pattern::compile("o").unwrap();
        assert_eq!(p.split("boo"), vec!["b"]);
    }

    #[test]
    fn test_literal_flag() {
        let p = Pattern::compile_with_flags("a.*b", Flags::LITERAL).unwrap();
        assert!(p.is_match("xa.*bx"));
        assert!(!p.is_match("aXb"));
    }

    #[test]
    fn test_quote() {
        let p = Pattern::compile(&Pattern::quote("a.*b")).unwrap();
        assert!(p.is_match("xa.*bx"));
        assert!(!p.is_match("aXb"));
        let p = Pattern::compile(&Pattern::quote(r"x\Ey")).unwrap();
        assert!(p.is_match(r"ax\Eyb"));
    }

    #[test]
    fn test_pattern_display() {
        let p = Pattern::compile("a+b").unwrap();
        assert_eq!(p.to_string(), "a+b");
        assert_eq!(p.as_str(), "a+b");
    }
}
