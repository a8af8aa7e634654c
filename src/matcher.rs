//! The stateful matcher: one compiled pattern applied to one subject
//! string, with a region, bound modes, and replacement support.

use crate::api::Pattern;
use crate::matching::{execute, MatchState};
use std::fmt;

/// Errors from match-result queries and replacement expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A result accessor was called with no successful match in effect.
    NoMatchAvailable,
    /// The group index exceeds the pattern's group count.
    InvalidGroupIndex(usize),
    /// The pattern defines no group with this name.
    InvalidGroupName(String),
    /// Malformed `$` reference in a replacement string.
    InvalidReplacement(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchError::NoMatchAvailable => f.write_str("no match available"),
            MatchError::InvalidGroupIndex(i) => write!(f, "no group {}", i),
            MatchError::InvalidGroupName(name) => {
                write!(f, "no group with name <{}>", name)
            }
            MatchError::InvalidReplacement(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for MatchError {}

/// A matcher is created from [`Pattern::matcher`] and owns all state of
/// repeated match operations over one subject.
///
/// The region restricts where matching may occur. Anchoring bounds
/// (default on) make `^`, `$`, `\A`, `\Z`, and `\z` treat the region
/// edges as input edges; transparent bounds (default off) let
/// lookarounds and word boundaries see the text outside the region.
pub struct Matcher<'p, 's> {
    pattern: &'p Pattern,
    text: &'s str,
    region_start: usize,
    region_end: usize,
    anchoring: bool,
    transparent: bool,
    groups: Vec<Option<(usize, usize)>>,
    matched: bool,
    last_match_end: Option<usize>,
    next_from: usize,
    append_pos: usize,
    hit_end: bool,
    require_end: bool,
    hit_start: bool,
}

impl<'p, 's> Matcher<'p, 's> {
    pub(crate) fn new(pattern: &'p Pattern, text: &'s str) -> Matcher<'p, 's> {
        Matcher {
            pattern,
            text,
            region_start: 0,
            region_end: text.len(),
            anchoring: true,
            transparent: false,
            groups: vec![None; pattern.group_count() + 1],
            matched: false,
            last_match_end: None,
            next_from: 0,
            append_pos: 0,
            hit_end: false,
            require_end: false,
            hit_start: false,
        }
    }

    pub fn pattern(&self) -> &'p Pattern {
        self.pattern
    }

    pub fn text(&self) -> &'s str {
        self.text
    }

    /// Discard all match state and restore the region to the whole
    /// subject. Bound modes are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.region_start = 0;
        self.region_end = self.text.len();
        self.groups.fill(None);
        self.matched = false;
        self.last_match_end = None;
        self.next_from = 0;
        self.append_pos = 0;
        self.hit_end = false;
        self.require_end = false;
        self.hit_start = false;
        self
    }

    /// Swap in a new subject and discard all match state. The pattern
    /// and bound modes are kept.
    pub fn reset_subject(&mut self, text: &'s str) -> &mut Self {
        self.text = text;
        self.reset()
    }

    /// Limit match operations to `[start, end)`. Resets match state.
    ///
    /// Panics if the bounds are out of order, beyond the subject, or not
    /// on character boundaries.
    pub fn region(&mut self, start: usize, end: usize) -> &mut Self {
        assert!(
            start <= end && end <= self.text.len(),
            "region [{}, {}) out of bounds",
            start,
            end
        );
        assert!(
            self.text.is_char_boundary(start) && self.text.is_char_boundary(end),
            "region [{}, {}) not on character boundaries",
            start,
            end
        );
        self.reset();
        self.region_start = start;
        self.region_end = end;
        self.next_from = start;
        self
    }

    pub fn region_start(&self) -> usize {
        self.region_start
    }

    pub fn region_end(&self) -> usize {
        self.region_end
    }

    pub fn use_anchoring_bounds(&mut self, on: bool) -> &mut Self {
        self.anchoring = on;
        self
    }

    pub fn has_anchoring_bounds(&self) -> bool {
        self.anchoring
    }

    pub fn use_transparent_bounds(&mut self, on: bool) -> &mut Self {
        self.transparent = on;
        self
    }

    pub fn has_transparent_bounds(&self) -> bool {
        self.transparent
    }

    /// Whether the last match operation read up to the end of the
    /// window, so more input could change a failure into a success.
    pub fn hit_end(&self) -> bool {
        self.hit_end
    }

    /// Whether more input could turn the last successful match into a
    /// failure.
    pub fn require_end(&self) -> bool {
        self.require_end
    }

    /// Whether a lookbehind in the last operation probed the window
    /// start.
    pub fn hit_start(&self) -> bool {
        self.hit_start
    }

    // Match operations.

    /// Match the entire region.
    pub fn matches(&mut self) -> bool {
        self.clear_op_flags();
        let mut st = self.make_state();
        st.full_match = true;
        st.pos = self.region_start;
        let ok = execute(self.pattern.arena(), self.pattern.root(), &mut st);
        self.finish(ok, self.region_start, &st)
    }

    /// Match a prefix of the region.
    pub fn looking_at(&mut self) -> bool {
        self.clear_op_flags();
        let mut st = self.make_state();
        st.pos = self.region_start;
        let ok = execute(self.pattern.arena(), self.pattern.root(), &mut st);
        self.finish(ok, self.region_start, &st)
    }

    /// Find the next match, continuing after the previous one. A
    /// zero-width match advances by one character so the scan makes
    /// progress.
    pub fn find(&mut self) -> bool {
        let from = self.next_from.max(self.region_start);
        if from > self.region_end {
            self.clear_op_flags();
            self.matched = false;
            return false;
        }
        self.search(from)
    }

    /// Reset this matcher and find the first match at or after \p start.
    ///
    /// Panics if \p start is beyond the subject or not a character
    /// boundary.
    pub fn find_at(&mut self, start: usize) -> bool {
        assert!(
            start <= self.text.len() && self.text.is_char_boundary(start),
            "illegal start index {}",
            start
        );
        self.reset();
        self.search(start)
    }

    fn clear_op_flags(&mut self) {
        self.hit_end = false;
        self.require_end = false;
        self.hit_start = false;
    }

    fn make_state(&self) -> MatchState<'s> {
        let mut st = MatchState::new(
            self.text,
            self.pattern.group_count() as u16,
            self.pattern.loop_count(),
        );
        st.start = self.region_start;
        st.end = self.region_end;
        if self.anchoring {
            st.anchor_start = self.region_start;
            st.anchor_end = self.region_end;
        }
        if !self.transparent {
            st.probe_start = self.region_start;
            st.probe_end = self.region_end;
        }
        st.g_anchor = self.last_match_end.unwrap_or(self.region_start);
        st
    }

    fn search(&mut self, from: usize) -> bool {
        self.clear_op_flags();
        let scanner = self.pattern.scanner();
        let hay = &self.text.as_bytes()[..self.region_end];
        let mut st = self.make_state();
        let mut at = from;
        loop {
            match scanner.find(hay, at) {
                Some(candidate) => at = candidate,
                None => {
                    self.hit_end = true;
                    return self.finish(false, from, &st);
                }
            }
            st.pos = at;
            st.reset_groups();
            if execute(self.pattern.arena(), self.pattern.root(), &mut st) {
                return self.finish(true, at, &st);
            }
            if scanner.anchored() || at >= self.region_end {
                return self.finish(false, from, &st);
            }
            at = advance_one(self.text, at);
        }
    }

    fn finish(&mut self, ok: bool, start: usize, st: &MatchState) -> bool {
        self.hit_end |= st.hit_end;
        self.require_end |= st.require_end;
        self.hit_start |= st.hit_start;
        if !ok {
            self.matched = false;
            return false;
        }
        self.matched = true;
        self.groups[0] = Some((start, st.pos));
        for g in 1..self.groups.len() {
            self.groups[g] = st.group_span(g);
        }
        self.last_match_end = Some(st.pos);
        self.next_from = if start == st.pos {
            advance_one(self.text, st.pos)
        } else {
            st.pos
        };
        true
    }

    // Match results.

    /// Number of capturing groups in the pattern, excluding group 0.
    pub fn group_count(&self) -> usize {
        self.pattern.group_count()
    }

    /// The span of a group in the last match, or None when the group did
    /// not participate.
    pub fn span(&self, group: usize) -> Result<Option<(usize, usize)>, MatchError> {
        if group >= self.groups.len() {
            return Err(MatchError::InvalidGroupIndex(group));
        }
        if !self.matched {
            return Err(MatchError::NoMatchAvailable);
        }
        Ok(self.groups[group])
    }

    pub fn start(&self, group: usize) -> Result<Option<usize>, MatchError> {
        Ok(self.span(group)?.map(|(s, _)| s))
    }

    pub fn end(&self, group: usize) -> Result<Option<usize>, MatchError> {
        Ok(self.span(group)?.map(|(_, e)| e))
    }

    /// The text of a group in the last match.
    pub fn group(&self, group: usize) -> Result<Option<&'s str>, MatchError> {
        Ok(self.span(group)?.map(|(s, e)| &self.text[s..e]))
    }

    /// The text of a named group in the last match.
    pub fn group_named(&self, name: &str) -> Result<Option<&'s str>, MatchError> {
        let idx = self.named_group_index(name)?;
        self.group(idx)
    }

    fn named_group_index(&self, name: &str) -> Result<usize, MatchError> {
        self.pattern
            .group_index(name)
            .ok_or_else(|| MatchError::InvalidGroupName(name.to_string()))
    }

    // Replacement.

    /// Append the text between the previous append position and the
    /// current match, followed by the replacement with `$` references
    /// expanded. A malformed replacement leaves \p out untouched.
    pub fn append_replacement(
        &mut self,
        out: &mut String,
        replacement: &str,
    ) -> Result<&mut Self, MatchError> {
        let (match_start, match_end) = match self.groups[0] {
            Some(span) if self.matched => span,
            _ => return Err(MatchError::NoMatchAvailable),
        };
        let mut expansion = String::new();
        self.expand_replacement(replacement, &mut expansion)?;
        out.push_str(&self.text[self.append_pos..match_start]);
        out.push_str(&expansion);
        self.append_pos = match_end;
        Ok(self)
    }

    /// Append the rest of the subject after the last append position.
    pub fn append_tail(&self, out: &mut String) {
        out.push_str(&self.text[self.append_pos..]);
    }

    /// Replace every match of the pattern in the subject.
    pub fn replace_all(&mut self, replacement: &str) -> Result<String, MatchError> {
        self.reset();
        let mut out = String::new();
        while self.find() {
            self.append_replacement(&mut out, replacement)?;
        }
        self.append_tail(&mut out);
        Ok(out)
    }

    /// Replace the first match of the pattern in the subject.
    pub fn replace_first(&mut self, replacement: &str) -> Result<String, MatchError> {
        self.reset();
        let mut out = String::new();
        if self.find() {
            self.append_replacement(&mut out, replacement)?;
        }
        self.append_tail(&mut out);
        Ok(out)
    }

    /// Expand `$n`, `${name}`, and backslash escapes against the current
    /// match. A group reference takes the longest digit run that still
    /// names an existing group.
    fn expand_replacement(&self, replacement: &str, out: &mut String) -> Result<(), MatchError> {
        let mut chars = replacement.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => {
                        return Err(MatchError::InvalidReplacement(
                            "character to be escaped is missing".to_string(),
                        ))
                    }
                },
                '$' => {
                    let group = match chars.peek() {
                        Some('{') => {
                            chars.next();
                            let mut name = String::new();
                            loop {
                                match chars.next() {
                                    Some('}') => break,
                                    Some(c) => name.push(c),
                                    None => {
                                        return Err(MatchError::InvalidReplacement(
                                            "named capturing group is missing trailing '}'"
                                                .to_string(),
                                        ))
                                    }
                                }
                            }
                            self.named_group_index(&name)?
                        }
                        Some(d) if d.is_ascii_digit() => {
                            let mut num = chars.next().and_then(|c| c.to_digit(10)).map_or(0, |d| d as usize);
                            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                                let widened = num * 10 + d as usize;
                                if widened > self.group_count() {
                                    break;
                                }
                                num = widened;
                                chars.next();
                            }
                            if num > self.group_count() {
                                return Err(MatchError::InvalidGroupIndex(num));
                            }
                            num
                        }
                        _ => {
                            return Err(MatchError::InvalidReplacement(
                                "illegal group reference".to_string(),
                            ))
                        }
                    };
                    if let Some((s, e)) = self.groups[group] {
                        out.push_str(&self.text[s..e]);
                    }
                }
                c => out.push(c),
            }
        }
        Ok(())
    }
}

/// One character boundary past \p i, saturating past the end.
fn advance_one(text: &str, i: usize) -> usize {
    match text.get(i..).and_then(|rest| rest.chars().next()) {
        Some(c) => i + c.len_utf8(),
        None => i + 1,
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{Flags, Pattern};
    use pretty_assertions::assert_eq;

    fn pattern(p: &str) -> Pattern {
        Pattern::compile(p).unwrap()
    }

    #[test]
    fn test_find_iteration() {
        let p = pattern("a+");
        let mut m = p.matcher("aa b aaa a");
        assert!(m.find());
        assert_eq!(m.span(0).unwrap(), Some((0, 2)));
        assert!(m.find());
        assert_eq!(m.span(0).unwrap(), Some((5, 8)));
        assert!(m.find());
        assert_eq!(m.span(0).unwrap(), Some((9, 10)));
        assert!(!m.find());
    }

    #[test]
    fn test_empty_match_advances() {
        let p = pattern("a*");
        let mut m = p.matcher("aab");
        let mut spans = Vec::new();
        while m.find() {
            spans.push(m.span(0).unwrap().unwrap());
        }
        assert_eq!(spans, vec![(0, 2), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_matches_and_looking_at() {
        let p = pattern("a+b");
        assert!(p.matcher("aaab").matches());
        assert!(!p.matcher("aaabc").matches());
        assert!(p.matcher("aaabc").looking_at());
        assert!(!p.matcher("xaab").looking_at());
    }

    #[test]
    fn test_region_restricts_search() {
        let p = pattern("b");
        let mut m = p.matcher("abcabc");
        m.region(2, 5);
        assert!(m.find());
        assert_eq!(m.span(0).unwrap(), Some((4, 5)));
        assert!(!m.find());
    }

    #[test]
    fn test_anchoring_bounds() {
        let p = pattern("^b");
        let mut m = p.matcher("ab");
        m.region(1, 2);
        assert!(m.find());
        m.region(1, 2);
        m.use_anchoring_bounds(false);
        assert!(!m.find());
    }

    #[test]
    fn test_transparent_bounds() {
        let p = Pattern::compile("(?<=a)b").unwrap();
        let mut m = p.matcher("ab");
        m.region(1, 2);
        // Opaque bounds hide the 'a' from the lookbehind.
        assert!(!m.find());
        m.region(1, 2);
        m.use_transparent_bounds(true);
        assert!(m.find());
    }

    #[test]
    fn test_word_boundary_sees_through_transparent_bounds() {
        let p = Pattern::compile(r"\bb").unwrap();
        let mut m = p.matcher("ab");
        m.region(1, 2);
        assert!(m.find());
        m.region(1, 2);
        m.use_transparent_bounds(true);
        assert!(!m.find());
    }

    #[test]
    fn test_hit_end_and_require_end() {
        let p = pattern("abc");
        let mut m = p.matcher("ab");
        assert!(!m.find());
        assert!(m.hit_end());

        let p = pattern("a$");
        let mut m = p.matcher("a");
        assert!(m.find());
        assert!(m.require_end());

        let p = pattern("ab");
        let mut m = p.matcher("ab");
        assert!(m.find());
        assert!(!m.require_end());
    }

    #[test]
    fn test_last_match_anchor() {
        let p = Pattern::compile(r"\Ga").unwrap();
        let mut m = p.matcher("aaab");
        assert!(m.find());
        assert!(m.find());
        assert!(m.find());
        assert_eq!(m.span(0).unwrap(), Some((2, 3)));
        assert!(!m.find());
    }

    #[test]
    fn test_group_access_errors() {
        let p = pattern("(a)(b)?");
        let mut m = p.matcher("a");
        assert!(m.group(0).is_err());
        assert!(m.find());
        assert_eq!(m.group(0).unwrap(), Some("a"));
        assert_eq!(m.group(1).unwrap(), Some("a"));
        assert_eq!(m.group(2).unwrap(), None);
        assert!(m.group(3).is_err());
    }

    #[test]
    fn test_named_groups() {
        let p = Pattern::compile("(?<word>[a-z]+) (?<num>[0-9]+)").unwrap();
        let mut m = p.matcher("abc 42");
        assert!(m.find());
        assert_eq!(m.group_named("word").unwrap(), Some("abc"));
        assert_eq!(m.group_named("num").unwrap(), Some("42"));
        assert!(m.group_named("other").is_err());
    }

    #[test]
    fn test_replace_all() {
        let p = pattern("cat");
        let mut m = p.matcher("one cat two cats");
        assert_eq!(m.replace_all("dog").unwrap(), "one dog two dogs");

        let p = pattern("(a+)(b)");
        let mut m = p.matcher("xaaby");
        assert_eq!(m.replace_all("[$2$1]").unwrap(), "x[baa]y");
    }

    #[test]
    fn test_replacement_references() {
        let p = Pattern::compile("(?<x>a)(b)").unwrap();
        let mut m = p.matcher("ab");
        assert_eq!(m.replace_first("${x}-$2").unwrap(), "a-b");
        // $12 shrinks to $1 followed by literal 2.
        let mut m = p.matcher("ab");
        assert_eq!(m.replace_first("$12").unwrap(), "a2");
        // Backslash escapes the dollar.
        let mut m = p.matcher("ab");
        assert_eq!(m.replace_first(r"\$1").unwrap(), "$1");
    }

    #[test]
    fn test_replacement_errors_leave_output_untouched() {
        let p = pattern("(a)");
        let mut m = p.matcher("xay");
        assert!(m.find());
        let mut out = String::new();
        assert!(m.append_replacement(&mut out, "$9").is_err());
        assert!(m.append_replacement(&mut out, "$x").is_err());
        assert_eq!(out, "");
        m.append_replacement(&mut out, "<$1>").unwrap();
        m.append_tail(&mut out);
        assert_eq!(out, "x<a>y");
    }

    #[test]
    fn test_unset_group_replacement_is_empty() {
        let p = pattern("(a)|(b)");
        let mut m = p.matcher("ab");
        assert_eq!(m.replace_all("[$1$2]").unwrap(), "[a][b]");
    }

    #[test]
    fn test_case_insensitive_flag() {
        let p = Pattern::compile_with_flags("abc", Flags::CASE_INSENSITIVE).unwrap();
        assert!(p.matcher("AbC").matches());
    }
}
