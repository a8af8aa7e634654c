//! The backtracking interpreter.
//!
//! Execution walks node chains iteratively, recursing at choice points
//! (alternations, loops, groups, lookarounds). A failed sub-run may leave
//! the position dirty; every choice point saves and restores the position
//! itself, so straight-line nodes never need to.
//!
//! Lookbehind operands were compiled with reversed concatenation order, so
//! the same interpreter evaluates them by stepping backward. Direction is
//! a compile-time parameter to keep the hot forward path free of checks.

use crate::node::{AnchorKind, Arena, CharMatcher, LoopKind, Node, NodeId};
use crate::unicode;
use memchr::memmem;

/// Sentinel offset for an unset group boundary.
pub(crate) const UNSET: usize = usize::MAX;

/// Per-slot state of a general loop: completed iterations and the
/// position at which the current iteration began.
#[derive(Debug, Clone, Copy, Default)]
struct LoopData {
    iters: u32,
    entry: usize,
}

pub(crate) trait Direction {
    const FORWARD: bool;
}

pub(crate) struct Forward;
pub(crate) struct Backward;

impl Direction for Forward {
    const FORWARD: bool = true;
}

impl Direction for Backward {
    const FORWARD: bool = false;
}

/// All mutable state of one match attempt.
///
/// The consumable window is `[start, end]`; `anchor_*` are the bounds
/// seen by anchors and `probe_*` the bounds seen by lookarounds and word
/// boundaries, which differ from the window when the anchoring or
/// transparency of region bounds is adjusted.
pub(crate) struct MatchState<'s> {
    pub(crate) haystack: &'s str,
    pub(crate) pos: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) anchor_start: usize,
    pub(crate) anchor_end: usize,
    pub(crate) probe_start: usize,
    pub(crate) probe_end: usize,
    /// Position at which `\G` holds.
    pub(crate) g_anchor: usize,
    /// Require the match to consume through the window end.
    pub(crate) full_match: bool,
    pub(crate) group_starts: Vec<usize>,
    pub(crate) group_ends: Vec<usize>,
    loops: Vec<LoopData>,
    pub(crate) hit_end: bool,
    pub(crate) require_end: bool,
    pub(crate) hit_start: bool,
}

/// Run the compiled chain at \p root against \p st.
pub(crate) fn execute(arena: &Arena, root: NodeId, st: &mut MatchState) -> bool {
    st.run::<Forward>(arena, root)
}

impl<'s> MatchState<'s> {
    pub(crate) fn new(haystack: &'s str, group_count: u16, loop_count: u16) -> MatchState<'s> {
        let slots = group_count as usize + 1;
        MatchState {
            haystack,
            pos: 0,
            start: 0,
            end: haystack.len(),
            anchor_start: 0,
            anchor_end: haystack.len(),
            probe_start: 0,
            probe_end: haystack.len(),
            g_anchor: 0,
            full_match: false,
            group_starts: vec![UNSET; slots],
            group_ends: vec![UNSET; slots],
            loops: vec![LoopData::default(); loop_count as usize],
            hit_end: false,
            require_end: false,
            hit_start: false,
        }
    }

    pub(crate) fn reset_groups(&mut self) {
        self.group_starts.fill(UNSET);
        self.group_ends.fill(UNSET);
    }

    /// \return the span of group \p g, when both boundaries were recorded.
    pub(crate) fn group_span(&self, g: usize) -> Option<(usize, usize)> {
        let (s, e) = (self.group_starts[g], self.group_ends[g]);
        if s == UNSET || e == UNSET {
            None
        } else {
            Some((s, e))
        }
    }

    fn char_at(&self, i: usize) -> Option<char> {
        self.haystack[i..].chars().next()
    }

    fn char_before(&self, i: usize) -> Option<char> {
        self.haystack[..i].chars().next_back()
    }

    /// Consume one character in direction \p D, or report why not.
    fn take_char<D: Direction>(&mut self) -> Option<char> {
        if D::FORWARD {
            if self.pos >= self.end {
                self.hit_end = true;
                return None;
            }
            let c = self.haystack[self.pos..self.end].chars().next()?;
            self.pos += c.len_utf8();
            Some(c)
        } else {
            if self.pos <= self.start {
                self.hit_start = true;
                return None;
            }
            let c = self.haystack[self.start..self.pos].chars().next_back()?;
            self.pos -= c.len_utf8();
            Some(c)
        }
    }

    /// Consume one character accepted by \p m, leaving the position
    /// unchanged on refusal.
    fn take_matching<D: Direction>(&mut self, m: &CharMatcher) -> bool {
        let save = self.pos;
        match self.take_char::<D>() {
            Some(c) if m.matches(c) => true,
            Some(_) => {
                self.pos = save;
                false
            }
            None => false,
        }
    }

    /// One character boundary away from \p i, against direction \p D.
    fn step_back<D: Direction>(&self, i: usize) -> usize {
        if D::FORWARD {
            match self.char_before(i) {
                Some(c) => i - c.len_utf8(),
                None => i,
            }
        } else {
            match self.char_at(i) {
                Some(c) => i + c.len_utf8(),
                None => i,
            }
        }
    }

    fn run<D: Direction>(&mut self, arena: &Arena, mut id: NodeId) -> bool {
        loop {
            match &arena[id] {
                Node::Accept => {
                    return !self.full_match || self.pos == self.end;
                }
                Node::IterEnd => return true,
                Node::Single { m, next } => {
                    match self.take_char::<D>() {
                        Some(c) if m.matches(c) => {}
                        _ => return false,
                    }
                    id = *next;
                }
                Node::Literal { bytes, next } => {
                    debug_assert!(D::FORWARD);
                    let avail = self.end - self.pos;
                    let take = bytes.len().min(avail);
                    if self.haystack.as_bytes()[self.pos..self.pos + take] != bytes[..take] {
                        return false;
                    }
                    if take < bytes.len() {
                        self.hit_end = true;
                        return false;
                    }
                    self.pos += bytes.len();
                    id = *next;
                }
                Node::Needle { positions, next } => {
                    debug_assert!(D::FORWARD);
                    for set in positions {
                        match self.take_char::<D>() {
                            Some(c) if set.contains(&c) => {}
                            _ => return false,
                        }
                    }
                    id = *next;
                }
                Node::Anchor {
                    kind,
                    multiline,
                    unix_lines,
                    next,
                } => {
                    let ok = match kind {
                        AnchorKind::LineStart => self.caret(*multiline, *unix_lines),
                        AnchorKind::LineEnd => self.dollar(*multiline, *unix_lines),
                        AnchorKind::InputStart => self.pos == self.anchor_start,
                        AnchorKind::LastMatchEnd => self.pos == self.g_anchor,
                        AnchorKind::InputEndBeforeTerminator => self.dollar(false, *unix_lines),
                        AnchorKind::InputEnd => {
                            if self.pos == self.anchor_end {
                                self.hit_end = true;
                                self.require_end = true;
                                true
                            } else {
                                false
                            }
                        }
                    };
                    if !ok {
                        return false;
                    }
                    id = *next;
                }
                Node::WordBoundary {
                    negate,
                    unicode,
                    next,
                } => {
                    let left = self.pos > self.probe_start
                        && self
                            .char_before(self.pos)
                            .map_or(false, |c| unicode::is_word_char(c, *unicode));
                    let right = if self.pos < self.probe_end {
                        self.char_at(self.pos)
                            .map_or(false, |c| unicode::is_word_char(c, *unicode))
                    } else {
                        self.hit_end = true;
                        false
                    };
                    if (left != right) == *negate {
                        return false;
                    }
                    id = *next;
                }
                Node::LineBreak { next } => {
                    if !self.take_line_break::<D>() {
                        return false;
                    }
                    id = *next;
                }
                Node::Join { next } => id = *next,
                Node::Alt { branches, .. } => {
                    let save = self.pos;
                    for &branch in branches.iter() {
                        self.pos = save;
                        if self.run::<D>(arena, branch) {
                            return true;
                        }
                    }
                    return false;
                }
                Node::GroupStart { group, next } => {
                    let g = *group as usize;
                    let saved = self.group_starts[g];
                    self.group_starts[g] = self.pos;
                    if self.run::<D>(arena, *next) {
                        return true;
                    }
                    self.group_starts[g] = saved;
                    return false;
                }
                Node::GroupEnd { group, next } => {
                    let g = *group as usize;
                    let saved = self.group_ends[g];
                    self.group_ends[g] = self.pos;
                    if self.run::<D>(arena, *next) {
                        return true;
                    }
                    self.group_ends[g] = saved;
                    return false;
                }
                Node::Loop {
                    kind: LoopKind::Possessive,
                    min,
                    max,
                    body,
                    next,
                    ..
                } => {
                    return self.run_possessive_loop::<D>(arena, *min, *max, *body, *next);
                }
                Node::Loop { slot, .. } => {
                    let slot = *slot as usize;
                    let saved = self.loops[slot];
                    self.loops[slot] = LoopData {
                        iters: 0,
                        entry: self.pos,
                    };
                    let ok = self.loop_decide::<D>(arena, id);
                    if !ok {
                        self.loops[slot] = saved;
                    }
                    return ok;
                }
                Node::LoopAgain { owner } => {
                    let owner = *owner;
                    let slot = match &arena[owner] {
                        Node::Loop { slot, .. } => *slot as usize,
                        _ => unreachable!("loop tail must point at its loop"),
                    };
                    let saved = self.loops[slot];
                    self.loops[slot].iters = saved.iters + 1;
                    let ok = self.loop_decide::<D>(arena, owner);
                    if !ok {
                        self.loops[slot] = saved;
                    }
                    return ok;
                }
                Node::CharLoop {
                    kind,
                    min,
                    max,
                    m,
                    next,
                } => {
                    return self.run_char_loop::<D>(arena, *kind, *min, *max, m, *next);
                }
                Node::Scan {
                    greedy,
                    min_one,
                    mode,
                    bytes,
                    next,
                } => {
                    debug_assert!(D::FORWARD);
                    return self.run_scan(arena, *greedy, *min_one, *mode, bytes, *next);
                }
                Node::BackRef {
                    group,
                    icase,
                    unicode,
                    next,
                } => {
                    if !self.take_back_ref::<D>(*group, *icase, *unicode) {
                        return false;
                    }
                    id = *next;
                }
                Node::Lookaround {
                    negate,
                    behind,
                    body,
                    next,
                } => {
                    let (negate, behind, body, next) = (*negate, *behind, *body, *next);
                    let save_pos = self.pos;
                    let save_window = (self.start, self.end);
                    self.start = self.probe_start;
                    self.end = self.probe_end;
                    // Captures inside a rejected probe must not leak out.
                    let saved_groups = if negate {
                        Some((self.group_starts.clone(), self.group_ends.clone()))
                    } else {
                        None
                    };
                    let ok = if behind {
                        self.run::<Backward>(arena, body)
                    } else {
                        self.run::<Forward>(arena, body)
                    };
                    self.start = save_window.0;
                    self.end = save_window.1;
                    self.pos = save_pos;
                    if ok == negate {
                        if let Some((s, e)) = saved_groups {
                            self.group_starts = s;
                            self.group_ends = e;
                        }
                        return false;
                    }
                    id = next;
                }
                Node::Atomic { body, next } => {
                    let (body, next) = (*body, *next);
                    let saved_groups = (self.group_starts.clone(), self.group_ends.clone());
                    if !self.run::<D>(arena, body) {
                        return false;
                    }
                    if self.run::<D>(arena, next) {
                        return true;
                    }
                    self.group_starts = saved_groups.0;
                    self.group_ends = saved_groups.1;
                    return false;
                }
            }
        }
    }

    /// Choose between repeating a loop body and running the continuation.
    /// Called at loop entry with zero iterations, and again from the body
    /// tail after each completed iteration.
    fn loop_decide<D: Direction>(&mut self, arena: &Arena, owner: NodeId) -> bool {
        let (kind, min, max, slot, body, next) = match &arena[owner] {
            Node::Loop {
                kind,
                min,
                max,
                slot,
                body,
                next,
            } => (*kind, *min, *max, *slot as usize, *body, *next),
            _ => unreachable!("loop_decide on a non-loop node"),
        };
        let d = self.loops[slot];
        // An iteration that consumed nothing would repeat forever; stop,
        // treating the empty repetitions as satisfying any minimum.
        if d.iters > 0 && self.pos == d.entry {
            return self.run::<D>(arena, next);
        }
        if d.iters < min {
            self.loops[slot].entry = self.pos;
            let ok = self.run::<D>(arena, body);
            if !ok {
                self.loops[slot] = d;
            }
            return ok;
        }
        let may_repeat = d.iters < max;
        match kind {
            LoopKind::Greedy => {
                if may_repeat {
                    let save_pos = self.pos;
                    self.loops[slot].entry = self.pos;
                    if self.run::<D>(arena, body) {
                        return true;
                    }
                    self.loops[slot] = d;
                    self.pos = save_pos;
                }
                self.run::<D>(arena, next)
            }
            LoopKind::Reluctant => {
                let save_pos = self.pos;
                if self.run::<D>(arena, next) {
                    return true;
                }
                if !may_repeat {
                    return false;
                }
                self.pos = save_pos;
                self.loops[slot].entry = self.pos;
                let ok = self.run::<D>(arena, body);
                if !ok {
                    self.loops[slot] = d;
                }
                ok
            }
            LoopKind::Possessive => unreachable!("possessive loops do not re-enter"),
        }
    }

    /// A possessive loop commits to the longest body repetition up front;
    /// its body chain ends at the committing terminal.
    fn run_possessive_loop<D: Direction>(
        &mut self,
        arena: &Arena,
        min: u32,
        max: u32,
        body: NodeId,
        next: NodeId,
    ) -> bool {
        let saved_groups = (self.group_starts.clone(), self.group_ends.clone());
        let mut iters: u32 = 0;
        let mut stuck_empty = false;
        while iters < max {
            let entry = self.pos;
            if !self.run::<D>(arena, body) {
                self.pos = entry;
                break;
            }
            if self.pos == entry {
                stuck_empty = true;
                break;
            }
            iters += 1;
        }
        if iters < min && !stuck_empty {
            self.group_starts = saved_groups.0;
            self.group_ends = saved_groups.1;
            return false;
        }
        if self.run::<D>(arena, next) {
            return true;
        }
        self.group_starts = saved_groups.0;
        self.group_ends = saved_groups.1;
        false
    }

    /// Iterative quantifier over a single character matcher: consume in a
    /// tight loop, then retreat one character boundary at a time.
    fn run_char_loop<D: Direction>(
        &mut self,
        arena: &Arena,
        kind: LoopKind,
        min: u32,
        max: u32,
        m: &CharMatcher,
        next: NodeId,
    ) -> bool {
        let mut count: u32 = 0;
        while count < min {
            if !self.take_matching::<D>(m) {
                return false;
            }
            count += 1;
        }
        match kind {
            LoopKind::Greedy | LoopKind::Possessive => {
                let floor = self.pos;
                while count < max && self.take_matching::<D>(m) {
                    count += 1;
                }
                if kind == LoopKind::Possessive {
                    return self.run::<D>(arena, next);
                }
                let mut cur = self.pos;
                loop {
                    self.pos = cur;
                    if self.run::<D>(arena, next) {
                        return true;
                    }
                    if cur == floor {
                        return false;
                    }
                    cur = self.step_back::<D>(cur);
                }
            }
            LoopKind::Reluctant => loop {
                let cur = self.pos;
                if self.run::<D>(arena, next) {
                    return true;
                }
                self.pos = cur;
                if count >= max || !self.take_matching::<D>(m) {
                    return false;
                }
                count += 1;
            },
        }
    }

    /// `.*lit` / `.+lit`: jump between candidate literal occurrences in
    /// the stretch the dot could cover, longest-first when greedy.
    fn run_scan(
        &mut self,
        arena: &Arena,
        greedy: bool,
        min_one: bool,
        mode: crate::node::TerminatorMode,
        bytes: &[u8],
        next: NodeId,
    ) -> bool {
        let begin = self.pos;
        // The dot may not cross a disallowed character, so literal
        // candidates start no later than the first one.
        let mut limit = self.end;
        for (off, c) in self.haystack[begin..self.end].char_indices() {
            if !mode.allows(c) {
                limit = begin + off;
                break;
            }
        }
        // A greedy dot run consumes up to the limit before the first
        // literal probe, reaching the end when nothing stops it. The
        // reluctant form only reaches the end on failure.
        if greedy && limit == self.end {
            self.hit_end = true;
        }
        let hay_end = (limit + bytes.len()).min(self.end);
        let hay = &self.haystack.as_bytes()[begin..hay_end];
        let try_candidate = |st: &mut Self, s: usize| -> Option<bool> {
            if begin + s > limit || (min_one && s == 0) {
                return None;
            }
            st.pos = begin + s + bytes.len();
            Some(st.run::<Forward>(arena, next))
        };
        if greedy {
            for s in memmem::rfind_iter(hay, bytes) {
                match try_candidate(self, s) {
                    Some(true) => return true,
                    _ => continue,
                }
            }
        } else {
            for s in memmem::find_iter(hay, bytes) {
                match try_candidate(self, s) {
                    Some(true) => return true,
                    _ => continue,
                }
            }
        }
        // On failure the stepped equivalent probes every remaining
        // position: the dot itself reaches the end, or a literal probe
        // near it matches a prefix and runs out of input.
        if limit == self.end {
            self.hit_end = true;
        } else if !bytes.is_empty() {
            let text = self.haystack.as_bytes();
            let lo = (self.end + 1).saturating_sub(bytes.len()).max(begin);
            for p in lo..=limit {
                if min_one && p == begin {
                    continue;
                }
                let tail = &text[p..self.end];
                if bytes.starts_with(tail) {
                    self.hit_end = true;
                    break;
                }
            }
        }
        false
    }

    /// `\R`: a carriage-return/newline pair, else any one line terminator.
    fn take_line_break<D: Direction>(&mut self) -> bool {
        if D::FORWARD {
            let c = match self.take_char::<D>() {
                Some(c) => c,
                None => return false,
            };
            if c == '\r' && self.pos < self.end && self.char_at(self.pos) == Some('\n') {
                self.pos += 1;
                return true;
            }
            unicode::is_line_terminator(c)
        } else {
            let c = match self.take_char::<D>() {
                Some(c) => c,
                None => return false,
            };
            if c == '\n' && self.pos > self.start && self.char_before(self.pos) == Some('\r') {
                self.pos -= 1;
                return true;
            }
            unicode::is_line_terminator(c)
        }
    }

    /// Match the text captured by a group again. An unset group fails.
    fn take_back_ref<D: Direction>(&mut self, group: u16, icase: bool, unicode: bool) -> bool {
        let (gs, ge) = match self.group_span(group as usize) {
            Some(span) => span,
            None => return false,
        };
        let text = &self.haystack[gs..ge];
        if !icase {
            if D::FORWARD {
                let avail = self.end - self.pos;
                let take = text.len().min(avail);
                if self.haystack.as_bytes()[self.pos..self.pos + take]
                    != text.as_bytes()[..take]
                {
                    return false;
                }
                if take < text.len() {
                    self.hit_end = true;
                    return false;
                }
                self.pos += text.len();
            } else {
                if self.pos - self.start < text.len() {
                    self.hit_start = true;
                    return false;
                }
                let from = self.pos - text.len();
                if &self.haystack.as_bytes()[from..self.pos] != text.as_bytes() {
                    return false;
                }
                self.pos = from;
            }
            return true;
        }
        if D::FORWARD {
            for rc in text.chars() {
                match self.take_char::<D>() {
                    Some(sc) if unicode::chars_eq_icase(sc, rc, unicode) => {}
                    _ => return false,
                }
            }
        } else {
            for rc in text.chars().rev() {
                match self.take_char::<D>() {
                    Some(sc) if unicode::chars_eq_icase(sc, rc, unicode) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// `^`: the window start, or just after a line terminator in
    /// multiline mode (but never at the window end, and never between a
    /// carriage return and a newline).
    fn caret(&mut self, multiline: bool, unix: bool) -> bool {
        let i = self.pos;
        if i == self.anchor_start {
            return true;
        }
        if !multiline {
            return false;
        }
        if i == self.anchor_end {
            self.hit_end = true;
            return false;
        }
        let prev = match self.char_before(i) {
            Some(c) => c,
            None => return false,
        };
        if unix {
            return prev == '\n';
        }
        if !unicode::is_line_terminator(prev) {
            return false;
        }
        !(prev == '\r' && self.char_at(i) == Some('\n'))
    }

    /// `$`: before a line terminator in multiline mode; otherwise only at
    /// the window end or before one final terminator, which makes the
    /// match depend on where the input ends.
    fn dollar(&mut self, multiline: bool, unix: bool) -> bool {
        let end = self.anchor_end;
        let i = self.pos;
        if i >= end {
            self.hit_end = true;
            self.require_end = true;
            return true;
        }
        let ch = match self.char_at(i) {
            Some(c) => c,
            None => return false,
        };
        let terminator = if unix {
            ch == '\n'
        } else {
            unicode::is_line_terminator(ch)
        };
        if !terminator {
            return false;
        }
        if !unix && ch == '\n' && i > 0 && self.haystack.as_bytes()[i - 1] == b'\r' {
            // No match between a carriage return and a newline.
            return false;
        }
        if multiline {
            return true;
        }
        let term_len = if !unix && ch == '\r' && self.char_at(i + 1) == Some('\n') {
            2
        } else {
            ch.len_utf8()
        };
        if i + term_len != end {
            return false;
        }
        self.hit_end = true;
        self.require_end = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Flags;
    use crate::parse::{parse, ParseOutput};

    fn compile(pattern: &str, flags: Flags) -> ParseOutput {
        match parse(pattern, flags) {
            Ok(out) => out,
            Err(e) => panic!("pattern {:?} failed to parse: {}", pattern, e),
        }
    }

    /// First match in left-to-right attempt order, as `(start, end)`.
    fn search_with(pattern: &str, flags: Flags, text: &str) -> Option<(usize, usize)> {
        let out = compile(pattern, flags);
        let mut from = 0;
        loop {
            let mut st = MatchState::new(text, out.group_count, out.loop_count);
            st.pos = from;
            if execute(&out.arena, out.root, &mut st) {
                return Some((from, st.pos));
            }
            if from >= text.len() {
                return None;
            }
            from += text[from..].chars().next().map_or(1, |c| c.len_utf8());
        }
    }

    fn search(pattern: &str, text: &str) -> Option<(usize, usize)> {
        search_with(pattern, Flags::NONE, text)
    }

    /// First match plus the span of one capture group.
    fn search_group(pattern: &str, text: &str, group: usize) -> Option<(usize, usize)> {
        let out = compile(pattern, Flags::NONE);
        let mut from = 0;
        loop {
            let mut st = MatchState::new(text, out.group_count, out.loop_count);
            st.pos = from;
            if execute(&out.arena, out.root, &mut st) {
                return st.group_span(group);
            }
            if from >= text.len() {
                return None;
            }
            from += text[from..].chars().next().map_or(1, |c| c.len_utf8());
        }
    }

    #[test]
    fn test_literal_and_alternation() {
        assert_eq!(search("abc", "xxabcxx"), Some((2, 5)));
        assert_eq!(search("abc", "xxabd"), None);
        // The first branch able to continue wins.
        assert_eq!(search("a(b|bb)c", "abbc"), Some((0, 4)));
        assert_eq!(search_group("a(b|bb)c", "abbc", 1), Some((1, 3)));
    }

    #[test]
    fn test_empty_pattern_matches_empty() {
        assert_eq!(search("a*", ""), Some((0, 0)));
        assert_eq!(search("", "xy"), Some((0, 0)));
    }

    #[test]
    fn test_greedy_reluctant_possessive() {
        assert_eq!(search("a{2,4}", "aaaaa"), Some((0, 4)));
        assert_eq!(search("a{2,4}?", "aaaaa"), Some((0, 2)));
        assert_eq!(search("a{2,4}+a", "aaaa"), None);
        assert_eq!(search("a{2,4}a", "aaaa"), Some((0, 4)));
        assert_eq!(search("a*+a", "aaaa"), None);
    }

    #[test]
    fn test_general_loop_backtracking() {
        // The loop gives back one iteration so the trailing literal fits.
        assert_eq!(search("(?:ab){1,3}ab", "ababab"), Some((0, 6)));
        assert_eq!(search("(a+)\\1", "aaaa"), Some((0, 4)));
        assert_eq!(search_group("(a+)\\1", "aaaa", 1), Some((0, 2)));
    }

    #[test]
    fn test_zero_width_loop_terminates() {
        assert_eq!(search("(a?)*b", "b"), Some((0, 1)));
        assert_eq!(search("(?:a|)*b", "aab"), Some((0, 3)));
        assert_eq!(search("(?:){3,}x", "x"), Some((0, 1)));
    }

    #[test]
    fn test_unset_group_back_ref_fails() {
        assert_eq!(search("(?:(a)|b)\\1", "ba"), None);
        assert_eq!(search("(?:(a)|b)\\1?", "b"), Some((0, 1)));
    }

    #[test]
    fn test_lookahead() {
        assert_eq!(search("a(?=b)", "cab"), Some((1, 2)));
        assert_eq!(search("a(?!b)", "ab ac"), Some((3, 4)));
        // Captures from a satisfied lookahead remain visible.
        assert_eq!(search_group("a(?=(b+))", "abbb", 1), Some((1, 4)));
    }

    #[test]
    fn test_lookbehind() {
        assert_eq!(search("(?<=abc)d", "xabcdxx"), Some((4, 5)));
        assert_eq!(search("(?<!a)b", "ab cb"), Some((4, 5)));
        // Variable width within a declared bound.
        assert_eq!(search("(?<=a{1,3})b", "aab"), Some((2, 3)));
        assert_eq!(search("(?<=x|yy)z", "ayyz"), Some((3, 4)));
    }

    #[test]
    fn test_atomic_group() {
        assert_eq!(search("(?>a+)a", "aaaa"), None);
        assert_eq!(search("(?>a|ab)c", "abc"), None);
        assert_eq!(search("(?>ab|a)c", "abc"), Some((0, 3)));
    }

    #[test]
    fn test_anchors() {
        assert_eq!(search("^b", "a\nb"), None);
        assert_eq!(search_with("^b", Flags::MULTILINE, "a\nb"), Some((2, 3)));
        assert_eq!(search_with("a$", Flags::MULTILINE, "a\nb"), Some((0, 1)));
        assert_eq!(search("b$", "a\nb"), Some((2, 3)));
        assert_eq!(search("a$", "a\nb"), None);
        // $ skips one final terminator, but \z does not.
        assert_eq!(search("b$", "b\n"), Some((0, 1)));
        assert_eq!(search("b\\z", "b\n"), None);
        assert_eq!(search("b\\Z", "b\n"), Some((0, 1)));
        // ^ in multiline never matches between \r and \n.
        assert_eq!(search_with("^", Flags::MULTILINE, "a\r\nb"), Some((0, 0)));
        let out = compile("^b", Flags::MULTILINE);
        let mut st = MatchState::new("a\r\nb", out.group_count, out.loop_count);
        st.pos = 3;
        assert!(execute(&out.arena, out.root, &mut st));
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(search(r"\bfoo\b", "a foo bar"), Some((2, 5)));
        assert_eq!(search(r"\bfoo\b", "afoob"), None);
        assert_eq!(search(r"\Boo\B", "afoob"), Some((2, 4)));
    }

    #[test]
    fn test_line_break() {
        assert_eq!(search(r"a\Rb", "a\r\nb"), Some((0, 4)));
        assert_eq!(search(r"a\Rb", "a\nb"), Some((0, 3)));
        assert_eq!(search(r"a\R", "a\u{2028}"), Some((0, 4)));
        assert_eq!(search(r"(?<=\R)b", "a\r\nb"), Some((3, 4)));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(search_with("abc", Flags::CASE_INSENSITIVE, "xABCx"), Some((1, 4)));
        assert_eq!(
            search_with(
                "σ",
                Flags::CASE_INSENSITIVE | Flags::UNICODE_CASE,
                "Σ"
            ),
            Some((0, 2))
        );
        assert_eq!(search_with("σ", Flags::CASE_INSENSITIVE, "Σ"), None);
    }

    #[test]
    fn test_scan_rewrite_matches() {
        assert_eq!(search(".*c", "abcabc"), Some((0, 6)));
        assert_eq!(search(".*?c", "abcabc"), Some((0, 3)));
        assert_eq!(search(".+c", "cabc"), Some((0, 4)));
        // The dot window stops at a line terminator.
        assert_eq!(search(".*c", "ab\ncd"), Some((3, 4)));
        assert_eq!(search(".+c", "ab\ncd"), None);
        assert_eq!(search_with(".*c", Flags::DOT_ALL, "ab\ncd"), Some((0, 4)));
    }

    #[test]
    fn test_multibyte_stepping() {
        assert_eq!(search(".", "é"), Some((0, 2)));
        assert_eq!(search("é+x", "ééx"), Some((0, 5)));
        assert_eq!(search("(?<=é)x", "éx"), Some((2, 3)));
    }

    #[test]
    fn test_full_match_mode() {
        let out = compile("a+", Flags::NONE);
        let mut st = MatchState::new("aaa", out.group_count, out.loop_count);
        st.full_match = true;
        assert!(execute(&out.arena, out.root, &mut st));
        let mut st = MatchState::new("aab", out.group_count, out.loop_count);
        st.full_match = true;
        assert!(!execute(&out.arena, out.root, &mut st));
    }

    #[test]
    fn test_hit_end_reporting() {
        let out = compile("abc", Flags::NONE);
        let mut st = MatchState::new("ab", out.group_count, out.loop_count);
        assert!(!execute(&out.arena, out.root, &mut st));
        assert!(st.hit_end);
        let mut st = MatchState::new("ax", out.group_count, out.loop_count);
        assert!(!execute(&out.arena, out.root, &mut st));
        assert!(!st.hit_end);
    }
}
