//! Start-of-match acceleration.
//!
//! Before the engine attempts a position, the matcher asks a `Scanner`
//! for the next offset that could possibly begin a match. The scanner is
//! derived from the head of the compiled chain: a required literal turns
//! into a substring search, a small set of possible first bytes into a
//! memchr sweep, and a longer known prefix into a Horspool-style skip
//! over per-position byte sets.
//!
//! Every reported candidate starts with a possible UTF-8 lead byte, so
//! candidates always fall on character boundaries.

use crate::node::{AnchorKind, Arena, CharMatcher, Node, NodeId};
use crate::unicode;
use memchr::{memchr, memchr2, memchr3, memmem};
use std::fmt;

/// Longest prefix the mask scanner will model.
const MAX_PREFIX: usize = 8;

/// Largest byte-set size still considered selective.
const MAX_SET_BITS: u32 = 64;

/// A set of bytes as a 256-bit mask.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ByteMask([u64; 4]);

impl ByteMask {
    pub(crate) fn new() -> ByteMask {
        ByteMask([0; 4])
    }

    fn single(b: u8) -> ByteMask {
        let mut mask = ByteMask::new();
        mask.set(b);
        mask
    }

    pub(crate) fn set(&mut self, b: u8) {
        self.0[(b >> 6) as usize] |= 1u64 << (b & 63);
    }

    #[inline(always)]
    pub(crate) fn contains(&self, b: u8) -> bool {
        self.0[(b >> 6) as usize] & (1u64 << (b & 63)) != 0
    }

    pub(crate) fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    fn merge(&mut self, rhs: &ByteMask) {
        for (w, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *w |= r;
        }
    }

    fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        (0u16..256).map(|b| b as u8).filter(|&b| self.contains(b))
    }
}

impl fmt::Debug for ByteMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.bytes()).finish()
    }
}

/// How to find the next position worth handing to the engine.
pub(crate) enum Scanner {
    /// No useful head information; attempt every position.
    Anywhere,
    /// The pattern is anchored to the search start; one attempt suffices.
    StartAnchored,
    /// The first byte comes from a set of at most three.
    Bytes { bytes: [u8; 3], len: usize },
    /// The pattern begins with a multi-byte literal.
    Literal { finder: memmem::Finder<'static> },
    /// Horspool skip over the first positions' byte sets.
    Masks {
        masks: Vec<ByteMask>,
        shift: Box<[u8; 256]>,
    },
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scanner::Anywhere => f.write_str("Anywhere"),
            Scanner::StartAnchored => f.write_str("StartAnchored"),
            Scanner::Bytes { bytes, len } => {
                f.debug_tuple("Bytes").field(&&bytes[..*len]).finish()
            }
            Scanner::Literal { finder } => {
                f.debug_tuple("Literal").field(&finder.needle()).finish()
            }
            Scanner::Masks { masks, .. } => f.debug_tuple("Masks").field(&masks.len()).finish(),
        }
    }
}

impl Scanner {
    /// \return the next candidate offset at or after \p from, or None if
    /// no later position can begin a match.
    pub(crate) fn find(&self, hay: &[u8], from: usize) -> Option<usize> {
        if from > hay.len() {
            return None;
        }
        match self {
            Scanner::Anywhere | Scanner::StartAnchored => Some(from),
            Scanner::Bytes { bytes, len } => {
                let rest = &hay[from..];
                let found = match len {
                    1 => memchr(bytes[0], rest),
                    2 => memchr2(bytes[0], bytes[1], rest),
                    _ => memchr3(bytes[0], bytes[1], bytes[2], rest),
                };
                found.map(|i| from + i)
            }
            Scanner::Literal { finder } => finder.find(&hay[from..]).map(|i| from + i),
            Scanner::Masks { masks, shift } => {
                let l = masks.len();
                let mut at = from;
                loop {
                    if at + l > hay.len() {
                        return None;
                    }
                    let b = hay[at + l - 1];
                    if masks[l - 1].contains(b)
                        && masks[..l - 1]
                            .iter()
                            .enumerate()
                            .all(|(j, m)| m.contains(hay[at + j]))
                    {
                        return Some(at);
                    }
                    at += shift[b as usize] as usize;
                }
            }
        }
    }

    /// \return whether a failed attempt at the first candidate settles
    /// the whole search.
    pub(crate) fn anchored(&self) -> bool {
        matches!(self, Scanner::StartAnchored)
    }
}

/// Derive a scanner from the head of a compiled chain.
pub(crate) fn build(arena: &Arena, root: NodeId) -> Scanner {
    let mut id = root;
    // Skip zero-width bookkeeping and recognize anchored heads.
    loop {
        match &arena[id] {
            Node::GroupStart { next, .. } | Node::GroupEnd { next, .. } => id = *next,
            Node::Anchor {
                kind: AnchorKind::InputStart,
                ..
            } => return Scanner::StartAnchored,
            Node::Anchor {
                kind: AnchorKind::LineStart,
                multiline: false,
                ..
            } => return Scanner::StartAnchored,
            _ => break,
        }
    }
    if let Node::Literal { bytes, .. } = &arena[id] {
        if bytes.len() >= 2 {
            return Scanner::Literal {
                finder: memmem::Finder::new(&bytes[..]).into_owned(),
            };
        }
    }
    let mut masks = Vec::new();
    collect_masks(arena, id, &mut masks);
    if let Some(dense) = masks.iter().position(|m| m.count() > MAX_SET_BITS) {
        masks.truncate(dense);
    }
    if masks.is_empty() {
        return Scanner::Anywhere;
    }
    if masks[0].count() <= 3 {
        let mut bytes = [0u8; 3];
        let mut len = 0;
        for b in masks[0].bytes() {
            bytes[len] = b;
            len += 1;
        }
        return Scanner::Bytes { bytes, len };
    }
    let l = masks.len();
    let mut shift = Box::new([l as u8; 256]);
    for (j, mask) in masks[..l - 1].iter().enumerate() {
        for b in mask.bytes() {
            shift[b as usize] = shift[b as usize].min((l - 1 - j) as u8);
        }
    }
    Scanner::Masks { masks, shift }
}

/// Walk the chain head, appending one byte set per byte position until
/// the prefix stops being fixed.
fn collect_masks(arena: &Arena, mut id: NodeId, out: &mut Vec<ByteMask>) {
    while out.len() < MAX_PREFIX {
        match &arena[id] {
            Node::GroupStart { next, .. }
            | Node::GroupEnd { next, .. }
            | Node::Join { next }
            | Node::Anchor { next, .. }
            | Node::WordBoundary { next, .. } => id = *next,
            Node::Literal { bytes, next } => {
                for &b in bytes.iter() {
                    if out.len() == MAX_PREFIX {
                        return;
                    }
                    out.push(ByteMask::single(b));
                }
                id = *next;
            }
            Node::Single { m, next } => {
                if !push_matcher_masks(m, out) {
                    return;
                }
                id = *next;
            }
            Node::Needle { positions, next } => {
                for set in positions {
                    if out.len() == MAX_PREFIX {
                        return;
                    }
                    let mut mask = ByteMask::new();
                    for &c in set.iter() {
                        if !c.is_ascii() {
                            // Later byte positions would no longer line up.
                            mask_lead_bytes(c, &mut mask);
                            out.push(mask);
                            return;
                        }
                        mask.set(c as u8);
                    }
                    out.push(mask);
                }
                id = *next;
            }
            Node::CharLoop { min, m, .. } if *min >= 1 => {
                push_matcher_masks(m, out);
                return;
            }
            Node::Alt { branches, .. } => {
                merge_alt_masks(arena, branches, out);
                return;
            }
            _ => return,
        }
    }
}

/// Append the byte positions pinned down by one character matcher.
/// \return whether following positions are still aligned.
fn push_matcher_masks(m: &CharMatcher, out: &mut Vec<ByteMask>) -> bool {
    match m {
        CharMatcher::Char { c, icase: false, .. } => {
            let mut buf = [0u8; 4];
            for &b in c.encode_utf8(&mut buf).as_bytes() {
                if out.len() == MAX_PREFIX {
                    return false;
                }
                out.push(ByteMask::single(b));
            }
            true
        }
        CharMatcher::Char {
            c,
            icase: true,
            unicode,
        } => {
            let mut forms = [*c; 3];
            let n = unicode::case_forms(*c, *unicode, &mut forms);
            let mut mask = ByteMask::new();
            let mut ascii = true;
            for &form in &forms[..n] {
                if form.is_ascii() {
                    mask.set(form as u8);
                } else {
                    ascii = false;
                    mask_lead_bytes(form, &mut mask);
                }
            }
            out.push(mask);
            ascii
        }
        CharMatcher::Class {
            class,
            icase,
            unicode,
        } => {
            let members = match class.members(MAX_SET_BITS as usize) {
                Some(members) => members,
                None => return false,
            };
            let mut mask = ByteMask::new();
            let mut ascii = true;
            for &c in &members {
                let forms: Vec<char> = if *icase {
                    let mut buf = [c; 3];
                    let n = unicode::case_forms(c, *unicode, &mut buf);
                    buf[..n].to_vec()
                } else {
                    vec![c]
                };
                for form in forms {
                    if form.is_ascii() {
                        mask.set(form as u8);
                    } else {
                        ascii = false;
                        mask_lead_bytes(form, &mut mask);
                    }
                }
            }
            if mask.count() == 0 {
                return false;
            }
            out.push(mask);
            ascii
        }
        CharMatcher::Dot { .. } => false,
    }
}

fn mask_lead_bytes(c: char, mask: &mut ByteMask) {
    let mut buf = [0u8; 4];
    mask.set(c.encode_utf8(&mut buf).as_bytes()[0]);
}

/// Union the branch prefixes of an alternation position-by-position, up
/// to the shortest branch prefix.
fn merge_alt_masks(arena: &Arena, branches: &[NodeId], out: &mut Vec<ByteMask>) {
    let mut merged: Option<Vec<ByteMask>> = None;
    for &branch in branches {
        let mut branch_masks = Vec::new();
        collect_masks(arena, branch, &mut branch_masks);
        if branch_masks.is_empty() {
            return;
        }
        merged = Some(match merged {
            None => branch_masks,
            Some(mut acc) => {
                acc.truncate(branch_masks.len());
                for (a, b) in acc.iter_mut().zip(branch_masks.iter()) {
                    a.merge(b);
                }
                acc
            }
        });
    }
    if let Some(mut masks) = merged.take() {
        let room = MAX_PREFIX - out.len();
        masks.truncate(room);
        out.append(&mut masks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Flags;
    use crate::parse::parse;

    fn scanner_for(pattern: &str, flags: Flags) -> Scanner {
        let out = parse(pattern, flags).unwrap();
        build(&out.arena, out.root)
    }

    #[test]
    fn test_anchored_patterns() {
        assert!(matches!(scanner_for("^abc", Flags::NONE), Scanner::StartAnchored));
        assert!(matches!(scanner_for(r"\Aabc", Flags::NONE), Scanner::StartAnchored));
        assert!(matches!(scanner_for(r"(\Ax)", Flags::NONE), Scanner::StartAnchored));
        // Multiline ^ floats, so it does not anchor the search.
        assert!(!matches!(
            scanner_for("^abc", Flags::MULTILINE),
            Scanner::StartAnchored
        ));
    }

    #[test]
    fn test_literal_head() {
        let s = scanner_for("abcde", Flags::NONE);
        assert!(matches!(s, Scanner::Literal { .. }));
        assert_eq!(s.find(b"xxabcdexx", 0), Some(2));
        assert_eq!(s.find(b"xxabcdexx", 3), None);
    }

    #[test]
    fn test_single_byte_head() {
        let s = scanner_for("a+b", Flags::NONE);
        assert!(matches!(s, Scanner::Bytes { len: 1, .. }));
        assert_eq!(s.find(b"xxxab", 0), Some(3));
    }

    #[test]
    fn test_small_class_head() {
        let s = scanner_for("[ab]x", Flags::NONE);
        assert!(matches!(s, Scanner::Bytes { len: 2, .. }));
        assert_eq!(s.find(b"zzbzz", 0), Some(2));
        let s = scanner_for("x", Flags::CASE_INSENSITIVE);
        assert!(matches!(s, Scanner::Bytes { len: 2, .. }));
        assert_eq!(s.find(b"zzXzz", 0), Some(2));
    }

    #[test]
    fn test_alternation_union() {
        let s = scanner_for("cat|cow", Flags::NONE);
        assert_eq!(s.find(b"a cow", 0), Some(2));
        assert_eq!(s.find(b"a dog", 0), None);
    }

    #[test]
    fn test_mask_scanner_skips() {
        let s = scanner_for("[a-m][0-9][0-9]end", Flags::NONE);
        assert!(matches!(s, Scanner::Masks { .. }));
        assert_eq!(s.find(b"zzz c42end", 0), Some(4));
        assert_eq!(s.find(b"c4xend zzz", 0), None);
    }

    #[test]
    fn test_dot_head_scans_anywhere() {
        assert!(matches!(scanner_for(".x.y", Flags::NONE), Scanner::Anywhere));
        assert!(matches!(scanner_for("a*b*c*", Flags::NONE), Scanner::Anywhere));
    }

    #[test]
    fn test_multibyte_lead_candidates() {
        let s = scanner_for("é", Flags::NONE);
        // The lead byte of 'é' pins the candidate to a char boundary.
        let hay = "xxéxx".as_bytes();
        assert_eq!(s.find(hay, 0), Some(2));
    }
}
