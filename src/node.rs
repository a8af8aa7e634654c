//! Compiled pattern representation: an arena of match nodes linked into
//! chains by `concat`, which performs the structural rewrites (literal
//! merging, needle fusion, any-char-then-literal scans) as chains are
//! assembled.

use crate::classes::CharClass;
use crate::unicode;

/// Nodes are addressed by index into the arena.
pub type NodeId = u32;

/// The shared terminal node, and also the "no continuation yet" sentinel
/// in `next` links: an unlinked chain simply ends at the terminal.
pub const ACCEPT: NodeId = 0;

pub const MAX_CAPTURE_GROUPS: usize = 65535;
pub const MAX_LOOPS: usize = 65535;

/// Sentinel repetition count for an unbounded quantifier.
pub const MAX_REPS: u32 = u32::MAX;

/// Sentinel for an unbounded consumed-length estimate.
pub const UNBOUNDED: usize = usize::MAX;

/// Longest needle the fusion rewrite will build.
const NEEDLE_MAX_LEN: usize = 12;

/// Largest class that may become one needle position.
const NEEDLE_MAX_SET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    Greedy,
    Reluctant,
    Possessive,
}

/// What `.` refuses to match, as resolved from the dot-all and Unix-lines
/// flags at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorMode {
    AnyChar,
    ExceptNewline,
    ExceptTerminators,
}

impl TerminatorMode {
    #[inline(always)]
    pub fn allows(self, c: char) -> bool {
        match self {
            TerminatorMode::AnyChar => true,
            TerminatorMode::ExceptNewline => c != '\n',
            TerminatorMode::ExceptTerminators => !unicode::is_line_terminator(c),
        }
    }
}

/// A single-character matcher, shared between `Single` nodes and the
/// iterative quantifier fast path.
#[derive(Debug, Clone)]
pub enum CharMatcher {
    Char { c: char, icase: bool, unicode: bool },
    Class { class: CharClass, icase: bool, unicode: bool },
    Dot { mode: TerminatorMode },
}

impl CharMatcher {
    /// \return whether the matcher accepts \p c.
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharMatcher::Char {
                c: pc,
                icase: false,
                ..
            } => c == *pc,
            CharMatcher::Char {
                c: pc,
                icase: true,
                unicode,
            } => unicode::chars_eq_icase(c, *pc, *unicode),
            CharMatcher::Class {
                class,
                icase,
                unicode,
            } => class.matches(c, *icase, *unicode),
            CharMatcher::Dot { mode } => mode.allows(c),
        }
    }

    /// Conservative UTF-8 byte length bounds of an accepted character.
    fn byte_bounds(&self) -> LenBounds {
        match self {
            CharMatcher::Char { c, icase: false, .. } => {
                let n = c.len_utf8();
                LenBounds { min: n, max: n }
            }
            // Other case forms of a character can have a different
            // encoded length (e.g. the Kelvin sign and 'k').
            CharMatcher::Char { icase: true, .. } => LenBounds { min: 1, max: 4 },
            CharMatcher::Class { class, icase, .. } => {
                if *icase {
                    LenBounds { min: 1, max: 4 }
                } else {
                    LenBounds {
                        min: cp_utf8_len(class.lower_bound()),
                        max: cp_utf8_len(class.upper_bound()),
                    }
                }
            }
            CharMatcher::Dot { .. } => LenBounds { min: 1, max: 4 },
        }
    }
}

fn cp_utf8_len(cp: u32) -> usize {
    match cp {
        0..=0x7F => 1,
        0x80..=0x7FF => 2,
        0x800..=0xFFFF => 3,
        _ => 4,
    }
}

/// Anchors are zero-width position tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    /// `^`
    LineStart,
    /// `$`
    LineEnd,
    /// `\A`
    InputStart,
    /// `\G`
    LastMatchEnd,
    /// `\Z`
    InputEndBeforeTerminator,
    /// `\z`
    InputEnd,
}

/// An executable unit of compiled pattern. Every non-terminal node records
/// the id of its continuation; a `next` of [`ACCEPT`] ends the chain at
/// the shared terminal.
#[derive(Debug, Clone)]
pub enum Node {
    /// The terminal: succeeds in "any end" mode, or at the region end.
    Accept,
    /// Terminal of lookaround probes, atomic-group bodies, and possessive
    /// loop bodies: succeeds unconditionally, committing the sub-match.
    IterEnd,
    /// One character via a [`CharMatcher`].
    Single { m: CharMatcher, next: NodeId },
    /// A merged run of case-sensitive literal characters, UTF-8 encoded.
    Literal { bytes: Box<[u8]>, next: NodeId },
    /// A fixed-length run of small per-position accepted-character sets.
    Needle {
        positions: Vec<Box<[char]>>,
        next: NodeId,
    },
    Anchor {
        kind: AnchorKind,
        multiline: bool,
        unix_lines: bool,
        next: NodeId,
    },
    WordBoundary {
        negate: bool,
        unicode: bool,
        next: NodeId,
    },
    /// `\R`: a carriage-return/newline pair or any single line terminator.
    LineBreak { next: NodeId },
    /// Shared tail of every alternation branch; carries the alternation's
    /// continuation.
    Join { next: NodeId },
    Alt {
        branches: Box<[NodeId]>,
        join: NodeId,
    },
    GroupStart { group: u16, next: NodeId },
    GroupEnd { group: u16, next: NodeId },
    /// The general quantifier. The body chain ends in [`Node::LoopAgain`]
    /// (greedy/reluctant) or [`Node::IterEnd`] (possessive).
    Loop {
        kind: LoopKind,
        min: u32,
        max: u32,
        slot: u16,
        body: NodeId,
        next: NodeId,
    },
    /// Tail of a greedy/reluctant loop body; re-enters the owning loop.
    LoopAgain { owner: NodeId },
    /// Iterative fast path: a quantifier directly over one character
    /// matcher, with no captures inside.
    CharLoop {
        kind: LoopKind,
        min: u32,
        max: u32,
        m: CharMatcher,
        next: NodeId,
    },
    /// `.*lit` / `.+lit`: jump directly to candidate occurrences of the
    /// literal instead of stepping a character at a time.
    Scan {
        greedy: bool,
        min_one: bool,
        mode: TerminatorMode,
        bytes: Box<[u8]>,
        next: NodeId,
    },
    BackRef {
        group: u16,
        icase: bool,
        unicode: bool,
        next: NodeId,
    },
    /// Lookahead or lookbehind. The body ends in [`Node::IterEnd`]; a
    /// lookbehind body is compiled with reversed concatenation order and
    /// evaluated by the engine running backward.
    Lookaround {
        negate: bool,
        behind: bool,
        body: NodeId,
        next: NodeId,
    },
    /// Independent (atomic) group: commits to the body's first match.
    Atomic { body: NodeId, next: NodeId },
}

/// Owns the nodes of one compiled pattern.
#[derive(Debug, Clone)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

impl Arena {
    pub fn new() -> Arena {
        Arena {
            nodes: vec![Node::Accept],
        }
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// \return the continuation link of a node, or [`ACCEPT`] for nodes
    /// that do not carry one.
    pub fn next_link(&self, id: NodeId) -> NodeId {
        match &self[id] {
            Node::Accept | Node::IterEnd | Node::LoopAgain { .. } => ACCEPT,
            Node::Alt { join, .. } => self.next_link(*join),
            Node::Single { next, .. }
            | Node::Literal { next, .. }
            | Node::Needle { next, .. }
            | Node::Anchor { next, .. }
            | Node::WordBoundary { next, .. }
            | Node::LineBreak { next }
            | Node::Join { next }
            | Node::GroupStart { next, .. }
            | Node::GroupEnd { next, .. }
            | Node::Loop { next, .. }
            | Node::CharLoop { next, .. }
            | Node::Scan { next, .. }
            | Node::BackRef { next, .. }
            | Node::Lookaround { next, .. }
            | Node::Atomic { next, .. } => *next,
        }
    }

    fn set_next(&mut self, id: NodeId, new_next: NodeId) {
        match &mut self[id] {
            Node::Accept | Node::IterEnd | Node::LoopAgain { .. } | Node::Alt { .. } => {
                debug_assert!(false, "node has no direct next link")
            }
            Node::Single { next, .. }
            | Node::Literal { next, .. }
            | Node::Needle { next, .. }
            | Node::Anchor { next, .. }
            | Node::WordBoundary { next, .. }
            | Node::LineBreak { next }
            | Node::Join { next }
            | Node::GroupStart { next, .. }
            | Node::GroupEnd { next, .. }
            | Node::Loop { next, .. }
            | Node::CharLoop { next, .. }
            | Node::Scan { next, .. }
            | Node::BackRef { next, .. }
            | Node::Lookaround { next, .. }
            | Node::Atomic { next, .. } => *next = new_next,
        }
    }

    /// \return the node holding the chain's trailing (unset) `next` link.
    fn chain_tail(&self, head: NodeId) -> NodeId {
        debug_assert!(head != ACCEPT);
        let mut id = head;
        loop {
            if let Node::Alt { join, .. } = &self[id] {
                id = *join;
                continue;
            }
            let next = self.next_link(id);
            if next == ACCEPT {
                return id;
            }
            id = next;
        }
    }
}

impl std::ops::Index<NodeId> for Arena {
    type Output = Node;
    #[inline(always)]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }
}

impl std::ops::IndexMut<NodeId> for Arena {
    #[inline(always)]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }
}

/// Append the chain at \p tail to the end of the chain at \p head,
/// applying structural rewrites, and return the id to keep using.
/// Rewrites may rebuild nodes in place; callers must rebind to the
/// returned id and drop stale ids.
pub fn concat(arena: &mut Arena, head: NodeId, tail: NodeId) -> NodeId {
    if head == ACCEPT {
        return tail;
    }
    if tail == ACCEPT {
        return head;
    }
    let end = arena.chain_tail(head);
    link(arena, end, tail);
    head
}

/// Plain chain append with no rewrites, for chains that must keep their
/// node-per-element shape (reversed lookbehind bodies).
pub fn concat_plain(arena: &mut Arena, head: NodeId, tail: NodeId) -> NodeId {
    if head == ACCEPT {
        return tail;
    }
    if tail == ACCEPT {
        return head;
    }
    let end = arena.chain_tail(head);
    arena.set_next(end, tail);
    head
}

fn link(arena: &mut Arena, end: NodeId, tail: NodeId) {
    // (d) A quantified `.` followed by a literal becomes a skip scan.
    if let Node::CharLoop {
        kind,
        min,
        max,
        m: CharMatcher::Dot { mode },
        ..
    } = &arena[end]
    {
        if matches!(kind, LoopKind::Greedy | LoopKind::Reluctant) && *min <= 1 && *max == MAX_REPS
        {
            if let Some(bytes) = literal_bytes(&arena[tail]) {
                let greedy = matches!(kind, LoopKind::Greedy);
                let min_one = *min == 1;
                let mode = *mode;
                let next = arena.next_link(tail);
                arena[end] = Node::Scan {
                    greedy,
                    min_one,
                    mode,
                    bytes: bytes.into_boxed_slice(),
                    next,
                };
                return;
            }
        }
    }

    // (a) Adjacent literals merge into one literal string.
    if let (Some(mut a), Some(b)) = (literal_bytes(&arena[end]), literal_bytes(&arena[tail])) {
        a.extend_from_slice(&b);
        let next = arena.next_link(tail);
        arena[end] = Node::Literal {
            bytes: a.into_boxed_slice(),
            next,
        };
        return;
    }

    // (b) Adjacent fixed-width small-alphabet nodes fuse into a needle.
    if let (Some(mut a), Some(b)) = (position_sets(&arena[end]), position_sets(&arena[tail])) {
        if a.len() + b.len() <= NEEDLE_MAX_LEN {
            a.extend(b);
            let next = arena.next_link(tail);
            arena[end] = Node::Needle { positions: a, next };
            return;
        }
    }

    arena.set_next(end, tail);
}

/// \return the UTF-8 bytes a node matches exactly, if it is a
/// case-sensitive single character or literal run.
fn literal_bytes(node: &Node) -> Option<Vec<u8>> {
    match node {
        Node::Single {
            m: CharMatcher::Char { c, icase: false, .. },
            ..
        } => {
            let mut buf = [0u8; 4];
            Some(c.encode_utf8(&mut buf).as_bytes().to_vec())
        }
        Node::Literal { bytes, .. } => Some(bytes.to_vec()),
        _ => None,
    }
}

/// \return the per-position accepted-character sets of a node, if it is
/// expressible as a short fixed-width needle.
fn position_sets(node: &Node) -> Option<Vec<Box<[char]>>> {
    match node {
        Node::Single {
            m: CharMatcher::Char { c, icase: false, .. },
            ..
        } => Some(vec![vec![*c].into_boxed_slice()]),
        Node::Literal { bytes, .. } => {
            let s = std::str::from_utf8(bytes).ok()?;
            Some(s.chars().map(|c| vec![c].into_boxed_slice()).collect())
        }
        Node::Single {
            m:
                CharMatcher::Class {
                    class,
                    icase: false,
                    ..
                },
            ..
        } => {
            if class.size_bound() > NEEDLE_MAX_SET as u32 {
                return None;
            }
            let members = class.members(NEEDLE_MAX_SET)?;
            if members.is_empty() {
                return None;
            }
            Some(vec![members.into_boxed_slice()])
        }
        Node::Needle { positions, .. } => Some(positions.clone()),
        _ => None,
    }
}

/// Static bounds on the number of subject bytes a chain can consume.
/// `max == UNBOUNDED` means no finite bound.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LenBounds {
    pub min: usize,
    pub max: usize,
}

impl LenBounds {
    const ZERO: LenBounds = LenBounds { min: 0, max: 0 };

    fn add(self, rhs: LenBounds) -> LenBounds {
        LenBounds {
            min: self.min.saturating_add(rhs.min),
            max: if self.max == UNBOUNDED || rhs.max == UNBOUNDED {
                UNBOUNDED
            } else {
                self.max.saturating_add(rhs.max)
            },
        }
    }

    fn union(self, rhs: LenBounds) -> LenBounds {
        LenBounds {
            min: self.min.min(rhs.min),
            max: self.max.max(rhs.max),
        }
    }

    fn repeat(self, min: u32, max: u32) -> LenBounds {
        let lo = self.min.saturating_mul(min as usize);
        let hi = if max == 0 || self.max == 0 {
            0
        } else if max == MAX_REPS || self.max == UNBOUNDED {
            UNBOUNDED
        } else {
            self.max.saturating_mul(max as usize)
        };
        LenBounds { min: lo, max: hi }
    }
}

/// Compute consumed-length bounds for the chain starting at \p head.
/// Used for lookbehind window validation; conservative, never exact for
/// backreferences.
pub fn chain_bounds(arena: &Arena, head: NodeId) -> LenBounds {
    bounds_until(arena, head, ACCEPT)
}

fn bounds_until(arena: &Arena, head: NodeId, stop: NodeId) -> LenBounds {
    let mut total = LenBounds::ZERO;
    let mut id = head;
    while id != stop {
        match &arena[id] {
            Node::Accept | Node::IterEnd | Node::LoopAgain { .. } => break,
            Node::Join { next } => id = *next,
            Node::Single { m, next } => {
                total = total.add(m.byte_bounds());
                id = *next;
            }
            Node::Literal { bytes, next } => {
                total = total.add(LenBounds {
                    min: bytes.len(),
                    max: bytes.len(),
                });
                id = *next;
            }
            Node::Needle { positions, next } => {
                for set in positions {
                    let lens: Vec<usize> = set.iter().map(|c| c.len_utf8()).collect();
                    total = total.add(LenBounds {
                        min: lens.iter().copied().min().unwrap_or(0),
                        max: lens.iter().copied().max().unwrap_or(0),
                    });
                }
                id = *next;
            }
            Node::Anchor { next, .. }
            | Node::WordBoundary { next, .. }
            | Node::GroupStart { next, .. }
            | Node::GroupEnd { next, .. } => id = *next,
            Node::LineBreak { next } => {
                total = total.add(LenBounds { min: 1, max: 3 });
                id = *next;
            }
            Node::Alt { branches, join } => {
                let mut combined: Option<LenBounds> = None;
                for &branch in branches.iter() {
                    let b = bounds_until(arena, branch, *join);
                    combined = Some(match combined {
                        Some(acc) => acc.union(b),
                        None => b,
                    });
                }
                total = total.add(combined.unwrap_or(LenBounds::ZERO));
                id = *join;
            }
            Node::Loop {
                min,
                max,
                body,
                next,
                ..
            } => {
                let body_bounds = bounds_until(arena, *body, ACCEPT);
                total = total.add(body_bounds.repeat(*min, *max));
                id = *next;
            }
            Node::CharLoop {
                min, max, m, next, ..
            } => {
                total = total.add(m.byte_bounds().repeat(*min, *max));
                id = *next;
            }
            Node::Scan {
                bytes,
                min_one,
                next,
                ..
            } => {
                total = total.add(LenBounds {
                    min: bytes.len() + usize::from(*min_one),
                    max: UNBOUNDED,
                });
                id = *next;
            }
            Node::BackRef { next, .. } => {
                total = total.add(LenBounds {
                    min: 0,
                    max: UNBOUNDED,
                });
                id = *next;
            }
            Node::Lookaround { next, .. } => id = *next,
            Node::Atomic { body, next } => {
                total = total.add(bounds_until(arena, *body, ACCEPT));
                id = *next;
            }
        }
    }
    total
}
