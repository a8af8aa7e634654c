//! Parser from pattern syntax to the node arena.
//!
//! A hand-written recursive descent parser over the grammar
//! `alternatives := sequence ('|' sequence)*`,
//! `sequence := quantified*`, `quantified := primary quantifier?`.
//! Character classes have their own sub-grammar with union, ranges,
//! nesting, and `&&` intersection.
//!
//! The parser allocates nodes directly into an [`Arena`] and assembles
//! sequences with [`concat`], so the structural rewrites happen as the
//! chain is built. Lookbehind operands are assembled with reversed
//! concatenation order instead of a second matching algorithm.

use crate::api::Flags;
use crate::classes::CharClass;
use crate::node::{
    concat, concat_plain, chain_bounds, AnchorKind, Arena, CharMatcher, LoopKind, Node, NodeId,
    TerminatorMode, ACCEPT, MAX_CAPTURE_GROUPS, MAX_LOOPS, MAX_REPS, UNBOUNDED,
};
use crate::spanset::CODE_POINT_MAX;
use crate::unicode;
use std::collections::HashMap;
use std::fmt;

/// An error encountered during pattern compilation, attributed to the
/// character offset at which parsing became invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for Error {}

/// The product of parsing: a root chain in its arena plus group and
/// counter metadata.
#[derive(Debug)]
pub struct ParseOutput {
    pub root: NodeId,
    pub arena: Arena,
    pub group_count: u16,
    pub group_names: HashMap<String, u16>,
    pub loop_count: u16,
}

/// Parse \p pattern under \p flags.
pub fn parse(pattern: &str, flags: Flags) -> Result<ParseOutput, Error> {
    let mut parser = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
        flags,
        arena: Arena::new(),
        group_count: 0,
        group_names: HashMap::new(),
        loop_count: 0,
        reverse: false,
        quote: false,
    };
    let root = if flags.contains(Flags::LITERAL) {
        parser.consume_all_literal()
    } else {
        let root = parser.consume_disjunction()?;
        if parser.peek() == Some(')') {
            return parser.error("Unmatched closing ')'");
        }
        root
    };
    Ok(ParseOutput {
        root,
        arena: parser.arena,
        group_count: parser.group_count,
        group_names: parser.group_names,
        loop_count: parser.loop_count,
    })
}

/// What an escape sequence resolved to.
enum Escape {
    Char(char),
    Class(CharClass),
    Boundary { negate: bool },
    Anchor(AnchorKind),
    LineBreak,
    BackRefNum(u16),
    BackRefName(String),
    QuoteStart,
    QuoteEnd,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    flags: Flags,
    arena: Arena,
    group_count: u16,
    group_names: HashMap<String, u16>,
    loop_count: u16,
    /// Assembling a lookbehind operand: concatenation order is reversed
    /// and byte-order-sensitive rewrites are suppressed.
    reverse: bool,
    /// Inside `\Q...\E`.
    quote: bool,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn try_consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error<T, S: Into<String>>(&self, message: S) -> Result<T, Error> {
        self.error_at(message, self.pos)
    }

    fn error_at<T, S: Into<String>>(&self, message: S, offset: usize) -> Result<T, Error> {
        Err(Error {
            message: message.into(),
            offset,
        })
    }

    fn icase(&self) -> bool {
        self.flags.contains(Flags::CASE_INSENSITIVE)
    }

    fn ucase(&self) -> bool {
        self.flags.contains(Flags::UNICODE_CASE)
    }

    fn uclasses(&self) -> bool {
        self.flags.contains(Flags::UNICODE_CLASSES)
    }

    fn multiline(&self) -> bool {
        self.flags.contains(Flags::MULTILINE)
    }

    fn unix_lines(&self) -> bool {
        self.flags.contains(Flags::UNIX_LINES)
    }

    fn comments(&self) -> bool {
        self.flags.contains(Flags::COMMENTS)
    }

    fn dot_mode(&self) -> TerminatorMode {
        if self.flags.contains(Flags::DOT_ALL) {
            TerminatorMode::AnyChar
        } else if self.unix_lines() {
            TerminatorMode::ExceptNewline
        } else {
            TerminatorMode::ExceptTerminators
        }
    }

    /// In comments mode, skip whitespace and `#`-to-end-of-line comments.
    fn skip_ws_comments(&mut self) {
        if !self.comments() {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.pos += 1;
                }
                Some('#') => {
                    while let Some(c) = self.next() {
                        if unicode::is_line_terminator(c) {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn char_node(&mut self, c: char) -> NodeId {
        let icase = self.icase();
        let unicode = self.ucase();
        self.arena.alloc(Node::Single {
            m: CharMatcher::Char { c, icase, unicode },
            next: ACCEPT,
        })
    }

    fn class_node(&mut self, class: CharClass) -> NodeId {
        let icase = self.icase();
        let unicode = self.ucase();
        self.arena.alloc(Node::Single {
            m: CharMatcher::Class {
                class,
                icase,
                unicode,
            },
            next: ACCEPT,
        })
    }

    /// The whole pattern as literal text (the LITERAL flag).
    fn consume_all_literal(&mut self) -> NodeId {
        let mut head = ACCEPT;
        while let Some(c) = self.next() {
            let node = self.char_node(c);
            head = concat(&mut self.arena, head, node);
        }
        head
    }

    fn consume_disjunction(&mut self) -> Result<NodeId, Error> {
        let mut branches = vec![self.consume_sequence()?];
        while self.try_consume('|') {
            branches.push(self.consume_sequence()?);
        }
        if branches.len() == 1 {
            return Ok(branches.pop().unwrap());
        }
        let join = self.arena.alloc(Node::Join { next: ACCEPT });
        let branches: Vec<NodeId> = branches
            .into_iter()
            .map(|b| {
                if b == ACCEPT {
                    join
                } else {
                    concat_plain(&mut self.arena, b, join)
                }
            })
            .collect();
        Ok(self.arena.alloc(Node::Alt {
            branches: branches.into_boxed_slice(),
            join,
        }))
    }

    fn consume_sequence(&mut self) -> Result<NodeId, Error> {
        let mut elems: Vec<NodeId> = Vec::new();
        // A quantifier found at the top of the loop may bind to the last
        // element only right after `\Q...\E` text.
        let mut quantifiable = false;
        loop {
            if self.quote {
                match self.peek() {
                    None => break,
                    Some('\\') if self.peek_at(1) == Some('E') => {
                        self.pos += 2;
                        self.quote = false;
                    }
                    Some(c) => {
                        self.pos += 1;
                        let node = self.char_node(c);
                        elems.push(node);
                        quantifiable = true;
                    }
                }
                continue;
            }
            self.skip_ws_comments();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some(c @ ('*' | '+' | '?' | '{')) => {
                    let start = self.pos;
                    let quant = self.try_consume_quantifier()?;
                    let (min, max, kind) = match quant {
                        Some(q) => q,
                        // Only '{' can fail to scan; it is never a literal.
                        None => return self.error_at("Illegal repetition", start),
                    };
                    if !quantifiable || elems.is_empty() {
                        return self
                            .error_at(format!("Dangling meta character '{}'", c), start);
                    }
                    let last = elems.pop().unwrap();
                    let quantified = self.make_quantified(last, min, max, kind)?;
                    if quantified != ACCEPT {
                        elems.push(quantified);
                    }
                    quantifiable = false;
                    continue;
                }
                _ => {}
            }
            let term = self.consume_term()?;
            if let Some(term) = term {
                self.skip_ws_comments();
                let term = match self.try_consume_quantifier()? {
                    Some((min, max, kind)) => self.make_quantified(term, min, max, kind)?,
                    None => term,
                };
                if term != ACCEPT {
                    elems.push(term);
                }
            }
            quantifiable = false;
        }

        let mut iter: Box<dyn Iterator<Item = NodeId>> = if self.reverse {
            Box::new(elems.into_iter().rev())
        } else {
            Box::new(elems.into_iter())
        };
        let mut head = match iter.next() {
            Some(first) => first,
            None => return Ok(ACCEPT),
        };
        let rest: Vec<NodeId> = iter.collect();
        for elem in rest {
            head = if self.reverse {
                concat_plain(&mut self.arena, head, elem)
            } else {
                concat(&mut self.arena, head, elem)
            };
        }
        Ok(head)
    }

    /// Consume one primary term. \return None for constructs that produce
    /// no node (inline flag directives, `\Q` / `\E` markers).
    fn consume_term(&mut self) -> Result<Option<NodeId>, Error> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            '(' => self.consume_group(),
            '[' => {
                let class = self.consume_class_body()?;
                Ok(Some(self.class_node(class)))
            }
            '^' => {
                self.pos += 1;
                let node = self.anchor_node(AnchorKind::LineStart);
                Ok(Some(node))
            }
            '$' => {
                self.pos += 1;
                let node = self.anchor_node(AnchorKind::LineEnd);
                Ok(Some(node))
            }
            '.' => {
                self.pos += 1;
                let mode = self.dot_mode();
                Ok(Some(self.arena.alloc(Node::Single {
                    m: CharMatcher::Dot { mode },
                    next: ACCEPT,
                })))
            }
            '\\' => {
                self.pos += 1;
                let escape = self.consume_escape(false)?;
                self.term_from_escape(escape)
            }
            _ => {
                self.pos += 1;
                Ok(Some(self.char_node(c)))
            }
        }
    }

    fn anchor_node(&mut self, kind: AnchorKind) -> NodeId {
        let multiline = self.multiline();
        let unix_lines = self.unix_lines();
        self.arena.alloc(Node::Anchor {
            kind,
            multiline,
            unix_lines,
            next: ACCEPT,
        })
    }

    fn term_from_escape(&mut self, escape: Escape) -> Result<Option<NodeId>, Error> {
        Ok(match escape {
            Escape::Char(c) => Some(self.char_node(c)),
            Escape::Class(class) => Some(self.class_node(class)),
            Escape::Boundary { negate } => {
                let unicode = self.uclasses();
                Some(self.arena.alloc(Node::WordBoundary {
                    negate,
                    unicode,
                    next: ACCEPT,
                }))
            }
            Escape::Anchor(kind) => Some(self.anchor_node(kind)),
            Escape::LineBreak => Some(self.arena.alloc(Node::LineBreak { next: ACCEPT })),
            Escape::BackRefNum(group) => {
                let icase = self.icase();
                let unicode = self.ucase();
                Some(self.arena.alloc(Node::BackRef {
                    group,
                    icase,
                    unicode,
                    next: ACCEPT,
                }))
            }
            Escape::BackRefName(name) => {
                let group = match self.group_names.get(&name) {
                    Some(&g) => g,
                    None => {
                        return self.error(format!(
                            "named capturing group <{}> does not exist",
                            name
                        ))
                    }
                };
                let icase = self.icase();
                let unicode = self.ucase();
                Some(self.arena.alloc(Node::BackRef {
                    group,
                    icase,
                    unicode,
                    next: ACCEPT,
                }))
            }
            Escape::QuoteStart => {
                self.quote = true;
                None
            }
            Escape::QuoteEnd => None,
        })
    }

    fn consume_group(&mut self) -> Result<Option<NodeId>, Error> {
        let open = self.pos;
        self.pos += 1; // '('
        if self.try_consume('?') {
            match self.peek() {
                Some(':') => {
                    self.pos += 1;
                    let body = self.consume_scoped_disjunction(self.flags)?;
                    self.expect_group_close(open)?;
                    Ok(Some(body))
                }
                Some('=') => {
                    self.pos += 1;
                    self.consume_lookaround(open, false, false).map(Some)
                }
                Some('!') => {
                    self.pos += 1;
                    self.consume_lookaround(open, true, false).map(Some)
                }
                Some('>') => {
                    self.pos += 1;
                    let body = self.consume_scoped_disjunction(self.flags)?;
                    self.expect_group_close(open)?;
                    let iter_end = self.arena.alloc(Node::IterEnd);
                    let body = concat_plain(&mut self.arena, body, iter_end);
                    Ok(Some(self.arena.alloc(Node::Atomic {
                        body,
                        next: ACCEPT,
                    })))
                }
                Some('<') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('=') => {
                            self.pos += 1;
                            self.consume_lookaround(open, false, true).map(Some)
                        }
                        Some('!') => {
                            self.pos += 1;
                            self.consume_lookaround(open, true, true).map(Some)
                        }
                        _ => {
                            let name = self.consume_group_name()?;
                            let group = self.new_capture_group()?;
                            if self.group_names.insert(name.clone(), group).is_some() {
                                return self.error(format!(
                                    "Named capturing group <{}> is already defined",
                                    name
                                ));
                            }
                            self.consume_capture_body(open, group).map(Some)
                        }
                    }
                }
                _ => self.consume_inline_flags(open),
            }
        } else {
            let group = self.new_capture_group()?;
            self.consume_capture_body(open, group).map(Some)
        }
    }

    fn new_capture_group(&mut self) -> Result<u16, Error> {
        if self.group_count as usize >= MAX_CAPTURE_GROUPS {
            return self.error("Capture group count limit exceeded");
        }
        self.group_count += 1;
        Ok(self.group_count)
    }

    fn consume_capture_body(&mut self, open: usize, group: u16) -> Result<NodeId, Error> {
        let body = self.consume_scoped_disjunction(self.flags)?;
        self.expect_group_close(open)?;
        let start = self.arena.alloc(Node::GroupStart {
            group,
            next: ACCEPT,
        });
        let end = self.arena.alloc(Node::GroupEnd {
            group,
            next: ACCEPT,
        });
        // In a reversed chain the end marker is reached first, so it leads.
        let chain = if self.reverse {
            let chain = concat_plain(&mut self.arena, end, body);
            concat_plain(&mut self.arena, chain, start)
        } else {
            let chain = concat_plain(&mut self.arena, start, body);
            concat_plain(&mut self.arena, chain, end)
        };
        Ok(chain)
    }

    /// Parse a disjunction with a fresh flag scope, restoring the flags
    /// and quote state afterwards.
    fn consume_scoped_disjunction(&mut self, flags: Flags) -> Result<NodeId, Error> {
        let saved_flags = self.flags;
        let saved_quote = self.quote;
        self.flags = flags;
        self.quote = false;
        let body = self.consume_disjunction();
        self.flags = saved_flags;
        self.quote = saved_quote;
        body
    }

    fn consume_lookaround(
        &mut self,
        open: usize,
        negate: bool,
        behind: bool,
    ) -> Result<NodeId, Error> {
        let saved_reverse = self.reverse;
        self.reverse = behind;
        let body = self.consume_scoped_disjunction(self.flags);
        self.reverse = saved_reverse;
        let body = body?;
        self.expect_group_close(open)?;
        let iter_end = self.arena.alloc(Node::IterEnd);
        let body = concat_plain(&mut self.arena, body, iter_end);
        if behind {
            let bounds = chain_bounds(&self.arena, body);
            if bounds.max == UNBOUNDED {
                return self.error_at(
                    "Look-behind group does not have an obvious maximum length",
                    open,
                );
            }
        }
        Ok(self.arena.alloc(Node::Lookaround {
            negate,
            behind,
            body,
            next: ACCEPT,
        }))
    }

    fn consume_group_name(&mut self) -> Result<String, Error> {
        let mut name = String::new();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                name.push(c);
                self.pos += 1;
            }
            _ => {
                return self.error("capturing group name does not start with a Latin letter");
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if !self.try_consume('>') {
            return self.error("named capturing group is missing trailing '>'");
        }
        Ok(name)
    }

    /// `(?idmsuxU-idmsuxU)` directive or `(?flags:...)` scoped group.
    fn consume_inline_flags(&mut self, open: usize) -> Result<Option<NodeId>, Error> {
        let mut on = Flags::NONE;
        let mut off = Flags::NONE;
        let mut negating = false;
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return self.error_at("Unclosed group", open),
            };
            let flag = match c {
                'i' => Some(Flags::CASE_INSENSITIVE),
                'd' => Some(Flags::UNIX_LINES),
                'm' => Some(Flags::MULTILINE),
                's' => Some(Flags::DOT_ALL),
                'u' => Some(Flags::UNICODE_CASE),
                'x' => Some(Flags::COMMENTS),
                'U' => Some(Flags::UNICODE_CLASSES | Flags::UNICODE_CASE),
                _ => None,
            };
            match (flag, c) {
                (Some(f), _) => {
                    if negating {
                        off = off | f;
                    } else {
                        on = on | f;
                    }
                    self.pos += 1;
                }
                (None, '-') => {
                    if negating {
                        return self.error("Unknown inline modifier");
                    }
                    negating = true;
                    self.pos += 1;
                }
                (None, ')') => {
                    self.pos += 1;
                    self.flags = self.flags.with(on).without(off);
                    return Ok(None);
                }
                (None, ':') => {
                    self.pos += 1;
                    let scoped = self.flags.with(on).without(off);
                    let body = self.consume_scoped_disjunction(scoped)?;
                    self.expect_group_close(open)?;
                    return Ok(Some(body));
                }
                _ => return self.error("Unknown inline modifier"),
            }
        }
    }

    fn expect_group_close(&mut self, open: usize) -> Result<(), Error> {
        if self.try_consume(')') {
            Ok(())
        } else {
            self.error_at("Unclosed group", open)
        }
    }

    // Quantifiers.

    /// Scan `* + ? {n} {n,} {n,m}` with optional `?`/`+` suffix.
    fn try_consume_quantifier(&mut self) -> Result<Option<(u32, u32, LoopKind)>, Error> {
        let start = self.pos;
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, MAX_REPS)
            }
            Some('+') => {
                self.pos += 1;
                (1, MAX_REPS)
            }
            Some('?') => {
                self.pos += 1;
                (0, 1)
            }
            Some('{') => {
                self.pos += 1;
                let min = match self.consume_number()? {
                    Some(n) => n,
                    None => return self.error_at("Illegal repetition", start),
                };
                let max = if self.try_consume(',') {
                    if self.peek() == Some('}') {
                        MAX_REPS
                    } else {
                        match self.consume_number()? {
                            Some(n) => n,
                            None => return self.error_at("Illegal repetition", start),
                        }
                    }
                } else {
                    min
                };
                if !self.try_consume('}') {
                    return self.error_at("Illegal repetition", start);
                }
                if max != MAX_REPS && min > max {
                    return self.error_at("Illegal repetition range", start);
                }
                (min, max)
            }
            _ => return Ok(None),
        };
        let kind = if self.try_consume('?') {
            LoopKind::Reluctant
        } else if self.try_consume('+') {
            LoopKind::Possessive
        } else {
            LoopKind::Greedy
        };
        Ok(Some((min, max, kind)))
    }

    fn consume_number(&mut self) -> Result<Option<u32>, Error> {
        let mut any = false;
        let mut value: u64 = 0;
        while let Some(c) = self.peek() {
            let d = match c.to_digit(10) {
                Some(d) => d,
                None => break,
            };
            any = true;
            self.pos += 1;
            value = value * 10 + d as u64;
            if value > MAX_REPS as u64 - 1 {
                return self.error("Illegal repetition");
            }
        }
        Ok(if any { Some(value as u32) } else { None })
    }

    fn make_quantified(
        &mut self,
        term: NodeId,
        min: u32,
        max: u32,
        kind: LoopKind,
    ) -> Result<NodeId, Error> {
        if max == 0 {
            // x{0} matches the empty string; any groups inside stay unset.
            return Ok(ACCEPT);
        }

        // (c) Unroll a bounded quantifier over one literal character into
        // the mandatory repetitions followed by a smaller quantifier.
        if !self.reverse && min >= 2 && min <= 8 {
            if let Node::Single {
                m: CharMatcher::Char { c, icase: false, .. },
                next: ACCEPT,
            } = self.arena[term]
            {
                let mut text = String::new();
                for _ in 0..min {
                    text.push(c);
                }
                let lit = self.arena.alloc(Node::Literal {
                    bytes: text.into_bytes().into_boxed_slice(),
                    next: ACCEPT,
                });
                let rem_max = if max == MAX_REPS { MAX_REPS } else { max - min };
                if rem_max == 0 {
                    return Ok(lit);
                }
                let rem = self.arena.alloc(Node::CharLoop {
                    kind,
                    min: 0,
                    max: rem_max,
                    m: CharMatcher::Char {
                        c,
                        icase: false,
                        unicode: false,
                    },
                    next: ACCEPT,
                });
                return Ok(concat(&mut self.arena, lit, rem));
            }
        }

        // Iterative fast path: a quantifier directly over one character
        // matcher has no captures to track and no internal choice points.
        if let Node::Single { next: ACCEPT, .. } = self.arena[term] {
            if let Node::Single { m, .. } = self.arena[term].clone() {
                return Ok(self.arena.alloc(Node::CharLoop {
                    kind,
                    min,
                    max,
                    m,
                    next: ACCEPT,
                }));
            }
        }

        if self.loop_count as usize >= MAX_LOOPS {
            return self.error("Loop count limit exceeded");
        }
        let slot = self.loop_count;
        self.loop_count += 1;
        let loop_id = self.arena.alloc(Node::Loop {
            kind,
            min,
            max,
            slot,
            body: ACCEPT,
            next: ACCEPT,
        });
        let tail = if kind == LoopKind::Possessive {
            self.arena.alloc(Node::IterEnd)
        } else {
            self.arena.alloc(Node::LoopAgain { owner: loop_id })
        };
        let body = concat_plain(&mut self.arena, term, tail);
        if let Node::Loop { body: b, .. } = &mut self.arena[loop_id] {
            *b = body;
        }
        Ok(loop_id)
    }

    // Escapes.

    /// Consume an escape sequence; the backslash is already consumed.
    fn consume_escape(&mut self, in_class: bool) -> Result<Escape, Error> {
        let start = self.pos.saturating_sub(1);
        let c = match self.next() {
            Some(c) => c,
            None => return self.error_at("Incomplete escape sequence", start),
        };
        match c {
            'n' => Ok(Escape::Char('\n')),
            'r' => Ok(Escape::Char('\r')),
            't' => Ok(Escape::Char('\t')),
            'f' => Ok(Escape::Char('\x0C')),
            'a' => Ok(Escape::Char('\x07')),
            'e' => Ok(Escape::Char('\x1B')),
            '0' => self.consume_octal_escape(start).map(Escape::Char),
            'x' => self.consume_hex_escape(start).map(Escape::Char),
            'u' => self.consume_unicode_escape(start).map(Escape::Char),
            'c' => match self.next() {
                Some(x) if x.is_ascii() => Ok(Escape::Char(((x as u8) ^ 0x40) as char)),
                _ => self.error_at("Illegal control escape sequence", start),
            },
            'd' => Ok(Escape::Class(self.digit_class(false))),
            'D' => Ok(Escape::Class(self.digit_class(true))),
            's' => Ok(Escape::Class(self.space_class(false))),
            'S' => Ok(Escape::Class(self.space_class(true))),
            'w' => Ok(Escape::Class(self.word_class(false))),
            'W' => Ok(Escape::Class(self.word_class(true))),
            'h' => Ok(Escape::Class(CharClass::from_spans(
                &unicode::HORIZONTAL_SPACE,
            ))),
            'H' => Ok(Escape::Class(
                CharClass::from_spans(&unicode::HORIZONTAL_SPACE).negated(),
            )),
            'v' => Ok(Escape::Class(CharClass::from_spans(
                &unicode::VERTICAL_SPACE,
            ))),
            'V' => Ok(Escape::Class(
                CharClass::from_spans(&unicode::VERTICAL_SPACE).negated(),
            )),
            'p' => self.consume_property(start, false).map(Escape::Class),
            'P' => self.consume_property(start, true).map(Escape::Class),
            'Q' => Ok(Escape::QuoteStart),
            'E' => Ok(Escape::QuoteEnd),
            'b' if in_class => Ok(Escape::Char('\x08')),
            'b' => Ok(Escape::Boundary { negate: false }),
            'B' if !in_class => Ok(Escape::Boundary { negate: true }),
            'A' if !in_class => Ok(Escape::Anchor(AnchorKind::InputStart)),
            'G' if !in_class => Ok(Escape::Anchor(AnchorKind::LastMatchEnd)),
            'Z' if !in_class => Ok(Escape::Anchor(AnchorKind::InputEndBeforeTerminator)),
            'z' if !in_class => Ok(Escape::Anchor(AnchorKind::InputEnd)),
            'R' if !in_class => Ok(Escape::LineBreak),
            'k' if !in_class => {
                if !self.try_consume('<') {
                    return self
                        .error_at("\\k is not followed by '<' for named capturing group", start);
                }
                let name = self.consume_group_name()?;
                Ok(Escape::BackRefName(name))
            }
            '1'..='9' if !in_class => self.consume_backref(start, c),
            c if c.is_ascii_alphanumeric() => {
                self.error_at("Illegal/unsupported escape sequence", start)
            }
            c => Ok(Escape::Char(c)),
        }
    }

    fn digit_class(&self, negate: bool) -> CharClass {
        let class = if self.uclasses() {
            CharClass::from_spans(&unicode::DECIMAL_DIGITS)
        } else {
            CharClass::from_spans(&[crate::spanset::Span::new(0x30, 0x39)])
        };
        if negate {
            class.negated()
        } else {
            class
        }
    }

    fn space_class(&self, negate: bool) -> CharClass {
        let class = if self.uclasses() {
            CharClass::property(unicode::Property::Binary(unicode::Binary::WhiteSpace))
        } else {
            CharClass::from_spans(&unicode::ASCII_SPACE)
        };
        if negate {
            class.negated()
        } else {
            class
        }
    }

    fn word_class(&self, negate: bool) -> CharClass {
        let class = if self.uclasses() {
            CharClass::property(unicode::Property::Binary(unicode::Binary::Word))
        } else {
            CharClass::from_spans(&unicode::ASCII_WORD_CHARS)
        };
        if negate {
            class.negated()
        } else {
            class
        }
    }

    /// Numeric backreference with digit shrinking: consume further digits
    /// only while the resulting number still refers to a seen group.
    fn consume_backref(&mut self, start: usize, first: char) -> Result<Escape, Error> {
        let mut num = first.to_digit(10).unwrap() as usize;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            let widened = num * 10 + d as usize;
            if widened > self.group_count as usize {
                break;
            }
            num = widened;
            self.pos += 1;
        }
        if num > self.group_count as usize {
            return self.error_at(
                "No such group yet exists at this point in the pattern",
                start,
            );
        }
        Ok(Escape::BackRefNum(num as u16))
    }

    fn consume_octal_escape(&mut self, start: usize) -> Result<char, Error> {
        let d1 = match self.peek().and_then(|c| c.to_digit(8)) {
            Some(d) => d,
            None => return self.error_at("Illegal octal escape sequence", start),
        };
        self.pos += 1;
        let mut value = d1;
        if let Some(d2) = self.peek().and_then(|c| c.to_digit(8)) {
            self.pos += 1;
            value = value * 8 + d2;
            if d1 <= 3 {
                if let Some(d3) = self.peek().and_then(|c| c.to_digit(8)) {
                    self.pos += 1;
                    value = value * 8 + d3;
                }
            }
        }
        Ok(char::from_u32(value).unwrap_or('\0'))
    }

    fn consume_hex_escape(&mut self, start: usize) -> Result<char, Error> {
        if self.try_consume('{') {
            let mut value: u32 = 0;
            let mut any = false;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                any = true;
                self.pos += 1;
                value = match value.checked_mul(16).and_then(|v| v.checked_add(d)) {
                    Some(v) if v <= CODE_POINT_MAX => v,
                    _ => return self.error_at("Hexadecimal codepoint is too big", start),
                };
            }
            if !any || !self.try_consume('}') {
                return self.error_at("Illegal hexadecimal escape sequence", start);
            }
            match char::from_u32(value) {
                Some(c) => Ok(c),
                None => self.error_at("Illegal hexadecimal escape sequence", start),
            }
        } else {
            let value = self.consume_hex_digits(2, start, "Illegal hexadecimal escape sequence")?;
            Ok(char::from_u32(value).unwrap_or('\0'))
        }
    }

    fn consume_unicode_escape(&mut self, start: usize) -> Result<char, Error> {
        let high = self.consume_hex_digits(4, start, "Illegal Unicode escape sequence")?;
        if (0xD800..=0xDBFF).contains(&high) {
            // A surrogate pair written as two escapes denotes one
            // supplementary code point.
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                let resume = self.pos;
                self.pos += 2;
                let low = self.consume_hex_digits(4, start, "Illegal Unicode escape sequence")?;
                if (0xDC00..=0xDFFF).contains(&low) {
                    let cp = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return match char::from_u32(cp) {
                        Some(c) => Ok(c),
                        None => self.error_at("Illegal Unicode escape sequence", start),
                    };
                }
                self.pos = resume;
            }
            return self.error_at("Illegal Unicode escape sequence", start);
        }
        match char::from_u32(high) {
            Some(c) => Ok(c),
            None => self.error_at("Illegal Unicode escape sequence", start),
        }
    }

    fn consume_hex_digits(
        &mut self,
        count: usize,
        start: usize,
        message: &str,
    ) -> Result<u32, Error> {
        let mut value: u32 = 0;
        for _ in 0..count {
            let d = match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => d,
                None => return self.error_at(message, start),
            };
            self.pos += 1;
            value = value * 16 + d;
        }
        Ok(value)
    }

    fn consume_property(&mut self, start: usize, negate: bool) -> Result<CharClass, Error> {
        let name = if self.try_consume('{') {
            let mut name = String::new();
            loop {
                match self.next() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => {
                        return self.error_at("Unclosed character property", start);
                    }
                }
            }
            name
        } else {
            match self.next() {
                Some(c) => c.to_string(),
                None => return self.error_at("Unclosed character property", start),
            }
        };
        let property = match unicode::lookup_property(&name) {
            Some(p) => p,
            None => {
                return self.error_at(format!("Unknown character property name {{{}}}", name), start)
            }
        };
        let class = CharClass::property(property);
        Ok(self.negate_class(class, negate))
    }

    // Character classes.

    /// Parse a bracket expression; the leading '[' is not yet consumed.
    fn consume_class_body(&mut self) -> Result<CharClass, Error> {
        let open = self.pos;
        self.pos += 1; // '['
        let negate = self.try_consume('^');
        let mut intersections: Vec<CharClass> = Vec::new();
        let mut union: Vec<CharClass> = Vec::new();
        let mut first = true;
        loop {
            self.skip_ws_comments();
            match self.peek() {
                None => return self.error_at("Unclosed character class", open),
                Some(']') if !first => {
                    self.pos += 1;
                    break;
                }
                Some('&') if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    intersections.push(CharClass::union(std::mem::take(&mut union)));
                    first = true;
                    continue;
                }
                _ => {}
            }
            let item = self.consume_class_item()?;
            union.push(item);
            first = false;
        }
        intersections.push(CharClass::union(union));
        let class = if self.icase() {
            CharClass::intersection_symbolic(intersections)
        } else {
            CharClass::intersection(intersections)
        };
        Ok(self.negate_class(class, negate))
    }

    /// Complement \p class when \p negate. Under case-insensitive
    /// matching the complement stays symbolic so folding applies to the
    /// written members rather than to the complement.
    fn negate_class(&self, class: CharClass, negate: bool) -> CharClass {
        if !negate {
            class
        } else if self.icase() {
            class.negated_symbolic()
        } else {
            class.negated()
        }
    }

    fn consume_class_item(&mut self) -> Result<CharClass, Error> {
        match self.peek() {
            Some('[') => self.consume_class_body(),
            Some('\\') if self.peek_at(1) == Some('Q') => {
                self.pos += 2;
                self.consume_quoted_class_run()
            }
            Some('\\') => {
                self.pos += 1;
                match self.consume_escape(true)? {
                    Escape::Char(c) => self.maybe_range(c),
                    Escape::Class(class) => Ok(class),
                    _ => self.error("Illegal/unsupported escape sequence"),
                }
            }
            Some(c) => {
                self.pos += 1;
                self.maybe_range(c)
            }
            None => self.error("Unclosed character class"),
        }
    }

    /// `\Q...\E` inside a class: a union of the quoted characters.
    fn consume_quoted_class_run(&mut self) -> Result<CharClass, Error> {
        let mut members = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some('\\') if self.peek_at(1) == Some('E') => {
                    self.pos += 2;
                    break;
                }
                Some(c) => {
                    self.pos += 1;
                    members.push(CharClass::single(c));
                }
            }
        }
        Ok(CharClass::union(members))
    }

    /// Having read one literal character, recognize an `a-z` range.
    fn maybe_range(&mut self, lo: char) -> Result<CharClass, Error> {
        if self.peek() != Some('-') {
            return Ok(CharClass::single(lo));
        }
        match self.peek_at(1) {
            // Trailing '-' is a literal member; leave it for the item loop.
            None | Some(']') => return Ok(CharClass::single(lo)),
            Some('[') => return self.error("Illegal character range"),
            _ => {}
        }
        let dash = self.pos;
        self.pos += 1; // '-'
        let hi = match self.peek() {
            Some('\\') => {
                self.pos += 1;
                match self.consume_escape(true)? {
                    Escape::Char(c) => c,
                    _ => return self.error_at("Illegal character range", dash),
                }
            }
            Some(c) => {
                self.pos += 1;
                c
            }
            None => return self.error_at("Unclosed character class", dash),
        };
        if (hi as u32) < (lo as u32) {
            return self.error_at("Illegal character range", dash);
        }
        Ok(CharClass::range(lo, hi))
    }
}
