//! The character class engine: predicates over a single code point, with
//! conservative bound metadata consumed by the structural optimizer, and
//! an algebra of union, intersection, and negation.

use crate::spanset::{Span, SpanSet, CODE_POINT_MAX};
use crate::unicode::{self, Property};

/// Sentinel for "unknown / unbounded" size.
pub const SIZE_UNBOUNDED: u32 = u32::MAX;

#[derive(Debug, Clone)]
enum ClassKind {
    /// A concrete set of code points. Singletons and ranges are stored
    /// this way too.
    Set(SpanSet),
    /// A named property backed by a predicate rather than intervals.
    Prop(Property),
    Union(Vec<CharClass>),
    Intersection(Vec<CharClass>),
    Negation(Box<CharClass>),
}

/// A stateless predicate over one code point.
///
/// `lower`/`upper`/`size` are conservative: every matching code point lies
/// in `[lower, upper]` and the member count is at most `size`. They steer
/// optimizer decisions only, never correctness.
#[derive(Debug, Clone)]
pub struct CharClass {
    kind: ClassKind,
    lower: u32,
    upper: u32,
    size: u32,
}

impl CharClass {
    pub fn single(c: char) -> CharClass {
        let mut set = SpanSet::new();
        set.add_one(c as u32);
        CharClass::from_set(set)
    }

    /// An inclusive code point range. Caller validates `lo <= hi`.
    pub fn range(lo: char, hi: char) -> CharClass {
        let mut set = SpanSet::new();
        set.add(Span::new(lo as u32, hi as u32));
        CharClass::from_set(set)
    }

    pub fn from_set(set: SpanSet) -> CharClass {
        let lower = set.first().unwrap_or(1);
        let upper = set.last().unwrap_or(0);
        let size = set.count().min(SIZE_UNBOUNDED as usize) as u32;
        CharClass {
            kind: ClassKind::Set(set),
            lower,
            upper,
            size,
        }
    }

    pub fn from_spans(spans: &[Span]) -> CharClass {
        CharClass::from_set(unicode::set_from(spans))
    }

    /// A named property. Interval-backed properties collapse to concrete
    /// sets up front so the set algebra can see through them.
    pub fn property(p: Property) -> CharClass {
        match p.spans() {
            Some(set) => CharClass::from_set(set),
            None => CharClass {
                kind: ClassKind::Prop(p),
                lower: 0,
                upper: CODE_POINT_MAX,
                size: SIZE_UNBOUNDED,
            },
        }
    }

    /// The union of several classes. Concrete sets are merged eagerly;
    /// anything predicate-backed stays symbolic.
    pub fn union(parts: Vec<CharClass>) -> CharClass {
        let mut merged = SpanSet::new();
        let mut symbolic: Vec<CharClass> = Vec::new();
        for part in parts {
            match part.kind {
                ClassKind::Set(set) => merged.add_set(&set),
                ClassKind::Union(inner) => {
                    // Flatten one level; inner sets were already merged.
                    for sub in inner {
                        match sub.kind {
                            ClassKind::Set(set) => merged.add_set(&set),
                            _ => symbolic.push(sub),
                        }
                    }
                }
                _ => symbolic.push(part),
            }
        }
        if symbolic.is_empty() {
            return CharClass::from_set(merged);
        }
        let mut parts = symbolic;
        if !merged.is_empty() {
            parts.insert(0, CharClass::from_set(merged));
        }
        let lower = parts.iter().map(|p| p.lower).min().unwrap_or(1);
        let upper = parts.iter().map(|p| p.upper).max().unwrap_or(0);
        let size = parts
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.size));
        CharClass {
            kind: ClassKind::Union(parts),
            lower,
            upper,
            size,
        }
    }

    /// The intersection of several classes, as written with `&&`.
    pub fn intersection(parts: Vec<CharClass>) -> CharClass {
        debug_assert!(!parts.is_empty());
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap();
        }
        if parts.iter().all(|p| matches!(p.kind, ClassKind::Set(_))) {
            let mut iter = parts.into_iter();
            let mut set = match iter.next().unwrap().kind {
                ClassKind::Set(s) => s,
                _ => unreachable!(),
            };
            for part in iter {
                match part.kind {
                    ClassKind::Set(s) => set = set.intersected(&s),
                    _ => unreachable!(),
                }
            }
            return CharClass::from_set(set);
        }
        CharClass::intersection_symbolic(parts)
    }

    /// The intersection as written, kept symbolic. Case-insensitive
    /// membership then folds each operand separately, which eager set
    /// intersection would lose.
    pub fn intersection_symbolic(parts: Vec<CharClass>) -> CharClass {
        debug_assert!(!parts.is_empty());
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap();
        }
        let lower = parts.iter().map(|p| p.lower).max().unwrap_or(1);
        let upper = parts.iter().map(|p| p.upper).min().unwrap_or(0);
        let size = parts.iter().map(|p| p.size).min().unwrap_or(0);
        CharClass {
            kind: ClassKind::Intersection(parts),
            lower,
            upper,
            size,
        }
    }

    /// The complement of this class. Concrete sets complement eagerly;
    /// only correct under case folding when the operand is case-closed.
    pub fn negated(self) -> CharClass {
        match self.kind {
            ClassKind::Negation(inner) => *inner,
            ClassKind::Set(set) => CharClass::from_set(set.negated()),
            _ => self.negated_symbolic(),
        }
    }

    /// The complement of this class, kept symbolic. Case-insensitive
    /// membership then folds against the operand, so `(?i)[^a]` rejects
    /// both `a` and `A`.
    pub fn negated_symbolic(self) -> CharClass {
        match self.kind {
            ClassKind::Negation(inner) => *inner,
            _ => CharClass {
                kind: ClassKind::Negation(Box::new(self)),
                lower: 0,
                upper: CODE_POINT_MAX,
                size: SIZE_UNBOUNDED,
            },
        }
    }

    /// \return whether \p c is a member, with no case folding.
    pub fn contains(&self, c: char) -> bool {
        match &self.kind {
            ClassKind::Set(set) => set.contains(c as u32),
            ClassKind::Prop(p) => p.contains(c),
            ClassKind::Union(parts) => parts.iter().any(|p| p.contains(c)),
            ClassKind::Intersection(parts) => parts.iter().all(|p| p.contains(c)),
            ClassKind::Negation(inner) => !inner.contains(c),
        }
    }

    /// \return whether \p c is a member. Case-insensitive membership
    /// folds at the leaves: a leaf accepts \p c when any case form of
    /// \p c is in it, and negation complements that folded membership.
    pub fn matches(&self, c: char, icase: bool, unicode: bool) -> bool {
        if !icase {
            return self.contains(c);
        }
        match &self.kind {
            ClassKind::Set(set) => {
                let mut forms = [c; 3];
                let n = unicode::case_forms(c, unicode, &mut forms);
                forms[..n].iter().any(|&v| set.contains(v as u32))
            }
            ClassKind::Prop(p) => {
                let mut forms = [c; 3];
                let n = unicode::case_forms(c, unicode, &mut forms);
                forms[..n].iter().any(|&v| p.contains(v))
            }
            ClassKind::Union(parts) => parts.iter().any(|p| p.matches(c, true, unicode)),
            ClassKind::Intersection(parts) => parts.iter().all(|p| p.matches(c, true, unicode)),
            ClassKind::Negation(inner) => !inner.matches(c, true, unicode),
        }
    }

    pub fn lower_bound(&self) -> u32 {
        self.lower
    }

    pub fn upper_bound(&self) -> u32 {
        self.upper
    }

    pub fn size_bound(&self) -> u32 {
        self.size
    }

    /// \return the concrete span set, when this class is one.
    pub fn as_set(&self) -> Option<&SpanSet> {
        match &self.kind {
            ClassKind::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Enumerate members of a small concrete class, up to \p limit.
    /// \return None for predicate-backed or larger classes.
    pub fn members(&self, limit: usize) -> Option<Vec<char>> {
        let set = self.as_set()?;
        if set.count() > limit {
            return None;
        }
        let mut out = Vec::with_capacity(set.count());
        for span in set.spans() {
            for cp in span.first..=span.last {
                out.push(char::from_u32(cp)?);
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::lookup_property;

    #[test]
    fn test_single_and_range() {
        let a = CharClass::single('a');
        assert!(a.contains('a'));
        assert!(!a.contains('b'));
        assert_eq!(a.size_bound(), 1);
        assert_eq!(a.lower_bound(), 'a' as u32);
        assert_eq!(a.upper_bound(), 'a' as u32);

        let digits = CharClass::range('0', '9');
        assert!(digits.contains('5'));
        assert!(!digits.contains('a'));
        assert_eq!(digits.size_bound(), 10);
    }

    #[test]
    fn test_union_merges_sets() {
        let c = CharClass::union(vec![
            CharClass::range('a', 'f'),
            CharClass::range('d', 'k'),
            CharClass::single('z'),
        ]);
        assert!(c.contains('a'));
        assert!(c.contains('k'));
        assert!(c.contains('z'));
        assert!(!c.contains('y'));
        // The overlapping ranges merged into one concrete set.
        assert!(c.as_set().is_some());
        assert_eq!(c.size_bound(), 12);
    }

    #[test]
    fn test_intersection() {
        let c = CharClass::intersection(vec![
            CharClass::range('a', 'z'),
            CharClass::range('m', 'p').negated(),
        ]);
        assert!(c.contains('a'));
        assert!(!c.contains('n'));
        assert!(c.contains('q'));
        assert!(!c.contains('A'));
    }

    #[test]
    fn test_negation_bounds() {
        let c = CharClass::range('a', 'z').negated();
        assert!(!c.contains('m'));
        assert!(c.contains('A'));
        assert!(c.contains('0'));
        // Double negation restores the original.
        let back = c.negated();
        assert!(back.contains('m'));
        assert!(!back.contains('A'));
        assert_eq!(back.size_bound(), 26);
    }

    #[test]
    fn test_symbolic_union_bounds_are_conservative() {
        let c = CharClass::union(vec![
            CharClass::single('x'),
            CharClass::property(lookup_property("L").unwrap()),
        ]);
        assert!(c.contains('x'));
        assert!(c.contains('a'));
        assert!(c.contains('é'));
        assert!(!c.contains('0'));
        assert_eq!(c.size_bound(), SIZE_UNBOUNDED);
    }

    #[test]
    fn test_icase_matching() {
        let c = CharClass::range('a', 'z');
        assert!(!c.matches('A', false, false));
        assert!(c.matches('A', true, false));
        assert!(c.matches('A', true, true));

        let sigma = CharClass::single('σ');
        assert!(!sigma.matches('Σ', true, false));
        assert!(sigma.matches('Σ', true, true));
    }

    #[test]
    fn test_icase_negation_folds_the_operand() {
        // The complement of {a} under folding rejects every case form
        // of its members.
        let c = CharClass::single('a').negated_symbolic();
        assert!(!c.matches('a', true, false));
        assert!(!c.matches('A', true, false));
        assert!(c.matches('b', true, false));
        assert!(c.matches('B', true, false));
        assert!(c.matches('A', false, false));

        let c = CharClass::range('a', 'z').negated_symbolic();
        assert!(!c.matches('Q', true, false));
        assert!(c.matches('0', true, false));
    }

    #[test]
    fn test_icase_intersection_folds_each_leaf() {
        let c = CharClass::intersection_symbolic(vec![
            CharClass::range('A', 'Z'),
            CharClass::range('a', 'z'),
        ]);
        assert!(!c.matches('m', false, false));
        assert!(c.matches('m', true, false));
        assert!(!c.matches('0', true, false));
    }

    #[test]
    fn test_members() {
        let c = CharClass::union(vec![CharClass::single('a'), CharClass::single('c')]);
        assert_eq!(c.members(4), Some(vec!['a', 'c']));
        assert_eq!(CharClass::range('a', 'z').members(4), None);
        let prop = CharClass::property(lookup_property("L").unwrap());
        assert_eq!(prop.members(4), None);
    }
}
