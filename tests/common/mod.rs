#![allow(clippy::uninlined_format_args)]
#![allow(dead_code)]

use retrack::{Flags, Pattern};

/// Compile \p pattern with default flags, panicking on error.
#[track_caller]
pub fn compile(pattern: &str) -> Pattern {
    match Pattern::compile(pattern) {
        Ok(p) => p,
        Err(e) => panic!("Pattern '{}' failed to compile: {}", pattern, e),
    }
}

/// Compile \p pattern under \p flags, panicking on error.
#[track_caller]
pub fn compile_f(pattern: &str, flags: Flags) -> Pattern {
    match Pattern::compile_with_flags(pattern, flags) {
        Ok(p) => p,
        Err(e) => panic!("Pattern '{}' failed to compile: {}", pattern, e),
    }
}

/// Test that \p pattern fails to compile with default flags.
#[track_caller]
pub fn test_parse_fails(pattern: &str) {
    let res = Pattern::compile(pattern);
    assert!(res.is_err(), "Pattern should not have compiled: {}", pattern);
}

/// Format the current match of \p m by inserting commas between the
/// match text and all capture groups, unset groups rendering empty.
fn format_match(m: &retrack::Matcher, group_count: usize) -> String {
    let mut result = m.group(0).unwrap().unwrap_or("").to_string();
    for g in 1..=group_count {
        result.push(',');
        if let Some(text) = m.group(g).unwrap() {
            result.push_str(text);
        }
    }
    result
}

pub trait StringTestHelpers {
    /// "Fluent" style helper for testing that a String is equal to a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    #[track_caller]
    fn test_eq(&self, rhs: &str) {
        assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// "Fluent" style helper for testing that a Vec<String> is equal to
    /// a Vec<&str>.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<String> {
    #[track_caller]
    fn test_eq(&self, rhs: Vec<&str>) {
        assert_eq!(self.len(), rhs.len(), "{:?} vs {:?}", self, rhs);
        for (lhs, rhs) in self.iter().zip(rhs.iter()) {
            assert_eq!(lhs, rhs);
        }
    }
}

pub trait PatternTestHelpers {
    /// Search \p input for the first match, returning the match text
    /// followed by every capture group, comma separated.
    fn match1f(&self, input: &str) -> String;

    /// Search \p input for the first match, returning the match text
    /// and each capture group as an Option.
    fn match1_vec<'s>(&self, input: &'s str) -> Vec<Option<&'s str>>;

    /// Return the text of every match in \p input.
    fn match_all(&self, input: &str) -> Vec<String>;

    /// Test that the pattern matches nowhere in \p input.
    fn test_fails(&self, input: &str);
}

impl PatternTestHelpers for Pattern {
    #[track_caller]
    fn match1f(&self, input: &str) -> String {
        let mut m = self.matcher(input);
        assert!(m.find(), "Pattern '{}' did not match '{}'", self, input);
        format_match(&m, self.group_count())
    }

    #[track_caller]
    fn match1_vec<'s>(&self, input: &'s str) -> Vec<Option<&'s str>> {
        let mut m = self.matcher(input);
        assert!(m.find(), "Pattern '{}' did not match '{}'", self, input);
        (0..=self.group_count())
            .map(|g| m.group(g).unwrap())
            .collect()
    }

    fn match_all(&self, input: &str) -> Vec<String> {
        self.find_iter(input).map(|r| input[r].to_string()).collect()
    }

    #[track_caller]
    fn test_fails(&self, input: &str) {
        let mut m = self.matcher(input);
        assert!(!m.find(), "Pattern '{}' should not match '{}'", self, input);
    }
}
