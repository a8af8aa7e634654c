pub mod common;

use common::*;
use retrack::{Flags, Pattern};

#[test]
fn test_leftmost_first_alternation() {
    compile("a(b|bb)c").match1f("abbc").test_eq("abbc,bb");
    compile("(a|ab)").match1f("ab").test_eq("a,a");
    compile("(ab|a)(b?)").match1f("ab").test_eq("ab,ab,");
    compile("x|y|z").match_all("zyx").test_eq(vec!["z", "y", "x"]);
}

#[test]
fn test_greedy_quantifiers() {
    compile("a{2,4}").match1f("aaaaa").test_eq("aaaa");
    compile("a*").match1f("aaa").test_eq("aaa");
    compile("a+b").match1f("aaab").test_eq("aaab");
    compile("a?").match1f("b").test_eq("");
    compile("(a+)(a)").match1f("aaa").test_eq("aaa,aa,a");
}

#[test]
fn test_reluctant_quantifiers() {
    compile("a{2,4}?").match1f("aaaaa").test_eq("aa");
    compile("a+?").match1f("aaa").test_eq("a");
    compile("<(.+?)>").match1f("<a><b>").test_eq("<a>,a");
    compile(".*?b").match1f("aaab").test_eq("aaab");
}

#[test]
fn test_possessive_quantifiers() {
    compile("a{2,4}+").match1f("aaaaa").test_eq("aaaa");
    compile("a*+a").test_fails("aaa");
    compile("a*+b").match1f("aaab").test_eq("aaab");
    compile(r#""[^"]*+""#).match1f(r#"say "hi" now"#).test_eq(r#""hi""#);
}

#[test]
fn test_atomic_groups() {
    compile("(?>a|ab)c").test_fails("abc");
    compile("(?>ab|a)c").match1f("abc").test_eq("abc");
    compile("(?>a+)ab").test_fails("aaab");
    compile("(?>a+)b").match1f("aaab").test_eq("aaab");
}

#[test]
fn test_zero_length_matches() {
    compile("a*").match1f("").test_eq("");
    compile("a*").match_all("aab").test_eq(vec!["aa", "", ""]);
    compile(".*?").match_all("a").test_eq(vec!["", ""]);
    compile("(a?)*b").match1f("b").test_eq("b,");
}

#[test]
fn test_general_loops_backtrack() {
    compile("(?:ab){1,3}ab").match1f("ababab").test_eq("ababab");
    compile("(?:a|b){2}c").match1f("bac").test_eq("bac");
    compile("(a|ab)*c").match1f("aababc").test_eq("aababc,ab");
}

#[test]
fn test_non_matching_captures() {
    assert_eq!(
        compile("aa(b)?aa").match1_vec("aaaa"),
        &[Some("aaaa"), None]
    );
    assert_eq!(
        compile("(x)?(y)").match1_vec("y"),
        &[Some("y"), None, Some("y")]
    );
}

#[test]
fn test_nested_captures() {
    compile("((a)(b))c").match1f("abc").test_eq("abc,ab,a,b");
    // Groups keep the value of their last iteration.
    compile("(?:(a)|(b))*").match1f("ab").test_eq("ab,a,b");
    compile("(a(b)?)+").match1f("aba").test_eq("aba,a,b");
}

#[test]
fn test_named_groups() {
    let p = compile(r"(?<y>\d{4})-(?<m>\d{2})");
    let mut m = p.matcher("on 2020-12-05");
    assert!(m.find());
    assert_eq!(m.group_named("y").unwrap(), Some("2020"));
    assert_eq!(m.group_named("m").unwrap(), Some("12"));
    assert_eq!(p.group_index("m"), Some(2));
}

#[test]
fn test_backreferences() {
    compile(r"(a+)\1").match1f("aaaa").test_eq("aaaa,aa");
    compile(r"(\w)\1").match_all("puzzle bee").test_eq(vec!["zz", "ee"]);
    compile(r"(?<x>ab)\k<x>").match1f("abab").test_eq("abab,ab");
    // A reference to an unset group matches nothing.
    compile(r"(b)?x\1").test_fails("x");
    compile(r"(b)?x\1").match1f("bxb").test_eq("bxb,b");
}

#[test]
fn test_case_insensitive() {
    compile_f("abc", Flags::CASE_INSENSITIVE)
        .match1f("xABCx")
        .test_eq("ABC");
    compile_f(r"[a-f]+", Flags::CASE_INSENSITIVE)
        .match1f("DEAD")
        .test_eq("DEAD");
    // ASCII-only folding unless UNICODE_CASE is set.
    compile_f("σ", Flags::CASE_INSENSITIVE).test_fails("Σ");
    compile_f("σ", Flags::CASE_INSENSITIVE | Flags::UNICODE_CASE)
        .match1f("Σ")
        .test_eq("Σ");
    compile_f("στιγμας", Flags::CASE_INSENSITIVE | Flags::UNICODE_CASE)
        .match1f("ΣΤΙΓΜΑΣ")
        .test_eq("ΣΤΙΓΜΑΣ");
}

#[test]
fn test_case_insensitive_negated_classes() {
    // A negated class rejects every case form of its members.
    compile_f("[^a]", Flags::CASE_INSENSITIVE).test_fails("A");
    compile_f("[^a]", Flags::CASE_INSENSITIVE).test_fails("a");
    compile_f("[^a-z]", Flags::CASE_INSENSITIVE).test_fails("Q");
    compile_f("[^a]+", Flags::CASE_INSENSITIVE)
        .match1f("xaAy")
        .test_eq("x");
    compile_f("[^σ]", Flags::CASE_INSENSITIVE | Flags::UNICODE_CASE).test_fails("Σ");
    // Intersection folds each operand, not their eager intersection.
    compile_f("[A-Z&&[a-z]]", Flags::CASE_INSENSITIVE)
        .match1f("0m1")
        .test_eq("m");
    compile_f("[a-z&&[^m-p]]", Flags::CASE_INSENSITIVE).test_fails("N");
}

#[test]
fn test_multiline() {
    compile("^abc").match1f("abc").test_eq("abc");
    compile("^def").test_fails("abc\ndef");
    compile_f("^def", Flags::MULTILINE)
        .match1f("abc\ndef")
        .test_eq("def");
    compile_f(r"^\d", Flags::MULTILINE)
        .match_all("aaa\n789\r\nccc\r\n345")
        .test_eq(vec!["7", "3"]);
    compile_f(r"\d$", Flags::MULTILINE)
        .match_all("aaa789\n789\r\nccc10\r\n345")
        .test_eq(vec!["9", "9", "0", "5"]);
    // No match between \r and \n.
    assert_eq!(
        compile_f("^", Flags::MULTILINE)
            .find_iter("a\r\nb")
            .collect::<Vec<_>>(),
        vec![0..0, 3..3]
    );
}

#[test]
fn test_dollar_before_final_terminator() {
    compile("a$").match1f("a").test_eq("a");
    compile("a$").match1f("a\n").test_eq("a");
    compile("a$").match1f("a\r\n").test_eq("a");
    compile("a$").test_fails("a\n\n");
    compile(r"a\Z").match1f("a\n").test_eq("a");
    compile(r"a\z").test_fails("a\n");
    compile(r"a\z").match1f("a").test_eq("a");
}

#[test]
fn test_unix_lines() {
    compile_f(".", Flags::UNIX_LINES).match1f("\r").test_eq("\r");
    compile_f(".", Flags::UNIX_LINES).test_fails("\n");
    compile_f("^b", Flags::MULTILINE | Flags::UNIX_LINES).test_fails("a\rb");
    compile_f("^b", Flags::MULTILINE | Flags::UNIX_LINES)
        .match1f("a\nb")
        .test_eq("b");
}

#[test]
fn test_dotall() {
    compile(".").test_fails("\n");
    compile(".").test_fails("\u{2028}");
    compile_f(".", Flags::DOT_ALL).match1f("\n").test_eq("\n");
    compile_f("a.b", Flags::DOT_ALL).match1f("a\nb").test_eq("a\nb");
}

#[test]
fn test_line_break() {
    compile(r"\R").match1f("a\nb").test_eq("\n");
    // \R consumes \r\n as a unit.
    compile(r"a\Rb").match1f("a\r\nb").test_eq("a\r\nb");
    compile(r"\R").match1f("\u{2028}").test_eq("\u{2028}");
    compile(r"\R").match1f("\x0B").test_eq("\x0B");
}

#[test]
fn test_word_boundaries() {
    compile(r"\bfoo\b").match1f("a foo b").test_eq("foo");
    compile(r"\bfoo\b").test_fails("food");
    compile(r"\Boo").match1f("food").test_eq("oo");
    compile(r"\b\w+\b").match_all("one, two!").test_eq(vec!["one", "two"]);
    // \w is ASCII by default and Unicode under UNICODE_CLASSES.
    compile(r"\w+").match1f("héllo").test_eq("h");
    compile_f(r"\w+", Flags::UNICODE_CLASSES)
        .match1f("héllo")
        .test_eq("héllo");
}

#[test]
fn test_character_classes() {
    compile("[a-c]+").match1f("xabcayz").test_eq("abca");
    compile("[^a-c]+").match1f("abxyca").test_eq("xy");
    compile("[a-z&&[^m-p]]+").match1f("lamp").test_eq("la");
    compile("[[a-d][x-z]]+").match1f("cbyq").test_eq("cby");
    compile("[a-c[x-z]]+").match1f("byaq").test_eq("bya");
    compile(r"[\d\s]+").match1f("a1 2b").test_eq("1 2");
    // [\b] is a backspace inside a class.
    compile(r"[\b]").match1f("\x08").test_eq("\x08");
    compile("[]]").match1f("]").test_eq("]");
    compile("[^]]").match1f("]a").test_eq("a");
}

#[test]
fn test_properties() {
    compile(r"\p{Alpha}+").match1f("12ab34").test_eq("ab");
    compile(r"\p{Upper}\p{Lower}+").match1f("the Cat").test_eq("Cat");
    compile(r"\p{L}+").match1f("1αβ2").test_eq("αβ");
    compile(r"\p{Lu}").match1f("aAb").test_eq("A");
    compile(r"\P{L}").match1f("ab:cd").test_eq(":");
    compile(r"\p{IsGreek}+").match1f("abαβγcd").test_eq("αβγ");
    compile(r"\p{InBasicLatin}+").match1f("δx7δ").test_eq("x7");
}

#[test]
fn test_predefined_classes() {
    compile(r"\d+").match1f("ab123cd").test_eq("123");
    compile(r"\D+").match1f("12ab34").test_eq("ab");
    compile(r"\s+").match1f("a \t b").test_eq(" \t ");
    compile(r"\S+").match1f("  abc  ").test_eq("abc");
    compile(r"\h").match1f("a\tb").test_eq("\t");
    compile(r"\h").match1f("a\u{3000}b").test_eq("\u{3000}");
    compile(r"\H+").match1f("\u{205F}ab\u{205F}").test_eq("ab");
    compile(r"\v+").match1f("a\n\x0Bb").test_eq("\n\x0B");
    // Unicode digits only under UNICODE_CLASSES.
    compile(r"\d").test_fails("٣");
    compile_f(r"\d", Flags::UNICODE_CLASSES).match1f("٣").test_eq("٣");
}

#[test]
fn test_escapes() {
    compile(r"\x41\x42").match1f("zABz").test_eq("AB");
    compile(r"\x{1F600}").match1f("a😀b").test_eq("😀");
    // A surrogate pair of \u escapes denotes one code point.
    compile(r"\uD83D\uDE00").match1f("a😀b").test_eq("😀");
    compile(r"\u0041").match1f("zAz").test_eq("A");
    compile(r"\cA").match1f("\x01").test_eq("\x01");
    compile(r"\0101").match1f("A").test_eq("A");
    compile(r"\t\n").match1f("\t\n").test_eq("\t\n");
    compile(r"\e").match1f("\x1B").test_eq("\x1B");
    compile(r"a\.b").match1f("a.b").test_eq("a.b");
    compile(r"a\.b").test_fails("axb");
}

#[test]
fn test_quoting() {
    compile(r"\Qa.*b\E").match1f("xa.*bx").test_eq("a.*b");
    compile(r"\Qa.*b\E").test_fails("aXb");
    compile(r"\Q[\E]").match1f("[]").test_eq("[]");
    compile(&Pattern::quote("1+1")).match1f("1+1").test_eq("1+1");
}

#[test]
fn test_comments_mode() {
    compile_f("a b # trailing\nc", Flags::COMMENTS)
        .match1f("abc")
        .test_eq("abc");
    compile_f(r"(\d+) \s (\d+)", Flags::COMMENTS)
        .match1f("12 34")
        .test_eq("12 34,12,34");
}

#[test]
fn test_inline_flags() {
    compile("(?i)abc").match1f("ABC").test_eq("ABC");
    compile("(?i:a)b").match1f("Ab").test_eq("Ab");
    compile("(?i:a)b").test_fails("AB");
    // Inline flags apply to the rest of the enclosing group.
    compile("a(?i)b").match1f("aB").test_eq("aB");
    compile("(a(?i)b)c").test_fails("abC");
    compile("(?i)a(?-i)b").test_fails("aB");
    compile("(?s).").match1f("\n").test_eq("\n");
}

#[test]
fn test_lookahead() {
    compile(r"a(?=b)").match1f("ab").test_eq("a");
    compile(r"a(?=b)").test_fails("ac");
    compile(r"a(?!b)").match1f("ac").test_eq("a");
    compile(r"\d+(?= dollars)").match1f("10 dollars").test_eq("10");
    // Captures inside a successful lookahead survive.
    compile(r"a(?=(b+))").match1f("abb").test_eq("a,bb");
}

#[test]
fn test_lookbehind() {
    compile(r"(?<=abc)d").match1f("abcd").test_eq("d");
    let p = compile(r"(?<=abc)d");
    let mut m = p.matcher("abcd");
    assert!(m.find());
    assert_eq!(m.span(0).unwrap(), Some((3, 4)));
    compile(r"(?<=x|yy)z").match1f("ayyz").test_eq("z");
    compile(r"(?<!a)b").match1f("cb").test_eq("b");
    compile(r"(?<!a)b").test_fails("ab");
    compile(r"(?<=a{2,4})b").match1f("aaab").test_eq("b");
}

#[test]
fn test_anchors() {
    compile(r"\Aab").match1f("ab").test_eq("ab");
    compile_f(r"\Aab", Flags::MULTILINE).test_fails("x\nab");
    compile(r"ab\Z").match1f("ab\n").test_eq("ab");
    compile(r"ab\z").match1f("ab").test_eq("ab");
    compile("^$").match1f("").test_eq("");
}

#[test]
fn test_supplementary_characters() {
    compile(".").match1f("😀").test_eq("😀");
    compile("[😀-😂]").match1f("x😁y").test_eq("😁");
    compile("😀+").match1f("😀😀").test_eq("😀😀");
    compile(r"\p{L}").test_fails("😀");
}

#[test]
fn test_literal_pattern_flag() {
    compile_f("a.*b", Flags::LITERAL).match1f("xa.*by").test_eq("a.*b");
    compile_f("a.*b", Flags::LITERAL).test_fails("aXb");
}

#[test]
fn test_split() {
    compile(",").split("a,b,c").join("|").test_eq("a|b|c");
    compile(",").split("a,b,,,").join("|").test_eq("a|b");
    compile("").split("abc").join("|").test_eq("a|b|c");
    compile(r"\s*,\s*").split("a , b,c").join("|").test_eq("a|b|c");
}
