/*!

# retrack - a backtracking regular expression engine

This crate provides a backtracking regular expression engine in the
style of `java.util.regex`: patterns are compiled once into an
immutable [`Pattern`], and a stateful [`Matcher`] applies them to a
subject string with full support for capturing groups, regions, and
incremental find/replace operations.

# Example: test if a string contains a match

```rust
use retrack::Pattern;
let p = Pattern::compile(r"[0-9]{4}").unwrap();
assert!(p.is_match("2020-20-05"));
```

# Example: iterating over matches

Here we use a backreference to find doubled characters:

```rust
use retrack::Pattern;
let p = Pattern::compile(r"(\w)\1").unwrap();
let text = "Frankly, Miss Piggy, I don't give a hoot!";
let found: Vec<&str> = p.find_iter(text).map(|r| &text[r]).collect();
assert_eq!(found, vec!["ss", "gg", "oo"]);
```

# Example: using capture groups

Group spans are byte indexes into the subject; group 0 is the whole
match.

```rust
use retrack::Pattern;
let p = Pattern::compile(r"([0-9]{4})-([0-9]{2})").unwrap();
let mut m = p.matcher("Today is 2020-12");
assert!(m.find());
assert_eq!(m.group(1).unwrap(), Some("2020"));
assert_eq!(m.group(2).unwrap(), Some("12"));
```

# Supported syntax

The pattern grammar follows `java.util.regex`: character classes with
union, ranges, intersection (`&&`), and negation; the predefined
classes `\d \s \w \h \v` and their complements; `\p{...}` properties
(POSIX classes, general categories, scripts, and blocks); greedy,
reluctant (`?`), and possessive (`+`) quantifiers; capturing, named
(`(?<name>...)`), non-capturing, and atomic (`(?>...)`) groups;
backreferences by number and name; lookahead and bounded lookbehind;
the anchors `^ $ \A \G \Z \z` and boundaries `\b \B`; quoting with
`\Q...\E`; and inline flags `(?idmsuxU)`.

Canonical equivalence (the CANON_EQ flag) is not supported and is
rejected at compile time. The engine performs no normalization:
a precomposed e-with-acute and its decomposed form do not match each
other. Normalize before matching if required.

# Matching semantics

Matching is leftmost-first classical backtracking: alternations prefer
their leftmost branch and quantifiers their preferred length, so the
reported match is the first one found by the backtracking order, not
the longest. Lookbehind operands must have a finite maximum length;
they are matched by running the engine backward rather than by
guessing start positions.

*/

#![warn(clippy::all)]
#![allow(clippy::manual_range_contains)]

pub use crate::api::{Flags, Matches, Pattern};
pub use crate::matcher::{MatchError, Matcher};
pub use crate::parse::Error;

mod api;
mod classes;
mod matcher;
mod matching;
mod node;
mod parse;
mod search;
mod spanset;
mod unicode;
