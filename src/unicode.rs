//! Character queries backing the class engine: POSIX classes, general
//! categories, scripts, blocks, line terminators, word characters, and
//! simple case folding.
//!
//! Category predicates lean on the classification built into `char`;
//! script and block membership come from interval tables below.

use crate::spanset::{Span, SpanSet};

/// Shorthand for constructing a span in a table.
const fn r(first: u32, last: u32) -> Span {
    Span::new(first, last)
}

const fn r1(cp: u32) -> Span {
    Span::single(cp)
}

/// \return whether \p c is a line terminator: newline, vertical tab,
/// form feed, carriage return, next-line, line separator, or paragraph
/// separator.
#[inline(always)]
pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\x0B' | '\x0C' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// ASCII word characters: `[a-zA-Z0-9_]`.
pub const ASCII_WORD_CHARS: [Span; 4] = [r(0x30, 0x39), r(0x41, 0x5A), r1(0x5F), r(0x61, 0x7A)];

/// \return whether \p c is a word character, optionally using the Unicode
/// definition (alphabetics, digits, marks, joiners).
#[inline]
pub fn is_word_char(c: char, unicode: bool) -> bool {
    if c == '_' || c.is_ascii_alphanumeric() {
        return true;
    }
    if !unicode {
        return false;
    }
    c.is_alphanumeric() || in_table(c, &MARKS) || matches!(c, '\u{200C}' | '\u{200D}')
}

/// Horizontal whitespace, the `\h` class.
pub const HORIZONTAL_SPACE: [Span; 9] = [
    r1(0x09),
    r1(0x20),
    r1(0xA0),
    r1(0x1680),
    r1(0x180E),
    r(0x2000, 0x200A),
    r1(0x202F),
    r1(0x205F),
    r1(0x3000),
];

/// Vertical whitespace, the `\v` class.
pub const VERTICAL_SPACE: [Span; 3] = [r(0x0A, 0x0D), r1(0x85), r(0x2028, 0x2029)];

/// ASCII whitespace, the default `\s` class: tab, newline, vertical tab,
/// form feed, carriage return, space.
pub const ASCII_SPACE: [Span; 2] = [r(0x09, 0x0D), r1(0x20)];

/// Decimal digits (category Nd), restricted to the blocks in common use.
pub const DECIMAL_DIGITS: [Span; 24] = [
    r(0x30, 0x39),     // ASCII
    r(0x660, 0x669),   // Arabic-Indic
    r(0x6F0, 0x6F9),   // Extended Arabic-Indic
    r(0x7C0, 0x7C9),   // NKo
    r(0x966, 0x96F),   // Devanagari
    r(0x9E6, 0x9EF),   // Bengali
    r(0xA66, 0xA6F),   // Gurmukhi
    r(0xAE6, 0xAEF),   // Gujarati
    r(0xB66, 0xB6F),   // Oriya
    r(0xBE6, 0xBEF),   // Tamil
    r(0xC66, 0xC6F),   // Telugu
    r(0xCE6, 0xCEF),   // Kannada
    r(0xD66, 0xD6F),   // Malayalam
    r(0xDE6, 0xDEF),   // Sinhala
    r(0xE50, 0xE59),   // Thai
    r(0xED0, 0xED9),   // Lao
    r(0xF20, 0xF29),   // Tibetan
    r(0x1040, 0x1049), // Myanmar
    r(0x17E0, 0x17E9), // Khmer
    r(0x1810, 0x1819), // Mongolian
    r(0x1946, 0x194F), // Limbu
    r(0x19D0, 0x19D9), // New Tai Lue
    r(0xA620, 0xA629), // Vai
    r(0xFF10, 0xFF19), // Fullwidth
];

/// Combining marks (categories Mn/Mc/Me), principal ranges.
const MARKS: [Span; 18] = [
    r(0x300, 0x36F),
    r(0x483, 0x489),
    r(0x591, 0x5BD),
    r1(0x5BF),
    r(0x5C1, 0x5C2),
    r(0x5C4, 0x5C7),
    r(0x610, 0x61A),
    r(0x64B, 0x65F),
    r1(0x670),
    r(0x6D6, 0x6DC),
    r(0x6DF, 0x6E4),
    r(0x900, 0x903),
    r(0x93A, 0x94F),
    r(0x951, 0x957),
    r(0x1AB0, 0x1AFF),
    r(0x1DC0, 0x1DFF),
    r(0x20D0, 0x20FF),
    r(0xFE20, 0xFE2F),
];

/// Space separators (category Zs) plus line/paragraph separators.
const SEPARATORS: [Span; 8] = [
    r1(0x20),
    r1(0xA0),
    r1(0x1680),
    r(0x2000, 0x200A),
    r(0x2028, 0x2029),
    r1(0x202F),
    r1(0x205F),
    r1(0x3000),
];

/// Titlecase letters (category Lt).
const TITLECASE_LETTERS: [Span; 7] = [
    r1(0x1C5),
    r1(0x1C8),
    r1(0x1CB),
    r1(0x1F2),
    r(0x1F88, 0x1F8F),
    r(0x1F98, 0x1F9F),
    r(0x1FA8, 0x1FAF),
];

#[inline]
fn in_table(c: char, table: &[Span]) -> bool {
    let cp = c as u32;
    table.iter().any(|s| s.contains(cp))
}

pub fn set_from(table: &[Span]) -> SpanSet {
    let mut set = SpanSet::new();
    for span in table {
        set.add(*span);
    }
    set
}

/// A named character property, resolved from `\p{...}` syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Posix(Posix),
    Category(Category),
    Script(Script),
    Block(Span),
    Binary(Binary),
}

impl Property {
    /// \return whether \p c has this property.
    pub fn contains(&self, c: char) -> bool {
        match self {
            Property::Posix(p) => p.contains(c),
            Property::Category(cat) => cat.contains(c),
            Property::Script(s) => in_table(c, s.spans()),
            Property::Block(span) => span.contains(c as u32),
            Property::Binary(b) => b.contains(c),
        }
    }

    /// \return the concrete code point set for this property, if it is
    /// backed by an interval table. Predicate-backed properties return None.
    pub fn spans(&self) -> Option<SpanSet> {
        match self {
            Property::Posix(p) => Some(set_from(p.table())),
            Property::Script(s) => Some(set_from(s.spans())),
            Property::Block(span) => Some(set_from(&[*span])),
            Property::Category(_) | Property::Binary(_) => None,
        }
    }
}

/// POSIX character classes. These are ASCII-only, as in the reference
/// dialect without Unicode classes enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posix {
    Alpha,
    Digit,
    Alnum,
    Punct,
    Graph,
    Print,
    Blank,
    Cntrl,
    XDigit,
    Space,
    Lower,
    Upper,
    Ascii,
}

const POSIX_ALPHA: [Span; 2] = [r(0x41, 0x5A), r(0x61, 0x7A)];
const POSIX_DIGIT: [Span; 1] = [r(0x30, 0x39)];
const POSIX_ALNUM: [Span; 3] = [r(0x30, 0x39), r(0x41, 0x5A), r(0x61, 0x7A)];
const POSIX_PUNCT: [Span; 4] = [r(0x21, 0x2F), r(0x3A, 0x40), r(0x5B, 0x60), r(0x7B, 0x7E)];
const POSIX_GRAPH: [Span; 1] = [r(0x21, 0x7E)];
const POSIX_PRINT: [Span; 1] = [r(0x20, 0x7E)];
const POSIX_BLANK: [Span; 2] = [r1(0x09), r1(0x20)];
const POSIX_CNTRL: [Span; 2] = [r(0x00, 0x1F), r1(0x7F)];
const POSIX_XDIGIT: [Span; 3] = [r(0x30, 0x39), r(0x41, 0x46), r(0x61, 0x66)];
const POSIX_LOWER: [Span; 1] = [r(0x61, 0x7A)];
const POSIX_UPPER: [Span; 1] = [r(0x41, 0x5A)];
const POSIX_ASCII: [Span; 1] = [r(0x00, 0x7F)];

impl Posix {
    pub fn table(&self) -> &'static [Span] {
        match self {
            Posix::Alpha => &POSIX_ALPHA,
            Posix::Digit => &POSIX_DIGIT,
            Posix::Alnum => &POSIX_ALNUM,
            Posix::Punct => &POSIX_PUNCT,
            Posix::Graph => &POSIX_GRAPH,
            Posix::Print => &POSIX_PRINT,
            Posix::Blank => &POSIX_BLANK,
            Posix::Cntrl => &POSIX_CNTRL,
            Posix::XDigit => &POSIX_XDIGIT,
            Posix::Space => &ASCII_SPACE,
            Posix::Lower => &POSIX_LOWER,
            Posix::Upper => &POSIX_UPPER,
            Posix::Ascii => &POSIX_ASCII,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        in_table(c, self.table())
    }

    pub fn lookup(name: &str) -> Option<Posix> {
        Some(match name {
            "Alpha" => Posix::Alpha,
            "Digit" => Posix::Digit,
            "Alnum" => Posix::Alnum,
            "Punct" => Posix::Punct,
            "Graph" => Posix::Graph,
            "Print" => Posix::Print,
            "Blank" => Posix::Blank,
            "Cntrl" => Posix::Cntrl,
            "XDigit" => Posix::XDigit,
            "Space" => Posix::Space,
            "Lower" => Posix::Lower,
            "Upper" => Posix::Upper,
            "ASCII" => Posix::Ascii,
            _ => return None,
        })
    }
}

/// General categories, at the granularity the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Letter,          // L
    UppercaseLetter, // Lu
    LowercaseLetter, // Ll
    TitlecaseLetter, // Lt
    Number,          // N
    DecimalNumber,   // Nd
    Mark,            // M
    Punctuation,     // P
    Symbol,          // S
    Separator,       // Z
    Other,           // C
}

const ASCII_SYMBOLS: [char; 9] = ['$', '+', '<', '=', '>', '^', '`', '|', '~'];

impl Category {
    pub fn contains(&self, c: char) -> bool {
        match self {
            Category::Letter => c.is_alphabetic(),
            Category::UppercaseLetter => c.is_uppercase() && !in_table(c, &TITLECASE_LETTERS),
            Category::LowercaseLetter => c.is_lowercase(),
            Category::TitlecaseLetter => in_table(c, &TITLECASE_LETTERS),
            Category::Number => c.is_numeric(),
            Category::DecimalNumber => in_table(c, &DECIMAL_DIGITS),
            Category::Mark => in_table(c, &MARKS),
            Category::Punctuation => {
                (c.is_ascii_punctuation() && !ASCII_SYMBOLS.contains(&c))
                    || matches!(c,
                        '\u{2010}'..='\u{2027}'
                        | '\u{2030}'..='\u{205E}'
                        | '\u{3001}'..='\u{3003}'
                        | '\u{FF01}'..='\u{FF03}')
            }
            Category::Symbol => {
                ASCII_SYMBOLS.contains(&c)
                    || matches!(c, '\u{20A0}'..='\u{20CF}' | '\u{2190}'..='\u{2BFF}')
            }
            Category::Separator => in_table(c, &SEPARATORS),
            Category::Other => {
                c.is_control()
                    || matches!(c, '\u{AD}' | '\u{200B}'..='\u{200F}' | '\u{E000}'..='\u{F8FF}')
            }
        }
    }

    pub fn lookup(name: &str) -> Option<Category> {
        Some(match name {
            "L" => Category::Letter,
            "Lu" => Category::UppercaseLetter,
            "Ll" => Category::LowercaseLetter,
            "Lt" => Category::TitlecaseLetter,
            "N" => Category::Number,
            "Nd" => Category::DecimalNumber,
            "M" => Category::Mark,
            "P" => Category::Punctuation,
            "S" => Category::Symbol,
            "Z" => Category::Separator,
            "C" => Category::Other,
            _ => return None,
        })
    }
}

/// Binary properties accepted in `Is` form, plus the word-character
/// predicate used by `\w` under Unicode classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binary {
    Alphabetic,
    WhiteSpace,
    Word,
}

impl Binary {
    pub fn contains(&self, c: char) -> bool {
        match self {
            Binary::Alphabetic => c.is_alphabetic(),
            Binary::WhiteSpace => c.is_whitespace(),
            Binary::Word => is_word_char(c, true),
        }
    }
}

/// Scripts the engine resolves by name, with their principal ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Greek,
    Cyrillic,
    Armenian,
    Hebrew,
    Arabic,
    Devanagari,
    Thai,
    Georgian,
    Han,
    Hiragana,
    Katakana,
    Hangul,
    Common,
}

const SCRIPT_LATIN: [Span; 6] = [
    r(0x41, 0x5A),
    r(0x61, 0x7A),
    r(0xC0, 0xD6),
    r(0xD8, 0xF6),
    r(0xF8, 0x2B8),
    r(0x1E00, 0x1EFF),
];
const SCRIPT_GREEK: [Span; 3] = [r(0x370, 0x373), r(0x375, 0x3FF), r(0x1F00, 0x1FFE)];
const SCRIPT_CYRILLIC: [Span; 3] = [r(0x400, 0x52F), r(0x1C80, 0x1C88), r(0x2DE0, 0x2DFF)];
const SCRIPT_ARMENIAN: [Span; 2] = [r(0x531, 0x58A), r(0xFB13, 0xFB17)];
const SCRIPT_HEBREW: [Span; 2] = [r(0x591, 0x5F4), r(0xFB1D, 0xFB4F)];
const SCRIPT_ARABIC: [Span; 4] = [
    r(0x600, 0x6FF),
    r(0x750, 0x77F),
    r(0x8A0, 0x8FF),
    r(0xFB50, 0xFDFF),
];
const SCRIPT_DEVANAGARI: [Span; 2] = [r(0x900, 0x97F), r(0xA8E0, 0xA8FF)];
const SCRIPT_THAI: [Span; 1] = [r(0xE01, 0xE5B)];
const SCRIPT_GEORGIAN: [Span; 2] = [r(0x10A0, 0x10FF), r(0x2D00, 0x2D2F)];
const SCRIPT_HAN: [Span; 4] = [
    r(0x2E80, 0x2FDF),
    r(0x3400, 0x4DBF),
    r(0x4E00, 0x9FFF),
    r(0xF900, 0xFAFF),
];
const SCRIPT_HIRAGANA: [Span; 1] = [r(0x3041, 0x309F)];
const SCRIPT_KATAKANA: [Span; 2] = [r(0x30A0, 0x30FF), r(0x31F0, 0x31FF)];
const SCRIPT_HANGUL: [Span; 3] = [r(0x1100, 0x11FF), r(0x3130, 0x318F), r(0xAC00, 0xD7AF)];
const SCRIPT_COMMON: [Span; 4] = [r(0x00, 0x40), r(0x5B, 0x60), r(0x7B, 0xA9), r(0x2000, 0x206F)];

impl Script {
    pub fn spans(&self) -> &'static [Span] {
        match self {
            Script::Latin => &SCRIPT_LATIN,
            Script::Greek => &SCRIPT_GREEK,
            Script::Cyrillic => &SCRIPT_CYRILLIC,
            Script::Armenian => &SCRIPT_ARMENIAN,
            Script::Hebrew => &SCRIPT_HEBREW,
            Script::Arabic => &SCRIPT_ARABIC,
            Script::Devanagari => &SCRIPT_DEVANAGARI,
            Script::Thai => &SCRIPT_THAI,
            Script::Georgian => &SCRIPT_GEORGIAN,
            Script::Han => &SCRIPT_HAN,
            Script::Hiragana => &SCRIPT_HIRAGANA,
            Script::Katakana => &SCRIPT_KATAKANA,
            Script::Hangul => &SCRIPT_HANGUL,
            Script::Common => &SCRIPT_COMMON,
        }
    }

    pub fn lookup(name: &str) -> Option<Script> {
        Some(match normalized(name).as_str() {
            "LATIN" => Script::Latin,
            "GREEK" => Script::Greek,
            "CYRILLIC" => Script::Cyrillic,
            "ARMENIAN" => Script::Armenian,
            "HEBREW" => Script::Hebrew,
            "ARABIC" => Script::Arabic,
            "DEVANAGARI" => Script::Devanagari,
            "THAI" => Script::Thai,
            "GEORGIAN" => Script::Georgian,
            "HAN" => Script::Han,
            "HIRAGANA" => Script::Hiragana,
            "KATAKANA" => Script::Katakana,
            "HANGUL" => Script::Hangul,
            "COMMON" => Script::Common,
            _ => return None,
        })
    }
}

/// Blocks resolvable by `In` or `block=` form. Block name matching ignores
/// case, spaces, hyphens, and underscores.
const BLOCKS: [(&str, Span); 24] = [
    ("BASICLATIN", r(0x0000, 0x007F)),
    ("LATIN1SUPPLEMENT", r(0x0080, 0x00FF)),
    ("LATINEXTENDEDA", r(0x0100, 0x017F)),
    ("LATINEXTENDEDB", r(0x0180, 0x024F)),
    ("IPAEXTENSIONS", r(0x0250, 0x02AF)),
    ("COMBININGDIACRITICALMARKS", r(0x0300, 0x036F)),
    ("GREEKANDCOPTIC", r(0x0370, 0x03FF)),
    ("GREEK", r(0x0370, 0x03FF)),
    ("CYRILLIC", r(0x0400, 0x04FF)),
    ("ARMENIAN", r(0x0530, 0x058F)),
    ("HEBREW", r(0x0590, 0x05FF)),
    ("ARABIC", r(0x0600, 0x06FF)),
    ("DEVANAGARI", r(0x0900, 0x097F)),
    ("THAI", r(0x0E00, 0x0E7F)),
    ("GEORGIAN", r(0x10A0, 0x10FF)),
    ("GENERALPUNCTUATION", r(0x2000, 0x206F)),
    ("CURRENCYSYMBOLS", r(0x20A0, 0x20CF)),
    ("ARROWS", r(0x2190, 0x21FF)),
    ("MATHEMATICALOPERATORS", r(0x2200, 0x22FF)),
    ("BOXDRAWING", r(0x2500, 0x257F)),
    ("HIRAGANA", r(0x3040, 0x309F)),
    ("KATAKANA", r(0x30A0, 0x30FF)),
    ("CJKUNIFIEDIDEOGRAPHS", r(0x4E00, 0x9FFF)),
    ("HANGULSYLLABLES", r(0xAC00, 0xD7AF)),
];

fn normalized(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn block_lookup(name: &str) -> Option<Span> {
    let key = normalized(name);
    BLOCKS
        .iter()
        .find(|(n, _)| *n == key)
        .map(|(_, span)| *span)
}

/// Resolve a `\p{...}` property name.
///
/// Accepted forms: one or two letter general categories; POSIX names;
/// `IsScript` / `IsBinaryProperty`; `InBlock`; and the explicit
/// `script=`/`sc=`, `block=`/`blk=`, `general_category=`/`gc=` prefixes.
pub fn lookup_property(name: &str) -> Option<Property> {
    if let Some((prefix, rest)) = name.split_once('=') {
        return match prefix {
            "script" | "sc" => Script::lookup(rest).map(Property::Script),
            "block" | "blk" => block_lookup(rest).map(Property::Block),
            "general_category" | "gc" => Category::lookup(rest).map(Property::Category),
            _ => None,
        };
    }
    if let Some(cat) = Category::lookup(name) {
        return Some(Property::Category(cat));
    }
    if let Some(posix) = Posix::lookup(name) {
        return Some(Property::Posix(posix));
    }
    if let Some(rest) = name.strip_prefix("Is") {
        if let Some(script) = Script::lookup(rest) {
            return Some(Property::Script(script));
        }
        return match normalized(rest).as_str() {
            "ALPHABETIC" => Some(Property::Binary(Binary::Alphabetic)),
            "WHITESPACE" => Some(Property::Binary(Binary::WhiteSpace)),
            _ => None,
        };
    }
    if let Some(rest) = name.strip_prefix("In") {
        return block_lookup(rest).map(Property::Block);
    }
    None
}

/// \return the single-character simple case fold of \p c: uppercase then
/// lowercase, keeping \p c when either mapping expands to multiple
/// characters.
pub fn fold_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    let up = match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => return c,
    };
    let mut lower = up.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// \return whether two characters are equal under case folding.
#[inline]
pub fn chars_eq_icase(a: char, b: char, unicode: bool) -> bool {
    if a == b {
        return true;
    }
    if !unicode {
        a.is_ascii() && b.is_ascii() && a.to_ascii_lowercase() == b.to_ascii_lowercase()
    } else {
        fold_char(a) == fold_char(b)
    }
}

/// Write the case forms of \p c (itself, then single-character uppercase
/// and lowercase mappings) into \p out, returning how many were written.
/// Used to test class membership case-insensitively, mirroring the
/// reference behavior of probing each case form against the class.
pub fn case_forms(c: char, unicode: bool, out: &mut [char; 3]) -> usize {
    out[0] = c;
    let mut n = 1;
    if !unicode {
        if c.is_ascii_alphabetic() {
            out[1] = c.to_ascii_uppercase();
            out[2] = c.to_ascii_lowercase();
            n = 3;
        }
        return n;
    }
    let mut upper = c.to_uppercase();
    if let (Some(u), None) = (upper.next(), upper.next()) {
        if u != c {
            out[n] = u;
            n += 1;
        }
    }
    let mut lower = c.to_lowercase();
    if let (Some(l), None) = (lower.next(), lower.next()) {
        if l != c && (n < 2 || out[1] != l) {
            out[n] = l;
            n += 1;
        }
    }
    n
}
