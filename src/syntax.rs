use lazy_static::lazy_static;
use regex::Regex;

use crate::instruction::Reg;
use crate::symbol::SymbolTable;

const COMMENT_DELIMITER: char = ';';
const LABEL_DELIMITER: char = ':';

/// One source line, split into its structural parts.
///
/// Operand tokens are kept as raw text; the per-mnemonic encoders decide
/// how to interpret them.
#[derive(PartialEq, Eq, Debug)]
pub struct Line<'a> {
    pub label: Option<&'a str>,
    pub mnemonic: Option<&'a str>,
    pub operands: Vec<&'a str>,
    pub comment: Option<&'a str>,
}

/// The text before a `:` did not form a valid label.
#[derive(PartialEq, Eq, Debug)]
pub struct InvalidLabel;

impl<'a> Line<'a> {
    pub fn parse(raw: &'a str) -> Result<Line<'a>, InvalidLabel> {
        let (code, comment) = match raw.split_once(COMMENT_DELIMITER) {
            Some((code, comment)) => (code, Some(comment.trim())),
            None => (raw, None),
        };

        let (label, rest) = match code.find(LABEL_DELIMITER) {
            Some(idx) => {
                let candidate = code[..=idx].trim();
                if !is_valid_label(candidate) {
                    return Err(InvalidLabel);
                }
                (
                    Some(candidate.trim_end_matches(LABEL_DELIMITER)),
                    &code[idx + 1..],
                )
            }
            None => (None, code),
        };

        let rest = rest.trim();
        let mut split = rest.splitn(2, char::is_whitespace);
        let mnemonic = split.next().filter(|m| !m.is_empty());
        let operands = match split.next() {
            Some(tail) => tail.split(',').map(str::trim).collect(),
            None => Vec::new(),
        };

        Ok(Line {
            label,
            mnemonic,
            operands,
            comment,
        })
    }
}

/// Labels are alphanumeric plus `#`, `_` and `~`, may not start with a
/// digit, and must be more than a bare colon.
fn is_valid_label(candidate: &str) -> bool {
    if candidate.len() == 1 && candidate.starts_with(LABEL_DELIMITER) {
        return false;
    }
    if !candidate.ends_with(LABEL_DELIMITER) {
        return false;
    }
    let name = candidate.trim_end_matches(LABEL_DELIMITER);
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '_' | '~'))
    {
        return false;
    }
    !candidate.starts_with(|c: char| c.is_ascii_digit())
}

/// Whether an operand token must or must not be wrapped in `[...]`.
/// Brackets mark the addressing modes that go through memory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BracketExpectation {
    Present,
    NotPresent,
}

fn surrounded_by_brackets(token: &str) -> bool {
    token.starts_with('[') && token.ends_with(']')
}

fn bracket_match(token: &str, expectation: BracketExpectation) -> bool {
    match expectation {
        BracketExpectation::Present => surrounded_by_brackets(token),
        BracketExpectation::NotPresent => !surrounded_by_brackets(token),
    }
}

/// Numeric literal in one of the accepted forms, tried in order:
/// decimal (optional trailing `d`, sign allowed), binary (trailing `b`),
/// hex (`0x` or `$` prefix, or `h` suffix on a non-letter start).
pub fn parse_number(token: &str) -> Option<u8> {
    parse_decimal(token)
        .or_else(|| parse_binary(token))
        .or_else(|| parse_hex(token))
}

fn parse_decimal(token: &str) -> Option<u8> {
    let digits = token.trim_end_matches('d');
    // A negative literal becomes its two's-complement byte
    if let Ok(signed) = digits.parse::<i8>() {
        if signed < 0 {
            return Some(signed as u8);
        }
    }
    digits.parse::<u8>().ok()
}

fn parse_binary(token: &str) -> Option<u8> {
    u8::from_str_radix(token.trim_end_matches('b'), 2).ok()
}

fn parse_hex(token: &str) -> Option<u8> {
    if let Some(digits) = token.strip_prefix("0x") {
        return u8::from_str_radix(digits, 16).ok();
    }
    if let Some(digits) = token.strip_prefix('$') {
        return u8::from_str_radix(digits, 16).ok();
    }
    if let Some(digits) = token.strip_suffix('h') {
        // A leading letter would make the token an identifier
        if token.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        return u8::from_str_radix(digits, 16).ok();
    }
    None
}

/// String literal wrapped in matching `"..."` or `'...'` quotes.
/// No escape processing is performed.
pub fn parse_string_literal(token: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}

lazy_static! {
    static ref REGISTER: Regex = Regex::new(r"^\[?R[0-9A-F]\]?$").unwrap();
}

/// Register token `R0`-`RF`, checked against the caller's bracket
/// expectation.
pub fn parse_register(token: &str, expectation: BracketExpectation) -> Option<Reg> {
    if !REGISTER.is_match(token) || !bracket_match(token, expectation) {
        return None;
    }
    let name = token.trim_matches(['[', ']']);
    let index = u8::from_str_radix(&name[1..2], 16).ok()?;
    Some(Reg::new(index))
}

/// An address operand: either a concrete byte or a label reference that
/// was not yet defined at the point of use.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AddressToken {
    Value(u8),
    Pending(String),
}

/// Address token: a numeric literal, or a label reference resolved
/// against the symbol table if already defined and deferred otherwise.
/// Register tokens are not addresses.
pub fn parse_address(
    token: &str,
    expectation: BracketExpectation,
    symbols: &SymbolTable,
) -> Option<AddressToken> {
    if !bracket_match(token, expectation) {
        return None;
    }
    let inner = token.trim_matches(['[', ']']);

    if let Some(value) = parse_number(inner) {
        return Some(AddressToken::Value(value));
    }
    if REGISTER.is_match(inner) {
        return None;
    }
    Some(match symbols.get(inner) {
        Some(offset) => AddressToken::Value(offset),
        None => AddressToken::Pending(inner.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_full_form() {
        let line = Line::parse("loop: addi R1, R2, R3 ; accumulate").unwrap();
        assert_eq!(line.label, Some("loop"));
        assert_eq!(line.mnemonic, Some("addi"));
        assert_eq!(line.operands, vec!["R1", "R2", "R3"]);
        assert_eq!(line.comment, Some("accumulate"));
    }

    #[test]
    fn line_blank_and_comment_only() {
        let line = Line::parse("").unwrap();
        assert_eq!(line.mnemonic, None);
        assert_eq!(line.label, None);

        let line = Line::parse("   ; nothing here").unwrap();
        assert_eq!(line.mnemonic, None);
        assert_eq!(line.comment, Some("nothing here"));
    }

    #[test]
    fn line_label_only() {
        let line = Line::parse("start:").unwrap();
        assert_eq!(line.label, Some("start"));
        assert_eq!(line.mnemonic, None);
    }

    #[test]
    fn line_comment_hides_colon() {
        let line = Line::parse("halt ; label: not really").unwrap();
        assert_eq!(line.label, None);
        assert_eq!(line.mnemonic, Some("halt"));
    }

    #[test]
    fn line_rejects_bad_labels() {
        assert_eq!(Line::parse(":"), Err(InvalidLabel));
        assert_eq!(Line::parse("9lives: halt"), Err(InvalidLabel));
        assert_eq!(Line::parse("has space: halt"), Err(InvalidLabel));
        assert_eq!(Line::parse("bad-char: halt"), Err(InvalidLabel));
    }

    #[test]
    fn line_accepts_odd_label_characters() {
        let line = Line::parse("x#_~2: halt").unwrap();
        assert_eq!(line.label, Some("x#_~2"));
    }

    #[test]
    fn number_decimal() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("200"), Some(200));
        assert_eq!(parse_number("25d"), Some(25));
        assert_eq!(parse_number("-1"), Some(0xFF));
        assert_eq!(parse_number("-128"), Some(0x80));
        assert_eq!(parse_number("+5"), Some(5));
        assert_eq!(parse_number("256"), None);
        assert_eq!(parse_number("-129"), None);
    }

    #[test]
    fn number_binary() {
        assert_eq!(parse_number("1010b"), Some(10));
        assert_eq!(parse_number("11111111b"), Some(255));
        assert_eq!(parse_number("100000000b"), None);
    }

    #[test]
    fn number_hex() {
        assert_eq!(parse_number("0x2A"), Some(0x2A));
        assert_eq!(parse_number("$2a"), Some(0x2A));
        assert_eq!(parse_number("2Ah"), Some(0x2A));
        // An h-suffixed token starting with a letter is an identifier
        assert_eq!(parse_number("FFh"), None);
        assert_eq!(parse_number("0xFF"), Some(0xFF));
        assert_eq!(parse_number("0x100"), None);
    }

    #[test]
    fn number_rejects_identifiers() {
        assert_eq!(parse_number("loop"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("R1"), None);
    }

    #[test]
    fn string_literals() {
        assert_eq!(parse_string_literal("\"hello\""), Some("hello"));
        assert_eq!(parse_string_literal("'a'"), Some("a"));
        assert_eq!(parse_string_literal("\"\""), Some(""));
        assert_eq!(parse_string_literal("\"mismatch'"), None);
        assert_eq!(parse_string_literal("bare"), None);
        assert_eq!(parse_string_literal("\""), None);
    }

    #[test]
    fn register_every_index() {
        for (index, name) in "0123456789ABCDEF".chars().enumerate() {
            let token = format!("R{name}");
            let reg = parse_register(&token, BracketExpectation::NotPresent).unwrap();
            assert_eq!(reg.index(), index as u8);
        }
    }

    #[test]
    fn register_rejects_non_registers() {
        assert_eq!(parse_register("r3", BracketExpectation::NotPresent), None);
        assert_eq!(parse_register("RG", BracketExpectation::NotPresent), None);
        assert_eq!(parse_register("R10", BracketExpectation::NotPresent), None);
        assert_eq!(parse_register("X1", BracketExpectation::NotPresent), None);
    }

    #[test]
    fn register_bracket_expectation() {
        assert!(parse_register("[R3]", BracketExpectation::Present).is_some());
        assert_eq!(parse_register("R3", BracketExpectation::Present), None);
        assert!(parse_register("R3", BracketExpectation::NotPresent).is_some());
        assert_eq!(parse_register("[R3]", BracketExpectation::NotPresent), None);
    }

    #[test]
    fn address_numeric_and_label() {
        let mut symbols = SymbolTable::new();
        symbols.define("loop", 0x04);

        assert_eq!(
            parse_address("0x10", BracketExpectation::NotPresent, &symbols),
            Some(AddressToken::Value(0x10))
        );
        assert_eq!(
            parse_address("loop", BracketExpectation::NotPresent, &symbols),
            Some(AddressToken::Value(0x04))
        );
        assert_eq!(
            parse_address("done", BracketExpectation::NotPresent, &symbols),
            Some(AddressToken::Pending("done".into()))
        );
    }

    #[test]
    fn address_rejects_registers() {
        let symbols = SymbolTable::new();
        assert_eq!(
            parse_address("R2", BracketExpectation::NotPresent, &symbols),
            None
        );
        assert_eq!(
            parse_address("[R2]", BracketExpectation::Present, &symbols),
            None
        );
    }

    #[test]
    fn address_bracket_expectation() {
        let symbols = SymbolTable::new();
        assert_eq!(
            parse_address("[0x10]", BracketExpectation::Present, &symbols),
            Some(AddressToken::Value(0x10))
        );
        assert_eq!(
            parse_address("[0x10]", BracketExpectation::NotPresent, &symbols),
            None
        );
        assert_eq!(
            parse_address("0x10", BracketExpectation::Present, &symbols),
            None
        );
    }
}
