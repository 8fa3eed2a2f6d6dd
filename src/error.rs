use miette::{miette, LabeledSpan, Report, Severity};

use crate::span::Span;

// Assembly-time diagnostics. The machine itself never raises errors;
// everything range-shaped is caught here or absorbed by wraparound.

pub fn invalid_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::label",
        help = "labels are letters, digits, `#`, `_` or `~`, may not start with a digit, and end with `:`",
        labels = vec![LabeledSpan::at(span, "invalid label")],
        "Encountered a malformed label.",
    )
    .with_source_code(src.to_string())
}

pub fn unknown_mnemonic(span: Span, src: &str, mnemonic: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::mnemonic",
        help = "check the list of available mnemonics in the documentation.",
        labels = vec![LabeledSpan::at(span, "unrecognized mnemonic")],
        "Unrecognized mnemonic `{mnemonic}`.",
    )
    .with_source_code(src.to_string())
}

/// Wrong arity, wrong addressing-mode bracketing, or an unparsable
/// literal. `expected` is the human-readable expectation.
pub fn bad_operands(span: Span, src: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operands",
        help = format!("expected {expected}"),
        labels = vec![LabeledSpan::at(span, "bad operands")],
        "Operands do not match any form of this instruction.",
    )
    .with_source_code(src.to_string())
}

pub fn rotate_out_of_range(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::range",
        help = "rotation counts are encoded in a nibble, so 15 is the largest",
        labels = vec![LabeledSpan::at(span, "out-of-range count")],
        "Number cannot be larger than 15.",
    )
    .with_source_code(src.to_string())
}

pub fn undefined_symbol(span: Span, src: &str, label: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::undefined",
        help = "every referenced label must be defined somewhere in the source.",
        labels = vec![LabeledSpan::at(span, "referenced here")],
        "Undefined symbol `{label}`.",
    )
    .with_source_code(src.to_string())
}

pub fn unaligned_image(len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "image::align",
        help = "machine images hold 2-byte instructions, so their length is always even.",
        "Image of {len} bytes is not aligned to instruction boundaries.",
    )
}
