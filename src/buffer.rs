use miette::Result;

use crate::error;
use crate::instruction::Instruction;
use crate::span::Span;
use crate::symbol::SymbolTable;
use crate::syntax::AddressToken;

const BUFFER_SIZE: usize = 0x100;

/// One staged byte: concrete, or a label reference to be resolved once
/// the whole source has been seen.
#[derive(Clone, PartialEq, Eq, Debug)]
enum ByteCell {
    Value(u8),
    Pending { label: String, span: Span },
}

/// Fixed 256-byte staging area with a movable write cursor.
///
/// Writes land at the cursor and advance it; `org` relocates it. The
/// high-water mark tracks the furthest point the cursor has reached and
/// bounds the final instruction sequence.
pub struct InstructionBuffer {
    bytes: Vec<ByteCell>,
    origin: u8,
    count: usize,
}

impl InstructionBuffer {
    pub fn new() -> Self {
        InstructionBuffer {
            bytes: vec![ByteCell::Value(0x00); BUFFER_SIZE],
            origin: 0,
            count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.bytes.fill(ByteCell::Value(0x00));
        self.origin = 0;
        self.count = 0;
    }

    /// Current write cursor; labels defined now denote this offset.
    pub fn origin(&self) -> u8 {
        self.origin
    }

    /// Relocate the write cursor. Moving past the end of the staged
    /// bytes extends the final image with zero padding.
    pub fn set_origin(&mut self, address: u8) {
        self.origin = address;
        self.count = self.count.max(address as usize);
    }

    pub fn push_value(&mut self, byte: u8) {
        self.push_cell(ByteCell::Value(byte));
    }

    pub fn push_address(&mut self, address: AddressToken, span: Span) {
        let cell = match address {
            AddressToken::Value(byte) => ByteCell::Value(byte),
            AddressToken::Pending(label) => ByteCell::Pending { label, span },
        };
        self.push_cell(cell);
    }

    fn push_cell(&mut self, cell: ByteCell) {
        self.bytes[self.origin as usize] = cell;
        self.count = self.count.max(self.origin as usize + 1);
        self.origin = self.origin.wrapping_add(1);
    }

    /// Read the staged bytes out in 2-byte strides, resolving deferred
    /// label references against the completed symbol table.
    pub fn finalize(&self, symbols: &SymbolTable, src: &str) -> Result<Vec<Instruction>> {
        let mut instructions = Vec::with_capacity(self.count.div_ceil(2));
        for offset in (0..self.count).step_by(2) {
            let byte1 = self.resolve(offset, symbols, src)?;
            let byte2 = self.resolve(offset + 1, symbols, src)?;
            instructions.push(Instruction::new(byte1, byte2));
        }
        Ok(instructions)
    }

    fn resolve(&self, offset: usize, symbols: &SymbolTable, src: &str) -> Result<u8> {
        if offset >= self.count {
            // Odd byte count: the image is padded out to a full instruction
            return Ok(0x00);
        }
        match &self.bytes[offset] {
            ByteCell::Value(byte) => Ok(*byte),
            ByteCell::Pending { label, span } => symbols
                .get(label)
                .ok_or_else(|| error::undefined_symbol(*span, src, label)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Idx;

    fn dummy_span() -> Span {
        Span::new(Idx(0), 1)
    }

    #[test]
    fn bytes_pair_into_instructions() {
        let mut buffer = InstructionBuffer::new();
        for byte in [0x20, 0x05, 0xC0, 0x00] {
            buffer.push_value(byte);
        }
        let instructions = buffer.finalize(&SymbolTable::new(), "").unwrap();
        assert_eq!(
            instructions,
            vec![Instruction::new(0x20, 0x05), Instruction::new(0xC0, 0x00)]
        );
    }

    #[test]
    fn odd_byte_count_pads_with_zero() {
        let mut buffer = InstructionBuffer::new();
        buffer.push_value(0x01);
        buffer.push_value(0x02);
        buffer.push_value(0x03);
        let instructions = buffer.finalize(&SymbolTable::new(), "").unwrap();
        assert_eq!(
            instructions,
            vec![Instruction::new(0x01, 0x02), Instruction::new(0x03, 0x00)]
        );
    }

    #[test]
    fn pending_reference_resolves_at_finalize() {
        let mut buffer = InstructionBuffer::new();
        let mut symbols = SymbolTable::new();

        buffer.push_value(0xB0);
        buffer.push_address(AddressToken::Pending("target".into()), dummy_span());
        // Defined only after the reference was staged
        symbols.define("target", 0x0A);

        let instructions = buffer.finalize(&symbols, "").unwrap();
        assert_eq!(instructions[0], Instruction::new(0xB0, 0x0A));
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        let mut buffer = InstructionBuffer::new();
        buffer.push_value(0xB0);
        buffer.push_address(AddressToken::Pending("nowhere".into()), dummy_span());
        assert!(buffer.finalize(&SymbolTable::new(), "jmp nowhere").is_err());
    }

    #[test]
    fn origin_moves_cursor_and_high_water() {
        let mut buffer = InstructionBuffer::new();
        buffer.push_value(0xAA);
        buffer.set_origin(0x06);
        buffer.push_value(0xBB);

        let instructions = buffer.finalize(&SymbolTable::new(), "").unwrap();
        assert_eq!(instructions.len(), 4);
        assert_eq!(instructions[0], Instruction::new(0xAA, 0x00));
        assert_eq!(instructions[3], Instruction::new(0xBB, 0x00));
    }

    #[test]
    fn origin_past_end_pads_image() {
        let mut buffer = InstructionBuffer::new();
        buffer.push_value(0x01);
        buffer.set_origin(0x08);
        let instructions = buffer.finalize(&SymbolTable::new(), "").unwrap();
        assert_eq!(instructions.len(), 4);
    }

    #[test]
    fn reset_clears_between_runs() {
        let mut buffer = InstructionBuffer::new();
        buffer.push_value(0x01);
        buffer.push_value(0x02);
        buffer.reset();
        assert_eq!(buffer.origin(), 0);
        assert!(buffer.finalize(&SymbolTable::new(), "").unwrap().is_empty());
    }

    #[test]
    fn cursor_wraps_at_top_of_memory() {
        let mut buffer = InstructionBuffer::new();
        buffer.set_origin(0xFF);
        buffer.push_value(0xAA);
        assert_eq!(buffer.origin(), 0x00);
    }
}
