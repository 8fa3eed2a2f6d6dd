use miette::Result;

use crate::buffer::InstructionBuffer;
use crate::error;
use crate::instruction::{pack_nibbles, Instruction, Opcode};
use crate::span::{Idx, Span};
use crate::symbol::SymbolTable;
use crate::syntax::{self, BracketExpectation::*, Line};

/// Translates assembly source into the 2-byte instruction sequence.
///
/// The symbol table and byte buffer live for exactly one `assemble`
/// call; re-running never sees stale labels.
pub struct Assembler {
    symbols: SymbolTable,
    buffer: InstructionBuffer,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            symbols: SymbolTable::new(),
            buffer: InstructionBuffer::new(),
        }
    }

    /// Assemble newline-delimited source, one statement per line.
    /// Stops at the first error; undefined symbols surface after the
    /// full pass, during finalization.
    pub fn assemble(&mut self, src: &str) -> Result<Vec<Instruction>> {
        self.symbols.clear();
        self.buffer.reset();

        let mut offs = 0usize;
        for raw in src.split('\n') {
            let text = raw.strip_suffix('\r').unwrap_or(raw);
            let span = Span::new(Idx(offs as u32), text.len() as u16);
            self.statement(text, span, src)?;
            offs += raw.len() + 1;
        }

        self.buffer.finalize(&self.symbols, src)
    }

    fn statement(&mut self, text: &str, span: Span, src: &str) -> Result<()> {
        let line = Line::parse(text).map_err(|_| error::invalid_label(span, src))?;

        if let Some(label) = line.label {
            self.symbols.define(label, self.buffer.origin());
        }

        let Some(mnemonic) = line.mnemonic else {
            return Ok(());
        };

        match mnemonic.to_lowercase().as_str() {
            "load" => self.load(&line, span, src),
            "store" => self.store(&line, span, src),
            "move" => self.mov(&line, span, src),
            "addi" => self.register_triplet(Opcode::IntegerAdd, &line, span, src),
            "addf" => self.register_triplet(Opcode::FloatingPointAdd, &line, span, src),
            "and" => self.register_triplet(Opcode::And, &line, span, src),
            "or" => self.register_triplet(Opcode::Or, &line, span, src),
            "xor" => self.register_triplet(Opcode::Xor, &line, span, src),
            "ror" => self.ror(&line, span, src),
            "jmp" => self.jmp(&line, span, src),
            "jmpeq" => self.jump_on_compare(Opcode::JumpEqual, &['='], &line, span, src),
            "jmple" => self.jump_on_compare(Opcode::JumpLessEqual, &['<', '='], &line, span, src),
            "db" => self.data_byte(&line, span, src),
            "org" => self.org(&line, span, src),
            "halt" => self.halt(&line, span, src),
            _ => Err(error::unknown_mnemonic(span, src, mnemonic)),
        }
    }

    fn emit(&mut self, opcode: Opcode, operand: u8) {
        self.buffer
            .push_value(pack_nibbles(opcode.nibble(), operand));
    }

    fn load(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        const EXPECTED: &str = "a register and an address, `[address]`, or `[register]`";
        if let [dest, source] = line.operands[..] {
            if let Some(reg) = syntax::parse_register(dest, NotPresent) {
                if let Some(address) = syntax::parse_address(source, NotPresent, &self.symbols) {
                    self.emit(Opcode::ImmediateLoad, reg.index());
                    self.buffer.push_address(address, span);
                    return Ok(());
                }
                if let Some(address) = syntax::parse_address(source, Present, &self.symbols) {
                    self.emit(Opcode::DirectLoad, reg.index());
                    self.buffer.push_address(address, span);
                    return Ok(());
                }
                if let Some(pointer) = syntax::parse_register(source, Present) {
                    self.emit(Opcode::IndirectLoad, 0x0);
                    self.buffer
                        .push_value(pack_nibbles(reg.index(), pointer.index()));
                    return Ok(());
                }
            }
        }
        Err(error::bad_operands(span, src, EXPECTED))
    }

    fn store(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        const EXPECTED: &str = "a register and an `[address]` or `[register]`";
        if let [source, dest] = line.operands[..] {
            if let Some(reg) = syntax::parse_register(source, NotPresent) {
                if let Some(address) = syntax::parse_address(dest, Present, &self.symbols) {
                    self.emit(Opcode::DirectStore, reg.index());
                    self.buffer.push_address(address, span);
                    return Ok(());
                }
                if let Some(pointer) = syntax::parse_register(dest, Present) {
                    self.emit(Opcode::IndirectStore, 0x0);
                    self.buffer
                        .push_value(pack_nibbles(reg.index(), pointer.index()));
                    return Ok(());
                }
            }
        }
        Err(error::bad_operands(span, src, EXPECTED))
    }

    fn mov(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        if let [from, to] = line.operands[..] {
            if let (Some(from), Some(to)) = (
                syntax::parse_register(from, NotPresent),
                syntax::parse_register(to, NotPresent),
            ) {
                self.emit(Opcode::Move, 0x0);
                self.buffer
                    .push_value(pack_nibbles(from.index(), to.index()));
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "two registers"))
    }

    fn register_triplet(
        &mut self,
        opcode: Opcode,
        line: &Line,
        span: Span,
        src: &str,
    ) -> Result<()> {
        if let [dest, lhs, rhs] = line.operands[..] {
            if let (Some(dest), Some(lhs), Some(rhs)) = (
                syntax::parse_register(dest, NotPresent),
                syntax::parse_register(lhs, NotPresent),
                syntax::parse_register(rhs, NotPresent),
            ) {
                self.emit(opcode, dest.index());
                self.buffer.push_value(pack_nibbles(lhs.index(), rhs.index()));
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "three registers"))
    }

    fn ror(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        if let [reg, count] = line.operands[..] {
            if let (Some(reg), Some(count)) = (
                syntax::parse_register(reg, NotPresent),
                syntax::parse_number(count),
            ) {
                if count >= 16 {
                    return Err(error::rotate_out_of_range(span, src));
                }
                self.emit(Opcode::Ror, reg.index());
                self.buffer.push_value(pack_nibbles(0x0, count));
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "a register and a count"))
    }

    /// Unconditional jump: R0 always equals itself, so this is
    /// jump-equal with the register field left at zero.
    fn jmp(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        if let [target] = line.operands[..] {
            if let Some(address) = syntax::parse_address(target, NotPresent, &self.symbols) {
                self.emit(Opcode::JumpEqual, 0x0);
                self.buffer.push_address(address, span);
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "a single address"))
    }

    /// `jmpeq R1, addr` compares R1 to R0. The register operand may
    /// carry comparison sugar (`R1=R0`, `R1<=R0`); everything from the
    /// first comparison character on is ignored.
    fn jump_on_compare(
        &mut self,
        opcode: Opcode,
        sugar: &[char],
        line: &Line,
        span: Span,
        src: &str,
    ) -> Result<()> {
        if let [reg, target] = line.operands[..] {
            let reg = reg.split(|c| sugar.contains(&c)).next().unwrap_or(reg);
            if let (Some(reg), Some(address)) = (
                syntax::parse_register(reg.trim(), NotPresent),
                syntax::parse_address(target, NotPresent, &self.symbols),
            ) {
                self.emit(opcode, reg.index());
                self.buffer.push_address(address, span);
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "a register and an address"))
    }

    fn data_byte(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        const EXPECTED: &str = "a number or string literal";
        if line.operands.is_empty() {
            return Err(error::bad_operands(span, src, EXPECTED));
        }
        for operand in &line.operands {
            if let Some(byte) = syntax::parse_number(operand) {
                self.buffer.push_value(byte);
            } else if let Some(literal) = syntax::parse_string_literal(operand) {
                for c in literal.chars() {
                    self.buffer.push_value(c as u8);
                }
            } else {
                return Err(error::bad_operands(span, src, EXPECTED));
            }
        }
        Ok(())
    }

    fn org(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        if let [address] = line.operands[..] {
            if let Some(address) = syntax::parse_number(address) {
                self.buffer.set_origin(address);
                return Ok(());
            }
        }
        Err(error::bad_operands(span, src, "a single number"))
    }

    fn halt(&mut self, line: &Line, span: Span, src: &str) -> Result<()> {
        if !line.operands.is_empty() {
            return Err(error::bad_operands(span, src, "no operands"));
        }
        self.emit(Opcode::Halt, 0x0);
        self.buffer.push_value(0x00);
        Ok(())
    }
}
