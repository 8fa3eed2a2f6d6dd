use std::fmt::{self, Display};

use miette::Result;

use crate::error;

/// Reference to one of the 16 general-purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Reg(u8);

impl Reg {
    /// Register indices are nibbles; anything above 0xF is masked off.
    pub fn new(index: u8) -> Self {
        Reg(index & 0xF)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{:X}", self.0)
    }
}

/// Operation encoded in the high nibble of an instruction's first byte.
///
/// The nibble 0x0 is not a valid encoding and has no variant here.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Load a register from a memory cell.
    DirectLoad = 0x1,
    /// Load a register with a literal byte.
    ImmediateLoad = 0x2,
    /// Store a register into a memory cell.
    DirectStore = 0x3,
    /// Copy one register into another.
    Move = 0x4,
    /// Unsigned 8-bit addition with wraparound.
    IntegerAdd = 0x5,
    /// Addition in the byte-sized floating-point format.
    FloatingPointAdd = 0x6,
    Or = 0x7,
    And = 0x8,
    Xor = 0x9,
    /// Rotate a register right by the encoded count.
    Ror = 0xA,
    /// Branch if the operand register equals R0.
    JumpEqual = 0xB,
    Halt = 0xC,
    /// Load a register from the cell a second register points at.
    IndirectLoad = 0xD,
    /// Store a register into the cell a second register points at.
    IndirectStore = 0xE,
    /// Branch if the operand register is at most R0.
    JumpLessEqual = 0xF,
}

impl Opcode {
    pub fn from_nibble(nibble: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match nibble {
            0x1 => DirectLoad,
            0x2 => ImmediateLoad,
            0x3 => DirectStore,
            0x4 => Move,
            0x5 => IntegerAdd,
            0x6 => FloatingPointAdd,
            0x7 => Or,
            0x8 => And,
            0x9 => Xor,
            0xA => Ror,
            0xB => JumpEqual,
            0xC => Halt,
            0xD => IndirectLoad,
            0xE => IndirectStore,
            0xF => JumpLessEqual,
            _ => return None,
        })
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

/// Pack two nibbles into a byte, high nibble first.
pub fn pack_nibbles(hi: u8, lo: u8) -> u8 {
    (hi & 0xF) << 4 | (lo & 0xF)
}

/// An immutable 2-byte machine instruction.
///
/// The first byte holds the opcode nibble and the first operand field;
/// the second byte holds either an address or two more operand fields.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Instruction {
    byte1: u8,
    byte2: u8,
}

impl Instruction {
    pub fn new(byte1: u8, byte2: u8) -> Self {
        Instruction { byte1, byte2 }
    }

    pub fn bytes(self) -> [u8; 2] {
        [self.byte1, self.byte2]
    }

    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_nibble(self.byte1 >> 4)
    }

    /// First operand field - low nibble of the first byte.
    pub fn field1(self) -> u8 {
        self.byte1 & 0xF
    }

    /// Second operand field - high nibble of the second byte.
    pub fn field2(self) -> u8 {
        self.byte2 >> 4
    }

    /// Third operand field - low nibble of the second byte.
    pub fn field3(self) -> u8 {
        self.byte2 & 0xF
    }

    /// The whole second byte, for address and immediate operands.
    pub fn address(self) -> u8 {
        self.byte2
    }
}

/// Decode a raw byte image into an instruction sequence.
pub fn decode_image(bytes: &[u8]) -> Result<Vec<Instruction>> {
    if bytes.len() % 2 != 0 {
        return Err(error::unaligned_image(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| Instruction::new(pair[0], pair[1]))
        .collect())
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.byte1, self.byte2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_nibble_roundtrip() {
        for nibble in 0x1..=0xF {
            let opcode = Opcode::from_nibble(nibble).unwrap();
            assert_eq!(opcode.nibble(), nibble);
        }
        assert_eq!(Opcode::from_nibble(0x0), None);
    }

    #[test]
    fn field_extraction() {
        let instr = Instruction::new(0x5A, 0xBC);
        assert_eq!(instr.opcode(), Some(Opcode::IntegerAdd));
        assert_eq!(instr.field1(), 0xA);
        assert_eq!(instr.field2(), 0xB);
        assert_eq!(instr.field3(), 0xC);
        assert_eq!(instr.address(), 0xBC);
    }

    #[test]
    fn packing() {
        assert_eq!(pack_nibbles(0xB, 0x4), 0xB4);
        assert_eq!(pack_nibbles(0x1F, 0x2E), 0xFE);
    }

    #[test]
    fn display_uppercase_hex() {
        assert_eq!(Instruction::new(0xB0, 0x04).to_string(), "B004");
        assert_eq!(Instruction::new(0x0, 0x0).to_string(), "0000");
    }

    #[test]
    fn image_decoding() {
        let image = decode_image(&[0x21, 0x05, 0xC0, 0x00]).unwrap();
        assert_eq!(
            image,
            vec![Instruction::new(0x21, 0x05), Instruction::new(0xC0, 0x00)]
        );
        assert!(decode_image(&[0x21]).is_err());
    }

    #[test]
    fn reg_masks_to_nibble() {
        assert_eq!(Reg::new(0x1F).index(), 0xF);
        assert_eq!(Reg::new(0x3).to_string(), "R3");
    }
}
