// Assembling
mod assembler;
pub use assembler::Assembler;
mod buffer;
mod symbol;
mod syntax;

// Encoding
mod instruction;
pub use instruction::{decode_image, Instruction, Opcode, Reg};
mod float;

// Running
mod machine;
pub use machine::{Machine, MachineObserver, MachineState, MEMORY_SIZE, REGISTER_COUNT};
mod debugger;
pub use debugger::{Debugger, DebuggerOptions};

mod error;
mod span;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 2;
