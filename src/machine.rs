use crate::float;
use crate::instruction::{Instruction, Opcode};

/// Memory is byte-addressed by a single byte, so it wraps modulo 256.
pub const MEMORY_SIZE: usize = 0x100;
pub const REGISTER_COUNT: usize = 0x10;

/// Callbacks fired after each observable mutation commits. A host can
/// mirror machine state live by registering one of these.
pub trait MachineObserver {
    fn pc_changed(&mut self, _pc: u8) {}
    fn ir_changed(&mut self, _ir: Instruction) {}
    fn register_changed(&mut self, _index: u8, _value: u8) {}
    fn memory_changed(&mut self, _address: u8, _value: u8) {}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MachineState {
    /// Between instructions or halted.
    Idle,
    /// Driving a step sequence.
    Running,
}

/// The simulated machine: 16 byte registers, 256 bytes of memory, a
/// program counter and an instruction register.
///
/// Registers and memory persist across assemble/execute cycles until
/// explicitly cleared. Addressing always wraps; execution never fails.
pub struct Machine {
    reg: [u8; REGISTER_COUNT],
    mem: [u8; MEMORY_SIZE],
    pc: u8,
    ir: Instruction,
    state: MachineState,
    observers: Vec<Box<dyn MachineObserver>>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            reg: [0; REGISTER_COUNT],
            mem: [0; MEMORY_SIZE],
            pc: 0,
            ir: Instruction::default(),
            state: MachineState::Idle,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn ir(&self) -> Instruction {
        self.ir
    }

    pub fn reg(&self, index: u8) -> u8 {
        self.reg[(index & 0xF) as usize]
    }

    pub fn mem(&self, address: u8) -> u8 {
        self.mem[address as usize]
    }

    pub fn subscribe(&mut self, observer: Box<dyn MachineObserver>) {
        self.observers.push(observer);
    }

    pub fn set_reg(&mut self, index: u8, value: u8) {
        let index = index & 0xF;
        self.reg[index as usize] = value;
        for observer in self.observers.iter_mut() {
            observer.register_changed(index, value);
        }
    }

    pub fn set_mem(&mut self, address: u8, value: u8) {
        self.mem[address as usize] = value;
        for observer in self.observers.iter_mut() {
            observer.memory_changed(address, value);
        }
    }

    fn set_pc(&mut self, value: u8) {
        self.pc = value;
        for observer in self.observers.iter_mut() {
            observer.pc_changed(value);
        }
    }

    fn set_ir(&mut self, value: Instruction) {
        self.ir = value;
        for observer in self.observers.iter_mut() {
            observer.ir_changed(value);
        }
    }

    pub fn reset_pc(&mut self) {
        self.set_pc(0);
    }

    pub fn clear_registers(&mut self) {
        for index in 0..REGISTER_COUNT as u8 {
            self.set_reg(index, 0x00);
        }
    }

    pub fn clear_memory(&mut self) {
        for address in 0..=u8::MAX {
            self.set_mem(address, 0x00);
        }
    }

    /// Copy an assembled instruction sequence into memory starting at
    /// address 0. This is the sole hand-off from the assembler.
    pub fn load_image(&mut self, instructions: &[Instruction]) {
        let mut address = 0u8;
        for instruction in instructions {
            let [byte1, byte2] = instruction.bytes();
            self.set_mem(address, byte1);
            self.set_mem(address.wrapping_add(1), byte2);
            address = address.wrapping_add(2);
        }
    }

    /// Halt a run loop from outside; takes effect at the next
    /// instruction boundary.
    pub fn stop(&mut self) {
        self.state = MachineState::Idle;
    }

    /// One fetch-decode-execute cycle. The instruction register and
    /// program counter are committed before the instruction's own side
    /// effects, so jumps overwrite the post-fetch counter.
    pub fn step(&mut self) {
        let instruction = Instruction::new(self.mem(self.pc), self.mem(self.pc.wrapping_add(1)));
        self.set_ir(instruction);
        self.set_pc(self.pc.wrapping_add(2));
        self.execute(instruction);
    }

    /// Step until halted.
    pub fn run(&mut self) {
        self.run_while(|| true);
    }

    /// Step until halted or until the caller declines to continue.
    /// Cancellation lands between instructions, never mid-instruction.
    pub fn run_while(&mut self, mut keep_going: impl FnMut() -> bool) {
        self.state = MachineState::Running;
        while self.state == MachineState::Running {
            self.step();
            if !keep_going() {
                self.state = MachineState::Idle;
            }
        }
    }

    fn execute(&mut self, instruction: Instruction) {
        let Some(opcode) = instruction.opcode() else {
            // The 0x0 nibble has no encoding; stop rather than wander
            // through zeroed memory.
            self.state = MachineState::Idle;
            return;
        };
        match opcode {
            Opcode::DirectLoad => {
                let value = self.mem(instruction.address());
                self.set_reg(instruction.field1(), value);
            }
            Opcode::ImmediateLoad => {
                self.set_reg(instruction.field1(), instruction.address());
            }
            Opcode::DirectStore => {
                let value = self.reg(instruction.field1());
                self.set_mem(instruction.address(), value);
            }
            Opcode::Move => {
                let value = self.reg(instruction.field2());
                self.set_reg(instruction.field3(), value);
            }
            Opcode::IntegerAdd => {
                let sum = self
                    .reg(instruction.field2())
                    .wrapping_add(self.reg(instruction.field3()));
                self.set_reg(instruction.field1(), sum);
            }
            Opcode::FloatingPointAdd => {
                let sum = float::add(
                    self.reg(instruction.field2()),
                    self.reg(instruction.field3()),
                );
                self.set_reg(instruction.field1(), sum);
            }
            Opcode::Or => {
                let value = self.reg(instruction.field2()) | self.reg(instruction.field3());
                self.set_reg(instruction.field1(), value);
            }
            Opcode::And => {
                let value = self.reg(instruction.field2()) & self.reg(instruction.field3());
                self.set_reg(instruction.field1(), value);
            }
            Opcode::Xor => {
                let value = self.reg(instruction.field2()) ^ self.reg(instruction.field3());
                self.set_reg(instruction.field1(), value);
            }
            Opcode::Ror => {
                // rotate_right reduces the count modulo the register width
                let value = self
                    .reg(instruction.field1())
                    .rotate_right(instruction.field3() as u32);
                self.set_reg(instruction.field1(), value);
            }
            Opcode::JumpEqual => {
                if self.reg(instruction.field1()) == self.reg(0x0) {
                    self.set_pc(instruction.address());
                }
            }
            Opcode::JumpLessEqual => {
                if self.reg(instruction.field1()) <= self.reg(0x0) {
                    self.set_pc(instruction.address());
                }
            }
            Opcode::Halt => {
                self.state = MachineState::Idle;
            }
            Opcode::IndirectLoad => {
                let pointer = self.reg(instruction.field3());
                let value = self.mem(pointer);
                self.set_reg(instruction.field2(), value);
            }
            Opcode::IndirectStore => {
                let pointer = self.reg(instruction.field3());
                let value = self.reg(instruction.field2());
                self.set_mem(pointer, value);
            }
        }
    }
}
