use std::error::Error as StdError;
use std::fmt;

use num_traits::FromPrimitive;

use crate::alu::{Alu, AluFunct};
use crate::bits::{Bits, Selector};
use crate::constants::{
    BYTE_WIDTH, NEGATIVE_FLAG_BIT, NIBBLE_WIDTH, RAM_SIZE, SELECTABLE_REGISTER_COUNT,
    ZERO_FLAG_BIT,
};
use crate::enums::{register_index, Opcode, RegisterId};
use crate::memory::{Ram, Register};
use crate::status::{CpuSnapshot, Phase, PhaseObserver};

/// Runtime faults raised while executing a memory image. Well-formed
/// assembler output never triggers these; hand-written images can.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CpuError {
    InvalidOpcode(u8),   // Instruction register held a value past the dispatch table
    InvalidRegister(u8), // Operand named a register code past the register file
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CpuError::InvalidOpcode(value) => {
                write!(f, "opcode {:08b} is not part of the instruction set", value)
            }
            CpuError::InvalidRegister(value) => {
                write!(f, "register code {:04b} selects no register", value)
            }
        }
    }
}

impl StdError for CpuError {}

/// The processor: register bank, ALU, RAM and the five-phase cycle.
///
/// Every instruction is two bytes, opcode then operand. A cycle fetches both
/// through the bus, decodes them into the instruction and address registers,
/// dispatches on the opcode, and increments the program counter twice (once
/// between the fetches, once in the end phase). Instructions that overwrite
/// the program counter themselves suppress the end-phase increment.
pub struct Cpu {
    alu: Alu,
    ram: Ram,
    selectable: [Register; SELECTABLE_REGISTER_COUNT],
    instruction_register: Register,
    address_register: Register,
    program_counter: Register,
    stack_pointer: Register,
    register_selector: Selector,
    current_instruction: Bits,
    current_address: Bits,
    halt: bool,
    not_skip_increment: bool,
    cycle_counter: u64,
    observers: Vec<PhaseObserver>,
}

fn byte_register() -> Register {
    Register::new(BYTE_WIDTH)
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            alu: Alu::new(),
            ram: Ram::new(RAM_SIZE),
            selectable: [
                byte_register(),
                byte_register(),
                byte_register(),
                byte_register(),
                byte_register(),
                byte_register(),
            ],
            instruction_register: byte_register(),
            address_register: byte_register(),
            program_counter: byte_register(),
            stack_pointer: byte_register(),
            register_selector: Selector::new(NIBBLE_WIDTH),
            current_instruction: Bits::new(BYTE_WIDTH),
            current_address: Bits::new(BYTE_WIDTH),
            halt: false,
            not_skip_increment: true,
            cycle_counter: 0,
            observers: Vec::new(),
        }
    }

    pub fn alu(&self) -> &Alu {
        &self.alu
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    pub fn register(&self, id: RegisterId) -> &Register {
        &self.selectable[register_index(id)]
    }

    pub fn instruction_register(&self) -> &Register {
        &self.instruction_register
    }

    pub fn address_register(&self) -> &Register {
        &self.address_register
    }

    pub fn program_counter(&self) -> &Register {
        &self.program_counter
    }

    pub fn stack_pointer(&self) -> &Register {
        &self.stack_pointer
    }

    pub fn halt(&self) -> bool {
        self.halt
    }

    pub fn cycle_counter(&self) -> u64 {
        self.cycle_counter
    }

    /// Registers a phase observer. Registration is append-only; observers run
    /// in registration order after each reported phase.
    pub fn on_phase<F>(&mut self, observer: F)
    where
        F: Fn(Phase, &CpuSnapshot) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            ax: self.register(RegisterId::AX).peek(),
            bx: self.register(RegisterId::BX).peek(),
            cx: self.register(RegisterId::CX).peek(),
            dx: self.register(RegisterId::DX).peek(),
            accumulator: self.register(RegisterId::ACC).peek(),
            status: self.register(RegisterId::SR).peek(),
            instruction_register: self.instruction_register.peek(),
            address_register: self.address_register.peek(),
            program_counter: self.program_counter.peek(),
            stack_pointer: self.stack_pointer.peek(),
            halt: self.halt,
            cycle_counter: self.cycle_counter,
        }
    }

    /// Runs one full fetch/decode/execute cycle.
    pub fn cycle(&mut self) -> Result<(), CpuError> {
        self.fetch_phase_one();
        self.emit(Phase::FetchOne);
        self.increment_program_counter();
        self.fetch_phase_two();
        self.emit(Phase::FetchTwo);
        self.decode_phase();
        self.emit(Phase::Decode);
        self.execute_phase()?;
        self.emit(Phase::Execute);
        self.end_phase();
        self.emit(Phase::End);
        self.cycle_counter += 1;
        Ok(())
    }

    /// Loads the byte addressed by the program counter into the instruction
    /// register.
    pub fn fetch_phase_one(&mut self) {
        self.instruction_register.set_write_enable(true);
        self.program_counter.set_read_enable(true);
        self.ram.set_read_enable(true);

        let counter = self.program_counter.read();
        self.ram.set_address(counter);
        let byte = self.ram.bus();
        self.instruction_register.write(byte);

        self.flush();
    }

    /// Loads the byte addressed by the program counter into the address
    /// register.
    pub fn fetch_phase_two(&mut self) {
        self.address_register.set_write_enable(true);
        self.program_counter.set_read_enable(true);
        self.ram.set_read_enable(true);

        let counter = self.program_counter.read();
        self.ram.set_address(counter);
        let byte = self.ram.bus();
        self.address_register.write(byte);

        self.flush();
    }

    /// Advances the program counter through the ALU, gated by the
    /// skip-increment flag a taken branch sets.
    pub fn increment_program_counter(&mut self) {
        self.program_counter.set_read_enable(true);
        let counter = self.program_counter.read();
        self.program_counter.set_read_enable(false);

        self.alu.set_a(counter);
        self.alu.set_funct(AluFunct::INC);

        self.program_counter.set_write_enable(self.not_skip_increment);
        self.program_counter.write(self.alu.output());
        self.not_skip_increment = true;

        self.flush();
    }

    /// Snapshots the instruction and address registers for the execute phase.
    pub fn decode_phase(&mut self) {
        self.instruction_register.set_read_enable(true);
        self.address_register.set_read_enable(true);
        self.current_instruction = self.instruction_register.read();
        self.current_address = self.address_register.read();
    }

    /// Dispatches the decoded instruction.
    pub fn execute_phase(&mut self) -> Result<(), CpuError> {
        let result = self.dispatch(self.current_instruction, self.current_address);
        self.flush();
        result
    }

    pub fn end_phase(&mut self) {
        self.increment_program_counter();
    }

    /// Clears every enable signal and zeroes the ALU inputs.
    pub fn flush(&mut self) {
        self.ram.clear_enables();
        self.program_counter.clear_enables();
        self.stack_pointer.clear_enables();
        self.instruction_register.clear_enables();
        self.address_register.clear_enables();
        for register in self.selectable.iter_mut() {
            register.clear_enables();
        }

        self.alu.set_a(Bits::new(BYTE_WIDTH));
        self.alu.set_b(Bits::new(BYTE_WIDTH));
    }

    fn emit(&self, phase: Phase) {
        if self.observers.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        for observer in &self.observers {
            observer(phase, &snapshot);
        }
    }

    fn dispatch(&mut self, instruction: Bits, operand: Bits) -> Result<(), CpuError> {
        let opcode = Opcode::from_u32(instruction.to_int())
            .ok_or_else(|| CpuError::InvalidOpcode(instruction.to_int() as u8))?;

        match opcode {
            Opcode::HLT => {
                self.halt = true;
                Ok(())
            }
            Opcode::LDA => {
                self.load(RegisterId::AX, operand);
                Ok(())
            }
            Opcode::LDB => {
                self.load(RegisterId::BX, operand);
                Ok(())
            }
            Opcode::LDC => {
                self.load(RegisterId::CX, operand);
                Ok(())
            }
            Opcode::LDD => {
                self.load(RegisterId::DX, operand);
                Ok(())
            }
            Opcode::STA => {
                self.store(RegisterId::AX, operand);
                Ok(())
            }
            Opcode::STB => {
                self.store(RegisterId::BX, operand);
                Ok(())
            }
            Opcode::STC => {
                self.store(RegisterId::CX, operand);
                Ok(())
            }
            Opcode::STD => {
                self.store(RegisterId::DX, operand);
                Ok(())
            }
            Opcode::ADD => self.add_sub(AluFunct::ADD, operand),
            Opcode::SUB => self.add_sub(AluFunct::SUB, operand),
            Opcode::INC => self.inc_dec(AluFunct::INC, operand),
            Opcode::DEC => self.inc_dec(AluFunct::DEC, operand),
            Opcode::CMP => self.compare(operand),
            Opcode::JIL => {
                self.branch(NEGATIVE_FLAG_BIT, true, operand);
                Ok(())
            }
            Opcode::JIG => {
                self.branch(NEGATIVE_FLAG_BIT, false, operand);
                Ok(())
            }
            Opcode::JIE => {
                self.branch(ZERO_FLAG_BIT, true, operand);
                Ok(())
            }
            Opcode::JNE => {
                self.branch(ZERO_FLAG_BIT, false, operand);
                Ok(())
            }
            Opcode::PUSH => self.push(operand),
            Opcode::POP => self.pop(operand),
            Opcode::CALL => {
                self.call(operand);
                Ok(())
            }
            Opcode::RET => {
                self.ret();
                Ok(())
            }
        }
    }

    /// Selects a register from an operand nibble through the register
    /// selector.
    fn selected_register(&mut self, code: Bits) -> Result<&mut Register, CpuError> {
        self.register_selector.set_selection(code);
        self.register_selector
            .select_mut(&mut self.selectable)
            .ok_or_else(|| CpuError::InvalidRegister(code.to_int() as u8))
    }

    fn load(&mut self, id: RegisterId, ram_address: Bits) {
        self.ram.set_address(ram_address);
        self.ram.set_read_enable(true);
        let byte = self.ram.bus();

        let register = &mut self.selectable[register_index(id)];
        register.set_write_enable(true);
        register.write(byte);
    }

    fn store(&mut self, id: RegisterId, ram_address: Bits) {
        self.ram.set_address(ram_address);
        self.ram.set_write_enable(true);

        let register = &mut self.selectable[register_index(id)];
        register.set_read_enable(true);
        let byte = register.read();

        self.ram.set_bus(byte);
    }

    fn add_sub(&mut self, funct: AluFunct, operands: Bits) -> Result<(), CpuError> {
        let (second, first) = operands.halves();

        let register = self.selected_register(first)?;
        register.set_read_enable(true);
        let a = register.read();

        let register = self.selected_register(second)?;
        register.set_read_enable(true);
        let b = register.read();

        self.alu.set_a(a);
        self.alu.set_b(b);
        self.alu.set_funct(funct);

        self.update_accumulator_register();
        Ok(())
    }

    fn inc_dec(&mut self, funct: AluFunct, operand: Bits) -> Result<(), CpuError> {
        let (_, code) = operand.halves();

        let register = self.selected_register(code)?;
        register.set_read_enable(true);
        let value = register.read();
        register.set_read_enable(false);

        self.alu.set_a(value);
        self.alu.set_funct(funct);
        let output = self.alu.output();

        let register = self.selected_register(code)?;
        register.set_write_enable(true);
        register.write(output);

        self.update_status_register();
        Ok(())
    }

    fn compare(&mut self, operands: Bits) -> Result<(), CpuError> {
        let (second, first) = operands.halves();

        let register = self.selected_register(first)?;
        register.set_read_enable(true);
        let a = register.read();

        let register = self.selected_register(second)?;
        register.set_read_enable(true);
        let b = register.read();

        self.alu.set_a(a);
        self.alu.set_b(b);
        self.alu.set_funct(AluFunct::SUB);

        self.update_status_register();
        Ok(())
    }

    /// Writes the target into the program counter gated on a status flag, and
    /// suppresses the end-phase increment when the branch is taken.
    fn branch(&mut self, flag_bit: u32, wanted: bool, target: Bits) {
        let status = &mut self.selectable[register_index(RegisterId::SR)];
        status.set_read_enable(true);
        let flag = status.read().bit(flag_bit);

        let taken = flag == wanted;
        self.not_skip_increment = !taken;
        self.program_counter.set_write_enable(taken);
        self.program_counter.write(target);
    }

    fn push(&mut self, operand: Bits) -> Result<(), CpuError> {
        let (_, code) = operand.halves();

        let register = self.selected_register(code)?;
        register.set_read_enable(true);
        let value = register.read();

        self.stack_pointer.set_write_enable(true);
        self.stack_pointer.write(value);
        Ok(())
    }

    fn pop(&mut self, operand: Bits) -> Result<(), CpuError> {
        self.stack_pointer.set_read_enable(true);
        let value = self.stack_pointer.read();

        let (_, code) = operand.halves();
        let register = self.selected_register(code)?;
        register.set_write_enable(true);
        register.write(value);
        Ok(())
    }

    /// The stack pointer is a single cell, so nested calls overwrite the
    /// stored return address.
    fn call(&mut self, target: Bits) {
        self.program_counter.set_read_enable(true);
        self.stack_pointer.set_write_enable(true);
        let return_address = self.program_counter.read();
        self.stack_pointer.write(return_address);
        self.stack_pointer.set_write_enable(false);
        self.program_counter.set_read_enable(false);

        self.program_counter.set_write_enable(true);
        self.program_counter.write(target);
        self.not_skip_increment = false;
    }

    fn ret(&mut self) {
        self.stack_pointer.set_read_enable(true);
        self.program_counter.set_write_enable(true);
        let return_address = self.stack_pointer.read();
        self.program_counter.write(return_address);
    }

    fn update_accumulator_register(&mut self) {
        let output = self.alu.output();
        let accumulator = &mut self.selectable[register_index(RegisterId::ACC)];
        accumulator.set_write_enable(true);
        accumulator.write(output);
        accumulator.set_write_enable(false);

        self.update_status_register();
    }

    fn update_status_register(&mut self) {
        let carry = (self.alu.carry() != 0) as u32;
        let zero = self.alu.zero() as u32;
        let negative = self.alu.negative() as u32;
        let value = Bits::from_int(negative << 2 | zero << 1 | carry, BYTE_WIDTH);

        let status = &mut self.selectable[register_index(RegisterId::SR)];
        status.set_write_enable(true);
        status.write(value);
        status.set_write_enable(false);
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}
