use super::*;

extern crate log;
use log::{info, trace};

use std::io::Write;

pub const DEFAULT_REGISTER_WIDTH: u32 = 16;
pub const DEFAULT_MEMORY_SIZE: usize = HIGH10_MAX as usize + 1;
pub const DEFAULT_STACK_SIZE: usize = 256;

/// Sizes the loader picks before building a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    /// Bits per register (and per memory / stack cell), 1..=32
    pub register_width: u32,
    pub memory_size: usize,
    pub stack_size: usize,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            register_width: DEFAULT_REGISTER_WIDTH,
            memory_size: DEFAULT_MEMORY_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), VmError> {
        if self.register_width == 0 || self.register_width > 32 {
            return Err(VmError::InvalidConfig(format!(
                "register width must be in 1..=32, got {}", self.register_width)));
        }
        if self.stack_size == 0 {
            return Err(VmError::InvalidConfig("stack size must be non zero".to_string()));
        }
        // SP has to be able to count every slot
        if self.stack_size as u64 > 1u64 << self.register_width {
            return Err(VmError::InvalidConfig(format!(
                "stack size {} can't be addressed by a {} bit SP",
                self.stack_size, self.register_width)));
        }
        Ok(())
    }
}

/// The register file: A-D plus IP and SP.
///
/// Every write is reduced modulo 2^width so a register never holds
/// anything a `width` bit cell couldn't.
#[derive(Debug, Clone, PartialEq)]
pub struct Registers {
    general: [u32; 4],
    ip: u32,
    sp: u32,
    width: u32,
}

impl Registers {
    /// `width` is clamped to 1..=32
    pub fn new(width: u32) -> Registers {
        Registers { general: [0; 4], ip: 0, sp: 0, width: width.max(1).min(32) }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn mask(&self) -> u64 {
        (1u64 << self.width) - 1
    }

    pub fn wrap(&self, value: u64) -> u32 {
        (value & self.mask()) as u32
    }

    pub fn read(&self, reg: Register) -> u32 {
        self.general[reg as usize]
    }

    pub fn write(&mut self, reg: Register, value: u64) {
        self.general[reg as usize] = self.wrap(value);
    }

    pub fn ip(&self) -> u32 {
        self.ip
    }

    pub fn set_ip(&mut self, value: u64) {
        self.ip = self.wrap(value);
    }

    pub fn sp(&self) -> u32 {
        self.sp
    }

    pub fn set_sp(&mut self, value: u64) {
        self.sp = self.wrap(value);
    }
}

/// Flat memory addressed by high10.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    cells: Vec<u32>,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        Memory { cells: vec![0; size] }
    }

    pub fn read(&self, addr: u16) -> Result<u32, VmError> {
        self.cells.get(addr as usize).copied()
            .ok_or(VmError::MemoryOutOfBounds(addr))
    }

    /// The caller is expected to have wrapped `value` to the register width.
    pub fn write(&mut self, addr: u16, value: u32) -> Result<(), VmError> {
        match self.cells.get_mut(addr as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(VmError::MemoryOutOfBounds(addr)),
        }
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }
}

/// Fixed capacity stack, the top pointer is the SP register.
///
/// Capacity is `size` but the last slot is never written: a push when
/// SP == size - 1 overflows.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    slots: Vec<u32>,
}

impl Stack {
    pub fn new(size: usize) -> Stack {
        Stack { slots: vec![0; size] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, registers: &mut Registers, value: u32) -> Result<(), VmError> {
        let sp = registers.sp() as usize;
        if sp + 1 >= self.slots.len() {
            return Err(VmError::StackOverflow);
        }
        self.slots[sp] = value;
        registers.set_sp(sp as u64 + 1);
        Ok(())
    }

    pub fn pop(&mut self, registers: &mut Registers) -> Result<u32, VmError> {
        let sp = registers.sp() as usize;
        if sp == 0 {
            return Err(VmError::StackUnderflow);
        }
        registers.set_sp(sp as u64 - 1);
        Ok(self.slots[sp - 1])
    }

    /// Live entries, bottom first
    pub fn live<'a>(&'a self, registers: &Registers) -> &'a [u32] {
        &self.slots[..registers.sp() as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub halted: bool,
}

/// One isolated machine: registers, memory, stack, the program and
/// somewhere for OUT to write to.
pub struct Machine<W: Write = std::io::Stdout> {
    pub registers: Registers,
    pub memory: Memory,
    pub stack: Stack,
    pub(crate) out: W,
    program: Vec<Instruction>,
    last_fetched: Option<(u32, Instruction)>,
}

impl Machine<std::io::Stdout> {
    pub fn new(config: &MachineConfig, program: Vec<Instruction>) -> Result<Machine, VmError> {
        Machine::with_output(config, program, std::io::stdout())
    }
}

impl<W: Write> Machine<W> {
    pub fn with_output(config: &MachineConfig, program: Vec<Instruction>, out: W) -> Result<Machine<W>, VmError> {
        config.validate()?;
        Ok(Machine {
            registers: Registers::new(config.register_width),
            memory: Memory::new(config.memory_size),
            stack: Stack::new(config.stack_size),
            out,
            program,
            last_fetched: None,
        })
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Address and word of the most recently fetched instruction
    pub fn last_fetched(&self) -> Option<(u32, Instruction)> {
        self.last_fetched
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn past_end(&self) -> bool {
        self.registers.ip() as usize >= self.program.len()
    }

    /// Fetch the instruction at IP, advance IP and execute it.
    /// Running off the end of the program counts as a halt.
    pub fn step(&mut self) -> Result<bool, VmError> {
        let ip = self.registers.ip();
        let instruction = match self.program.get(ip as usize) {
            Some(instruction) => *instruction,
            None => {
                info!("IP {} is past the end of the program, halting", ip);
                return Ok(true);
            }
        };
        trace!("{:04} {:#06x} {}", ip, instruction.0, instruction);
        self.last_fetched = Some((ip, instruction));
        self.registers.set_ip(ip as u64 + 1);
        execute(instruction, self)
    }

    /// Step until HLT, a fault or `max_steps` instructions have run.
    /// Only fetched instructions count as steps.
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<RunSummary, VmError> {
        let mut steps = 0;
        loop {
            if self.past_end() {
                info!("IP {} is past the end of the program, halting", self.registers.ip());
                return Ok(RunSummary { steps, halted: true });
            }
            if let Some(max) = max_steps {
                if steps >= max {
                    info!("Step budget of {} exhausted", max);
                    return Ok(RunSummary { steps, halted: false });
                }
            }
            let halted = self.step()?;
            steps += 1;
            if halted {
                return Ok(RunSummary { steps, halted: true });
            }
        }
    }
}
