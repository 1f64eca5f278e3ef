pub mod instructions;
pub mod machine;
pub mod execute;

pub use instructions::*;
pub use machine::*;
pub use execute::*;

use std::collections::HashMap;

/// == RegVM Instruction Set ==
/// A tiny 16 bit register machine.
/// Important characteristics
/// - Every instruction is exactly one u16 word
/// - 4 general purpose registers (A, B, C, D) + IP and SP
/// - A single bounded stack shared between PSH/POP and CAL/RET
///
/// == Instruction Layout ==
///   15              8 7   6 5   4 3       0
///  +-----------------+-----+-----+---------+
///  |      high8      | rs  | rd  | opcode  |
///  +-----------------+-----+-----+---------+
///  |         high10        |
///  +-----------------------+
/// - high8 is the word shifted right by 8
/// - high10 is the word shifted right by 6 (so it shares its top bits with
///   high8 and its bottom two with rs)
/// Only one of high8 / high10 means anything for a given opcode.
///
/// == Registers ==
/// All registers (including IP and SP) are `register_width` bits wide,
/// every write is reduced modulo 2^width.  Memory cells are the same width.

/// Represents all the instruction opcodes
///
/// The discriminant is the value stored in the low 4 bits of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Push IP, IP = high10
    CAL = 0,
    /// IP = pop
    RET = 1,
    /// $rd = $rs
    MOV = 2,
    /// $rd = high10
    LDV = 3,
    /// $rd = mem[high10]
    LDR = 4,
    /// mem[high10] = $rd
    LDM = 5,
    /// Arithmetic, see `ArithmeticKind`
    ATH = 6,
    /// Shift $rs by high8, direction given by rd
    SFT = 7,
    /// Push $rs
    PSH = 8,
    /// $rd = pop
    POP = 9,
    /// Branch to high10 if $A < $rd
    JLT = 10,
    /// Write $rs to the output, high8 selects the format
    OUT = 11,
    /// Stop the machine
    HLT = 12,
}

/// The opcodes in table order, indexable by the raw opcode value.
pub const OPCODE_TABLE: [Opcode; 13] = [
    Opcode::CAL,
    Opcode::RET,
    Opcode::MOV,
    Opcode::LDV,
    Opcode::LDR,
    Opcode::LDM,
    Opcode::ATH,
    Opcode::SFT,
    Opcode::PSH,
    Opcode::POP,
    Opcode::JLT,
    Opcode::OUT,
    Opcode::HLT,
];

impl Opcode {
    pub fn from_u8(raw: u8) -> Option<Opcode> {
        OPCODE_TABLE.get(raw as usize).copied()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::CAL => "CAL",
            Opcode::RET => "RET",
            Opcode::MOV => "MOV",
            Opcode::LDV => "LDV",
            Opcode::LDR => "LDR",
            Opcode::LDM => "LDM",
            Opcode::ATH => "ATH",
            Opcode::SFT => "SFT",
            Opcode::PSH => "PSH",
            Opcode::POP => "POP",
            Opcode::JLT => "JLT",
            Opcode::OUT => "OUT",
            Opcode::HLT => "HLT",
        }
    }
}

/// General purpose registers addressable from an instruction.
///
/// IP and SP live in `Registers` but have no index; nothing in the
/// instruction format can name them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl Register {
    /// Total over the 2 bit index fields, anything wider is masked.
    pub fn from_index(index: u8) -> Register {
        match index & 0b11 {
            0 => Register::A,
            1 => Register::B,
            2 => Register::C,
            _ => Register::D,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
        }
    }
}

/// The low two bits of high8 for an ATH instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticKind {
    /// $rd + $rs
    ADD = 0,
    /// $rs - $rd (note the order)
    SUB = 1,
    /// $rs * $rd
    MUL = 2,
    /// floor($rs / $rd)
    DIV = 3,
}

impl ArithmeticKind {
    pub fn from_high8(high8: u8) -> ArithmeticKind {
        match high8 & 0b11 {
            0 => ArithmeticKind::ADD,
            1 => ArithmeticKind::SUB,
            2 => ArithmeticKind::MUL,
            _ => ArithmeticKind::DIV,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithmeticKind::ADD => "ADD",
            ArithmeticKind::SUB => "SUB",
            ArithmeticKind::MUL => "MUL",
            ArithmeticKind::DIV => "DIV",
        }
    }
}

bitflags! {
    /// Modifier bits of an ATH high8 above the operation selector.
    pub struct ArithmeticFlags: u8 {
        /// Store into rd instead of rs
        const DESTINATION_RD = 0b0000_0100;
    }
}

/// How OUT renders a value, selected by high8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Decimal = 0,
    Binary = 1,
    Hex = 2,
    Char = 3,
}

impl OutputFormat {
    /// Unassigned selectors fall back to decimal.
    pub fn from_high8(high8: u8) -> OutputFormat {
        match high8 {
            1 => OutputFormat::Binary,
            2 => OutputFormat::Hex,
            3 => OutputFormat::Char,
            _ => OutputFormat::Decimal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Decimal => "DEC",
            OutputFormat::Binary => "BIN",
            OutputFormat::Hex => "HEX",
            OutputFormat::Char => "CHR",
        }
    }

    pub fn render(self, value: u32) -> String {
        match self {
            OutputFormat::Decimal => value.to_string(),
            OutputFormat::Binary => format!("{:b}", value),
            OutputFormat::Hex => format!("{:x}", value),
            OutputFormat::Char => std::char::from_u32(value)
                .unwrap_or(std::char::REPLACEMENT_CHARACTER)
                .to_string(),
        }
    }
}

lazy_static! {
    /// Mnemonic text => opcode, used by the assembler
    pub static ref MNEMONICS: HashMap<&'static str, Opcode> = OPCODE_TABLE
        .iter()
        .map(|op| (op.mnemonic(), *op))
        .collect();

    /// Register name => register, used by the assembler
    pub static ref REGISTER_NAMES: HashMap<&'static str, Register> = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
    ].iter().map(|reg| (reg.name(), *reg)).collect();
}

/// Everything that can stop the machine abnormally.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum VmError {
    StackOverflow,
    StackUnderflow,
    UnknownOpcode(u8),
    DivisionByZero,
    MemoryOutOfBounds(u16),
    Output(std::io::ErrorKind),
    InvalidConfig(String),
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            VmError::StackOverflow => write!(f, "Stack overflow"),
            VmError::StackUnderflow => write!(f, "Stack underflow"),
            VmError::UnknownOpcode(op) => write!(f, "Unknown opcode {}", op),
            VmError::DivisionByZero => write!(f, "Division by zero"),
            VmError::MemoryOutOfBounds(addr) => write!(f, "Memory address {} out of bounds", addr),
            VmError::Output(kind) => write!(f, "Output failed: {:?}", kind),
            VmError::InvalidConfig(msg) => write!(f, "Invalid machine config: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> VmError {
        VmError::Output(err.kind())
    }
}
