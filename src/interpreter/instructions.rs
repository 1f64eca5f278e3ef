use super::*;

pub const OPCODE_MASK: u16 = 0b1111;
pub const RD_SHIFT: u16 = 4;
pub const RS_SHIFT: u16 = 6;
pub const REG_MASK: u16 = 0b11;
pub const HIGH8_SHIFT: u16 = 8;
pub const HIGH10_SHIFT: u16 = 6;

/// Largest value that fits in high10 (jump targets, addresses, literals)
pub const HIGH10_MAX: u16 = (1 << 10) - 1;
/// Largest value that fits in high8
pub const HIGH8_MAX: u16 = (1 << 8) - 1;

/// A single raw instruction word.
///
/// Splitting never fails, any u16 yields a set of fields even if the
/// opcode turns out to be unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u16);

impl Instruction {
    pub fn opcode_bits(self) -> u8 {
        (self.0 & OPCODE_MASK) as u8
    }

    pub fn rd(self) -> u8 {
        ((self.0 >> RD_SHIFT) & REG_MASK) as u8
    }

    pub fn rs(self) -> u8 {
        ((self.0 >> RS_SHIFT) & REG_MASK) as u8
    }

    pub fn high8(self) -> u8 {
        (self.0 >> HIGH8_SHIFT) as u8
    }

    pub fn high10(self) -> u16 {
        self.0 >> HIGH10_SHIFT
    }

    /// (opcode, rd, rs, high8, high10)
    pub fn split(self) -> (u8, u8, u8, u8, u16) {
        (self.opcode_bits(), self.rd(), self.rs(), self.high8(), self.high10())
    }

    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode_bits())
    }

    pub fn rd_reg(self) -> Register {
        Register::from_index(self.rd())
    }

    pub fn rs_reg(self) -> Register {
        Register::from_index(self.rs())
    }

    /*
     * Encoders, the inverse of the accessors above.
     * Out of range operands are masked; range checking is the assembler's job.
     */

    pub fn encode(op: Opcode, rd: Register, rs: Register, high8: u8) -> Instruction {
        Instruction(
            op as u16
                | ((rd as u16) << RD_SHIFT)
                | ((rs as u16) << RS_SHIFT)
                | ((high8 as u16) << HIGH8_SHIFT),
        )
    }

    pub fn encode_high10(op: Opcode, rd: Register, high10: u16) -> Instruction {
        Instruction(
            op as u16
                | ((rd as u16) << RD_SHIFT)
                | ((high10 & HIGH10_MAX) << HIGH10_SHIFT),
        )
    }

    pub fn encode_arith(kind: ArithmeticKind, rd: Register, rs: Register, flags: ArithmeticFlags) -> Instruction {
        Instruction::encode(Opcode::ATH, rd, rs, kind as u8 | flags.bits())
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Instruction {
        Instruction(word)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let op = match self.opcode() {
            Some(op) => op,
            None => return write!(f, "??? {:#06x}", self.0),
        };
        let (rd, rs) = (self.rd_reg().name(), self.rs_reg().name());
        let m = op.mnemonic();
        match op {
            Opcode::RET | Opcode::HLT => write!(f, "{}", m),
            Opcode::CAL => write!(f, "{} {}", m, self.high10()),
            Opcode::MOV => write!(f, "{} {} {}", m, rd, rs),
            Opcode::LDV | Opcode::LDR | Opcode::LDM | Opcode::JLT => {
                write!(f, "{} {} {}", m, rd, self.high10())
            }
            Opcode::ATH => {
                let dest = if ArithmeticFlags::from_bits_truncate(self.high8())
                    .contains(ArithmeticFlags::DESTINATION_RD) { "RD" } else { "RS" };
                write!(f, "{} {} {} {} {}", m, rd, rs,
                       ArithmeticKind::from_high8(self.high8()).name(), dest)
            }
            Opcode::SFT => {
                let dir = if self.rd() == 0 { "LEFT" } else { "RIGHT" };
                write!(f, "{} {} {} {}", m, rs, dir, self.high8())
            }
            Opcode::PSH => write!(f, "{} {}", m, rs),
            Opcode::POP => write!(f, "{} {}", m, rd),
            Opcode::OUT => write!(f, "{} {} {}", m, rs, OutputFormat::from_high8(self.high8()).name()),
        }
    }
}
