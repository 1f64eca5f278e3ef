use super::*;

extern crate log;
use log::debug;

use num::traits::{CheckedDiv, PrimInt, WrappingAdd, WrappingMul, WrappingSub};
use std::io::Write;

/// Decode and run a single instruction against `machine`.
///
/// Returns `Ok(true)` only for HLT.  IP advancement is the caller's job,
/// so by the time we get here IP already points at the next word.
/// On error nothing the faulting instruction would have touched is modified.
pub fn execute<W: Write>(instruction: Instruction, machine: &mut Machine<W>) -> Result<bool, VmError> {
    let (opcode, rd, rs, high8, high10) = instruction.split();
    let op = Opcode::from_u8(opcode).ok_or(VmError::UnknownOpcode(opcode))?;
    let (rd, rs) = (Register::from_index(rd), Register::from_index(rs));
    let Machine { registers, memory, stack, out, .. } = machine;

    match op {
        Opcode::CAL => {
            let ip = registers.ip();
            stack.push(registers, ip)?;
            registers.set_ip(high10 as u64);
        }
        Opcode::RET => {
            let ip = stack.pop(registers)?;
            registers.set_ip(ip as u64);
        }

        Opcode::MOV => {
            let value = registers.read(rs);
            registers.write(rd, value as u64);
        }
        Opcode::LDV => registers.write(rd, high10 as u64),
        Opcode::LDR => {
            let value = memory.read(high10)?;
            registers.write(rd, value as u64);
        }
        Opcode::LDM => memory.write(high10, registers.read(rd))?,

        Opcode::ATH => arithmetic(registers, rd, rs, high8)?,
        Opcode::SFT => {
            let value = shift(registers, registers.read(rs), rd as u8 != 0, high8);
            registers.write(rs, value);
        }

        Opcode::PSH => {
            let value = registers.read(rs);
            stack.push(registers, value)?;
        }
        Opcode::POP => {
            let value = stack.pop(registers)?;
            registers.write(rd, value as u64);
        }

        Opcode::JLT => {
            if registers.read(Register::A) < registers.read(rd) {
                registers.set_ip(high10 as u64);
            }
        }

        Opcode::OUT => output(out, registers.read(rs), OutputFormat::from_high8(high8))?,

        Opcode::HLT => return Ok(true),
    }

    Ok(false)
}

/// ATH: operation in the low 2 bits of high8, bit 2 picks rd (set) or rs
/// (clear) as the destination.
fn arithmetic(registers: &mut Registers, rd: Register, rs: Register, high8: u8) -> Result<(), VmError> {
    let kind = ArithmeticKind::from_high8(high8);
    let flags = ArithmeticFlags::from_bits_truncate(high8);
    let dest = if flags.contains(ArithmeticFlags::DESTINATION_RD) { rd } else { rs };

    let (d, s) = (registers.read(rd) as u64, registers.read(rs) as u64);
    let result = match kind {
        ArithmeticKind::ADD => apply(kind, d, s),
        // SUB / MUL / DIV all take rs as the left operand
        _ => apply(kind, s, d),
    };

    match result {
        Some(value) => {
            registers.write(dest, value);
            Ok(())
        }
        None => {
            debug!("{} {} {} faulted", kind.name(), rs.name(), rd.name());
            Err(VmError::DivisionByZero)
        }
    }
}

/// `None` only for a division by zero, everything else wraps.
pub fn apply<T>(kind: ArithmeticKind, lhs: T, rhs: T) -> Option<T>
    where T: PrimInt + CheckedDiv + WrappingAdd + WrappingSub + WrappingMul
{
    match kind {
        ArithmeticKind::ADD => Some(lhs.wrapping_add(&rhs)),
        ArithmeticKind::SUB => Some(lhs.wrapping_sub(&rhs)),
        ArithmeticKind::MUL => Some(lhs.wrapping_mul(&rhs)),
        // unsigned so truncation == floor
        ArithmeticKind::DIV => lhs.checked_div(&rhs),
    }
}

/// Logical shift, any amount >= the register width clears the register.
fn shift(registers: &Registers, value: u32, right: bool, amount: u8) -> u64 {
    if amount as u32 >= registers.width() {
        return 0;
    }
    let value = value as u64;
    if right {
        value >> amount
    } else {
        value << amount
    }
}

fn output<W: Write>(out: &mut W, value: u32, format: OutputFormat) -> Result<(), VmError> {
    out.write_all(format.render(value).as_bytes())?;
    out.flush()?;
    Ok(())
}
