extern crate log;
use log::{error, warn};

use crate::assembler::lexer::*;
use crate::interpreter::*;

pub fn log_expected_token(msg: &str, found: &TokenKind) {
    warn!("Was expecting token of type {} found {:?}", msg, found);
}

pub fn log_asm_error(line: usize, col: usize, msg: &str) {
    warn!("Error {}:{}  {}", line, col, msg);
}

/// `ip` is the address the faulting word was fetched from
pub fn log_vm_fault(ip: u32, instruction: Instruction, err: &VmError) {
    error!("[Error] {} at {:04} ({}). Exiting...", err, ip, instruction);
}
