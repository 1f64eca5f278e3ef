pub mod lexer;

use crate::interpreter::*;
use crate::logger::*;
use lexer::*;

extern crate log;
use log::{info, warn};

use std::collections::HashMap;

/// One parsed source line: a mnemonic and whatever followed it.
#[derive(Debug, Clone)]
struct Statement {
    op: Opcode,
    at: (usize, usize),
    operands: Vec<Token>,
}

/*
 * Two pass assembler.
 *
 * Pass one tokenizes, records label addresses (the index of the next
 * instruction) and groups operand tokens per line.  Pass two encodes,
 * which is where operands get range checked and labels resolved, so
 * forward references just work.
 *
 * Errors are logged as they are found, we keep going so that one run
 * reports as much as possible and only then give up.
 */
pub struct Assembler {
    statements: Vec<Statement>,
    labels: HashMap<String, u16>,
    failed: bool,
}

impl Assembler {
    pub fn assemble(text: &str) -> Option<Vec<Instruction>> {
        let mut asm = Assembler { statements: vec![], labels: HashMap::new(), failed: false };
        asm.parse(Lexer::new(text));

        let program: Vec<Instruction> = asm.statements.iter()
            .filter_map(|stmt| asm.encode(stmt))
            .collect();

        if asm.failed || program.len() != asm.statements.len() {
            return None;
        }
        info!("Assembled {} instructions ({} labels)", program.len(), asm.labels.len());
        Some(program)
    }

    fn error(&mut self, at: (usize, usize), msg: &str) {
        log_asm_error(at.0, at.1, msg);
        self.failed = true;
    }

    fn parse(&mut self, lexer: Lexer) {
        let mut line: Vec<Token> = vec![];
        for tok in lexer {
            match tok {
                Ok(Token { kind: TokenKind::Newline, .. }) => {
                    self.parse_line(std::mem::replace(&mut line, vec![]));
                }
                Ok(tok) => line.push(tok),
                Err(err) => self.error((err.line, err.col), &format!("Invalid token '{}'", err.text)),
            }
        }
        self.parse_line(line);
    }

    fn parse_line(&mut self, line: Vec<Token>) {
        let mut it = line.into_iter().peekable();

        // any number of `label:` prefixes
        loop {
            let is_label = {
                let mut ahead = it.clone();
                match (ahead.next(), ahead.next()) {
                    (Some(Token { kind: TokenKind::Ident(_), .. }),
                     Some(Token { kind: TokenKind::Colon, .. })) => true,
                    _ => false,
                }
            };
            if !is_label {
                break;
            }
            if let Some(Token { kind: TokenKind::Ident(name), start, .. }) = it.next() {
                it.next();
                self.define_label(name, start);
            }
        }

        let head = match it.next() {
            Some(head) => head,
            None => return,
        };
        let op = match &head.kind {
            TokenKind::Ident(name) => match MNEMONICS.get(name.to_ascii_uppercase().as_str()) {
                Some(op) => *op,
                None => {
                    self.error(head.start, &format!("Unknown mnemonic '{}'", name));
                    return;
                }
            },
            other => {
                log_expected_token("mnemonic", other);
                self.failed = true;
                return;
            }
        };

        // commas between operands are optional
        let operands = it.filter(|tok| tok.kind != TokenKind::Comma).collect();
        self.statements.push(Statement { op, at: head.start, operands });
    }

    fn define_label(&mut self, name: String, at: (usize, usize)) {
        let addr = self.statements.len();
        if self.labels.contains_key(&name) {
            self.error(at, &format!("Duplicate label '{}'", name));
        } else if addr > HIGH10_MAX as usize {
            self.error(at, &format!("Label '{}' at {} is past the addressable range", name, addr));
        } else {
            self.labels.insert(name, addr as u16);
        }
    }

    fn encode(&self, stmt: &Statement) -> Option<Instruction> {
        let expected = match stmt.op {
            Opcode::RET | Opcode::HLT => 0,
            Opcode::CAL | Opcode::PSH | Opcode::POP => 1,
            Opcode::ATH => 4,
            Opcode::SFT => 3,
            _ => 2,
        };
        if stmt.operands.len() != expected {
            log_asm_error(stmt.at.0, stmt.at.1, &format!("{} takes {} operands, found {}",
                                                         stmt.op.mnemonic(), expected, stmt.operands.len()));
            return None;
        }
        let ops = &stmt.operands;

        Some(match stmt.op {
            Opcode::RET | Opcode::HLT => Instruction::encode(stmt.op, Register::A, Register::A, 0),
            Opcode::CAL => Instruction::encode_high10(stmt.op, Register::A, self.value(&ops[0], HIGH10_MAX)?),
            Opcode::MOV => Instruction::encode(stmt.op, self.register(&ops[0])?, self.register(&ops[1])?, 0),
            Opcode::LDV | Opcode::LDR | Opcode::LDM | Opcode::JLT => {
                Instruction::encode_high10(stmt.op, self.register(&ops[0])?, self.value(&ops[1], HIGH10_MAX)?)
            }
            Opcode::ATH => {
                let kind = match self.keyword(&ops[2], &["ADD", "SUB", "MUL", "DIV"])? {
                    0 => ArithmeticKind::ADD,
                    1 => ArithmeticKind::SUB,
                    2 => ArithmeticKind::MUL,
                    _ => ArithmeticKind::DIV,
                };
                let flags = match self.keyword(&ops[3], &["RS", "RD"])? {
                    0 => ArithmeticFlags::empty(),
                    _ => ArithmeticFlags::DESTINATION_RD,
                };
                Instruction::encode_arith(kind, self.register(&ops[0])?, self.register(&ops[1])?, flags)
            }
            Opcode::SFT => {
                let dir = self.keyword(&ops[1], &["LEFT", "RIGHT"])?;
                let amount = self.value(&ops[2], HIGH8_MAX)? as u8;
                Instruction::encode(stmt.op, Register::from_index(dir), self.register(&ops[0])?, amount)
            }
            Opcode::PSH => Instruction::encode(stmt.op, Register::A, self.register(&ops[0])?, 0),
            Opcode::POP => Instruction::encode(stmt.op, self.register(&ops[0])?, Register::A, 0),
            Opcode::OUT => {
                let format = match &ops[1].kind {
                    TokenKind::Number(_) => self.value(&ops[1], HIGH8_MAX)? as u8,
                    _ => self.keyword(&ops[1], &["DEC", "BIN", "HEX", "CHR"])?,
                };
                Instruction::encode(stmt.op, Register::A, self.register(&ops[0])?, format)
            }
        })
    }

    fn register(&self, tok: &Token) -> Option<Register> {
        match &tok.kind {
            TokenKind::Ident(name) => match REGISTER_NAMES.get(name.to_ascii_uppercase().as_str()) {
                Some(reg) => Some(*reg),
                None => {
                    log_asm_error(tok.start.0, tok.start.1, &format!("Unknown register '{}'", name));
                    None
                }
            },
            other => {
                log_expected_token("register", other);
                None
            }
        }
    }

    /// A number or a label, checked against `max`
    fn value(&self, tok: &Token, max: u16) -> Option<u16> {
        let value = match &tok.kind {
            TokenKind::Number(n) => *n,
            TokenKind::Ident(name) => match self.labels.get(name) {
                Some(addr) => *addr as u32,
                None => {
                    log_asm_error(tok.start.0, tok.start.1, &format!("Unknown label '{}'", name));
                    return None;
                }
            },
            other => {
                log_expected_token("number or label", other);
                return None;
            }
        };
        if value > max as u32 {
            log_asm_error(tok.start.0, tok.start.1, &format!("{} doesn't fit, max is {}", value, max));
            return None;
        }
        Some(value as u16)
    }

    /// Index of the matching keyword in `options`
    fn keyword(&self, tok: &Token, options: &[&str]) -> Option<u8> {
        if let TokenKind::Ident(name) = &tok.kind {
            let upper = name.to_ascii_uppercase();
            if let Some(idx) = options.iter().position(|opt| *opt == upper) {
                return Some(idx as u8);
            }
        }
        warn!("Was expecting one of {:?} found {:?}", options, tok.kind);
        None
    }
}

/// Load a program given as whitespace separated hex words (`0x` optional).
pub fn load_raw(text: &str) -> Option<Vec<Instruction>> {
    let mut program = vec![];
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split(|c| c == ';' || c == '#').next().unwrap_or("");
        for word in line.split_whitespace() {
            let digits = word.trim_start_matches("0x").trim_start_matches("0X");
            match u16::from_str_radix(digits, 16) {
                Ok(word) => program.push(Instruction(word)),
                Err(_) => {
                    log_asm_error(line_no + 1, 0, &format!("Invalid instruction word '{}'", word));
                    return None;
                }
            }
        }
    }
    Some(program)
}
