extern crate regvm_lib;
use regvm_lib::*;
use regvm_lib::assembler::lexer::*;

macro_rules! test_assemble {
    { $($src:expr => [$($word:expr),* $(,)?]),+ $(,)? } => {
        $({
            let program = Assembler::assemble($src).expect($src);
            let words: Vec<u16> = program.iter().map(|ins| ins.0).collect();
            let expected: Vec<u16> = vec![$($word),*];
            assert_eq!(words, expected, "{}", $src);
        });+
    };
}

macro_rules! test_rejects {
    { $($src:expr),+ $(,)? } => {
        $({
            assert!(Assembler::assemble($src).is_none(), "should reject {:?}", $src);
        });+
    };
}

fn run(src: &str) -> (Machine<Vec<u8>>, Result<RunSummary, VmError>) {
    let program = Assembler::assemble(src).expect("program should assemble");
    let mut machine = Machine::with_output(&MachineConfig::default(), program, Vec::<u8>::new()).unwrap();
    let result = machine.run(Some(10_000));
    (machine, result)
}

#[test]
fn lexer_tests() {
    let kinds: Vec<TokenKind> = Lexer::new("loop: LDV a, 0x1F ; comment\n  OUT A 0b101")
        .map(|tok| tok.unwrap().kind)
        .collect();
    assert_eq!(kinds, vec![
        TokenKind::Ident("loop".to_string()),
        TokenKind::Colon,
        TokenKind::Ident("LDV".to_string()),
        TokenKind::Ident("a".to_string()),
        TokenKind::Comma,
        TokenKind::Number(31),
        TokenKind::Newline,
        TokenKind::Ident("OUT".to_string()),
        TokenKind::Ident("A".to_string()),
        TokenKind::Number(5),
    ]);

    let toks: Vec<_> = Lexer::new("HLT\n  RET").collect();
    let ret = toks[2].as_ref().unwrap();
    assert_eq!(ret.start, (2, 3));
    assert_eq!(ret.kind.as_ident().map(|s| s.as_str()), Some("RET"));

    assert!(Lexer::new("12ab").next().unwrap().is_err());
    assert!(Lexer::new("0x").next().unwrap().is_err());
    assert!(Lexer::new("$").next().unwrap().is_err());
}

#[test]
fn encoding_tests() {
    test_assemble! {
        "HLT" => [12],
        "RET" => [1],
        "CAL 2" => [2 << 6],
        "MOV B C" => [2 | 1 << 4 | 2 << 6],
        "LDV D 1023" => [0xFFF3],
        "ldr a 0x10" => [4 | 0x10 << 6],
        "LDM C 0b11" => [5 | 2 << 4 | 3 << 6],
        "ATH A B ADD RD" => [6 | 1 << 6 | 0b100 << 8],
        "ATH C D DIV RS" => [6 | 2 << 4 | 3 << 6 | 3 << 8],
        "SFT B LEFT 3" => [7 | 1 << 6 | 3 << 8],
        "SFT B RIGHT 255" => [7 | 1 << 4 | 1 << 6 | 255 << 8],
        "PSH D" => [8 | 3 << 6],
        "POP C" => [9 | 2 << 4],
        "JLT B 7" => [10 | 1 << 4 | 7 << 6],
        "OUT A HEX" => [11 | 2 << 8],
        "OUT B 3" => [11 | 1 << 6 | 3 << 8],
        "  ; only a comment\n\nHLT ; trailing\n" => [12],
    }
}

#[test]
fn label_tests() {
    test_assemble! {
        "start: LDV A 1\n JLT B end\n CAL start\nend: HLT" => [
            3 | 1 << 6,
            10 | 1 << 4 | 3 << 6,
            0,
            12,
        ],
        // labels on their own line point at the next instruction
        "CAL fn\nHLT\nfn:\n  RET" => [2 << 6, 12, 1],
        "a: b: HLT\nCAL b" => [12, 0],
    }
}

#[test]
fn rejection_tests() {
    test_rejects! {
        "NOP",
        "LDV E 1",
        "LDV A 1024",
        "SFT A LEFT 256",
        "OUT A 256",
        "ATH A B MOD RD",
        "ATH A B ADD",
        "SFT A UP 1",
        "MOV A",
        "HLT A",
        "CAL nowhere",
        "x: HLT\nx: HLT",
        "LDV A 12z",
        "LDV A 1 @",
    }

    // labels past the high10 range, including ones far enough out to wrap a u16
    let just_past = "HLT\n".repeat(1024) + "far: HLT\nCAL far";
    let wrapped = "HLT\n".repeat(65536) + "far: HLT\nCAL far";
    test_rejects! {
        &just_past,
        &wrapped,
    }
    assert!(Assembler::assemble(&("HLT\n".repeat(1023) + "edge: HLT\nCAL edge")).is_some());
}

#[test]
fn disassembly_reassembles() {
    let src = "LDV A 5\nLDV B 3\nATH A B ADD RD\nOUT A DEC\nSFT C RIGHT 2\nPSH A\nPOP D\nJLT D 0\nCAL 8\nRET\nHLT";
    let program = Assembler::assemble(src).unwrap();
    let text: Vec<String> = program.iter().map(|ins| ins.to_string()).collect();
    assert_eq!(Assembler::assemble(&text.join("\n")), Some(program));
}

#[test]
fn raw_loader_tests() {
    let program = load_raw("0x0033 0073 ; comment\n # another\nc").unwrap();
    assert_eq!(program, vec![Instruction(0x33), Instruction(0x73), Instruction(0xC)]);
    assert!(load_raw("0x10000").is_none());
    assert!(load_raw("zz").is_none());
}

#[test]
fn add_and_print_program() {
    let (machine, result) = run("
        LDV A 5
        LDV B 3
        ATH A B ADD RD
        OUT A DEC
        HLT
    ");
    assert!(result.unwrap().halted);
    assert_eq!(String::from_utf8(machine.into_output()).unwrap(), "8");
}

#[test]
fn countdown_program() {
    // prints 5 4 3 2 1 separated by spaces
    let (machine, result) = run("
            LDV C 5
            LDV D 1
            LDV B 32
        loop:
            OUT C DEC
            OUT B CHR
            ATH D C SUB RS      ; C = C - D
            LDV A 0
            JLT C loop          ; 0 < C
            HLT
    ");
    assert_eq!(result, Ok(RunSummary { steps: 29, halted: true }));
    assert_eq!(String::from_utf8(machine.into_output()).unwrap(), "5 4 3 2 1 ");
}

#[test]
fn memory_and_stack_program() {
    let (machine, result) = run("
        LDV A 0x2A
        LDM A 100
        LDR B 100
        PSH B
        SFT B LEFT 1
        POP C
        OUT B HEX
        OUT C BIN
        HLT
    ");
    assert!(result.is_ok());
    assert_eq!(machine.memory.read(100), Ok(42));
    assert_eq!(String::from_utf8(machine.into_output()).unwrap(), "54101010");
}

#[test]
fn faulting_programs() {
    let (_, result) = run("LDV A 1\nATH B A DIV RS\nHLT");
    assert_eq!(result, Err(VmError::DivisionByZero));

    let (machine, result) = run("RET");
    assert_eq!(result, Err(VmError::StackUnderflow));
    assert_eq!(machine.last_fetched(), Some((0, Instruction(1))));
}
