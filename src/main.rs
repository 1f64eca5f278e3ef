use std::fs;

extern crate clap;
use clap::{App, ArgMatches, SubCommand};

extern crate log;
use log::{error, info};
extern crate simple_logger;

extern crate regvm_lib;
use regvm_lib::*;
use regvm_lib::assembler::lexer::Lexer;
use regvm_lib::logger::log_vm_fault;

fn parse_num<T: std::str::FromStr>(matches: &ArgMatches, name: &str, default: T) -> Option<T> {
    match matches.value_of(name) {
        None => Some(default),
        Some(text) => match text.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                error!("--{} expects a number, got '{}'", name, text);
                None
            }
        },
    }
}

fn load_program(matches: &ArgMatches) -> std::io::Result<Option<Vec<Instruction>>> {
    let filename = matches.value_of("INPUT").unwrap_or_default();
    let text = fs::read_to_string(filename)?;
    Ok(if matches.is_present("raw") {
        load_raw(&text)
    } else {
        Assembler::assemble(&text)
    })
}

fn run(matches: &ArgMatches) -> std::io::Result<i32> {
    let defaults = MachineConfig::default();
    let config = match (
        parse_num(matches, "width", defaults.register_width),
        parse_num(matches, "memory", defaults.memory_size),
        parse_num(matches, "stack", defaults.stack_size),
    ) {
        (Some(register_width), Some(memory_size), Some(stack_size)) => {
            MachineConfig { register_width, memory_size, stack_size }
        }
        _ => return Ok(2),
    };
    let max_steps = match matches.value_of("max-steps") {
        None => None,
        Some(_) => match parse_num(matches, "max-steps", 0u64) {
            Some(max) => Some(max),
            None => return Ok(2),
        },
    };

    let program = match load_program(matches)? {
        Some(program) => program,
        None => return Ok(1),
    };

    let mut machine = match Machine::new(&config, program) {
        Ok(machine) => machine,
        Err(err) => {
            error!("{}", err);
            return Ok(2);
        }
    };

    let code = match machine.run(max_steps) {
        Ok(summary) => {
            info!("Ran {} instructions (halted: {})", summary.steps, summary.halted);
            0
        }
        Err(err) => {
            if let Some((ip, instruction)) = machine.last_fetched() {
                log_vm_fault(ip, instruction, &err);
            } else {
                error!("{}", err);
            }
            1
        }
    };

    if matches.is_present("dump") {
        let regs = &machine.registers;
        println!();
        println!("== Machine State ==");
        println!("A={} B={} C={} D={} IP={} SP={}",
                 regs.read(Register::A), regs.read(Register::B),
                 regs.read(Register::C), regs.read(Register::D),
                 regs.ip(), regs.sp());
        println!("Stack ({} slots): {:?}", machine.stack.capacity(), machine.stack.live(regs));
        println!("Program: {} words, memory: {} cells",
                 machine.program().len(), machine.memory.cells().len());
    }

    Ok(code)
}

fn dev(matches: &ArgMatches) -> std::io::Result<i32> {
    let filename = matches.value_of("INPUT").unwrap_or_default();
    let text = fs::read_to_string(filename)?;

    if matches.is_present("tokens") {
        println!("== Tokenizer Output Started ==");
        for tok in Lexer::new(&text) { println!("{:?}", tok); }
        println!("== Tokenizer Output Finished ==");
    }

    let program = match load_program(matches)? {
        Some(program) => program,
        None => return Ok(1),
    };

    if matches.is_present("words") {
        println!("== Instruction Words Started ==");
        for instruction in program.iter() { println!("{:04x}", instruction.0); }
        println!("== Instruction Words Finished ==");
    }

    if matches.is_present("disasm") {
        println!("== Disassembly Started ==");
        for (addr, instruction) in program.iter().enumerate() {
            println!("{:04}  {:#06x}  {}", addr, instruction.0, instruction);
        }
        println!("== Disassembly Finished ==");
    }

    Ok(0)
}

fn main() -> std::io::Result<()> {
    let matches = App::new("RegVM")
        .version("0.1a")
        .author("Braedon Wooding <braedonww@gmail.com>")
        .about("A small 16 bit register machine")
        .args_from_usage("-v...                  'Sets the level of verbosity (-v info, -vv debug, -vvv trace)'")
        .subcommand(SubCommand::with_name("run")
            .args_from_usage(
                "--raw                 'Input is hex instruction words, not assembly'
                 --width=[BITS]        'Register width in bits'
                 --memory=[CELLS]      'Number of memory cells'
                 --stack=[SLOTS]       'Stack size'
                 --max-steps=[STEPS]   'Stop after this many instructions'
                 --dump                'Print the registers and stack afterwards'
                 <INPUT>               'Sets the input file to use'")
        )
        .subcommand(SubCommand::with_name("dev")
            .args_from_usage(
                "--raw                 'Input is hex instruction words, not assembly'
                 --tokens              'Get the output of the tokenizer'
                 --words               'Print the assembled instruction words'
                 --disasm              'Print the disassembled program'
                 <INPUT>               'Sets the input file to use'")
        )
        .get_matches();

    // the program's own output shares stdout with the logger so stay quiet by default
    let level = match matches.occurrences_of("v") {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    if let Err(err) = simple_logger::init_with_level(level) {
        eprintln!("Couldn't start logger: {}", err);
    }

    let code = match matches.subcommand() {
        ("run", Some(sub_matches)) => run(sub_matches)?,
        ("dev", Some(sub_matches)) => dev(sub_matches)?,
        _ => {
            println!("{}", matches.usage());
            2
        }
    };

    std::process::exit(code);
}
