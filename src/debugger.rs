use std::io::{self, BufRead, IsTerminal, Write};

use colored::Colorize;

use crate::machine::{Machine, MachineState, REGISTER_COUNT};
use crate::syntax;

pub struct DebuggerOptions {
    /// Read commands from this argument instead of stdin.
    pub command: Option<String>,
    /// Produce plain output, suited for blackbox tests.
    pub minimal: bool,
}

/// Interactive driver for the machine control surface.
///
/// Reads one command per line, from stdin or from a `;`/newline
/// separated script passed on the command line.
pub struct Debugger {
    machine: Machine,
    minimal: bool,
    source: CommandSource,
}

enum CommandSource {
    Stdin,
    Argument(ArgumentSource),
}

struct ArgumentSource {
    commands: Vec<String>,
    cursor: usize,
}

impl ArgumentSource {
    fn from(argument: String) -> Self {
        ArgumentSource {
            commands: argument
                .split(['\n', ';'])
                .map(|cmd| cmd.trim().to_string())
                .collect(),
            cursor: 0,
        }
    }

    fn read(&mut self) -> Option<String> {
        let command = self.commands.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(command)
    }
}

impl CommandSource {
    fn from(argument: Option<String>) -> Self {
        match argument {
            Some(argument) => CommandSource::Argument(ArgumentSource::from(argument)),
            None => CommandSource::Stdin,
        }
    }

    fn read(&mut self) -> Option<String> {
        match self {
            Self::Stdin => {
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line).ok()? == 0 {
                    return None;
                }
                Some(line.trim().to_string())
            }
            Self::Argument(argument) => argument.read(),
        }
    }
}

impl Debugger {
    pub fn new(machine: Machine, opts: DebuggerOptions) -> Self {
        Debugger {
            machine,
            minimal: opts.minimal,
            source: CommandSource::from(opts.command),
        }
    }

    pub fn wait_for_command(&mut self) {
        loop {
            self.prompt();
            let Some(line) = self.source.read() else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let command = tokens.next().unwrap_or_default().to_lowercase();
            let args: Vec<&str> = tokens.collect();

            match command.as_str() {
                "s" | "step" => self.step(&args),
                "r" | "run" => self.run(&args),
                "regs" | "registers" => self.print_registers(),
                "mem" | "memory" => self.print_memory(&args),
                "pc" => println!("pc 0x{:02X}", self.machine.pc()),
                "reset" => {
                    self.machine.reset_pc();
                    println!("pc 0x00");
                }
                "clear" => {
                    self.machine.clear_registers();
                    self.machine.clear_memory();
                    self.machine.reset_pc();
                    println!("cleared");
                }
                "h" | "help" => print!("{HELP}"),
                "q" | "quit" | "exit" => break,
                _ => println!("unknown command `{command}`, try `help`"),
            }
        }
    }

    fn prompt(&self) {
        if matches!(self.source, CommandSource::Stdin) && io::stdin().is_terminal() {
            print!("(vole) ");
            let _ = io::stdout().flush();
        }
    }

    fn step(&mut self, args: &[&str]) {
        let count = args
            .first()
            .and_then(|arg| arg.parse::<usize>().ok())
            .unwrap_or(1);
        for _ in 0..count {
            self.machine.step();
            println!(
                "pc 0x{:02X}  ir {}",
                self.machine.pc(),
                self.machine.ir()
            );
            if self.machine.state() == MachineState::Idle {
                self.halted();
                break;
            }
        }
    }

    fn run(&mut self, args: &[&str]) {
        match args.first().and_then(|arg| arg.parse::<usize>().ok()) {
            Some(limit) => {
                let mut remaining = limit;
                self.machine.run_while(|| {
                    remaining = remaining.saturating_sub(1);
                    remaining > 0
                });
            }
            None => self.machine.run(),
        }
        self.halted();
    }

    fn halted(&self) {
        if self.minimal {
            println!("{:>12}", "Halted");
        } else {
            println!("{:>12}", "Halted".cyan());
        }
        println!("pc 0x{:02X}", self.machine.pc());
    }

    fn print_registers(&self) {
        for index in 0..REGISTER_COUNT as u8 {
            let value = self.machine.reg(index);
            let name = format!("R{index:X}");
            if self.minimal {
                println!("{name} 0x{value:02X} {value}");
            } else {
                println!("{} 0x{value:02X} {value:>5}", name.bold());
            }
        }
        println!("PC 0x{:02X}", self.machine.pc());
        println!("IR {}", self.machine.ir());
    }

    fn print_memory(&self, args: &[&str]) {
        let Some(address) = args.first().and_then(|arg| syntax::parse_number(arg)) else {
            println!("expected an address, like `mem 0xF0`");
            return;
        };
        let count = args
            .get(1)
            .and_then(|arg| arg.parse::<u8>().ok())
            .unwrap_or(1);
        for offset in 0..count {
            let cell = address.wrapping_add(offset);
            println!("mem[0x{cell:02X}] 0x{:02X}", self.machine.mem(cell));
        }
    }
}

const HELP: &str = "\
commands:
  step [n]       execute n instructions (default 1)
  run [n]        run until halt, or at most n instructions
  regs           print registers, pc and ir
  mem a [n]      print n memory cells starting at address a
  pc             print the program counter
  reset          reset the program counter to 0
  clear          zero registers, memory and the program counter
  help           show this message
  quit           leave the debugger
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_source_splits_on_separators() {
        let mut source = ArgumentSource::from("step; regs\nquit".to_string());
        assert_eq!(source.read().as_deref(), Some("step"));
        assert_eq!(source.read().as_deref(), Some("regs"));
        assert_eq!(source.read().as_deref(), Some("quit"));
        assert_eq!(source.read(), None);
    }
}
