use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use vole::{decode_image, Assembler, Debugger, DebuggerOptions};
use vole::{Instruction, Machine, MachineObserver, REGISTER_COUNT};

/// Vole is a complete & convenient assembler and simulator toolchain for
/// the Vole machine language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.asm` or binary `.vole` file directly and output to terminal
    Run {
        /// `.asm` or `.vole` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Run text `.asm` file under the interactive debugger
    Debug {
        /// `.asm` file to run
        name: PathBuf,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Create binary `.vole` file to run later or view compiled data
    Compile {
        /// `.asm` file to compile
        name: PathBuf,
        /// Destination to output .vole file
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a `.asm` file to receive constant assembler updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    vole::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(vole::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run { name, minimal } => {
                run(&name, minimal)?;
                Ok(())
            }
            Command::Debug {
                name,
                command,
                minimal,
            } => {
                if name.extension().and_then(|ext| ext.to_str()) != Some("asm") {
                    bail!("Cannot use debugger on non-assembly file");
                }
                file_message(Green, "Assembling", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let image = assemble(&contents)?;

                let mut machine = Machine::new();
                machine.load_image(&image);

                let mut debugger = Debugger::new(machine, DebuggerOptions { command, minimal });
                debugger.wait_for_command();
                Ok(())
            }
            Command::Compile { name, dest } => {
                file_message(Green, "Assembling", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let image = assemble(&contents)?;

                let out_file_name =
                    dest.unwrap_or(name.with_extension("vole").file_name().unwrap().into());
                let mut file = File::create(&out_file_name).into_diagnostic()?;

                for instruction in &image {
                    file.write_all(&instruction.bytes()).into_diagnostic()?;
                }

                message(Green, "Finished", "emit binary");
                file_message(Green, "Saved", &out_file_name);
                Ok(())
            }
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let contents = fs::read_to_string(&name).into_diagnostic()?;
                let _ = assemble(&contents)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
            Command::Watch { name } => {
                if !name.exists() {
                    bail!("File does not exist. Exiting...")
                }
                // Vim breaks if watching a single file
                let folder_path = match name.parent() {
                    Some(pth) if pth.is_dir() => pth.to_path_buf(),
                    _ => Path::new(".").to_path_buf(),
                };

                // Clear screen and move cursor to top left
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Cyan, "Help", "press CTRL+C to exit");

                let mut watcher =
                    Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

                watcher
                    .watch(folder_path, move |event: Event| match event.kind {
                        // Watch remove for vim changes
                        EventKind::Modify(_) | EventKind::Remove(_) => {
                            // Clear screen
                            print!("\x1B[2J\x1B[2;1H");
                            file_message(Green, "Watching", &name);
                            message(Green, "Re-checking", "file change detected");
                            message(Cyan, "Help", "press CTRL+C to exit");

                            // Makes reruns more obvious
                            sleep(Duration::from_millis(50));

                            let contents = match fs::read_to_string(&name) {
                                Ok(cts) => cts,
                                Err(e) => {
                                    eprintln!("{e}. Exiting...");
                                    std::process::exit(1)
                                }
                            };
                            match assemble(&contents) {
                                Ok(_) => {
                                    message(Green, "Success", "no errors found!");
                                }
                                Err(e) => {
                                    println!("\n{:?}", e);
                                }
                            };
                            Flow::Continue
                        }
                        _ => Flow::Continue,
                    })
                    .into_diagnostic()?;
                watcher.run();
                Ok(())
            }
        }
    } else {
        if let Some(path) = args.path {
            run(&path, false)?;
            Ok(())
        } else {
            println!("\n~ vole v{VERSION} ~");
            println!("{}", LOGO.truecolor(175, 145, 95).bold());
            println!("{SHORT_INFO}");
            std::process::exit(0);
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &PathBuf) {
    let right = format!("target {}", right.to_str().unwrap());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &PathBuf, minimal: bool) -> Result<()> {
    let image = if let Some(ext) = name.extension() {
        match ext.to_str().unwrap() {
            "vole" | "bin" | "obj" => {
                message(MsgColor::Green, "Loading", "binary image");
                let buffer = fs::read(name).into_diagnostic()?;
                decode_image(&buffer)?
            }
            "asm" => {
                file_message(MsgColor::Green, "Assembling", name);
                let contents = fs::read_to_string(name).into_diagnostic()?;
                assemble(&contents)?
            }
            _ => {
                bail!("File has unknown extension. Exiting...")
            }
        }
    } else {
        bail!("File has no extension. Exiting...");
    };

    let mut machine = Machine::new();
    machine.load_image(&image);
    if vole::env::is_trace_enabled() {
        machine.subscribe(Box::new(Tracer::default()));
    }

    message(MsgColor::Green, "Running", "loaded image");
    machine.run();

    message(MsgColor::Cyan, "Halted", "machine is idle");
    dump_registers(&machine, minimal);

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

fn dump_registers(machine: &Machine, minimal: bool) {
    for index in 0..REGISTER_COUNT as u8 {
        let value = machine.reg(index);
        let name = format!("R{index:X}");
        if minimal {
            println!("{name} 0x{value:02X} {value}");
        } else {
            println!("{} 0x{value:02X} {value:>5}", name.bold());
        }
    }
    println!("PC 0x{:02X}", machine.pc());
}

/// Return the machine image of an assembly source for further processing
fn assemble(contents: &str) -> Result<Vec<Instruction>> {
    let mut assembler = Assembler::new();
    assembler.assemble(contents)
}

/// Prints every executed instruction when `VOLE_TRACE=1`.
#[derive(Default)]
struct Tracer {
    fetch_pc: u8,
}

impl MachineObserver for Tracer {
    fn ir_changed(&mut self, ir: Instruction) {
        println!("{:>12} 0x{:02X}  {ir}", "Trace".cyan(), self.fetch_pc);
    }

    fn pc_changed(&mut self, pc: u8) {
        self.fetch_pc = pc;
    }
}

const LOGO: &str = r#"
        __   __   ___   _      ___
        \ \ / /  / _ \ | |    | __|
         \ V /  | (_) || |__  | _|
          \_/    \___/ |____| |___|"#;

const SHORT_INFO: &str = r"
Welcome to vole, an all-in-one toolchain for assembling and simulating
programs for the Vole 8-bit educational machine.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
