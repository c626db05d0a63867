//! Line-oriented command surface over the emulator core.
//!
//! Commands parse into a [`Command`] value first, so the dispatch and the
//! parser can be tested without touching stdin. Breakpoints live here, on
//! the host side: they are plain PC values checked between instructions.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use microtrace_core::{Cpu, RESET_VECTOR};

use crate::demo::demo_program;
use crate::hexfile::{load_bin_file, load_hex_file};
use crate::view;

/// Help screen printed by `help`.
pub const HELP_TEXT: &str = "Commands:
  s                 step one instruction
  c                 step one cycle (micro-step)
  r N               run N instructions
  g                 run until halt or breakpoint
  p                 print registers
  m ADDR [ROWS]     dump memory from hex ADDR (default 8 rows of 16)
  w ADDR BYTE       write BYTE at ADDR (both hex)
  b ADDR            add breakpoint at PC==ADDR (hex)
  bl                list breakpoints
  bc [ADDR]         clear breakpoint at ADDR, or all if none given
  t [K]             show last K trace frames (default 20)
  d ADDR [N]        disassemble N instructions starting at ADDR (default 16)
  loadbin PATH ADDR load a binary file at hex ADDR
  loadhex PATH ADDR load a hex-text file at hex ADDR
  setrv ADDR        set the reset vector at FFFC/FFFD
  reset             reset CPU to PC=0000 and clear the trace
  help              this text
  quit              exit";

/// Safety bound for `g`, in instructions.
const RUN_WATCHDOG: u64 = 10_000_000;

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Command {
    StepInstr,
    StepCycle,
    Run(u64),
    Go,
    Regs,
    MemDump { addr: u16, rows: usize },
    WriteByte { addr: u16, value: u8 },
    BreakAdd(u16),
    BreakList,
    BreakClear(Option<u16>),
    Trace(usize),
    Disasm { addr: u16, count: usize },
    LoadBin { path: PathBuf, addr: u16 },
    LoadHex { path: PathBuf, addr: u16 },
    SetResetVector(u16),
    Reset,
    Help,
    Quit,
}

fn parse_hex_u16(token: &str, what: &str) -> Result<u16, String> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u16::from_str_radix(digits, 16).map_err(|_| format!("bad {what} '{token}', expected hex"))
}

fn parse_hex_u8(token: &str, what: &str) -> Result<u8, String> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u8::from_str_radix(digits, 16).map_err(|_| format!("bad {what} '{token}', expected hex"))
}

/// Parses one input line. Blank lines parse to `None`.
///
/// # Errors
///
/// Returns a user-facing message for unknown commands or malformed
/// arguments.
#[allow(clippy::too_many_lines)]
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Command::Quit,
        "help" | "h" | "?" => Command::Help,
        "s" => Command::StepInstr,
        "c" => Command::StepCycle,
        "p" => Command::Regs,
        "g" => Command::Go,
        "r" => {
            let count = parts
                .next()
                .and_then(|t| t.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1);
            Command::Run(count)
        }
        "m" => {
            let addr = parts.next().ok_or("usage: m ADDR [ROWS]")?;
            let rows = parts
                .next()
                .and_then(|t| t.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(8);
            Command::MemDump {
                addr: parse_hex_u16(addr, "address")?,
                rows,
            }
        }
        "w" => {
            let addr = parts.next().ok_or("usage: w ADDR BYTE")?;
            let value = parts.next().ok_or("usage: w ADDR BYTE")?;
            Command::WriteByte {
                addr: parse_hex_u16(addr, "address")?,
                value: parse_hex_u8(value, "byte")?,
            }
        }
        "b" => {
            let addr = parts.next().ok_or("usage: b ADDR")?;
            Command::BreakAdd(parse_hex_u16(addr, "address")?)
        }
        "bl" => Command::BreakList,
        "bc" => match parts.next() {
            Some(addr) => Command::BreakClear(Some(parse_hex_u16(addr, "address")?)),
            None => Command::BreakClear(None),
        },
        "t" => {
            let count = parts
                .next()
                .and_then(|t| t.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(20);
            Command::Trace(count)
        }
        "d" | "dis" | "disasm" => {
            let addr = parts.next().ok_or("usage: d ADDR [N]")?;
            let count = parts
                .next()
                .and_then(|t| t.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(16);
            Command::Disasm {
                addr: parse_hex_u16(addr, "address")?,
                count,
            }
        }
        "loadbin" => {
            let path = parts.next().ok_or("usage: loadbin PATH ADDR")?;
            let addr = parts.next().ok_or("usage: loadbin PATH ADDR")?;
            Command::LoadBin {
                path: PathBuf::from(path),
                addr: parse_hex_u16(addr, "address")?,
            }
        }
        "loadhex" => {
            let path = parts.next().ok_or("usage: loadhex PATH ADDR")?;
            let addr = parts.next().ok_or("usage: loadhex PATH ADDR")?;
            Command::LoadHex {
                path: PathBuf::from(path),
                addr: parse_hex_u16(addr, "address")?,
            }
        }
        "setrv" => {
            let addr = parts.next().ok_or("usage: setrv ADDR")?;
            Command::SetResetVector(parse_hex_u16(addr, "address")?)
        }
        "reset" => Command::Reset,
        _ => return Err(String::from("unknown command, type 'help'")),
    };

    Ok(Some(command))
}

/// Result of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Text to print, possibly empty.
    pub text: String,
    /// True when the REPL should exit.
    pub quit: bool,
}

/// REPL state: the machine plus host-side breakpoints.
pub struct Session {
    /// The emulated machine.
    pub cpu: Cpu,
    breakpoints: BTreeSet<u16>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with the demo program loaded at 0x0000, the reset
    /// vector planted, and the core reset.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Cpu::new();
        cpu.write16(RESET_VECTOR, 0x0000);
        // The fixture is a handful of bytes at the bottom of memory.
        let _ = cpu.load_program(&demo_program(), 0x0000);
        cpu.reset(0x0000);
        Self {
            cpu,
            breakpoints: BTreeSet::new(),
        }
    }

    /// Currently set breakpoints in ascending PC order.
    pub fn breakpoints(&self) -> impl Iterator<Item = u16> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Steps up to `limit` instructions; stops early on halt or when `PC`
    /// lands on a breakpoint, returning the hit address.
    fn run(&mut self, limit: u64) -> Option<u16> {
        for _ in 0..limit {
            if self.cpu.halted() {
                return None;
            }
            self.cpu.step_instr();
            if self.breakpoints.contains(&self.cpu.regs.pc) {
                return Some(self.cpu.regs.pc);
            }
        }
        None
    }

    /// Dispatches one parsed command.
    #[allow(clippy::too_many_lines)]
    pub fn execute(&mut self, command: Command) -> Outcome {
        let mut text = String::new();
        let mut quit = false;

        match command {
            Command::Quit => quit = true,
            Command::Help => text.push_str(HELP_TEXT),
            Command::StepInstr => {
                self.cpu.step_instr();
                text = view::render_registers(&self.cpu);
            }
            Command::StepCycle => {
                self.cpu.step_cycle();
                text = view::render_registers(&self.cpu);
            }
            Command::Run(count) => {
                if let Some(pc) = self.run(count) {
                    let _ = writeln!(text, "* Breakpoint hit at PC={pc:04x}");
                }
                text.push_str(&view::render_registers(&self.cpu));
            }
            Command::Go => {
                if let Some(pc) = self.run(RUN_WATCHDOG) {
                    let _ = writeln!(text, "* Breakpoint hit at PC={pc:04x}");
                }
                text.push_str(&view::render_registers(&self.cpu));
            }
            Command::Regs => text = view::render_registers(&self.cpu),
            Command::MemDump { addr, rows } => text = view::render_memory(&self.cpu, addr, rows),
            Command::WriteByte { addr, value } => {
                self.cpu.mem[usize::from(addr)] = value;
                let _ = write!(text, "wrote {value:02x} to [{addr:04x}]");
            }
            Command::BreakAdd(addr) => {
                self.breakpoints.insert(addr);
                let _ = write!(text, "breakpoint added at PC={addr:04x}");
            }
            Command::BreakList => {
                if self.breakpoints.is_empty() {
                    text.push_str("(no breakpoints)");
                } else {
                    for addr in &self.breakpoints {
                        let _ = writeln!(text, " - {addr:04x}");
                    }
                }
            }
            Command::BreakClear(None) => {
                self.breakpoints.clear();
                text.push_str("breakpoints cleared");
            }
            Command::BreakClear(Some(addr)) => {
                self.breakpoints.remove(&addr);
                let _ = write!(text, "cleared {addr:04x}");
            }
            Command::Trace(count) => text = view::render_trace(&self.cpu, count),
            Command::Disasm { addr, count } => text = view::render_disasm(&self.cpu, addr, count),
            Command::LoadBin { path, addr } => {
                text = match load_bin_file(&path) {
                    Ok(bytes) => self.load_at(&bytes, addr),
                    Err(error) => format!("[loadbin] {error}"),
                };
            }
            Command::LoadHex { path, addr } => {
                text = match load_hex_file(&path) {
                    Ok(bytes) => self.load_at(&bytes, addr),
                    Err(error) => format!("[loadhex] {error}"),
                };
            }
            Command::SetResetVector(addr) => {
                self.cpu.write16(RESET_VECTOR, addr);
                let _ = write!(text, "reset vector set to {addr:04x}");
            }
            Command::Reset => {
                self.cpu.reset(0x0000);
                text.push_str("reset done\n");
                text.push_str(&view::render_registers(&self.cpu));
            }
        }

        Outcome { text, quit }
    }

    fn load_at(&mut self, bytes: &[u8], addr: u16) -> String {
        match self.cpu.load_program(bytes, addr) {
            Ok(()) => format!("loaded {} bytes at {addr:04x}", bytes.len()),
            Err(error) => format!("load failed: {error}"),
        }
    }
}
