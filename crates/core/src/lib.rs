//! Cycle-accurate emulator core for a small pedagogical 8-bit CPU.
//!
//! The core executes programs one *micro-step* per cycle: each instruction
//! is broken into fetch / decode / operand-fetch / execute / writeback
//! phases, every memory transaction is recorded as a [`BusEvent`], and a
//! [`TraceFrame`] snapshot is appended to an append-only timeline after
//! every step. Hosts drive the machine with [`Cpu::step_cycle`] and
//! [`Cpu::step_instr`] and read the timeline back for visualization and
//! debugging.
//!
//! ```
//! use microtrace_core::{Cpu, MicroState};
//!
//! let mut cpu = Cpu::new();
//! cpu.load_program(&[0x10, 0x2A, 0xFF], 0x0000).unwrap(); // LDA #$2A; HLT
//! cpu.reset(0x0000);
//!
//! cpu.step_instr();
//! assert_eq!(cpu.regs.a, 0x2A);
//!
//! cpu.step_instr();
//! assert!(cpu.halted());
//! assert_eq!(cpu.micro_state(), MicroState::Halted);
//! assert_eq!(cpu.timeline().len() as u64, cpu.cycles());
//! ```
//!
//! The core is single-threaded and total: the only terminal condition is
//! the `Halted` micro-state, entered by `HLT` or any unassigned opcode
//! byte.

/// The micro-step engine and host-facing API.
pub mod cpu;
pub use cpu::{next_microstate, Cpu, ProgramTooLarge, Registers, SP_RESET};

/// Instruction disassembly over the shared ISA table.
pub mod disasm;
pub use disasm::{disassemble_one, disassemble_range, DisassemblyRow};

/// FLAGS register model and Z/N/C/V update rules.
pub mod flags;
pub use flags::{Flags, F_C, F_N, F_V, F_Z};

/// Opcode, addressing-mode, and mnemonic table.
pub mod isa;
pub use isa::{instruction_len, AddressingMode, Opcode, OPCODE_TABLE};

/// Flat 64 KiB address-space primitives.
pub mod memory;
pub use memory::{new_address_space, read16, write16, MEMORY_BYTES, OUT0, RESET_VECTOR};

/// Bus events and per-cycle trace frames.
pub mod trace;
pub use trace::{BusDir, BusEvent, MicroState, TraceFrame};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
