//! The micro-step execution engine and the host-facing API.
//!
//! Each call to [`Cpu::step_cycle`] performs exactly one micro-state
//! transition, issues at most one bus transaction per helper call, and
//! appends exactly one [`TraceFrame`] to the timeline. Next-state selection
//! lives in the pure [`next_microstate`] function so the reachable
//! transition graph has a single, directly testable definition.

use thiserror::Error;

use crate::flags::Flags;
use crate::isa::{AddressingMode, Opcode};
use crate::memory::{self, MEMORY_BYTES};
use crate::trace::{BusDir, BusEvent, MicroState, TraceFrame};

/// Stack pointer value installed by `reset`. The stack is unused by the
/// current ISA but the register is reserved for it.
pub const SP_RESET: u16 = 0x01FF;

/// Architectural register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    /// Accumulator.
    pub a: u8,
    /// B register, the implicit second ALU operand.
    pub b: u8,
    /// X index register.
    pub x: u8,
    /// Program counter.
    pub pc: u16,
    /// Stack pointer.
    pub sp: u16,
    /// Flag register.
    pub flags: Flags,
}

/// Error returned when a program image does not fit in memory.
///
/// Memory is untouched when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("program of {len} bytes does not fit in memory at origin {origin:#06X}")]
pub struct ProgramTooLarge {
    /// Requested load origin.
    pub origin: u16,
    /// Length of the rejected image in bytes.
    pub len: usize,
}

/// The emulated CPU: registers, memory, micro-step latches, and the trace
/// timeline.
///
/// A fresh value is fully zeroed; call [`Cpu::reset`] before stepping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    /// Architectural registers. Hosts may read and poke these directly.
    pub regs: Registers,
    /// Flat 64 KiB memory image.
    pub mem: Box<[u8]>,
    halted: bool,
    cycles: u64,
    ustate: MicroState,
    opcode: u8,
    opaddr: u16,
    timeline: Vec<TraceFrame>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Next micro-state for a transition out of `state` with `opcode` latched.
///
/// Pure over its inputs. `Execute` maps to `Halted` for HLT and for any
/// byte the ISA table does not assign; every other opcode proceeds to
/// `WriteBack`. The reserved `MemRead`/`MemWrite` states map to themselves
/// and are never produced.
#[must_use]
pub fn next_microstate(state: MicroState, opcode: u8) -> MicroState {
    match state {
        MicroState::FetchOp => MicroState::Decode,
        MicroState::Decode => match Opcode::from_byte(opcode) {
            Some(op) if op.addressing_mode() == AddressingMode::Implied => MicroState::Execute,
            Some(_) => MicroState::FetchOpLo,
            // Unknown opcodes go straight to Execute, which halts.
            None => MicroState::Execute,
        },
        MicroState::FetchOpLo => match Opcode::from_byte(opcode) {
            Some(op) if op.addressing_mode() == AddressingMode::Immediate => MicroState::Execute,
            _ => MicroState::FetchOpHi,
        },
        MicroState::FetchOpHi => MicroState::Execute,
        MicroState::Execute => match Opcode::from_byte(opcode) {
            None | Some(Opcode::Hlt) => MicroState::Halted,
            Some(_) => MicroState::WriteBack,
        },
        MicroState::WriteBack => MicroState::FetchOp,
        MicroState::MemRead | MicroState::MemWrite | MicroState::Halted => state,
    }
}

impl Cpu {
    /// Creates a zeroed CPU with a fresh 64 KiB address space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            mem: memory::new_address_space(),
            halted: false,
            cycles: 0,
            ustate: MicroState::FetchOp,
            opcode: 0,
            opaddr: 0,
            timeline: Vec::new(),
        }
    }

    /// True once the core has reached the terminal `Halted` state.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Number of micro-steps executed since the last reset. Always equal to
    /// the timeline length.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Current micro-state.
    #[must_use]
    pub const fn micro_state(&self) -> MicroState {
        self.ustate
    }

    /// Most recently fetched opcode byte.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Operand latch: the immediate byte (low half) or the absolute address.
    #[must_use]
    pub const fn opaddr(&self) -> u16 {
        self.opaddr
    }

    /// The append-only trace timeline, one frame per executed micro-step.
    #[must_use]
    pub fn timeline(&self) -> &[TraceFrame] {
        &self.timeline
    }

    /// Resets the core: clears registers and flags, installs `SP_RESET`,
    /// sets `PC` to `pc_init`, clears the timeline, and re-enters `FetchOp`.
    ///
    /// Memory is preserved. The reset vector at 0xFFFC/0xFFFD is not
    /// consulted; hosts that want vector-driven reset read it themselves
    /// and pass the value in.
    pub fn reset(&mut self, pc_init: u16) {
        self.regs = Registers {
            pc: pc_init,
            sp: SP_RESET,
            ..Registers::default()
        };
        self.halted = false;
        self.cycles = 0;
        self.ustate = MicroState::FetchOp;
        self.opcode = 0;
        self.opaddr = 0;
        self.timeline.clear();
    }

    /// Copies `bytes` into memory starting at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramTooLarge`] without touching memory when the image
    /// would run past the end of the address space.
    pub fn load_program(&mut self, bytes: &[u8], origin: u16) -> Result<(), ProgramTooLarge> {
        let start = usize::from(origin);
        let end = start
            .checked_add(bytes.len())
            .filter(|end| *end <= MEMORY_BYTES)
            .ok_or(ProgramTooLarge {
                origin,
                len: bytes.len(),
            })?;
        self.mem[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Little-endian 16-bit store, without a bus event. Used by hosts to
    /// plant vectors and data before execution.
    pub fn write16(&mut self, addr: u16, value: u16) {
        memory::write16(&mut self.mem, addr, value);
    }

    fn bus_read(&self, addr: u16, events: &mut Vec<BusEvent>, note: &str) -> u8 {
        let data = self.mem[usize::from(addr)];
        events.push(BusEvent {
            cycle: self.cycles,
            state: self.ustate,
            dir: BusDir::Read,
            address: addr,
            data,
            note: note.to_owned(),
        });
        data
    }

    fn bus_write(&mut self, addr: u16, data: u8, events: &mut Vec<BusEvent>, note: &str) {
        self.mem[usize::from(addr)] = data;
        events.push(BusEvent {
            cycle: self.cycles,
            state: self.ustate,
            dir: BusDir::Write,
            address: addr,
            data,
            note: note.to_owned(),
        });
    }

    /// Advances the machine by one micro-step and appends one trace frame.
    ///
    /// A no-op once halted: no state change, no frame.
    pub fn step_cycle(&mut self) {
        if self.halted {
            return;
        }

        let mut events = Vec::new();

        match self.ustate {
            MicroState::FetchOp => {
                self.opcode = self.bus_read(self.regs.pc, &mut events, "opcode fetch");
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.ustate = next_microstate(MicroState::FetchOp, self.opcode);
            }
            MicroState::Decode => {
                self.ustate = next_microstate(MicroState::Decode, self.opcode);
            }
            MicroState::FetchOpLo => {
                let lo = self.bus_read(self.regs.pc, &mut events, "operand lo");
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.opaddr = u16::from(lo);
                self.ustate = next_microstate(MicroState::FetchOpLo, self.opcode);
            }
            MicroState::FetchOpHi => {
                let hi = self.bus_read(self.regs.pc, &mut events, "operand hi");
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.opaddr |= u16::from(hi) << 8;
                self.ustate = next_microstate(MicroState::FetchOpHi, self.opcode);
            }
            MicroState::Execute => {
                self.execute(&mut events);
                self.ustate = next_microstate(MicroState::Execute, self.opcode);
                self.halted = self.ustate == MicroState::Halted;
            }
            MicroState::WriteBack => {
                self.ustate = next_microstate(MicroState::WriteBack, self.opcode);
            }
            MicroState::MemRead | MicroState::MemWrite | MicroState::Halted => {}
        }

        self.timeline.push(TraceFrame {
            cycle: self.cycles,
            pc: self.regs.pc,
            a: self.regs.a,
            b: self.regs.b,
            x: self.regs.x,
            sp: (self.regs.sp & 0xFF) as u8,
            flags: self.regs.flags,
            opcode: self.opcode,
            state: self.ustate,
            events,
        });
        self.cycles += 1;
    }

    /// Runs micro-steps until the next instruction boundary.
    ///
    /// Finishes any in-flight instruction first, then executes exactly one
    /// more instruction, so the core always ends aligned to `FetchOp` (or
    /// halted).
    pub fn step_instr(&mut self) {
        if self.halted {
            return;
        }
        while self.ustate != MicroState::FetchOp && !self.halted {
            self.step_cycle();
        }
        while !self.halted {
            self.step_cycle();
            if self.ustate == MicroState::FetchOp {
                break;
            }
        }
    }

    fn execute(&mut self, events: &mut Vec<BusEvent>) {
        // Unknown bytes have no action; the transition function parks the
        // machine in Halted.
        let Some(opcode) = Opcode::from_byte(self.opcode) else {
            return;
        };

        match opcode {
            Opcode::Nop | Opcode::Hlt => {}
            Opcode::LdaImm => {
                self.regs.a = (self.opaddr & 0xFF) as u8;
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::LdbImm => {
                self.regs.b = (self.opaddr & 0xFF) as u8;
                self.regs.flags.set_zn(self.regs.b);
            }
            Opcode::LdxImm => {
                self.regs.x = (self.opaddr & 0xFF) as u8;
                self.regs.flags.set_zn(self.regs.x);
            }
            Opcode::LdaAbs => {
                self.regs.a = self.bus_read(self.opaddr, events, "LDA mem");
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::StaAbs => {
                self.bus_write(self.opaddr, self.regs.a, events, "STA mem");
            }
            Opcode::LdaAbsX => {
                let ea = self.opaddr.wrapping_add(u16::from(self.regs.x));
                self.regs.a = self.bus_read(ea, events, "LDA [abs+X]");
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::StaAbsX => {
                let ea = self.opaddr.wrapping_add(u16::from(self.regs.x));
                self.bus_write(ea, self.regs.a, events, "STA [abs+X]");
            }
            Opcode::AddB => {
                self.regs.a = self.regs.flags.apply_add(self.regs.a, self.regs.b);
            }
            Opcode::SubB => {
                self.regs.a = self.regs.flags.apply_sub(self.regs.a, self.regs.b);
            }
            Opcode::AndB => {
                self.regs.a &= self.regs.b;
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::OrB => {
                self.regs.a |= self.regs.b;
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::XorB => {
                self.regs.a ^= self.regs.b;
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::IncA => {
                // Z/N only; C and V keep their previous values.
                self.regs.a = self.regs.a.wrapping_add(1);
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::DecA => {
                self.regs.a = self.regs.a.wrapping_sub(1);
                self.regs.flags.set_zn(self.regs.a);
            }
            Opcode::Jmp => {
                self.regs.pc = self.opaddr;
            }
            Opcode::Jz => {
                if self.regs.flags.zero() {
                    self.regs.pc = self.opaddr;
                }
            }
            Opcode::Jnz => {
                if !self.regs.flags.zero() {
                    self.regs.pc = self.opaddr;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{next_microstate, Cpu, SP_RESET};
    use crate::trace::{BusDir, MicroState};

    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program, 0x0000).expect("program fits");
        cpu.reset(0x0000);
        cpu
    }

    #[test]
    fn reset_installs_canonical_state() {
        let mut cpu = Cpu::new();
        cpu.regs.a = 0x55;
        cpu.regs.flags.set_zn(0x80);
        cpu.load_program(&[0x00], 0x0000).unwrap();
        cpu.step_cycle();

        cpu.reset(0x1234);

        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.b, 0);
        assert_eq!(cpu.regs.x, 0);
        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(cpu.regs.sp, SP_RESET);
        assert_eq!(cpu.regs.flags.bits(), 0);
        assert_eq!(cpu.cycles(), 0);
        assert!(cpu.timeline().is_empty());
        assert_eq!(cpu.micro_state(), MicroState::FetchOp);
        assert!(!cpu.halted());
    }

    #[test]
    fn reset_preserves_memory() {
        let mut cpu = Cpu::new();
        cpu.mem[0x8000] = 0xAB;
        cpu.reset(0x0000);
        assert_eq!(cpu.mem[0x8000], 0xAB);
    }

    #[test]
    fn fetch_latches_opcode_and_advances_pc() {
        let mut cpu = cpu_with(&[0x10, 0x2A]);
        cpu.step_cycle();

        assert_eq!(cpu.opcode(), 0x10);
        assert_eq!(cpu.regs.pc, 0x0001);
        assert_eq!(cpu.micro_state(), MicroState::Decode);

        let frame = &cpu.timeline()[0];
        assert_eq!(frame.events.len(), 1);
        assert_eq!(frame.events[0].dir, BusDir::Read);
        assert_eq!(frame.events[0].address, 0x0000);
        assert_eq!(frame.events[0].note, "opcode fetch");
    }

    #[test]
    fn decode_and_writeback_emit_no_events() {
        let mut cpu = cpu_with(&[0x00]); // NOP
        for _ in 0..4 {
            cpu.step_cycle();
        }
        // FetchOp, Decode, Execute, WriteBack
        assert_eq!(cpu.timeline()[1].state, MicroState::Execute);
        assert!(cpu.timeline()[1].events.is_empty()); // frame after Decode step
        assert_eq!(cpu.timeline()[3].state, MicroState::FetchOp);
        assert!(cpu.timeline()[3].events.is_empty()); // frame after WriteBack step
    }

    #[test]
    fn immediate_operand_lands_in_opaddr_low_byte() {
        let mut cpu = cpu_with(&[0x10, 0x2A]);
        cpu.opaddr = 0xFF00; // stale high byte must be replaced, not OR-ed
        cpu.step_cycle(); // FetchOp
        cpu.step_cycle(); // Decode
        cpu.step_cycle(); // FetchOpLo
        assert_eq!(cpu.opaddr(), 0x002A);
        assert_eq!(cpu.micro_state(), MicroState::Execute);
    }

    #[test]
    fn absolute_operand_assembles_little_endian() {
        let mut cpu = cpu_with(&[0x30, 0x34, 0x12]); // JMP $1234
        cpu.step_instr();
        assert_eq!(cpu.regs.pc, 0x1234);
        assert!(!cpu.halted());
    }

    #[test]
    fn halted_step_is_a_noop_without_a_frame() {
        let mut cpu = cpu_with(&[0xFF]);
        cpu.step_instr();
        assert!(cpu.halted());
        assert_eq!(cpu.micro_state(), MicroState::Halted);

        let frames = cpu.timeline().len() as u64;
        cpu.step_cycle();
        cpu.step_instr();
        assert_eq!(cpu.cycles(), frames);
        assert_eq!(cpu.timeline().len() as u64, frames);
    }

    #[test]
    fn unknown_opcode_halts_like_hlt() {
        let mut cpu = cpu_with(&[0xAB]);
        cpu.step_instr();
        assert!(cpu.halted());
        assert_eq!(cpu.micro_state(), MicroState::Halted);
    }

    #[test]
    fn load_program_rejects_oversized_image() {
        let mut cpu = Cpu::new();
        let err = cpu.load_program(&[0xAA, 0xBB, 0xCC], 0xFFFE).unwrap_err();
        assert_eq!(err.origin, 0xFFFE);
        assert_eq!(err.len, 3);
        // Memory untouched on failure.
        assert_eq!(cpu.mem[0xFFFE], 0x00);
        assert_eq!(cpu.mem[0xFFFF], 0x00);
    }

    #[test]
    fn load_program_accepts_image_ending_at_top_of_memory() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xAA, 0xBB], 0xFFFE).unwrap();
        assert_eq!(cpu.mem[0xFFFE], 0xAA);
        assert_eq!(cpu.mem[0xFFFF], 0xBB);
    }

    #[test]
    fn transition_function_is_terminal_in_halted() {
        for opcode in 0..=u8::MAX {
            assert_eq!(
                next_microstate(MicroState::Halted, opcode),
                MicroState::Halted
            );
        }
    }

    #[test]
    fn reserved_states_map_to_themselves() {
        assert_eq!(
            next_microstate(MicroState::MemRead, 0x00),
            MicroState::MemRead
        );
        assert_eq!(
            next_microstate(MicroState::MemWrite, 0x00),
            MicroState::MemWrite
        );
    }

    #[test]
    fn store_records_write_event_with_note() {
        let mut cpu = cpu_with(&[0x10, 0x42, 0x13, 0x00, 0x80]); // LDA #$42; STA $8000
        cpu.step_instr();
        cpu.step_instr();

        assert_eq!(cpu.mem[0x8000], 0x42);
        let write = cpu
            .timeline()
            .iter()
            .flat_map(|frame| frame.events.iter())
            .find(|event| event.dir == BusDir::Write)
            .expect("store must emit a write event");
        assert_eq!(write.address, 0x8000);
        assert_eq!(write.data, 0x42);
        assert_eq!(write.note, "STA mem");
        assert_eq!(write.state, MicroState::Execute);
    }
}
