//! Textual renderers for registers, memory windows, trace frames, and
//! disassembly listings. Pure string builders so they stay testable.

use std::fmt::Write as _;

use microtrace_core::{disassemble_range, BusDir, Cpu};

/// One-line register summary.
#[must_use]
pub fn render_registers(cpu: &Cpu) -> String {
    format!(
        "PC={:04x}  A={:02x}  B={:02x}  X={:02x}  SP={:04x}  F={:02x}  ustate={}  cycles={}",
        cpu.regs.pc,
        cpu.regs.a,
        cpu.regs.b,
        cpu.regs.x,
        cpu.regs.sp,
        cpu.regs.flags.bits(),
        cpu.micro_state().short_name(),
        cpu.cycles(),
    )
}

/// Hex dump of `rows` rows of 16 bytes starting at `base`.
#[must_use]
pub fn render_memory(cpu: &Cpu, base: u16, rows: usize) -> String {
    let mut out = String::new();
    for row in 0..rows {
        let addr = base.wrapping_add((row * 16) as u16);
        let _ = write!(out, "{addr:04x}: ");
        for col in 0..16u16 {
            let byte = cpu.mem[usize::from(addr.wrapping_add(col))];
            let _ = write!(out, "{byte:02x} ");
        }
        out.push('\n');
    }
    out
}

/// The last `count` trace frames, one line per frame with bus events
/// nested underneath.
#[must_use]
pub fn render_trace(cpu: &Cpu, count: usize) -> String {
    let timeline = cpu.timeline();
    if timeline.is_empty() {
        return String::from("(no trace yet)\n");
    }

    let start = timeline.len().saturating_sub(count);
    let mut out = String::new();
    for frame in &timeline[start..] {
        let _ = writeln!(
            out,
            "{:>6}  pc={:04x}  op={:02x}  a={:02x} b={:02x} x={:02x}  f={:02x}  {}  events:{}",
            frame.cycle,
            frame.pc,
            frame.opcode,
            frame.a,
            frame.b,
            frame.x,
            frame.flags.bits(),
            frame.state.short_name(),
            frame.events.len(),
        );
        for event in &frame.events {
            let dir = match event.dir {
                BusDir::Read => "RD",
                BusDir::Write => "WR",
                BusDir::None => "--",
            };
            let _ = writeln!(
                out,
                "        {} [{:04x}] = {:02x}  {}",
                dir, event.address, event.data, event.note
            );
        }
    }
    out
}

/// Disassembly listing of `count` instructions starting at `addr`.
#[must_use]
pub fn render_disasm(cpu: &Cpu, addr: u16, count: usize) -> String {
    let mut out = String::new();
    for row in disassemble_range(&cpu.mem, addr, count) {
        let _ = writeln!(out, "{row}");
    }
    out
}
