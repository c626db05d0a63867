//! Prints the cycle-by-cycle trace of a small store/add loop to stdout.
//!
//! The textual twin of a trace viewer: one line per frame, bus events
//! nested underneath.

use microtrace_core::{BusDir, Cpu, OUT0};

fn main() {
    let mut program = vec![
        0x10, 0x00, // LDA #$00
        0x11, 0x01, // LDB #$01
    ];
    // loop: STA OUT0; ADD B; JMP loop
    program.extend_from_slice(&[0x13, 0x00, 0xFF]);
    program.extend_from_slice(&[0x20]);
    program.extend_from_slice(&[0x30, 0x04, 0x00]);

    let mut cpu = Cpu::new();
    cpu.load_program(&program, 0x0000).expect("program fits");
    cpu.write16(microtrace_core::RESET_VECTOR, 0x0000);
    cpu.reset(0x0000);

    for _ in 0..12 {
        cpu.step_instr();
    }

    for frame in cpu.timeline() {
        println!(
            "{:>4}  pc={:04x}  op={:02x}  a={:02x} b={:02x} x={:02x}  f={:02x}  {}",
            frame.cycle,
            frame.pc,
            frame.opcode,
            frame.a,
            frame.b,
            frame.x,
            frame.flags.bits(),
            frame.state.short_name(),
        );
        for event in &frame.events {
            let dir = match event.dir {
                BusDir::Read => "RD",
                BusDir::Write => "WR",
                BusDir::None => "--",
            };
            println!(
                "      {} [{:04x}] = {:02x}  {}",
                dir, event.address, event.data, event.note
            );
        }
    }

    println!("cycles: {}", cpu.cycles());
    println!("out0:   {:02x}", cpu.mem[usize::from(OUT0)]);
}
