//! Feeds arbitrary byte programs to the engine and checks the structural
//! invariants after every micro-step.

#![no_main]

use libfuzzer_sys::fuzz_target;
use microtrace_core::{Cpu, MicroState, MEMORY_BYTES};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > MEMORY_BYTES {
        return;
    }

    let mut cpu = Cpu::new();
    cpu.load_program(data, 0x0000).expect("image fits");
    cpu.reset(0x0000);

    for _ in 0..4096 {
        cpu.step_cycle();

        assert_eq!(cpu.timeline().len() as u64, cpu.cycles());
        assert_eq!(cpu.regs.flags.bits() & 0xF0, 0);
        assert_eq!(cpu.mem.len(), MEMORY_BYTES);
        assert_eq!(cpu.halted(), cpu.micro_state() == MicroState::Halted);
        assert!(!matches!(
            cpu.micro_state(),
            MicroState::MemRead | MicroState::MemWrite
        ));

        if cpu.halted() {
            let frames = cpu.cycles();
            cpu.step_cycle();
            cpu.step_instr();
            assert_eq!(cpu.cycles(), frames);
            break;
        }
    }
});
