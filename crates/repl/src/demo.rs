//! Built-in demo fixture: a counter that streams to OUT0.

/// Returns the demo image loaded at startup.
///
/// A starts at 0 with B as the increment; the loop stores A to OUT0, bumps
/// it, and twiddles the flags on the way round. The trailing HLT is never
/// reached.
#[must_use]
pub fn demo_program() -> Vec<u8> {
    let mut image = Vec::new();
    let emit16 = |image: &mut Vec<u8>, value: u16| {
        image.push((value & 0xFF) as u8);
        image.push((value >> 8) as u8);
    };

    image.extend_from_slice(&[0x10, 0x00]); // LDA #0
    image.extend_from_slice(&[0x11, 0x01]); // LDB #1 (increment)

    // loop:
    image.push(0x13); // STA OUT0
    emit16(&mut image, 0xFF00);
    image.push(0x20); // ADD B (A++)
    image.extend_from_slice(&[0x11, 0x0A]); // LDB #10
    image.push(0x24); // XOR B (twiddle flags)
    image.push(0x24); // XOR B (undo)
    image.extend_from_slice(&[0x33, 0x0A]); // LDX #10
    image.push(0x21); // SUB B (simple flag play)
    image.push(0x30); // JMP back to the STA
    emit16(&mut image, 0x0004);
    image.push(0xFF); // HLT (unreached)

    image
}

#[cfg(test)]
mod tests {
    use super::demo_program;
    use microtrace_core::{instruction_len, Cpu, OUT0};

    #[test]
    fn demo_image_decodes_cleanly_from_the_top() {
        let image = demo_program();
        let mut offset = 0usize;
        while offset < image.len() {
            offset += usize::from(instruction_len(image[offset]));
        }
        assert_eq!(offset, image.len());
    }

    #[test]
    fn demo_loops_forever_streaming_to_out0() {
        let mut cpu = Cpu::new();
        cpu.load_program(&demo_program(), 0x0000).unwrap();
        cpu.reset(0x0000);

        // Two loads, then watch a few loop iterations. After the first pass
        // the SUB #10 folds every value back to 0xF7.
        cpu.step_instr();
        cpu.step_instr();
        for expected in [0x00u8, 0xF7, 0xF7, 0xF7] {
            cpu.step_instr(); // STA OUT0
            assert_eq!(cpu.mem[usize::from(OUT0)], expected);
            for _ in 0..6 {
                cpu.step_instr(); // ADD, LDB, XOR, XOR, LDX, SUB
            }
            cpu.step_instr(); // JMP
            assert!(!cpu.halted());
        }
    }
}
