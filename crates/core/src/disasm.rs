//! Instruction disassembly.
//!
//! Lengths come from the same [`crate::isa::OPCODE_TABLE`] classification
//! the decode micro-state uses, so the listing walks memory exactly as the
//! engine would fetch it. Unknown bytes render as `.DB` data rows. All
//! functions here expect the full 64 KiB address space and wrap addresses
//! the way the engine does.

use std::fmt;

use crate::isa::{instruction_len, AddressingMode, Opcode};
use crate::memory;

/// One disassembled instruction (or data byte).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisassemblyRow {
    /// Address of the first byte.
    pub addr: u16,
    /// Encoded length, 1..=3 bytes.
    pub len_bytes: u8,
    /// Raw bytes; only the first `len_bytes` entries are meaningful.
    pub raw: [u8; 3],
    /// Mnemonic, or `.DB` for an unassigned byte.
    pub mnemonic: String,
    /// Formatted operand field, empty for plain implied forms.
    pub operands: String,
    /// True when this row is a data byte rather than an instruction.
    pub is_data: bool,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = String::new();
        for i in 0..3 {
            if i < usize::from(self.len_bytes) {
                bytes.push_str(&format!("{:02x} ", self.raw[i]));
            } else {
                bytes.push_str("   ");
            }
        }
        if self.operands.is_empty() {
            write!(f, "{:04x}:  {} {}", self.addr, bytes, self.mnemonic)
        } else {
            write!(
                f,
                "{:04x}:  {} {} {}",
                self.addr, bytes, self.mnemonic, self.operands
            )
        }
    }
}

/// Disassembles the instruction starting at `pc`.
#[must_use]
pub fn disassemble_one(mem: &[u8], pc: u16) -> DisassemblyRow {
    let byte = mem[usize::from(pc)];
    let len = instruction_len(byte);

    let mut raw = [0u8; 3];
    for (i, slot) in raw.iter_mut().enumerate().take(usize::from(len)) {
        *slot = mem[usize::from(pc.wrapping_add(i as u16))];
    }

    let Some(opcode) = Opcode::from_byte(byte) else {
        return DisassemblyRow {
            addr: pc,
            len_bytes: 1,
            raw,
            mnemonic: String::from(".DB"),
            operands: format!("${byte:02x}"),
            is_data: true,
        };
    };

    let operands = match opcode.addressing_mode() {
        AddressingMode::Implied => implied_operand(opcode).to_owned(),
        AddressingMode::Immediate => format!("#${:02x}", raw[1]),
        AddressingMode::Absolute => {
            format!("${:04x}", memory::read16(mem, pc.wrapping_add(1)))
        }
        AddressingMode::AbsoluteX => {
            format!("${:04x},X", memory::read16(mem, pc.wrapping_add(1)))
        }
    };

    DisassemblyRow {
        addr: pc,
        len_bytes: len,
        raw,
        mnemonic: opcode.mnemonic().to_owned(),
        operands,
        is_data: false,
    }
}

/// Disassembles `count` consecutive instructions starting at `start`.
#[must_use]
pub fn disassemble_range(mem: &[u8], start: u16, count: usize) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut pc = start;
    for _ in 0..count {
        let row = disassemble_one(mem, pc);
        pc = pc.wrapping_add(u16::from(row.len_bytes));
        rows.push(row);
    }
    rows
}

const fn implied_operand(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::AddB | Opcode::SubB | Opcode::AndB | Opcode::OrB | Opcode::XorB => "B",
        Opcode::IncA | Opcode::DecA => "A",
        _ => "",
    }
}
