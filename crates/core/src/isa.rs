//! Instruction-set table: opcodes, addressing modes, and mnemonics.
//!
//! [`OPCODE_TABLE`] is the single source of truth. The decode micro-state
//! uses it to pick the next state, and the disassembler derives instruction
//! lengths from the same addressing-mode classification, so the two can
//! never disagree.

/// How an instruction sources its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressingMode {
    /// No operand bytes follow the opcode.
    Implied,
    /// One immediate byte follows the opcode.
    Immediate,
    /// A little-endian 16-bit absolute address follows the opcode.
    Absolute,
    /// Absolute address indexed by X, modulo 65536.
    AbsoluteX,
}

impl AddressingMode {
    /// Number of operand bytes fetched after the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        match self {
            Self::Implied => 0,
            Self::Immediate => 1,
            Self::Absolute | Self::AbsoluteX => 2,
        }
    }
}

/// Assigned opcodes of the ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Nop,
    LdaImm,
    LdbImm,
    LdxImm,
    LdaAbs,
    StaAbs,
    LdaAbsX,
    StaAbsX,
    AddB,
    SubB,
    AndB,
    OrB,
    XorB,
    IncA,
    DecA,
    Jmp,
    Jz,
    Jnz,
    Hlt,
}

/// Single source-of-truth opcode table: byte, opcode, mode, mnemonic.
///
/// Any byte not present here is an unknown opcode and executes as HLT.
pub const OPCODE_TABLE: &[(u8, Opcode, AddressingMode, &str)] = &[
    (0x00, Opcode::Nop, AddressingMode::Implied, "NOP"),
    (0x10, Opcode::LdaImm, AddressingMode::Immediate, "LDA"),
    (0x11, Opcode::LdbImm, AddressingMode::Immediate, "LDB"),
    (0x12, Opcode::LdaAbs, AddressingMode::Absolute, "LDA"),
    (0x13, Opcode::StaAbs, AddressingMode::Absolute, "STA"),
    (0x20, Opcode::AddB, AddressingMode::Implied, "ADD"),
    (0x21, Opcode::SubB, AddressingMode::Implied, "SUB"),
    (0x22, Opcode::AndB, AddressingMode::Implied, "AND"),
    (0x23, Opcode::OrB, AddressingMode::Implied, "OR"),
    (0x24, Opcode::XorB, AddressingMode::Implied, "XOR"),
    (0x25, Opcode::IncA, AddressingMode::Implied, "INC"),
    (0x26, Opcode::DecA, AddressingMode::Implied, "DEC"),
    (0x30, Opcode::Jmp, AddressingMode::Absolute, "JMP"),
    (0x31, Opcode::Jz, AddressingMode::Absolute, "JZ"),
    (0x32, Opcode::Jnz, AddressingMode::Absolute, "JNZ"),
    (0x33, Opcode::LdxImm, AddressingMode::Immediate, "LDX"),
    (0x34, Opcode::LdaAbsX, AddressingMode::AbsoluteX, "LDA"),
    (0x35, Opcode::StaAbsX, AddressingMode::AbsoluteX, "STA"),
    (0xFF, Opcode::Hlt, AddressingMode::Implied, "HLT"),
];

impl Opcode {
    /// Looks up the opcode assigned to `byte`, if any.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find_map(|(entry, opcode, _, _)| (*entry == byte).then_some(*opcode))
    }

    /// Addressing mode of this opcode.
    #[must_use]
    pub fn addressing_mode(self) -> AddressingMode {
        self.table_entry().2
    }

    /// Assembly mnemonic of this opcode.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.table_entry().3
    }

    /// Encoding byte of this opcode.
    #[must_use]
    pub fn byte(self) -> u8 {
        self.table_entry().0
    }

    fn table_entry(self) -> (u8, Self, AddressingMode, &'static str) {
        // The table is exhaustive over the enum, checked by test below.
        *OPCODE_TABLE
            .iter()
            .find(|(_, opcode, _, _)| *opcode == self)
            .unwrap_or(&(0xFF, Self::Hlt, AddressingMode::Implied, "HLT"))
    }
}

/// Total encoded length in bytes of the instruction starting with `byte`.
/// Unknown opcodes count as one data byte.
#[must_use]
pub fn instruction_len(byte: u8) -> u8 {
    Opcode::from_byte(byte).map_or(1, |opcode| 1 + opcode.addressing_mode().operand_bytes())
}

#[cfg(test)]
mod tests {
    use super::{instruction_len, AddressingMode, Opcode, OPCODE_TABLE};
    use std::collections::HashSet;

    #[test]
    fn table_bytes_are_unique() {
        let bytes: HashSet<_> = OPCODE_TABLE.iter().map(|(byte, _, _, _)| *byte).collect();
        assert_eq!(bytes.len(), OPCODE_TABLE.len());
    }

    #[test]
    fn table_covers_every_opcode_exactly_once() {
        let opcodes: HashSet<_> = OPCODE_TABLE.iter().map(|(_, op, _, _)| *op).collect();
        assert_eq!(opcodes.len(), OPCODE_TABLE.len());
        for (_, opcode, _, _) in OPCODE_TABLE {
            assert_eq!(Opcode::from_byte(opcode.byte()), Some(*opcode));
        }
    }

    #[test]
    fn lengths_follow_addressing_mode() {
        assert_eq!(instruction_len(0x00), 1); // NOP
        assert_eq!(instruction_len(0x10), 2); // LDA #imm
        assert_eq!(instruction_len(0x13), 3); // STA abs
        assert_eq!(instruction_len(0x35), 3); // STA abs+X
        assert_eq!(instruction_len(0xFF), 1); // HLT
        assert_eq!(instruction_len(0xAB), 1); // unknown byte is data
    }

    #[test]
    fn unknown_bytes_do_not_decode() {
        for byte in [0x01u8, 0x0F, 0x27, 0x36, 0x80, 0xFE] {
            assert_eq!(Opcode::from_byte(byte), None);
        }
    }

    #[test]
    fn operand_byte_counts() {
        assert_eq!(AddressingMode::Implied.operand_bytes(), 0);
        assert_eq!(AddressingMode::Immediate.operand_bytes(), 1);
        assert_eq!(AddressingMode::Absolute.operand_bytes(), 2);
        assert_eq!(AddressingMode::AbsoluteX.operand_bytes(), 2);
    }
}
