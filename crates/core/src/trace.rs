//! Trace model: bus events and per-cycle machine snapshots.
//!
//! Everything here is plain descriptive data. Events are recorded while a
//! micro-step runs and are never replayed; frames are appended to the
//! timeline in strict cycle order and only `reset` discards them.

use crate::flags::Flags;

/// Sub-phase of instruction execution. The engine performs exactly one
/// micro-state transition per cycle.
///
/// `MemRead` and `MemWrite` are reserved names kept for forward
/// compatibility; the engine never transitions into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MicroState {
    /// Read the opcode byte at `PC` and latch it.
    #[default]
    FetchOp,
    /// Read the low operand byte at `PC`.
    FetchOpLo,
    /// Read the high operand byte at `PC`.
    FetchOpHi,
    /// Classify the latched opcode; no bus traffic.
    Decode,
    /// Reserved, unused.
    MemRead,
    /// Reserved, unused.
    MemWrite,
    /// Perform the instruction's semantic action.
    Execute,
    /// Instruction boundary; no side effects.
    WriteBack,
    /// Terminal state; stepping is a no-op.
    Halted,
}

impl MicroState {
    /// Three-letter tag used by trace and register views.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::FetchOp => "FET",
            Self::FetchOpLo => "FLO",
            Self::FetchOpHi => "FHI",
            Self::Decode => "DEC",
            Self::MemRead => "MRD",
            Self::MemWrite => "MWR",
            Self::Execute => "EXE",
            Self::WriteBack => "WBK",
            Self::Halted => "HLT",
        }
    }
}

/// Direction of a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusDir {
    /// Memory read.
    Read,
    /// Memory write.
    Write,
    /// No transaction.
    None,
}

/// A single memory transaction issued during one micro-step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusEvent {
    /// Global cycle number at which the transaction was issued.
    pub cycle: u64,
    /// Micro-state the engine was in when it issued the transaction.
    pub state: MicroState,
    /// Transaction direction.
    pub dir: BusDir,
    /// Target address.
    pub address: u16,
    /// Byte transferred.
    pub data: u8,
    /// Short human-readable tag, e.g. `"opcode fetch"` or `"LDA mem"`.
    pub note: String,
}

/// Snapshot of the architectural state taken after one micro-step, together
/// with the bus events that step emitted in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceFrame {
    /// Cycle index of this frame; equal to its position in the timeline.
    pub cycle: u64,
    /// Program counter after the transition.
    pub pc: u16,
    /// Accumulator.
    pub a: u8,
    /// B register.
    pub b: u8,
    /// X index register.
    pub x: u8,
    /// Low byte of the stack pointer.
    pub sp: u8,
    /// Flag register.
    pub flags: Flags,
    /// Most recently latched opcode.
    pub opcode: u8,
    /// Micro-state entered by the transition.
    pub state: MicroState,
    /// Bus events emitted during this micro-step, in issue order.
    pub events: Vec<BusEvent>,
}

#[cfg(test)]
mod tests {
    use super::{BusDir, BusEvent, MicroState, TraceFrame};
    use crate::flags::Flags;

    #[test]
    fn micro_state_default_is_fetch_op() {
        assert_eq!(MicroState::default(), MicroState::FetchOp);
    }

    #[test]
    fn short_names_are_unique() {
        let all = [
            MicroState::FetchOp,
            MicroState::FetchOpLo,
            MicroState::FetchOpHi,
            MicroState::Decode,
            MicroState::MemRead,
            MicroState::MemWrite,
            MicroState::Execute,
            MicroState::WriteBack,
            MicroState::Halted,
        ];
        let names: std::collections::HashSet<_> =
            all.iter().map(|s| s.short_name()).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn frame_preserves_event_insertion_order() {
        let event = |address| BusEvent {
            cycle: 0,
            state: MicroState::Execute,
            dir: BusDir::Read,
            address,
            data: 0,
            note: String::from("test"),
        };
        let frame = TraceFrame {
            cycle: 0,
            pc: 0,
            a: 0,
            b: 0,
            x: 0,
            sp: 0,
            flags: Flags::default(),
            opcode: 0,
            state: MicroState::Execute,
            events: vec![event(0x1000), event(0x2000), event(0x3000)],
        };
        let addresses: Vec<u16> = frame.events.iter().map(|e| e.address).collect();
        assert_eq!(addresses, vec![0x1000, 0x2000, 0x3000]);
    }
}
