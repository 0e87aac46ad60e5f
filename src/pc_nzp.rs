//! Per-thread program counter and condition-code register.
//!
//! `next_pc` is computed combinationally during `EXECUTE`; the core
//! commits it into `pc` (and, if `nzp_we` fired, commits the new NZP
//! triple) once the instruction retires — see [`crate::core::Core`] for
//! why that commit point is chosen over a literal per-stage latch.

#[derive(Debug, Clone, Copy, Default)]
pub struct PcNzp {
    pc: u8,
    next_pc: u8,
    nzp: u8,
}

impl PcNzp {
    pub fn new() -> Self {
        PcNzp {
            pc: 0,
            next_pc: 0,
            nzp: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn pc(&self) -> u8 {
        self.pc
    }

    #[inline]
    pub fn nzp(&self) -> u8 {
        self.nzp
    }

    /// EXECUTE-stage combinational next-PC computation. `branch_flags` is
    /// always thread-0's NZP register: the fetcher/decoder run once per
    /// core, so a divergent per-thread branch decision isn't
    /// representable — every thread takes the branch thread 0's flags
    /// decide.
    pub fn compute_next_pc(&mut self, next_pc_mux: bool, nzp_mask: u8, imm8: u8, branch_flags: u8) {
        self.next_pc = if next_pc_mux && (branch_flags & nzp_mask) != 0 {
            imm8
        } else {
            self.pc.wrapping_add(1)
        };
    }

    /// Commit `next_pc` into `pc`, and the ALU-derived NZP bits into `nzp`
    /// if this instruction wrote the condition register.
    pub fn commit(&mut self, nzp_we: bool, alu_out: u8) {
        self.pc = self.next_pc;
        if nzp_we {
            self.nzp = alu_out & 0b111;
        }
    }
}
