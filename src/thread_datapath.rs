//! Everything a single SIMT lane owns privately: its register file,
//! program counter / condition codes, and load/store unit. The
//! instruction stream, decoder, and ALU control are shared per-core and
//! live on [`crate::core::Core`] instead.

use crate::lsu::Lsu;
use crate::pc_nzp::PcNzp;
use crate::regfile::RegisterFile;

#[derive(Debug, Clone, Copy)]
pub struct ThreadDatapath {
    pub regs: RegisterFile,
    pub pc_nzp: PcNzp,
    pub lsu: Lsu,
    /// Whether this lane is active for the currently-assigned block. A
    /// core may be handed fewer threads than `threads_per_block` on the
    /// last block of a dispatch; inactive lanes sit out every stage and
    /// never block the UPDATE barrier.
    pub active: bool,
}

impl ThreadDatapath {
    pub fn new() -> Self {
        ThreadDatapath {
            regs: RegisterFile::new(0, 0, 0),
            pc_nzp: PcNzp::new(),
            lsu: Lsu::new(),
            active: false,
        }
    }

    /// Called by the core when a new block is assigned.
    pub fn on_block_start(&mut self, block_id: u8, thread_id: u8, threads_per_block: u8) {
        self.regs = RegisterFile::new(block_id, thread_id, threads_per_block);
        self.pc_nzp.reset();
        self.lsu.reset();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.lsu.reset();
    }
}

impl Default for ThreadDatapath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lane_starts_inactive() {
        let lane = ThreadDatapath::new();
        assert!(!lane.active);
    }

    #[test]
    fn block_start_seeds_geometry_registers() {
        let mut lane = ThreadDatapath::new();
        lane.on_block_start(2, 3, 4);
        assert!(lane.active);
        assert_eq!(lane.regs.read(crate::regfile::REG_BLOCK_ID), 2);
        assert_eq!(lane.regs.read(crate::regfile::REG_THREAD_ID), 3);
        assert_eq!(lane.regs.read(crate::regfile::REG_THREADS_PER_BLOCK), 4);
    }
}
