//! One SIMT core: a single shared fetch/decode stream driving a bank of
//! [`ThreadDatapath`] lanes in lockstep.
//!
//! `IDLE -> FETCH -> DECODE -> REQUEST -> EXECUTE -> UPDATE -> FETCH ...`
//! `UPDATE` is the global memory barrier: the core cannot retire the
//! instruction (register write-back, PC/NZP commit) until every active
//! lane's LSU has settled into `Idle` or `Done`. A lane whose instruction
//! never touched memory stays `Idle` and is vacuously past the barrier —
//! it never blocks a warp-mate that did issue a request.
//!
//! The LSU half of each lane is *not* only advanced during `UPDATE`: a
//! memory request issued at `REQUEST` must keep handshaking with the
//! controller while the core is still in `EXECUTE`, so every call to
//! [`Core::tick`] advances every active lane's LSU first, and only then
//! steps the core's own stage.

use crate::alu::Alu;
use crate::decoder::{DecodedControl, RfMux};
use crate::dispatcher::BlockAssignment;
use crate::instruction::Instruction;
use crate::lsu::{LsuState, MemOp};
use crate::memory_controller::{ConsumerRequest, ConsumerTick};
use crate::rom::Rom;
use crate::thread_datapath::ThreadDatapath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    Idle,
    Fetch,
    Decode,
    Request,
    Execute,
    Update,
}

pub struct Core {
    state: CoreState,
    lanes: Vec<ThreadDatapath>,
    alu_out: Vec<u8>,
    instr: Instruction,
    ctrl: DecodedControl,
}

impl Core {
    pub fn new(threads_per_block: u8) -> Self {
        let n = threads_per_block as usize;
        Core {
            state: CoreState::Idle,
            lanes: vec![ThreadDatapath::new(); n],
            alu_out: vec![0u8; n],
            instr: Instruction::decode(0),
            ctrl: DecodedControl::decode(Instruction::decode(0)),
        }
    }

    #[inline]
    pub fn state(&self) -> CoreState {
        self.state
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == CoreState::Idle
    }

    /// Read a lane's general-purpose register. Exposed for host-side
    /// inspection (the CLI's `step` dump and end-to-end tests); not used
    /// by the pipeline itself.
    pub fn lane_register(&self, lane: usize, addr: u8) -> u8 {
        self.lanes[lane].regs.read(addr)
    }

    /// Requests from every active lane currently in the LSU `Requesting`
    /// state, for the device to fold into this cycle's memory-controller
    /// arbitration.
    pub fn gather_requests(&self) -> Vec<Option<ConsumerRequest>> {
        self.lanes
            .iter()
            .map(|lane| {
                if !lane.active {
                    return None;
                }
                lane.lsu
                    .request()
                    .map(|(op, addr, write_data)| ConsumerRequest {
                        op,
                        addr,
                        write_data,
                    })
            })
            .collect()
    }

    fn to_idle(&mut self) {
        self.state = CoreState::Idle;
        for lane in &mut self.lanes {
            lane.deactivate();
        }
    }

    pub fn tick(
        &mut self,
        reset: bool,
        assignment: Option<BlockAssignment>,
        rom: &Rom,
        lsu_results: &[ConsumerTick],
    ) {
        if reset {
            self.to_idle();
            return;
        }

        for (lane, result) in self.lanes.iter_mut().zip(lsu_results) {
            if lane.active {
                lane.lsu.tick(result.accepted, result.completion);
            }
        }

        match self.state {
            CoreState::Idle => {
                if let Some(assignment) = assignment {
                    for (i, lane) in self.lanes.iter_mut().enumerate() {
                        if (i as u8) < assignment.thread_count {
                            lane.on_block_start(assignment.block_id, i as u8, assignment.thread_count);
                        } else {
                            lane.deactivate();
                        }
                    }
                    self.state = CoreState::Fetch;
                }
            }
            CoreState::Fetch => {
                let pc = self.lanes[0].pc_nzp.pc();
                self.instr = Instruction::decode(rom.read(pc));
                tracing::trace!(pc, opcode = ?self.instr.opcode, "fetched instruction");
                self.state = CoreState::Decode;
            }
            CoreState::Decode => {
                self.ctrl = DecodedControl::decode(self.instr);
                self.state = CoreState::Request;
            }
            CoreState::Request => {
                for lane in self.lanes.iter_mut().filter(|l| l.active) {
                    if self.ctrl.mem_re || self.ctrl.mem_we {
                        let addr = lane.regs.read(self.ctrl.rs);
                        let write_data = lane.regs.read(self.ctrl.rt);
                        let op = if self.ctrl.mem_re {
                            MemOp::Read
                        } else {
                            MemOp::Write
                        };
                        lane.lsu.begin(op, addr, write_data);
                    }
                }
                self.state = CoreState::Execute;
            }
            CoreState::Execute => {
                let branch_flags = self.lanes[0].pc_nzp.nzp();
                for (lane, alu_out) in self.lanes.iter_mut().zip(self.alu_out.iter_mut()) {
                    if !lane.active {
                        continue;
                    }
                    let rs = lane.regs.read(self.ctrl.rs);
                    let rt = lane.regs.read(self.ctrl.rt);
                    *alu_out = if self.ctrl.alu_out_mux_nzp {
                        Alu::compare(rs, rt)
                    } else {
                        Alu::compute(self.ctrl.alu_ctrl, rs, rt)
                    };
                    lane.pc_nzp.compute_next_pc(
                        self.ctrl.next_pc_mux,
                        self.ctrl.nzp_mask,
                        self.ctrl.imm8,
                        branch_flags,
                    );
                }
                self.state = CoreState::Update;
            }
            CoreState::Update => {
                let barrier_clear = self.lanes.iter().all(|lane| {
                    !lane.active
                        || matches!(lane.lsu.state(), LsuState::Idle | LsuState::Done)
                });
                if !barrier_clear {
                    tracing::trace!("stalled at UPDATE barrier");
                    return;
                }

                for (lane, alu_out) in self.lanes.iter_mut().zip(self.alu_out.iter()) {
                    if !lane.active {
                        continue;
                    }
                    if self.ctrl.rf_we {
                        let value = match self.ctrl.rf_mux {
                            RfMux::Alu => *alu_out,
                            RfMux::Lsu => lane.lsu.result(),
                            RfMux::Imm => self.ctrl.imm8,
                        };
                        lane.regs.write(self.ctrl.rd, value);
                    }
                    lane.pc_nzp.commit(self.ctrl.nzp_we, *alu_out);
                    lane.lsu.clear();
                }

                if self.ctrl.decoded_ret {
                    self.to_idle();
                } else {
                    self.state = CoreState::Fetch;
                }
            }
        }
    }
}
