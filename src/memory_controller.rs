//! Shared memory arbitration across up to `num_channels` channels and
//! `num_consumers` per-thread LSUs.
//!
//! Each channel is its own small FSM; on every tick existing channels are
//! advanced first (in ascending channel-index order), and only then are
//! freshly-Idle channels handed to the highest-priority (lowest index)
//! outstanding consumer request that hasn't already been claimed this
//! round. That ordering, plus the `served` bitmap, is what guarantees a
//! consumer is never served by more than one channel at once, and that
//! no more than `num_channels` requests are ever in flight together.

use crate::lsu::MemOp;
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Idle,
    Processing,
    Waiting,
    Completion,
}

#[derive(Debug, Clone, Copy)]
struct Channel {
    state: ChannelState,
    consumer: Option<usize>,
    op: MemOp,
    addr: u8,
    write_data: u8,
    result: u8,
}

impl Channel {
    fn idle() -> Self {
        Channel {
            state: ChannelState::Idle,
            consumer: None,
            op: MemOp::Read,
            addr: 0,
            write_data: 0,
            result: 0,
        }
    }
}

/// A pending memory request as seen from an LSU in the `Requesting` state.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerRequest {
    pub op: MemOp,
    pub addr: u8,
    pub write_data: u8,
}

/// Per-consumer outcome of a single controller tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerTick {
    pub accepted: bool,
    pub completion: Option<u8>,
}

pub struct MemoryController {
    channels: Vec<Channel>,
    served: Vec<bool>,
}

impl MemoryController {
    pub fn new(num_channels: usize, num_consumers: usize) -> Self {
        MemoryController {
            channels: vec![Channel::idle(); num_channels],
            served: vec![false; num_consumers],
        }
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            *ch = Channel::idle();
        }
        for s in &mut self.served {
            *s = false;
        }
    }

    #[cfg(test)]
    fn channels_busy(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.state != ChannelState::Idle)
            .count()
    }

    /// `requests[i]` is `Some` iff consumer `i`'s LSU is in `Requesting`
    /// this cycle. Returns one [`ConsumerTick`] per consumer.
    pub fn tick(
        &mut self,
        requests: &[Option<ConsumerRequest>],
        memory: &mut Memory,
    ) -> Vec<ConsumerTick> {
        let mut results = vec![ConsumerTick::default(); requests.len()];

        // Advance existing channels, lowest index first.
        for ch in &mut self.channels {
            match ch.state {
                ChannelState::Idle => {}
                ChannelState::Processing => {
                    match ch.op {
                        MemOp::Read => ch.result = memory.read(ch.addr),
                        MemOp::Write => {
                            memory.write(ch.addr, ch.write_data);
                            ch.result = 0;
                        }
                    }
                    ch.state = ChannelState::Waiting;
                }
                ChannelState::Waiting => {
                    let consumer = ch.consumer.expect("Waiting channel always has a consumer");
                    results[consumer].completion = Some(ch.result);
                    ch.state = ChannelState::Completion;
                }
                ChannelState::Completion => {
                    if let Some(consumer) = ch.consumer {
                        tracing::trace!(consumer, "releasing served bitmap entry");
                        self.served[consumer] = false;
                    }
                    *ch = Channel::idle();
                }
            }
        }

        // Assign newly-Idle channels to outstanding requests, priority by
        // ascending consumer index, landing on the lowest-index free
        // channel.
        let pending = requests
            .iter()
            .enumerate()
            .filter(|(c, r)| r.is_some() && !self.served[*c])
            .count();
        if pending > self.channels.len() {
            tracing::debug!(
                pending,
                num_channels = self.channels.len(),
                "more consumers requesting than channels available this cycle"
            );
        }

        for (consumer, request) in requests.iter().enumerate() {
            let Some(request) = request else { continue };
            if self.served[consumer] {
                continue;
            }
            let Some(ch) = self
                .channels
                .iter_mut()
                .find(|c| c.state == ChannelState::Idle)
            else {
                break;
            };
            ch.state = ChannelState::Processing;
            ch.consumer = Some(consumer);
            ch.op = request.op;
            ch.addr = request.addr;
            ch.write_data = request.write_data;
            self.served[consumer] = true;
            results[consumer].accepted = true;
            tracing::trace!(consumer, "claiming served bitmap entry");
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(op: MemOp, addr: u8) -> Option<ConsumerRequest> {
        Some(ConsumerRequest {
            op,
            addr,
            write_data: 0,
        })
    }

    #[test]
    fn single_read_round_trip() {
        let mut mem = Memory::new();
        mem.write(5, 77);
        let mut mc = MemoryController::new(1, 1);

        let r0 = mc.tick(&[req(MemOp::Read, 5)], &mut mem);
        assert!(r0[0].accepted);
        assert_eq!(r0[0].completion, None);

        let r1 = mc.tick(&[None], &mut mem);
        assert_eq!(r1[0].completion, None);

        let r2 = mc.tick(&[None], &mut mem);
        assert_eq!(r2[0].completion, Some(77));

        let r3 = mc.tick(&[None], &mut mem);
        assert_eq!(r3[0].completion, None);
        assert_eq!(mc.channels_busy(), 0);
    }

    #[test]
    fn write_commits_to_memory_during_processing() {
        let mut mem = Memory::new();
        let mut mc = MemoryController::new(1, 1);
        mc.tick(
            &[Some(ConsumerRequest {
                op: MemOp::Write,
                addr: 9,
                write_data: 42,
            })],
            &mut mem,
        );
        mc.tick(&[None], &mut mem);
        assert_eq!(mem.read(9), 42);
    }

    #[test]
    fn contention_serves_lowest_index_consumer_first() {
        let mut mem = Memory::new();
        let mut mc = MemoryController::new(1, 2);
        let r0 = mc.tick(&[req(MemOp::Read, 0), req(MemOp::Read, 1)], &mut mem);
        assert!(r0[0].accepted);
        assert!(!r0[1].accepted);

        // consumer 1 keeps asking; only served once channel frees up.
        let r1 = mc.tick(&[None, req(MemOp::Read, 1)], &mut mem);
        assert!(!r1[1].accepted, "channel still busy with consumer 0");
    }

    #[test]
    fn never_more_than_num_channels_busy_at_once() {
        let mut mem = Memory::new();
        let mut mc = MemoryController::new(2, 4);
        let all = [
            req(MemOp::Read, 0),
            req(MemOp::Read, 1),
            req(MemOp::Read, 2),
            req(MemOp::Read, 3),
        ];
        mc.tick(&all, &mut mem);
        assert!(mc.channels_busy() <= 2);
    }

    #[test]
    fn served_consumer_not_reassigned_while_in_flight() {
        let mut mem = Memory::new();
        let mut mc = MemoryController::new(2, 1);
        let r0 = mc.tick(&[req(MemOp::Read, 0)], &mut mem);
        assert!(r0[0].accepted);
        // Even though a second channel is free, the consumer isn't
        // re-accepted while still being served by channel 0.
        let r1 = mc.tick(&[req(MemOp::Read, 0)], &mut mem);
        assert!(!r1[0].accepted);
    }
}
