#![doc = r#"
Cycle-accurate functional simulator for a minimal SIMT GPU.

This crate exposes the simulator core modules for use by the `simtctl`
binary and by tests.

Modules:
- config: host-supplied sizing/timeout parameters (`DeviceConfig`)
- error: host-boundary error type (`SimError`)
- instruction / decoder: instruction encoding and control-signal decode
- alu: per-thread integer ALU
- regfile: per-thread register file
- pc_nzp: per-thread program counter and condition-code register
- lsu: per-thread load/store unit state machine
- memory / memory_controller: shared memory and channel arbitration
- thread_datapath: the private state bundle of one SIMT lane
- core: per-core fetch/decode/request/execute/update pipeline
- dispatcher: block-to-core assignment and completion tracking
- rom: instruction memory loading
- device: top-level wiring, the host-facing simulation object

In tests, shared fixtures are available under `crate::test_support`.
"#]

pub mod alu;
pub mod config;
pub mod core;
pub mod decoder;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod instruction;
pub mod lsu;
pub mod memory;
pub mod memory_controller;
pub mod pc_nzp;
pub mod regfile;
pub mod rom;
pub mod thread_datapath;

pub use config::DeviceConfig;
pub use device::Device;
pub use error::SimError;
pub use rom::Rom;

#[cfg(test)]
pub mod test_support;
