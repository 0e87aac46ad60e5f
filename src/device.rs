//! Top-level wiring: dispatcher + cores + shared memory controller + ROM.
//! This is the host-facing simulation object; everything below it only
//! ever sees its own inputs for one `tick`.

use tracing::{debug, info, instrument, warn};

use crate::config::DeviceConfig;
use crate::core::Core;
use crate::dispatcher::Dispatcher;
use crate::error::SimError;
use crate::memory::Memory;
use crate::memory_controller::MemoryController;
use crate::rom::Rom;

pub struct Device {
    config: DeviceConfig,
    cores: Vec<Core>,
    dispatcher: Dispatcher,
    memory_controller: MemoryController,
    memory: Memory,
    rom: Rom,
    cycle: u64,
    done: bool,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Self {
        let num_cores = config.num_cores as usize;
        Device {
            cores: (0..num_cores)
                .map(|_| Core::new(config.threads_per_block))
                .collect(),
            dispatcher: Dispatcher::new(num_cores, config.threads_per_block),
            memory_controller: MemoryController::new(
                config.num_channels as usize,
                config.num_consumers(),
            ),
            memory: Memory::new(),
            rom: Rom::from_instructions(Vec::new()),
            cycle: 0,
            done: false,
            config,
        }
    }

    pub fn load_rom(&mut self, rom: Rom) {
        self.rom = rom;
    }

    pub fn load_memory_image(&mut self, image: &[u8]) {
        self.memory.load_image(image);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Read a register out of a specific core/lane. Exposed for the CLI's
    /// `step` dump and for end-to-end tests; the pipeline itself never
    /// reaches across cores like this.
    pub fn core_register(&self, core: usize, lane: usize, addr: u8) -> u8 {
        self.cores[core].lane_register(lane, addr)
    }

    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        for core in &mut self.cores {
            core.tick(true, None, &self.rom, &vec![Default::default(); self.config.threads_per_block as usize]);
        }
        self.memory_controller.reset();
        self.cycle = 0;
        self.done = false;
        debug!("device reset");
    }

    /// Launch a kernel over `total_threads` hardware threads.
    #[instrument(skip(self))]
    pub fn start(&mut self, total_threads: u32) -> Result<(), SimError> {
        if total_threads == 0 {
            return Err(SimError::Misconfigured(
                "thread_count must be nonzero".to_string(),
            ));
        }
        self.dispatcher.launch(total_threads);
        self.done = false;
        info!(total_threads, "kernel launched");
        Ok(())
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Advance the whole device by exactly one cycle.
    pub fn step(&mut self) {
        let core_idle: Vec<bool> = self.cores.iter().map(|c| c.is_idle()).collect();
        let (assignments, just_finished) = self.dispatcher.tick(&core_idle);

        let mut requests_per_core = Vec::with_capacity(self.cores.len());
        for core in &self.cores {
            requests_per_core.push(core.gather_requests());
        }
        let flat_requests: Vec<_> = requests_per_core.iter().flatten().copied().collect();
        let flat_results = self
            .memory_controller
            .tick(&flat_requests, &mut self.memory);

        let threads_per_block = self.config.threads_per_block as usize;
        for (i, core) in self.cores.iter_mut().enumerate() {
            let lo = i * threads_per_block;
            let hi = lo + threads_per_block;
            core.tick(false, assignments[i], &self.rom, &flat_results[lo..hi]);
        }

        self.cycle += 1;
        if just_finished {
            self.done = true;
            info!(cycle = self.cycle, "kernel completed");
        }
    }

    /// Run until `done()` or the configured cycle budget is exhausted.
    #[instrument(skip(self))]
    pub fn run_to_completion(&mut self) -> Result<u64, SimError> {
        while !self.done {
            if self.cycle >= self.config.max_cycles {
                warn!(cycles = self.cycle, "kernel exceeded cycle budget");
                return Err(SimError::Timeout {
                    cycles: self.config.max_cycles,
                });
            }
            self.step();
        }
        Ok(self.cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;
    use crate::test_support::{instr, rom_from_instructions};

    fn ret_only_rom() -> Rom {
        rom_from_instructions(&[instr(Opcode::Ret, 0, 0, 0, 0)])
    }

    #[test]
    fn single_block_single_instruction_run_completes() {
        let mut device = Device::new(DeviceConfig {
            threads_per_block: 2,
            num_cores: 1,
            num_channels: 1,
            max_cycles: 100,
        });
        device.load_rom(ret_only_rom());
        device.start(2).unwrap();
        let cycles = device.run_to_completion().unwrap();
        assert!(device.done());
        assert!(cycles > 0);
    }

    #[test]
    fn start_with_zero_threads_is_misconfigured() {
        let mut device = Device::new(DeviceConfig::default());
        device.load_rom(ret_only_rom());
        assert!(matches!(
            device.start(0),
            Err(SimError::Misconfigured(_))
        ));
    }

    #[test]
    fn timeout_when_rom_never_retires() {
        // NOP forever: no RET, core never returns to idle.
        let rom = Rom::from_instructions(vec![0u16]);
        let mut device = Device::new(DeviceConfig {
            threads_per_block: 1,
            num_cores: 1,
            num_channels: 1,
            max_cycles: 20,
        });
        device.load_rom(rom);
        device.start(1).unwrap();
        let err = device.run_to_completion().unwrap_err();
        assert!(matches!(err, SimError::Timeout { cycles: 20 }));
    }

    #[test]
    fn ldr_str_round_trip_through_shared_memory() {
        // STR: mem[R1] <- R0 ; LDR: R2 <- mem[R1] ; RET
        let rom = rom_from_instructions(&[
            instr(Opcode::Const, 0, 0, 0, 0x2A),
            instr(Opcode::Const, 1, 0, 0, 0x10),
            instr(Opcode::Str, 0, 1, 0, 0),
            instr(Opcode::Ldr, 2, 1, 0, 0),
            instr(Opcode::Ret, 0, 0, 0, 0),
        ]);
        let mut device = Device::new(DeviceConfig {
            threads_per_block: 1,
            num_cores: 1,
            num_channels: 1,
            max_cycles: 100,
        });
        device.load_rom(rom);
        device.start(1).unwrap();
        device.run_to_completion().unwrap();
        assert_eq!(device.memory().read(0x10), 0x2A);
    }

    #[test]
    fn branch_taken_skips_the_fallthrough_instruction() {
        // CONST R0,#5 ; CONST R1,#5 ; CMP R0,R1 ; BR Z,#5 ; CONST R2,#99 ; RET
        let rom = rom_from_instructions(&[
            instr(Opcode::Const, 0, 0, 0, 5),
            instr(Opcode::Const, 1, 0, 0, 5),
            instr(Opcode::Cmp, 0, 0, 1, 0),
            instr(Opcode::Br, 0b010, 0, 0, 5), // Z
            instr(Opcode::Const, 2, 0, 0, 99),
            instr(Opcode::Ret, 0, 0, 0, 0),
        ]);
        let mut device = Device::new(DeviceConfig {
            threads_per_block: 1,
            num_cores: 1,
            num_channels: 1,
            max_cycles: 100,
        });
        device.load_rom(rom);
        device.start(1).unwrap();
        while !device.done() {
            device.step();
        }
        assert_eq!(device.core_register(0, 0, 2), 0, "skipped CONST must not have run");
    }

    #[test]
    fn two_blocks_on_one_core_run_sequentially() {
        let mut device = Device::new(DeviceConfig {
            threads_per_block: 2,
            num_cores: 1,
            num_channels: 1,
            max_cycles: 200,
        });
        device.load_rom(ret_only_rom());
        device.start(4).unwrap();
        let cycles = device.run_to_completion().unwrap();
        assert!(device.done());
        assert!(cycles > 0);
    }
}
