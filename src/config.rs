//! Host-supplied sizing and timeout parameters.
//!
//! Threads-per-block and the memory controller's channel count are
//! architecturally fixed at hardware-build time, but we keep them as
//! runtime configuration instead (a `DeviceConfig`, serializable so it
//! can round-trip through a config file) so the same binary can be
//! exercised against different grid shapes without a rebuild.

use serde::{Deserialize, Serialize};

/// Default threads per block.
pub const DEFAULT_THREADS_PER_BLOCK: u8 = 4;
/// Default memory controller channel count.
pub const DEFAULT_NUM_CHANNELS: u8 = 2;
/// Default core count. Two is the smallest count that still exercises
/// the dispatcher's multi-core assignment loop.
pub const DEFAULT_NUM_CORES: u8 = 2;
/// Default host-side cycle budget before a kernel is declared hung.
pub const DEFAULT_MAX_CYCLES: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Threads per block (`B`).
    #[serde(default = "default_threads_per_block")]
    pub threads_per_block: u8,
    /// Number of cores dispatched across.
    #[serde(default = "default_num_cores")]
    pub num_cores: u8,
    /// Number of memory controller channels (`K`).
    #[serde(default = "default_num_channels")]
    pub num_channels: u8,
    /// Host-side cycle budget; `Device::run_to_completion` raises
    /// `SimError::Timeout` past this many ticks.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
}

fn default_threads_per_block() -> u8 {
    DEFAULT_THREADS_PER_BLOCK
}
fn default_num_cores() -> u8 {
    DEFAULT_NUM_CORES
}
fn default_num_channels() -> u8 {
    DEFAULT_NUM_CHANNELS
}
fn default_max_cycles() -> u64 {
    DEFAULT_MAX_CYCLES
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            threads_per_block: DEFAULT_THREADS_PER_BLOCK,
            num_cores: DEFAULT_NUM_CORES,
            num_channels: DEFAULT_NUM_CHANNELS,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl DeviceConfig {
    /// Total number of memory-controller consumers (one LSU per hardware
    /// thread across every core).
    pub fn num_consumers(&self) -> usize {
        self.num_cores as usize * self.threads_per_block as usize
    }
}
