use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use simt_core::config::DeviceConfig;
use simt_core::device::Device;
use simt_core::error::SimError;
use simt_core::rom::Rom;

#[derive(Parser)]
#[command(name = "simtctl", about = "Cycle-accurate SIMT GPU simulator")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG still wins
    /// if set explicitly.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load a DeviceConfig from a TOML file, overriding the built-in
    /// defaults before any per-flag overrides are applied.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a ROM, run a kernel to completion, and dump final state.
    Run {
        #[arg(long)]
        rom: PathBuf,
        #[arg(long)]
        threads: u32,
        #[arg(long)]
        memory: Option<PathBuf>,
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Advance a fixed number of cycles and print the state bus.
    Step {
        #[arg(long)]
        rom: PathBuf,
        #[arg(long)]
        threads: u32,
        #[arg(long)]
        cycles: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        tracing_subscriber::EnvFilter::new(match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<DeviceConfig> {
    match path {
        None => Ok(DeviceConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text).context("parsing config file")
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Run {
            rom,
            threads,
            memory,
            max_cycles,
        } => run_to_completion(config, rom, threads, memory, max_cycles),
        Command::Step {
            rom,
            threads,
            cycles,
        } => step(config, rom, threads, cycles),
    }
}

fn load_rom(path: &PathBuf) -> Result<Rom> {
    let bytes = fs::read(path).with_context(|| format!("reading ROM file {}", path.display()))?;
    Rom::from_bytes(&bytes).context("parsing ROM image")
}

fn run_to_completion(
    mut config: DeviceConfig,
    rom_path: PathBuf,
    threads: u32,
    memory_path: Option<PathBuf>,
    max_cycles: Option<u64>,
) -> Result<ExitCode> {
    if let Some(max_cycles) = max_cycles {
        config.max_cycles = max_cycles;
    }

    let rom = load_rom(&rom_path)?;
    let mut device = Device::new(config);
    device.load_rom(rom);
    if let Some(path) = memory_path {
        let image = fs::read(&path).with_context(|| format!("reading memory image {}", path.display()))?;
        device.load_memory_image(&image);
    }
    device.start(threads).context("launching kernel")?;

    match device.run_to_completion() {
        Ok(cycles) => {
            println!("done after {cycles} cycles");
            for (addr, byte) in device.memory().dump().iter().enumerate() {
                if *byte != 0 {
                    println!("mem[{addr:#04x}] = {byte:#04x}");
                }
            }
            Ok(ExitCode::from(0))
        }
        Err(err @ SimError::Timeout { .. }) => {
            eprintln!("error: {err}");
            Ok(ExitCode::from(1))
        }
        Err(err) => Err(err.into()),
    }
}

fn step(config: DeviceConfig, rom_path: PathBuf, threads: u32, cycles: u64) -> Result<ExitCode> {
    let rom = load_rom(&rom_path)?;
    let mut device = Device::new(config);
    device.load_rom(rom);
    device.start(threads).context("launching kernel")?;

    for _ in 0..cycles {
        device.step();
        println!("cycle {} done={}", device.cycle(), device.done());
        if device.done() {
            break;
        }
    }
    Ok(ExitCode::from(0))
}

fn exit_code_for(_err: &anyhow::Error) -> ExitCode {
    ExitCode::from(2)
}
