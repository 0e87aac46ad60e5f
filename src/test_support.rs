//! Shared test fixtures, mirroring the per-module `#[cfg(test)]` units
//! rather than a separate integration-test crate.

#![cfg(test)]

use crate::instruction::{Instruction, Opcode};
use crate::rom::Rom;

pub fn instr(opcode: Opcode, rd_or_mask: u8, rs: u8, rt: u8, imm8: u8) -> Instruction {
    Instruction {
        opcode,
        rd_or_mask,
        rs,
        rt,
        imm8,
    }
}

pub fn rom_from_instructions(instructions: &[Instruction]) -> Rom {
    Rom::from_instructions(instructions.iter().map(Instruction::encode).collect())
}
