use super::table::InstructionTable;
use crate::error::{CodevolveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest legal x86 encoding
pub const MAX_INSTRUCTION_LEN: usize = 15;

/// Relative control-transfer forms carrying a rel32 in their last four bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpKind {
    /// `E9 rel32`
    Near,
    /// `0F 8x rel32`
    Conditional,
}

/// A single machine instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    bytes: Vec<u8>,
}

impl Instruction {
    /// Build an instruction, checking its size against the table
    pub fn new(bytes: Vec<u8>, table: &InstructionTable) -> Result<Self> {
        let declared = table.length_of(&bytes)?;
        if declared != bytes.len() || bytes.len() > MAX_INSTRUCTION_LEN {
            return Err(CodevolveError::LengthMismatch {
                opcode: bytes[0],
                declared,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn jump_kind(&self) -> Option<JumpKind> {
        match self.bytes.as_slice() {
            [0xE9, _, _, _, _] => Some(JumpKind::Near),
            [0x0F, cc, _, _, _, _] if (0x80..=0x8F).contains(cc) => Some(JumpKind::Conditional),
            _ => None,
        }
    }

    /// Decoded rel32 of a jump
    pub fn displacement(&self) -> Option<i32> {
        self.jump_kind()?;
        let field = self.displacement_field();
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[field..]);
        Some(i32::from_le_bytes(raw))
    }

    /// Rewrite the rel32 of a jump in place. Returns false for non-jumps.
    pub(crate) fn set_displacement(&mut self, displacement: i32) -> bool {
        if self.jump_kind().is_none() {
            return false;
        }
        let field = self.displacement_field();
        self.bytes[field..].copy_from_slice(&displacement.to_le_bytes());
        true
    }

    // The field is the trailing four bytes of this instruction's own encoding.
    fn displacement_field(&self) -> usize {
        self.bytes.len() - 4
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Split a raw byte stream into instructions using the table
pub fn decode_stream(code: &[u8], table: &InstructionTable) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while offset < code.len() {
        let length = table.length_of(&code[offset..]).map_err(|e| {
            log::error!("Cannot decode byte 0x{:02X} at offset {}", code[offset], offset);
            e
        })?;

        let available = code.len() - offset;
        if length > available {
            return Err(CodevolveError::TruncatedInstruction {
                offset,
                expected: length,
                available,
            });
        }

        instructions.push(Instruction::new(code[offset..offset + length].to_vec(), table)?);
        offset += length;
    }

    Ok(instructions)
}
