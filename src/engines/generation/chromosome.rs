use crate::engines::relocation::{self, JumpMetadata};
use crate::error::Result;
use crate::isa::{decode_stream, Instruction, InstructionTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chromosome representation for the machine-code search
///
/// A chromosome is a line-addressed stream of x86-64 instructions plus the
/// metadata of every relative jump inside it. Lines, not bytes, are the unit
/// of mutation: a gene is always inserted between two whole instructions,
/// and the jump map tells the relocation engine which rel32 fields must
/// grow to keep every jump landing on the same instruction.
///
/// The jump map is computed once, when the seed is decoded. After that it is
/// the single source of truth and is only ever updated incrementally by
/// [`Chromosome::insert`].
///
/// # Example
///
/// ```
/// use codevolve::engines::generation::Chromosome;
/// use codevolve::isa::InstructionTable;
///
/// let table = InstructionTable::new();
/// // push rbp; mov rbp, rsp; pop rbp; ret
/// let chromosome = Chromosome::decode(&[0x55, 0x48, 0x89, 0xE5, 0x5D, 0xC3], &table).unwrap();
/// assert_eq!(chromosome.len(), 4);
/// assert_eq!(chromosome.byte_len(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    instructions: Vec<Instruction>,
    jumps: Vec<JumpMetadata>,
}

impl Chromosome {
    /// Decode a raw byte stream and scan its jumps
    pub fn decode(code: &[u8], table: &InstructionTable) -> Result<Self> {
        Self::from_instructions(decode_stream(code, table)?)
    }

    pub fn from_instructions(instructions: Vec<Instruction>) -> Result<Self> {
        let jumps = relocation::compute_initial_jump_map(&instructions)?;
        Ok(Self { instructions, jumps })
    }

    /// Insert `gene` before `line`, relocating every jump first
    pub fn insert(&mut self, line: usize, gene: Instruction) -> Result<()> {
        relocation::remap_on_insert(line, gene.len(), &mut self.instructions, &mut self.jumps)?;
        self.instructions.insert(line, gene);
        Ok(())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn jumps(&self) -> &[JumpMetadata] {
        &self.jumps
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of encoded bytes
    pub fn byte_len(&self) -> usize {
        self.instructions.iter().map(Instruction::len).sum()
    }

    /// Flatten into executable bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for instruction in &self.instructions {
            bytes.extend_from_slice(instruction.bytes());
        }
        bytes
    }

    /// One hex string per instruction
    pub fn to_hex_lines(&self) -> Vec<String> {
        self.instructions.iter().map(Instruction::to_hex).collect()
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{:3}: {}", line, instruction)?;
        }
        Ok(())
    }
}
