use crate::config::MutationConfig;
use crate::engines::generation::chromosome::Chromosome;
use crate::error::{CodevolveError, Result};
use crate::isa::{GeneGenerator, Instruction, InstructionTable};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// What a single mutation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub line: usize,
    pub gene: Instruction,
}

/// Insertion mutation: one random gene at one random line
pub struct Mutator {
    generator: GeneGenerator,
    config: MutationConfig,
}

impl Mutator {
    pub fn new(table: Arc<InstructionTable>, config: MutationConfig) -> Self {
        Self {
            generator: GeneGenerator::new(table),
            config,
        }
    }

    /// Lines a gene may be inserted before, honoring both margins
    pub fn insertion_range(&self, len: usize) -> Result<RangeInclusive<usize>> {
        let head = self.config.head_margin;
        let tail = self.config.tail_margin;

        match len.checked_sub(tail) {
            Some(last) if head <= last => Ok(head..=last),
            _ => Err(CodevolveError::NoInsertionPoint { len, head, tail }),
        }
    }

    /// Mutate `chromosome` in place. Callers pass a copy, never a parent.
    pub fn mutate<R: Rng>(&self, chromosome: &mut Chromosome, rng: &mut R) -> Result<MutationRecord> {
        let line = rng.gen_range(self.insertion_range(chromosome.len())?);
        let gene = self.generator.generate(rng)?;

        chromosome.insert(line, gene.clone())?;
        Ok(MutationRecord { line, gene })
    }
}
