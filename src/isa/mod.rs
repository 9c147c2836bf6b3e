pub mod gene;
pub mod instruction;
pub mod table;

pub use gene::{GeneGenerator, GeneShape, GeneSpec, Register};
pub use instruction::{decode_stream, Instruction, JumpKind, MAX_INSTRUCTION_LEN};
pub use table::{InstructionTable, OpcodeKey};
