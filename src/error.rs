use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodevolveError {
    #[error("Unknown opcode 0x{opcode:02X}")]
    UnknownOpcode { opcode: u8 },

    #[error("Empty instruction")]
    EmptyInstruction,

    #[error("Truncated instruction at byte {offset}: expected {expected} bytes, {available} available")]
    TruncatedInstruction {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("Instruction 0x{opcode:02X} declares {declared} bytes but carries {actual}")]
    LengthMismatch {
        opcode: u8,
        declared: usize,
        actual: usize,
    },

    #[error("Jump at line {line} leaves the instruction stream")]
    JumpOutOfRange { line: usize },

    #[error("Jump at line {line} no longer fits a 32-bit displacement")]
    DisplacementOverflow { line: usize },

    #[error("No insertion point in a stream of {len} lines with margins {head}/{tail}")]
    NoInsertionPoint { len: usize, head: usize, tail: usize },

    #[error("Seed file {path:?} could not be opened: {source}")]
    MissingSeedFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodevolveError>;
