use crate::error::{CodevolveError, Result};
use std::collections::HashMap;
use std::fmt;

/// Lookup key for an instruction length.
///
/// Most opcodes are identified by their first byte. REX-prefixed forms
/// (`0x40..=0x4F`) are identified by the prefix together with the byte
/// that follows it, so `REX.W 0F C8+r` (bswap) and `0F 83 rel32` (jae)
/// do not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeKey {
    Plain(u8),
    Rex { prefix: u8, opcode: u8 },
}

impl OpcodeKey {
    /// Extract the key from the leading bytes of an instruction
    pub fn of(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [] => Err(CodevolveError::EmptyInstruction),
            [prefix, opcode, ..] if is_rex(*prefix) => Ok(OpcodeKey::Rex {
                prefix: *prefix,
                opcode: *opcode,
            }),
            [first, ..] => Ok(OpcodeKey::Plain(*first)),
        }
    }

    /// First byte of the encoding
    pub fn lead(&self) -> u8 {
        match self {
            OpcodeKey::Plain(opcode) => *opcode,
            OpcodeKey::Rex { prefix, .. } => *prefix,
        }
    }
}

impl fmt::Display for OpcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeKey::Plain(opcode) => write!(f, "{:02X}", opcode),
            OpcodeKey::Rex { prefix, opcode } => write!(f, "{:02X} {:02X}", prefix, opcode),
        }
    }
}

pub fn is_rex(byte: u8) -> bool {
    (0x40..=0x4F).contains(&byte)
}

/// Static byte lengths of the supported x86-64 subset
pub struct InstructionTable {
    plain: HashMap<u8, u8>,
    rex: HashMap<u8, u8>,
}

impl InstructionTable {
    pub fn new() -> Self {
        let mut table = Self {
            plain: HashMap::new(),
            rex: HashMap::new(),
        };
        table.register_plain();
        table.register_rex();
        table
    }

    /// Byte length of the instruction starting at `bytes[0]`
    pub fn length_of(&self, bytes: &[u8]) -> Result<usize> {
        self.length_of_key(OpcodeKey::of(bytes)?)
    }

    pub fn length_of_key(&self, key: OpcodeKey) -> Result<usize> {
        let length = match key {
            OpcodeKey::Plain(opcode) => self.plain.get(&opcode),
            OpcodeKey::Rex { opcode, .. } => self.rex.get(&opcode),
        };

        length
            .map(|&len| len as usize)
            .ok_or(CodevolveError::UnknownOpcode { opcode: key.lead() })
    }

    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.length_of(bytes).is_ok()
    }

    fn register_plain(&mut self) {
        // push r64 / pop r64
        for opcode in 0x50..=0x5F {
            self.plain.insert(opcode, 1);
        }
        self.plain.insert(0xC3, 1); // ret
        self.plain.insert(0xF8, 1); // clc
        self.plain.insert(0x66, 4); // mov r16, imm16
        self.plain.insert(0xE9, 5); // jmp rel32
        self.plain.insert(0x0F, 6); // jcc rel32
    }

    fn register_rex(&mut self) {
        // push/pop r8..r15
        for opcode in 0x50..=0x5F {
            self.rex.insert(opcode, 2);
        }

        // op r/m64, r64 and unary /digit forms: prefix, opcode, modrm
        for opcode in [0x01, 0x09, 0x21, 0x31, 0x39, 0x89, 0xF7, 0xFF] {
            self.rex.insert(opcode, 3);
        }
        self.rex.insert(0x0F, 3); // bswap: prefix, 0F, C8+r

        // accumulator short forms: prefix, opcode, imm32
        for opcode in [0x05, 0x0D, 0x25, 0x35] {
            self.rex.insert(opcode, 6);
        }

        self.rex.insert(0x81, 7); // op r/m64, imm32
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::new()
    }
}
