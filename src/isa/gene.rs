use super::instruction::Instruction;
use super::table::InstructionTable;
use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const REX_W: u8 = 0b0100_1000;
const REX_R: u8 = 0b0000_0100;
const REX_X: u8 = 0b0000_0010;
const REX_B: u8 = 0b0000_0001;
const MODRM_DIRECT: u8 = 0b1100_0000;

/// General-purpose register, numbered by its hardware encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register(u8);

impl Register {
    pub const RAX: Register = Register(0);
    pub const RCX: Register = Register(1);
    pub const RDX: Register = Register(2);
    pub const RBX: Register = Register(3);
    pub const RSP: Register = Register(4);
    pub const RBP: Register = Register(5);
    pub const RSI: Register = Register(6);
    pub const RDI: Register = Register(7);

    /// `index` must be below 16
    pub fn new(index: u8) -> Option<Self> {
        (index < 16).then_some(Register(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    fn low(&self) -> u8 {
        self.0 & 0x7
    }

    fn extended(&self) -> bool {
        self.0 & 0x8 != 0
    }

    /// Registers a gene may touch: everything but the accumulator and the stack/frame pointers
    pub fn mutable() -> Vec<Register> {
        (0..16)
            .map(Register)
            .filter(|r| ![Register::RAX, Register::RSP, Register::RBP].contains(r))
            .collect()
    }
}

/// Instruction shapes a gene can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneShape {
    Inc,
    Dec,
    CmpReg,
    XorReg,
    XorImm,
    AddReg,
    AddImm,
    Bswap,
    Not,
    Neg,
    /// neg with the ignored REX.X bit set
    NegAlt,
    AndReg,
    AndImm,
    OrReg,
    OrImm,
    Clc,
}

impl GeneShape {
    pub const ALL: [GeneShape; 16] = [
        GeneShape::Inc,
        GeneShape::Dec,
        GeneShape::CmpReg,
        GeneShape::XorReg,
        GeneShape::XorImm,
        GeneShape::AddReg,
        GeneShape::AddImm,
        GeneShape::Bswap,
        GeneShape::Not,
        GeneShape::Neg,
        GeneShape::NegAlt,
        GeneShape::AndReg,
        GeneShape::AndImm,
        GeneShape::OrReg,
        GeneShape::OrImm,
        GeneShape::Clc,
    ];

    pub fn takes_immediate(&self) -> bool {
        matches!(
            self,
            GeneShape::XorImm | GeneShape::AddImm | GeneShape::AndImm | GeneShape::OrImm
        )
    }
}

/// Fully determined gene: shape plus operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSpec {
    pub shape: GeneShape,
    pub dst: Register,
    pub src: Register,
    pub imm: u32,
}

impl GeneSpec {
    /// Machine encoding of this gene
    pub fn encode(&self) -> Vec<u8> {
        let dst = self.dst;
        let src = self.src;

        match self.shape {
            GeneShape::Inc => unary(0xFF, 0, dst),
            GeneShape::Dec => unary(0xFF, 1, dst),
            GeneShape::Not => unary(0xF7, 2, dst),
            GeneShape::Neg => unary(0xF7, 3, dst),
            GeneShape::NegAlt => {
                let mut bytes = unary(0xF7, 3, dst);
                bytes[0] |= REX_X;
                bytes
            }
            GeneShape::CmpReg => binary(0x39, dst, src),
            GeneShape::XorReg => binary(0x31, dst, src),
            GeneShape::AddReg => binary(0x01, dst, src),
            GeneShape::AndReg => binary(0x21, dst, src),
            GeneShape::OrReg => binary(0x09, dst, src),
            GeneShape::AddImm => immediate(0x05, 0, dst, self.imm),
            GeneShape::OrImm => immediate(0x0D, 1, dst, self.imm),
            GeneShape::AndImm => immediate(0x25, 4, dst, self.imm),
            GeneShape::XorImm => immediate(0x35, 6, dst, self.imm),
            GeneShape::Bswap => vec![rex(None, dst), 0x0F, 0xC8 | dst.low()],
            GeneShape::Clc => vec![0xF8],
        }
    }
}

fn rex(reg: Option<Register>, rm: Register) -> u8 {
    let mut prefix = REX_W;
    if reg.is_some_and(|r| r.extended()) {
        prefix |= REX_R;
    }
    if rm.extended() {
        prefix |= REX_B;
    }
    prefix
}

// op r/m64 with a /digit extension in the reg field
fn unary(opcode: u8, digit: u8, dst: Register) -> Vec<u8> {
    vec![rex(None, dst), opcode, MODRM_DIRECT | (digit << 3) | dst.low()]
}

// op r/m64, r64
fn binary(opcode: u8, dst: Register, src: Register) -> Vec<u8> {
    vec![
        rex(Some(src), dst),
        opcode,
        MODRM_DIRECT | (src.low() << 3) | dst.low(),
    ]
}

// op r/m64, imm32, or the short accumulator form when dst is rax
fn immediate(short_opcode: u8, digit: u8, dst: Register, imm: u32) -> Vec<u8> {
    let mut bytes = if dst == Register::RAX {
        vec![REX_W, short_opcode]
    } else {
        unary(0x81, digit, dst)
    };
    bytes.extend_from_slice(&imm.to_le_bytes());
    bytes
}

/// Produces random, table-valid genes
pub struct GeneGenerator {
    table: Arc<InstructionTable>,
    registers: Vec<Register>,
}

impl GeneGenerator {
    pub fn new(table: Arc<InstructionTable>) -> Self {
        Self {
            table,
            registers: Register::mutable(),
        }
    }

    /// Draw shape, operands and immediate uniformly
    pub fn random_spec<R: Rng>(&self, rng: &mut R) -> GeneSpec {
        let shape = GeneShape::ALL[rng.gen_range(0..GeneShape::ALL.len())];
        let dst = self.registers[rng.gen_range(0..self.registers.len())];
        let src = self.registers[rng.gen_range(0..self.registers.len())];

        GeneSpec {
            shape,
            dst,
            src,
            imm: rng.gen(),
        }
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Instruction> {
        let spec = self.random_spec(rng);
        self.build(&spec)
    }

    /// Encode a spec and validate it against the table
    pub fn build(&self, spec: &GeneSpec) -> Result<Instruction> {
        Instruction::new(spec.encode(), &self.table)
    }
}
