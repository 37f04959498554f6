//! Opcode table and decoded instruction form.
//!
//! Register operands are one byte reduced modulo the register count, literals
//! and addresses are big-endian words, except for the jump target of
//! `JMP_NOT_EQ` which is a single byte.

/// Encoding of a single operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Literal,
    Address,
    ShortAddress,
}

impl OperandKind {
    pub fn len_bytes(self) -> u8 {
        match self {
            OperandKind::Register | OperandKind::ShortAddress => 1,
            OperandKind::Literal | OperandKind::Address => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    MovLitReg = 0x10,
    MovRegReg = 0x11,
    MovRegMem = 0x12,
    MovMemReg = 0x13,
    AddRegReg = 0x14,
    JmpNotEq = 0x15,
    PshLit = 0x17,
    PshReg = 0x18,
    PopReg = 0x1A,
    CalLit = 0x5A,
    CalReg = 0x5B,
    Ret = 0x5C,
}

pub const OPCODES: [Opcode; 12] = [
    Opcode::MovLitReg,
    Opcode::MovRegReg,
    Opcode::MovRegMem,
    Opcode::MovMemReg,
    Opcode::AddRegReg,
    Opcode::JmpNotEq,
    Opcode::PshLit,
    Opcode::PshReg,
    Opcode::PopReg,
    Opcode::CalLit,
    Opcode::CalReg,
    Opcode::Ret,
];

impl Opcode {
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODES.iter().copied().find(|op| op.byte() == byte)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::MovLitReg => "MOV_LIT_REG",
            Opcode::MovRegReg => "MOV_REG_REG",
            Opcode::MovRegMem => "MOV_REG_MEM",
            Opcode::MovMemReg => "MOV_MEM_REG",
            Opcode::AddRegReg => "ADD_REG_REG",
            Opcode::JmpNotEq => "JMP_NOT_EQ",
            Opcode::PshLit => "PSH_LIT",
            Opcode::PshReg => "PSH_REG",
            Opcode::PopReg => "POP_REG",
            Opcode::CalLit => "CAL_LIT",
            Opcode::CalReg => "CAL_REG",
            Opcode::Ret => "RET",
        }
    }

    /// Operand fields in fetch order.
    pub fn operands(self) -> &'static [OperandKind] {
        use OperandKind::*;
        match self {
            Opcode::MovLitReg => &[Literal, Register],
            Opcode::MovRegReg => &[Register, Register],
            Opcode::MovRegMem => &[Register, Address],
            Opcode::MovMemReg => &[Address, Register],
            Opcode::AddRegReg => &[Register, Register],
            Opcode::JmpNotEq => &[Literal, ShortAddress],
            Opcode::PshLit => &[Literal],
            Opcode::PshReg | Opcode::PopReg => &[Register],
            Opcode::CalLit => &[Address],
            Opcode::CalReg => &[Register],
            Opcode::Ret => &[],
        }
    }

    /// Opcode byte plus operand bytes.
    pub fn encoded_len(self) -> u8 {
        1 + self
            .operands()
            .iter()
            .map(|kind| kind.len_bytes())
            .sum::<u8>()
    }
}

/// A fully decoded instruction. Register fields hold slot offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MovLitReg { value: u16, dst: usize },
    MovRegReg { src: usize, dst: usize },
    MovRegMem { src: usize, addr: u16 },
    MovMemReg { addr: u16, dst: usize },
    AddRegReg { lhs: usize, rhs: usize },
    JmpNotEq { value: u16, target: u8 },
    PshLit { value: u16 },
    PshReg { src: usize },
    PopReg { dst: usize },
    CalLit { target: u16 },
    CalReg { src: usize },
    Ret,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::MovLitReg { .. } => Opcode::MovLitReg,
            Instruction::MovRegReg { .. } => Opcode::MovRegReg,
            Instruction::MovRegMem { .. } => Opcode::MovRegMem,
            Instruction::MovMemReg { .. } => Opcode::MovMemReg,
            Instruction::AddRegReg { .. } => Opcode::AddRegReg,
            Instruction::JmpNotEq { .. } => Opcode::JmpNotEq,
            Instruction::PshLit { .. } => Opcode::PshLit,
            Instruction::PshReg { .. } => Opcode::PshReg,
            Instruction::PopReg { .. } => Opcode::PopReg,
            Instruction::CalLit { .. } => Opcode::CalLit,
            Instruction::CalReg { .. } => Opcode::CalReg,
            Instruction::Ret => Opcode::Ret,
        }
    }
}
