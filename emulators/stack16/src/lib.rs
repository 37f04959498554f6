//! Emulator core for a small 16-bit register/stack machine.
//!
//! The machine has twelve 16-bit registers, a flat byte-addressable memory that
//! holds both code and the downward-growing stack, and a call convention that
//! saves `r1..r8` and the return address in a frame on the stack. There is no
//! halt instruction; the driver decides how many times to call [`Cpu::step`].

use thiserror::Error;

pub mod bus;
pub mod config;
pub mod debug;
pub mod eval;
pub mod isa;
pub mod snapshot;
pub mod state;

pub use bus::{Bus, Memory};
pub use config::{EngineConfig, UnknownOpcodePolicy};
pub use eval::Cpu;
pub use isa::{Instruction, Opcode, OperandKind, OPCODES};
pub use snapshot::CpuSnapshot;
pub use state::{resolve_operand_index, Register, RegisterFile};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("access of {width} byte(s) at 0x{addr:04X} outside memory of {size} bytes")]
    OutOfBounds { addr: u32, width: u8, size: usize },
    #[error("no such register '{0}'")]
    UnknownRegister(String),
    #[error("unknown opcode 0x{opcode:02X} at 0x{addr:04X}")]
    UnknownOpcode { opcode: u8, addr: u16 },
}
