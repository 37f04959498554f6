//! Fetch/decode/execute loop and the call-frame protocol.
//!
//! A call frame, from the most recently pushed word downwards:
//!
//! ```text
//!   fp ->  (free)
//!          frame-size marker
//!          return ip
//!          r8 .. r1
//!          argument count     <- pushed by the caller
//!          arguments          <- pushed by the caller
//! ```
//!
//! The caller pushes its arguments and then their count before `CAL_*`; `RET`
//! discards both.

use log::{debug, trace};

use crate::bus::{Bus, Memory};
use crate::config::{EngineConfig, UnknownOpcodePolicy};
use crate::isa::{Instruction, Opcode};
use crate::snapshot::CpuSnapshot;
use crate::state::{resolve_operand_index, Register, RegisterFile};
use crate::{debug as diag, Error, Result};

pub struct Cpu<B: Bus = Memory> {
    registers: RegisterFile,
    memory: B,
    stack_frame_words: u16,
    config: EngineConfig,
}

impl<B: Bus> Cpu<B> {
    pub fn new(memory: B) -> Self {
        Self::with_config(memory, EngineConfig::default())
    }

    pub fn with_config(memory: B, config: EngineConfig) -> Self {
        Self {
            registers: RegisterFile::new(memory.size()),
            memory,
            stack_frame_words: 0,
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn memory(&self) -> &B {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut B {
        &mut self.memory
    }

    pub fn into_memory(self) -> B {
        self.memory
    }

    /// Words pushed since the current frame was entered.
    pub fn stack_frame_words(&self) -> u16 {
        self.stack_frame_words
    }

    pub fn reg(&self, reg: Register) -> u16 {
        self.registers.get(reg)
    }

    pub fn set_reg(&mut self, reg: Register, value: u16) {
        self.registers.set(reg, value);
    }

    pub fn fetch_byte(&mut self) -> Result<u8> {
        let ip = self.registers.get(Register::Ip);
        let byte = self.memory.read_byte(ip as u32)?;
        self.registers.set(Register::Ip, ip.wrapping_add(1));
        Ok(byte)
    }

    pub fn fetch_word(&mut self) -> Result<u16> {
        let ip = self.registers.get(Register::Ip);
        let word = self.memory.read_word(ip as u32)?;
        self.registers.set(Register::Ip, ip.wrapping_add(2));
        Ok(word)
    }

    /// Fetch a register operand byte and return its slot offset.
    pub fn fetch_register_operand(&mut self) -> Result<usize> {
        Ok(resolve_operand_index(self.fetch_byte()?))
    }

    pub fn step(&mut self) -> Result<()> {
        let opcode = self.fetch_byte()?;
        self.execute(opcode)
    }

    /// Call `step` up to `max_steps` times, stopping at the first error.
    pub fn run(&mut self, max_steps: u64) -> Result<u64> {
        for _ in 0..max_steps {
            self.step()?;
        }
        Ok(max_steps)
    }

    /// Decode the operands of `opcode` from the instruction stream and execute it.
    pub fn execute(&mut self, opcode: u8) -> Result<()> {
        let Some(op) = Opcode::from_byte(opcode) else {
            return self.unknown_opcode(opcode);
        };
        let instr = self.decode(op)?;
        self.apply(instr)
    }

    fn unknown_opcode(&mut self, opcode: u8) -> Result<()> {
        let addr = self.registers.get(Register::Ip).wrapping_sub(1);
        match self.config.unknown_opcode {
            UnknownOpcodePolicy::Strict => Err(Error::UnknownOpcode { opcode, addr }),
            UnknownOpcodePolicy::Permissive => {
                debug!("ignoring unknown opcode 0x{opcode:02X} at 0x{addr:04X}");
                Ok(())
            }
        }
    }

    pub fn decode(&mut self, op: Opcode) -> Result<Instruction> {
        Ok(match op {
            Opcode::MovLitReg => {
                let value = self.fetch_word()?;
                let dst = self.fetch_register_operand()?;
                Instruction::MovLitReg { value, dst }
            }
            Opcode::MovRegReg => {
                let src = self.fetch_register_operand()?;
                let dst = self.fetch_register_operand()?;
                Instruction::MovRegReg { src, dst }
            }
            Opcode::MovRegMem => {
                let src = self.fetch_register_operand()?;
                let addr = self.fetch_word()?;
                Instruction::MovRegMem { src, addr }
            }
            Opcode::MovMemReg => {
                let addr = self.fetch_word()?;
                let dst = self.fetch_register_operand()?;
                Instruction::MovMemReg { addr, dst }
            }
            Opcode::AddRegReg => {
                let lhs = self.fetch_register_operand()?;
                let rhs = self.fetch_register_operand()?;
                Instruction::AddRegReg { lhs, rhs }
            }
            Opcode::JmpNotEq => {
                let value = self.fetch_word()?;
                let target = self.fetch_byte()?;
                Instruction::JmpNotEq { value, target }
            }
            Opcode::PshLit => Instruction::PshLit {
                value: self.fetch_word()?,
            },
            Opcode::PshReg => Instruction::PshReg {
                src: self.fetch_register_operand()?,
            },
            Opcode::PopReg => Instruction::PopReg {
                dst: self.fetch_register_operand()?,
            },
            Opcode::CalLit => Instruction::CalLit {
                target: self.fetch_word()?,
            },
            Opcode::CalReg => Instruction::CalReg {
                src: self.fetch_register_operand()?,
            },
            Opcode::Ret => Instruction::Ret,
        })
    }

    pub fn apply(&mut self, instr: Instruction) -> Result<()> {
        match instr {
            Instruction::MovLitReg { value, dst } => {
                self.registers.write_slot(dst, value)?;
            }
            Instruction::MovRegReg { src, dst } => {
                let value = self.registers.read_slot(src)?;
                self.registers.write_slot(dst, value)?;
            }
            Instruction::MovRegMem { src, addr } => {
                let value = self.registers.read_slot(src)?;
                self.memory.write_word(addr as u32, value)?;
            }
            Instruction::MovMemReg { addr, dst } => {
                let value = self.memory.read_word(addr as u32)?;
                self.registers.write_slot(dst, value)?;
            }
            Instruction::AddRegReg { lhs, rhs } => {
                let a = self.registers.read_slot(lhs)?;
                let b = self.registers.read_slot(rhs)?;
                self.registers.set(Register::Acc, a.wrapping_add(b));
            }
            Instruction::JmpNotEq { value, target } => {
                if value != self.registers.get(Register::Acc) {
                    self.registers.set(Register::Ip, target as u16);
                }
            }
            Instruction::PshLit { value } => self.push(value)?,
            Instruction::PshReg { src } => {
                let value = self.registers.read_slot(src)?;
                self.push(value)?;
            }
            Instruction::PopReg { dst } => {
                let value = self.pop()?;
                self.registers.write_slot(dst, value)?;
            }
            Instruction::CalLit { target } => self.call(target)?,
            Instruction::CalReg { src } => {
                let target = self.registers.read_slot(src)?;
                self.call(target)?;
            }
            Instruction::Ret => self.pop_state()?,
        }
        Ok(())
    }

    fn call(&mut self, target: u16) -> Result<()> {
        self.push_state()?;
        self.registers.set(Register::Ip, target);
        Ok(())
    }

    pub fn push(&mut self, value: u16) -> Result<()> {
        let sp = self.registers.get(Register::Sp);
        self.memory.write_word(sp as u32, value)?;
        self.registers.set(Register::Sp, sp.wrapping_sub(2));
        self.stack_frame_words = self.stack_frame_words.wrapping_add(1);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        // The read address is not wrapped: popping past the top word must fault.
        let addr = u32::from(self.registers.get(Register::Sp)) + 2;
        let value = self.memory.read_word(addr)?;
        self.registers.set(Register::Sp, addr as u16);
        self.stack_frame_words = self.stack_frame_words.wrapping_sub(1);
        Ok(value)
    }

    /// Call prologue: save `r1..r8`, the return address and the frame-size marker.
    pub fn push_state(&mut self) -> Result<()> {
        for reg in Register::SAVED {
            self.push(self.registers.get(reg))?;
        }
        self.push(self.registers.get(Register::Ip))?;
        // The marker counts itself, on top of everything pushed so far in this frame.
        let marker = self.stack_frame_words.wrapping_add(2);
        self.push(marker)?;

        let sp = self.registers.get(Register::Sp);
        self.registers.set(Register::Fp, sp);
        self.stack_frame_words = 0;
        trace!(
            "call frame fp=0x{sp:04X} marker={marker} ret=0x{ret:04X}",
            ret = self.registers.get(Register::Ip)
        );
        Ok(())
    }

    /// Return epilogue: unwind the frame at `fp` and drop the caller's arguments.
    pub fn pop_state(&mut self) -> Result<()> {
        let frame = self.registers.get(Register::Fp);
        self.registers.set(Register::Sp, frame);

        let marker = self.pop()?;
        self.stack_frame_words = marker;

        let ret = self.pop()?;
        self.registers.set(Register::Ip, ret);
        for reg in Register::SAVED.iter().rev() {
            let value = self.pop()?;
            self.registers.set(*reg, value);
        }

        let arg_count = self.pop()?;
        for _ in 0..arg_count {
            self.pop()?;
        }

        let fp = frame.wrapping_add(marker);
        self.registers.set(Register::Fp, fp);
        trace!("return to 0x{ret:04X} args={arg_count} fp=0x{fp:04X}");
        Ok(())
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot::capture(&self.registers, self.stack_frame_words)
    }

    pub fn restore(&mut self, snapshot: &CpuSnapshot) {
        snapshot.apply(&mut self.registers);
        self.stack_frame_words = snapshot.stack_frame_words;
    }

    pub fn register_dump(&self) -> String {
        diag::register_dump(&self.registers)
    }

    pub fn memory_window(&self, addr: u32, len: usize) -> Result<String> {
        diag::memory_window(&self.memory, addr, len)
    }
}
