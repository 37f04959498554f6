use std::fmt;
use std::str::FromStr;

use crate::bus::check_range;
use crate::{Error, Result};

/// Architectural registers, in slot order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Register {
    Ip,
    Acc,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    Sp,
    Fp,
}

impl Register {
    pub const COUNT: usize = 12;

    pub const ALL: [Register; Register::COUNT] = [
        Register::Ip,
        Register::Acc,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
        Register::Sp,
        Register::Fp,
    ];

    /// General purpose registers saved by a call frame, in push order.
    pub const SAVED: [Register; 8] = [
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Byte offset of the register's slot in the register buffer.
    pub fn offset(self) -> usize {
        self.index() * 2
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Ip => "ip",
            Register::Acc => "acc",
            Register::R1 => "r1",
            Register::R2 => "r2",
            Register::R3 => "r3",
            Register::R4 => "r4",
            Register::R5 => "r5",
            Register::R6 => "r6",
            Register::R7 => "r7",
            Register::R8 => "r8",
            Register::Sp => "sp",
            Register::Fp => "fp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_ascii_lowercase();
        Register::ALL
            .iter()
            .copied()
            .find(|reg| reg.name() == lowered)
            .ok_or_else(|| Error::UnknownRegister(s.to_string()))
    }
}

/// Map a raw register operand byte to a slot offset.
///
/// Out-of-range encodings wrap onto a real register instead of failing.
pub fn resolve_operand_index(raw: u8) -> usize {
    (raw as usize % Register::COUNT) * 2
}

/// Twelve 16-bit registers stored big-endian in a private 24-byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    slots: [[u8; 2]; Register::COUNT],
}

impl RegisterFile {
    /// Zeroed registers with `sp`/`fp` at the top word of a memory of `memory_size` bytes.
    pub fn new(memory_size: usize) -> Self {
        let mut regs = Self {
            slots: [[0; 2]; Register::COUNT],
        };
        let top = (memory_size as u32).wrapping_sub(2) as u16;
        regs.set(Register::Sp, top);
        regs.set(Register::Fp, top);
        regs
    }

    pub fn get(&self, reg: Register) -> u16 {
        u16::from_be_bytes(self.slots[reg.index()])
    }

    pub fn set(&mut self, reg: Register, value: u16) {
        self.slots[reg.index()] = value.to_be_bytes();
    }

    pub fn get_named(&self, name: &str) -> Result<u16> {
        Ok(self.get(name.parse()?))
    }

    /// Store `value mod 2^16` in the named register.
    pub fn set_named(&mut self, name: &str, value: u32) -> Result<()> {
        let reg: Register = name.parse()?;
        self.set(reg, value as u16);
        Ok(())
    }

    /// Read the slot at a byte offset produced by [`resolve_operand_index`].
    pub fn read_slot(&self, offset: usize) -> Result<u16> {
        let at = check_range(offset as u32, 2, self.as_bytes().len())?;
        let bytes = self.as_bytes();
        Ok(u16::from_be_bytes([bytes[at], bytes[at + 1]]))
    }

    pub fn write_slot(&mut self, offset: usize, value: u16) -> Result<()> {
        let at = check_range(offset as u32, 2, self.as_bytes().len())?;
        self.slots.as_flattened_mut()[at..at + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.slots.as_flattened()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
        Register::ALL.iter().map(move |reg| (*reg, self.get(*reg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_registers_start_at_top_word() {
        let regs = RegisterFile::new(256);
        assert_eq!(regs.get(Register::Sp), 0x00FE);
        assert_eq!(regs.get(Register::Fp), 0x00FE);
        assert_eq!(regs.get(Register::Ip), 0);
        assert_eq!(regs.get(Register::Acc), 0);
    }

    #[test]
    fn full_address_space_puts_stack_at_fffe() {
        let regs = RegisterFile::new(0x1_0000);
        assert_eq!(regs.get(Register::Sp), 0xFFFE);
    }

    #[test]
    fn slots_are_big_endian_at_index_times_two() {
        let mut regs = RegisterFile::new(16);
        regs.set(Register::R1, 0x1234);
        assert_eq!(Register::R1.offset(), 4);
        assert_eq!(&regs.as_bytes()[4..6], &[0x12, 0x34]);
        assert_eq!(regs.read_slot(4).unwrap(), 0x1234);
    }

    #[test]
    fn typed_and_slot_access_share_storage() {
        let mut regs = RegisterFile::new(16);
        for reg in Register::ALL {
            regs.set(reg, 0xA000 | reg.index() as u16);
        }
        for reg in Register::ALL {
            assert_eq!(regs.get(reg), 0xA000 | reg.index() as u16);
            assert_eq!(regs.read_slot(reg.offset()), Ok(regs.get(reg)));
        }
        regs.write_slot(Register::Fp.offset(), 0xBEEF).unwrap();
        assert_eq!(regs.get(Register::Fp), 0xBEEF);
        assert_eq!(&regs.as_bytes()[22..], &[0xBE, 0xEF]);
    }

    #[test]
    fn named_access_wraps_and_rejects_unknown_names() {
        let mut regs = RegisterFile::new(16);
        regs.set_named("acc", 0x1_0005).unwrap();
        assert_eq!(regs.get_named("ACC").unwrap(), 0x0005);
        assert_eq!(
            regs.get_named("r9"),
            Err(Error::UnknownRegister("r9".into()))
        );
        assert!(regs.set_named("pc", 1).is_err());
    }

    #[test]
    fn operand_index_wraps_modulo_register_count() {
        assert_eq!(resolve_operand_index(0), 0);
        assert_eq!(resolve_operand_index(12), resolve_operand_index(0));
        assert_eq!(resolve_operand_index(13), resolve_operand_index(1));
        assert_eq!(resolve_operand_index(0xFF), (0xFF % 12) * 2);
    }

    #[test]
    fn slot_outside_buffer_is_out_of_bounds() {
        let regs = RegisterFile::new(16);
        assert!(regs.read_slot(22).is_ok());
        assert!(matches!(
            regs.read_slot(23),
            Err(Error::OutOfBounds { size: 24, .. })
        ));
    }

    #[test]
    fn names_round_trip() {
        for reg in Register::ALL {
            assert_eq!(reg.to_string().parse::<Register>().unwrap(), reg);
            assert_eq!(Register::from_index(reg.index()), Some(reg));
        }
    }
}
