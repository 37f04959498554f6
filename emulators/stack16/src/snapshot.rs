use serde::{Deserialize, Serialize};

use crate::state::{Register, RegisterFile};

/// Serializable copy of the architectural state (registers plus frame counter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub ip: u16,
    pub acc: u16,
    pub r1: u16,
    pub r2: u16,
    pub r3: u16,
    pub r4: u16,
    pub r5: u16,
    pub r6: u16,
    pub r7: u16,
    pub r8: u16,
    pub sp: u16,
    pub fp: u16,
    #[serde(default)]
    pub stack_frame_words: u16,
}

impl CpuSnapshot {
    pub fn capture(registers: &RegisterFile, stack_frame_words: u16) -> Self {
        let mut snap = Self {
            stack_frame_words,
            ..Self::default()
        };
        for (reg, value) in registers.iter() {
            *snap.slot_mut(reg) = value;
        }
        snap
    }

    pub fn apply(&self, registers: &mut RegisterFile) {
        for reg in Register::ALL {
            registers.set(reg, self.get(reg));
        }
    }

    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::Ip => self.ip,
            Register::Acc => self.acc,
            Register::R1 => self.r1,
            Register::R2 => self.r2,
            Register::R3 => self.r3,
            Register::R4 => self.r4,
            Register::R5 => self.r5,
            Register::R6 => self.r6,
            Register::R7 => self.r7,
            Register::R8 => self.r8,
            Register::Sp => self.sp,
            Register::Fp => self.fp,
        }
    }

    fn slot_mut(&mut self, reg: Register) -> &mut u16 {
        match reg {
            Register::Ip => &mut self.ip,
            Register::Acc => &mut self.acc,
            Register::R1 => &mut self.r1,
            Register::R2 => &mut self.r2,
            Register::R3 => &mut self.r3,
            Register::R4 => &mut self.r4,
            Register::R5 => &mut self.r5,
            Register::R6 => &mut self.r6,
            Register::R7 => &mut self.r7,
            Register::R8 => &mut self.r8,
            Register::Sp => &mut self.sp,
            Register::Fp => &mut self.fp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_reads_every_register() {
        let mut regs = RegisterFile::new(0x100);
        regs.set(Register::R5, 0x5555);
        regs.set(Register::Acc, 0x0A0A);
        let snap = CpuSnapshot::capture(&regs, 3);
        assert_eq!(snap.r5, 0x5555);
        assert_eq!(snap.acc, 0x0A0A);
        assert_eq!(snap.sp, 0x00FE);
        assert_eq!(snap.stack_frame_words, 3);
    }

    #[test]
    fn json_uses_register_names() {
        let snap = CpuSnapshot {
            ip: 6,
            r1: 0x1234,
            ..CpuSnapshot::default()
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["ip"], 6);
        assert_eq!(json["r1"], 0x1234);

        let parsed: CpuSnapshot = serde_json::from_str(
            r#"{"ip":1,"acc":2,"r1":0,"r2":0,"r3":0,"r4":0,"r5":0,"r6":0,"r7":0,"r8":0,"sp":254,"fp":254}"#,
        )
        .unwrap();
        assert_eq!(parsed.acc, 2);
        assert_eq!(parsed.stack_frame_words, 0);
    }
}
