//! Read-only renderings of machine state for humans.

use crate::bus::Bus;
use crate::state::RegisterFile;
use crate::Result;

/// One `name: 0xNNNN` line per register, in slot order.
pub fn register_dump(registers: &RegisterFile) -> String {
    registers
        .iter()
        .map(|(reg, value)| format!("{reg}: 0x{value:04x}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `0xAAAA: 0xNN 0xNN ...` for `len` bytes starting at `addr`.
pub fn memory_window<B: Bus + ?Sized>(bus: &B, addr: u32, len: usize) -> Result<String> {
    let bytes = (0..len)
        .map(|i| bus.read_byte(addr.wrapping_add(i as u32)))
        .collect::<Result<Vec<_>>>()?;
    let hex = bytes
        .iter()
        .map(|byte| format!("0x{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(format!("0x{addr:04x}: {hex}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Memory;
    use crate::state::Register;

    #[test]
    fn register_dump_lists_all_registers() {
        let mut regs = RegisterFile::new(0x100);
        regs.set(Register::Acc, 0x68AC);
        let dump = register_dump(&regs);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "ip: 0x0000");
        assert_eq!(lines[1], "acc: 0x68ac");
        assert_eq!(lines[11], "fp: 0x00fe");
    }

    #[test]
    fn memory_window_renders_bytes() {
        let mut mem = Memory::new(8);
        mem.load(2, &[0x10, 0x12, 0x34]).unwrap();
        assert_eq!(
            memory_window(&mem, 2, 4).unwrap(),
            "0x0002: 0x10 0x12 0x34 0x00"
        );
        assert_eq!(memory_window(&mem, 8, 0).unwrap(), "0x0008: ");
    }

    #[test]
    fn memory_window_past_end_fails_without_side_effects() {
        let mem = Memory::new(8);
        let before = mem.clone();
        assert!(memory_window(&mem, 6, 4).is_err());
        assert_eq!(mem, before);
    }
}
