use crate::{Error, Result};

/// Byte-addressable store seen by the engine.
///
/// Words are big-endian: the most significant byte lives at the lower address.
/// The default word accessors are built on the byte accessors, so an
/// implementation only has to provide `size`, `read_byte` and `write_byte`.
pub trait Bus {
    fn size(&self) -> usize;
    fn read_byte(&self, addr: u32) -> Result<u8>;
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()>;

    fn read_word(&self, addr: u32) -> Result<u16> {
        check_range(addr, 2, self.size())?;
        let hi = self.read_byte(addr)?;
        let lo = self.read_byte(addr + 1)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn write_word(&mut self, addr: u32, value: u16) -> Result<()> {
        check_range(addr, 2, self.size())?;
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(addr, hi)?;
        self.write_byte(addr + 1, lo)
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read_byte(&self, addr: u32) -> Result<u8> {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        (**self).write_byte(addr, value)
    }

    fn read_word(&self, addr: u32) -> Result<u16> {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: u32, value: u16) -> Result<()> {
        (**self).write_word(addr, value)
    }
}

/// Fails unless `addr..addr + width` lies inside a store of `size` bytes.
pub(crate) fn check_range(addr: u32, width: u8, size: usize) -> Result<usize> {
    let start = addr as usize;
    match start.checked_add(width as usize) {
        Some(end) if end <= size => Ok(start),
        _ => Err(Error::OutOfBounds { addr, width, size }),
    }
}

fn clamp_width(len: usize) -> u8 {
    len.min(u8::MAX as usize) as u8
}

/// Fixed-size, zero-initialised memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Copy a program image to `start`. Nothing is written if the image does not fit.
    pub fn load(&mut self, start: u32, image: &[u8]) -> Result<()> {
        let begin = start as usize;
        let end = begin
            .checked_add(image.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Error::OutOfBounds {
                addr: start,
                width: clamp_width(image.len()),
                size: self.bytes.len(),
            })?;
        self.bytes[begin..end].copy_from_slice(image);
        Ok(())
    }

    /// Borrow `len` bytes starting at `addr`.
    pub fn slice(&self, addr: u32, len: usize) -> Result<&[u8]> {
        let begin = addr as usize;
        let end = begin
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Error::OutOfBounds {
                addr,
                width: clamp_width(len),
                size: self.bytes.len(),
            })?;
        Ok(&self.bytes[begin..end])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Bus for Memory {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&self, addr: u32) -> Result<u8> {
        let index = check_range(addr, 1, self.bytes.len())?;
        Ok(self.bytes[index])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        let index = check_range(addr, 1, self.bytes.len())?;
        self.bytes[index] = value;
        Ok(())
    }

    fn read_word(&self, addr: u32) -> Result<u16> {
        let index = check_range(addr, 2, self.bytes.len())?;
        Ok(u16::from_be_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    fn write_word(&mut self, addr: u32, value: u16) -> Result<()> {
        let index = check_range(addr, 2, self.bytes.len())?;
        self.bytes[index..index + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_memory_is_zeroed() {
        let mem = Memory::new(8);
        assert_eq!(mem.size(), 8);
        assert!(mem.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn words_are_big_endian() {
        let mut mem = Memory::new(4);
        mem.write_word(1, 0xABCD).unwrap();
        assert_eq!(mem.read_byte(1).unwrap(), 0xAB);
        assert_eq!(mem.read_byte(2).unwrap(), 0xCD);
        assert_eq!(mem.read_word(1).unwrap(), 0xABCD);
    }

    #[test]
    fn word_at_last_byte_is_out_of_bounds() {
        let mut mem = Memory::new(4);
        assert!(mem.read_word(2).is_ok());
        assert_eq!(
            mem.read_word(3),
            Err(Error::OutOfBounds {
                addr: 3,
                width: 2,
                size: 4
            })
        );
        assert!(mem.write_word(3, 1).is_err());
        // A failed word write must not touch the last byte.
        assert_eq!(mem.read_byte(3).unwrap(), 0);
    }

    #[test]
    fn byte_access_past_end_fails() {
        let mut mem = Memory::new(4);
        assert!(mem.read_byte(4).is_err());
        assert!(mem.write_byte(u32::MAX, 1).is_err());
    }

    #[test]
    fn load_rejects_images_that_do_not_fit() {
        let mut mem = Memory::new(4);
        assert!(mem.load(2, &[1, 2, 3]).is_err());
        assert_eq!(mem.as_bytes(), &[0, 0, 0, 0]);
        mem.load(1, &[1, 2, 3]).unwrap();
        assert_eq!(mem.as_bytes(), &[0, 1, 2, 3]);
    }

    #[test]
    fn mutable_reference_is_a_bus() {
        fn poke<B: Bus>(mut bus: B) {
            bus.write_word(0, 0x1234).unwrap();
        }

        let mut mem = Memory::new(4);
        poke(&mut mem);
        assert_eq!(mem.slice(0, 2).unwrap(), &[0x12, 0x34]);
    }
}
