
//! Bit level reading and writing, most significant bit first.
//! Used by the fax and LZW codecs.

use bit_field::BitField;
use std::io::{ErrorKind, Read, Write};
use crate::error::{Result, UnitResult};


/// Collects bits into bytes and writes each completed byte to the inner sink.
#[derive(Debug)]
pub struct BitWriter<W> {
    write: W,
    accumulator: u32,
    bit_count: u32,
}

impl<W: Write> BitWriter<W> {

    /// Start writing bits to the sink.
    pub fn new(write: W) -> Self {
        BitWriter { write, accumulator: 0, bit_count: 0 }
    }

    /// Emit a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> UnitResult {
        self.write_bits(u32::from(bit), 1)
    }

    /// Emit the lowest `length` bits of `code`, most significant first.
    #[inline]
    pub fn write_bits(&mut self, code: u32, length: u32) -> UnitResult {
        debug_assert!(length <= 24, "bit code too long");

        self.accumulator = (self.accumulator << length) | (code & low_bits(length));
        self.bit_count += length;

        while self.bit_count >= 8 {
            self.bit_count -= 8;
            self.write.write_all(&[ (self.accumulator >> self.bit_count) as u8 ])?;
        }

        self.accumulator &= low_bits(self.bit_count);
        Ok(())
    }

    /// Whether no partial byte is pending.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// Write the pending partial byte, padded with zero bits, and return the sink.
    pub fn finish(mut self) -> Result<W> {
        if self.bit_count != 0 {
            let byte = (self.accumulator << (8 - self.bit_count)) as u8;
            self.write.write_all(&[ byte ])?;
        }

        Ok(self.write)
    }
}

#[inline]
fn low_bits(count: u32) -> u32 {
    if count >= 32 { u32::MAX } else { (1 << count) - 1 }
}


/// Reads bits one by one from a byte source.
/// The end of the input is reported as `None`,
/// which is distinct from a zero bit.
#[derive(Debug)]
pub struct BitReader<R> {
    read: R,
    byte: u8,
    remaining_bits: usize,
    exhausted: bool,
}

impl<R: Read> BitReader<R> {

    /// Start reading bits from the source.
    pub fn new(read: R) -> Self {
        BitReader { read, byte: 0, remaining_bits: 0, exhausted: false }
    }

    /// Returns `None` once the source has no more bytes.
    #[inline]
    pub fn next_bit(&mut self) -> Result<Option<bool>> {
        if self.remaining_bits == 0 {
            match self.next_byte()? {
                Some(byte) => {
                    self.byte = byte;
                    self.remaining_bits = 8;
                },

                None => return Ok(None),
            }
        }

        self.remaining_bits -= 1;
        Ok(Some(self.byte.get_bit(self.remaining_bits)))
    }

    /// Whether the end of the source has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut byte = [0_u8];
        loop {
            match self.read.read(&mut byte) {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(None);
                },

                Ok(_) => return Ok(Some(byte[0])),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_msb_first(){
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bit(true).unwrap();
        writer.write_bits(0b0000_0001, 8).unwrap();
        assert!(!writer.is_byte_aligned());

        writer.write_bits(0x1FF, 9).unwrap();
        let bytes = writer.finish().unwrap();

        // 1 00000001 111111111 + 6 padding zeros
        assert_eq!(bytes, vec![ 0b1000_0000, 0b1111_1111, 0b1100_0000 ]);
    }

    #[test]
    fn read_until_exhausted(){
        let bytes: &[u8] = &[ 0b1010_0000 ];
        let mut reader = BitReader::new(bytes);

        let mut bits = Vec::new();
        while let Some(bit) = reader.next_bit().unwrap() {
            bits.push(bit);
        }

        assert_eq!(bits, vec![ true, false, true, false, false, false, false, false ]);
        assert!(reader.is_exhausted());
        assert_eq!(reader.next_bit().unwrap(), None);
    }

    #[test]
    fn write_then_read(){
        let mut writer = BitWriter::new(Vec::new());
        for length in 1 ..= 13 {
            writer.write_bits(0x1555, length).unwrap();
        }

        let bytes = writer.finish().unwrap();
        let mut reader = BitReader::new(bytes.as_slice());

        for length in 1 ..= 13_u32 {
            let mut code = 0;
            for _ in 0 .. length {
                code = (code << 1) | u32::from(reader.next_bit().unwrap().unwrap());
            }

            assert_eq!(code, 0x1555 & ((1 << length) - 1), "length {}", length);
        }
    }
}
