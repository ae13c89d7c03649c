
//! Specialized binary input and output.
//! Uses the error handling for this crate.

pub use ::std::io::{Read, Write};
use lebe::prelude::*;
use crate::error::{Result, UnitResult};


/// The byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {

    /// Use the default of the image, which is most significant byte first.
    Undefined,

    /// Least significant byte first.
    Lsb,

    /// Most significant byte first.
    Msb,
}

impl Default for Endianness {
    fn default() -> Self { Endianness::Undefined }
}

impl Endianness {

    /// Whether samples are stored with the least significant byte first.
    /// Anything but `Lsb` is stored most significant byte first.
    #[inline]
    pub fn is_little(self) -> bool {
        self == Endianness::Lsb
    }
}


/// Write the lowest `byte_count` bytes of `value` in the specified byte order.
/// Byte counts other than 1, 2, 4 and 8 are written byte by byte.
pub fn write_unsigned(write: &mut impl Write, endian: Endianness, byte_count: usize, value: u64) -> UnitResult {
    debug_assert!(byte_count >= 1 && byte_count <= 8, "invalid sample byte count");

    match (byte_count, endian.is_little()) {
        (1, _) => write.write_as_little_endian(&(value as u8))?,
        (2, true) => write.write_as_little_endian(&(value as u16))?,
        (2, false) => write.write_as_big_endian(&(value as u16))?,
        (4, true) => write.write_as_little_endian(&(value as u32))?,
        (4, false) => write.write_as_big_endian(&(value as u32))?,
        (8, true) => write.write_as_little_endian(&value)?,
        (8, false) => write.write_as_big_endian(&value)?,

        (count, true) => for index in 0 .. count {
            write.write_as_little_endian(&((value >> (8 * index)) as u8))?;
        },

        (count, false) => for index in (0 .. count).rev() {
            write.write_as_little_endian(&((value >> (8 * index)) as u8))?;
        },
    }

    Ok(())
}

/// Read `byte_count` bytes in the specified byte order.
/// Counterpart of `write_unsigned`.
pub fn read_unsigned(read: &mut impl Read, endian: Endianness, byte_count: usize) -> Result<u64> {
    debug_assert!(byte_count >= 1 && byte_count <= 8, "invalid sample byte count");

    Ok(match (byte_count, endian.is_little()) {
        (1, _) => u64::from(u8::read_from_little_endian(read)?),
        (2, true) => u64::from(u16::read_from_little_endian(read)?),
        (2, false) => u64::from(u16::read_from_big_endian(read)?),
        (4, true) => u64::from(u32::read_from_little_endian(read)?),
        (4, false) => u64::from(u32::read_from_big_endian(read)?),
        (8, true) => u64::read_from_little_endian(read)?,
        (8, false) => u64::read_from_big_endian(read)?,

        (count, true) => {
            let mut value = 0_u64;
            for index in 0 .. count {
                value |= u64::from(u8::read_from_little_endian(read)?) << (8 * index);
            }

            value
        },

        (count, false) => {
            let mut value = 0_u64;
            for _ in 0 .. count {
                value = (value << 8) | u64::from(u8::read_from_little_endian(read)?);
            }

            value
        },
    })
}


/// Keep track of what byte we are at.
/// Used to report how many bytes a codec produced.
#[derive(Debug)]
pub struct Tracking<T> {

    /// Do not expose to prevent writing without updating position
    inner: T,

    position: usize,
}

impl<T: Read> Read for Tracking<T> {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let count = self.inner.read(buffer)?;
        self.position += count;
        Ok(count)
    }
}

impl<T: Write> Write for Tracking<T> {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        let count = self.inner.write(buffer)?;
        self.position += count;
        Ok(count)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T> Tracking<T> {

    /// Wrap a byte sink or source.
    pub fn new(inner: T) -> Self {
        Tracking { inner, position: 0 }
    }

    /// Current number of bytes written or read.
    pub fn byte_position(&self) -> usize {
        self.position
    }

    /// Return the wrapped sink or source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn odd_byte_counts(){
        let mut bytes = Vec::new();
        write_unsigned(&mut bytes, Endianness::Msb, 3, 0x01_02_03).unwrap();
        write_unsigned(&mut bytes, Endianness::Lsb, 3, 0x01_02_03).unwrap();
        assert_eq!(bytes, vec![ 1, 2, 3, 3, 2, 1 ]);

        let mut read = bytes.as_slice();
        assert_eq!(read_unsigned(&mut read, Endianness::Msb, 3).unwrap(), 0x01_02_03);
        assert_eq!(read_unsigned(&mut read, Endianness::Lsb, 3).unwrap(), 0x01_02_03);
        assert!(read_unsigned(&mut read, Endianness::Lsb, 1).is_err());
    }

    #[test]
    fn undefined_is_big_endian(){
        let mut bytes = Vec::new();
        write_unsigned(&mut bytes, Endianness::Undefined, 2, 0xABCD).unwrap();
        write_unsigned(&mut bytes, Endianness::Undefined, 4, u64::from(1.0_f32.to_bits())).unwrap();
        assert_eq!(bytes, vec![ 0xAB, 0xCD, 0x3F, 0x80, 0, 0 ]);
    }

    #[test]
    fn tracking_counts_bytes(){
        let mut tracking = Tracking::new(Vec::new());
        tracking.write_all(&[ 1, 2, 3 ]).unwrap();
        assert_eq!(tracking.byte_position(), 3);
        assert_eq!(tracking.into_inner(), vec![ 1, 2, 3 ]);
    }
}
