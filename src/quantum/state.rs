
//! The transient state of a packing pass:
//! a bit accumulator for samples that do not fill whole bytes,
//! and cursors that write samples into or read samples from one packed row.

use crate::error::{Error, Result, UnitResult};
use crate::io::{self, Endianness};


/// `MASKS[n]` keeps the lowest `n` bits.
const MASKS: [u32; 32] = mask_table();

const fn mask_table() -> [u32; 32] {
    let mut masks = [0_u32; 32];
    let mut index = 1;

    while index < 32 {
        masks[index] = (masks[index - 1] << 1) | 1;
        index += 1;
    }

    masks
}


/// Accumulates the bits of a partially filled byte,
/// and remembers the reciprocal of the floating point scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantumState {

    /// Multiplied with internal samples when exporting floating point samples.
    pub inverse_scale: f64,

    /// The partially filled byte.
    pixel: u32,

    /// The number of bits in `pixel` not yet written or not yet read.
    bits: u32,
}

impl Default for QuantumState {
    fn default() -> Self {
        QuantumState { inverse_scale: 1.0, pixel: 0, bits: 0 }
    }
}

impl QuantumState {

    /// Clear the accumulator and derive the inverse scale.
    /// Scales too small to be inverted leave the inverse scale at `1.0`.
    pub fn reset(&mut self, scale: f64) {
        self.inverse_scale = if scale.abs() < f64::EPSILON { 1.0 } else { 1.0 / scale };
        self.pixel = 0;
        self.bits = 0;
    }
}


fn row_too_short(position: usize, count: usize, length: usize) -> Error {
    Error::invalid(format!(
        "packed row buffer of {} bytes is too short for {} more bytes at byte {}",
        length, count, position
    ))
}


/// Writes samples into a packed row, front to back.
#[derive(Debug)]
pub struct PackedWriter<'b> {
    bytes: &'b mut [u8],
    position: usize,
    partial: usize,
    state: QuantumState,
}

impl<'b> PackedWriter<'b> {

    /// Start at the first byte with an empty accumulator.
    pub fn new(bytes: &'b mut [u8], mut state: QuantumState) -> Self {
        state.pixel = 0;
        state.bits = 0;
        PackedWriter { bytes, position: 0, partial: 0, state }
    }

    /// The number of bytes occupied so far, including a partially filled byte.
    #[inline]
    pub fn position(&self) -> usize { self.position }

    fn reserve(&mut self, count: usize) -> Result<usize> {
        let start = self.position;
        let end = start.checked_add(count).filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| row_too_short(start, count, self.bytes.len()))?;

        self.position = end;
        Ok(start)
    }

    /// Append the lowest `depth` bits of `value`, most significant bit first,
    /// filling up the current partial byte before starting a new one.
    pub fn write_bits(&mut self, value: u64, depth: usize) -> UnitResult {
        let mut remaining = depth as u32;

        while remaining > 0 {
            if self.state.bits == 0 {
                self.partial = self.reserve(1)?;
                self.state.pixel = 0;
                self.state.bits = 8;
            }

            let count = remaining.min(self.state.bits);
            remaining -= count;
            self.state.bits -= count;

            let chunk = (value >> remaining) as u32 & MASKS[count as usize];
            self.state.pixel |= chunk << self.state.bits;
            self.bytes[self.partial] = self.state.pixel as u8;
        }

        Ok(())
    }

    /// Append `byte_count` whole bytes in the specified byte order.
    pub fn write_bytes(&mut self, value: u64, byte_count: usize, endian: Endianness) -> UnitResult {
        let start = self.reserve(byte_count)?;
        let mut target = &mut self.bytes[start .. start + byte_count];
        io::write_unsigned(&mut target, endian, byte_count, value)
    }

    /// Append zero bytes.
    pub fn write_padding(&mut self, count: usize) -> UnitResult {
        if count != 0 {
            let start = self.reserve(count)?;
            for byte in &mut self.bytes[start .. start + count] { *byte = 0; }
        }

        Ok(())
    }
}


/// Reads samples from a packed row, front to back.
/// Mirrors `PackedWriter` exactly.
#[derive(Debug)]
pub struct PackedReader<'b> {
    bytes: &'b [u8],
    position: usize,
    state: QuantumState,
}

impl<'b> PackedReader<'b> {

    /// Start at the first byte with an empty accumulator.
    pub fn new(bytes: &'b [u8], mut state: QuantumState) -> Self {
        state.pixel = 0;
        state.bits = 0;
        PackedReader { bytes, position: 0, state }
    }

    /// The number of bytes consumed so far, including a partially consumed byte.
    #[inline]
    pub fn position(&self) -> usize { self.position }

    fn take(&mut self, count: usize) -> Result<&'b [u8]> {
        let start = self.position;
        let end = start.checked_add(count).filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| row_too_short(start, count, self.bytes.len()))?;

        self.position = end;
        Ok(&self.bytes[start .. end])
    }

    /// Read `depth` bits, most significant bit first.
    pub fn read_bits(&mut self, depth: usize) -> Result<u64> {
        let mut remaining = depth as u32;
        let mut value = 0_u64;

        while remaining > 0 {
            if self.state.bits == 0 {
                self.state.pixel = u32::from(self.take(1)?[0]);
                self.state.bits = 8;
            }

            let count = remaining.min(self.state.bits);
            remaining -= count;
            self.state.bits -= count;

            let chunk = (self.state.pixel >> self.state.bits) & MASKS[count as usize];
            value = (value << count) | u64::from(chunk);
        }

        Ok(value)
    }

    /// Read `byte_count` whole bytes in the specified byte order.
    pub fn read_bytes(&mut self, byte_count: usize, endian: Endianness) -> Result<u64> {
        let mut source = self.take(byte_count)?;
        io::read_unsigned(&mut source, endian, byte_count)
    }

    /// Skip padding bytes.
    pub fn skip_padding(&mut self, count: usize) -> UnitResult {
        self.take(count).map(|_| ())
    }
}
