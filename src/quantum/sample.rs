
//! Conversion of single samples between the internal normalized range
//! and the external integer or floating point representation.

use half::f16;
use crate::error::{Result, UnitResult};
use crate::image::{Quantum, QUANTUM_RANGE};
use crate::io::Endianness;
use crate::math::bytes_per_sample;
use super::state::{PackedReader, PackedWriter};
use super::{QuantumFormat, QuantumInfo};


/// How each sample is represented in the packed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Unsigned,

    /// Unsigned with the most significant bit flipped.
    Signed,

    Half,

    /// One sign bit, seven exponent bits and sixteen mantissa bits.
    Float24,

    Single,
    Double,
}


/// Writes and reads single samples with the settings of a `QuantumInfo`.
#[derive(Debug, Clone, Copy)]
pub struct SampleCodec {
    encoding: Encoding,
    depth: usize,
    bit_packed: bool,
    byte_count: usize,
    endian: Endianness,

    /// The largest integer a sample of `depth` bits can hold.
    range: f64,

    minimum: f64,
    scale: f64,
    inverse_scale: f64,
}

impl SampleCodec {

    /// Capture the sample layout of the quantum info.
    pub fn new(info: &QuantumInfo) -> Self {
        let depth = info.depth();

        let encoding = match (info.format(), depth) {
            (QuantumFormat::FloatingPoint, 16) => Encoding::Half,
            (QuantumFormat::FloatingPoint, 24) => Encoding::Float24,
            (QuantumFormat::FloatingPoint, 32) => Encoding::Single,
            (QuantumFormat::FloatingPoint, _) => Encoding::Double,
            (QuantumFormat::Signed, _) => Encoding::Signed,
            _ => Encoding::Unsigned,
        };

        SampleCodec {
            encoding, depth,
            bit_packed: info.pack() && depth % 8 != 0,
            byte_count: bytes_per_sample(depth),
            endian: info.endian(),
            range: integer_range(depth),
            minimum: info.minimum(),
            scale: info.scale(),
            inverse_scale: info.state().inverse_scale,
        }
    }

    /// Whether samples are single bits that name a color
    /// instead of an intensity.
    #[inline]
    pub fn is_bilevel(&self) -> bool {
        self.depth == 1
    }

    /// Write an integer unchanged, such as a colormap index.
    /// Bits above the depth are dropped.
    pub fn write_raw(&self, writer: &mut PackedWriter<'_>, value: u64) -> UnitResult {
        let value = value & integer_mask(self.depth);

        if self.bit_packed { writer.write_bits(value, self.depth) }
        else { writer.write_bytes(value, self.byte_count, self.endian) }
    }

    /// Read an integer unchanged.
    pub fn read_raw(&self, reader: &mut PackedReader<'_>) -> Result<u64> {
        let value = if self.bit_packed { reader.read_bits(self.depth)? }
            else { reader.read_bytes(self.byte_count, self.endian)? };

        Ok(value & integer_mask(self.depth))
    }

    /// Convert an internal sample to the external representation and write it.
    pub fn write_scaled(&self, writer: &mut PackedWriter<'_>, sample: Quantum) -> UnitResult {
        let sample = f64::from(sample);

        match self.encoding {
            Encoding::Unsigned => self.write_raw(writer, self.to_integer(sample)),
            Encoding::Signed => self.write_raw(writer, self.to_integer(sample) ^ self.sign_bit()),

            Encoding::Half => {
                let half = f16::from_f64(sample / f64::from(QUANTUM_RANGE));
                writer.write_bytes(u64::from(half.to_bits()), 2, self.endian)
            },

            Encoding::Float24 => {
                let value = (sample * self.inverse_scale + self.minimum) as f32;
                writer.write_bytes(u64::from(float24_from_f32(value)), 3, self.endian)
            },

            Encoding::Single => {
                let value = (sample * self.inverse_scale + self.minimum) as f32;
                writer.write_bytes(u64::from(value.to_bits()), 4, self.endian)
            },

            Encoding::Double => {
                let value = sample * self.inverse_scale + self.minimum;
                writer.write_bytes(value.to_bits(), 8, self.endian)
            },
        }
    }

    /// Read an external sample and convert it to the internal range.
    pub fn read_scaled(&self, reader: &mut PackedReader<'_>) -> Result<Quantum> {
        let sample = match self.encoding {
            Encoding::Unsigned => self.from_integer(self.read_raw(reader)?),
            Encoding::Signed => self.from_integer(self.read_raw(reader)? ^ self.sign_bit()),

            Encoding::Half => {
                let half = f16::from_bits(reader.read_bytes(2, self.endian)? as u16);
                f64::from(QUANTUM_RANGE) * half.to_f64()
            },

            Encoding::Float24 => {
                let value = f32_from_float24(reader.read_bytes(3, self.endian)? as u32);
                self.unscale(f64::from(value))
            },

            Encoding::Single => {
                let value = f32::from_bits(reader.read_bytes(4, self.endian)? as u32);
                self.unscale(f64::from(value))
            },

            Encoding::Double => {
                let value = f64::from_bits(reader.read_bytes(8, self.endian)?);
                self.unscale(value)
            },
        };

        Ok(finite_quantum(sample))
    }

    #[inline]
    fn to_integer(&self, sample: f64) -> u64 {
        let value = (self.range * sample / f64::from(QUANTUM_RANGE)).round();
        value.max(0.0).min(self.range) as u64
    }

    #[inline]
    fn from_integer(&self, value: u64) -> f64 {
        f64::from(QUANTUM_RANGE) * value as f64 / self.range
    }

    /// A scale of zero reads floating point samples unchanged.
    #[inline]
    fn unscale(&self, value: f64) -> f64 {
        if self.scale == 0.0 { value }
        else { (value - self.minimum) * self.scale }
    }

    #[inline]
    fn sign_bit(&self) -> u64 {
        1_u64 << (self.depth - 1)
    }
}


/// The largest unsigned integer with `depth` bits.
#[inline]
pub fn integer_range(depth: usize) -> f64 {
    integer_mask(depth) as f64
}

#[inline]
fn integer_mask(depth: usize) -> u64 {
    if depth >= 64 { u64::MAX } else { (1_u64 << depth) - 1 }
}

/// Samples that are not a number become zero,
/// infinite samples become the largest finite sample.
#[inline]
fn finite_quantum(value: f64) -> Quantum {
    if value.is_nan() { 0.0 }
    else { value.max(f64::from(Quantum::MIN)).min(f64::from(Quantum::MAX)) as Quantum }
}


const FLOAT24_EXPONENT_BIAS: i32 = 63;
const FLOAT32_EXPONENT_BIAS: i32 = 127;

/// Truncate a single precision float to 24 bits.
/// Values too small for the exponent become zero,
/// values too large saturate at the largest magnitude.
pub fn float24_from_f32(value: f32) -> u32 {
    let bits = value.to_bits();
    let sign = (bits >> 31) << 23;
    let exponent = ((bits >> 23) & 0xff) as i32 - FLOAT32_EXPONENT_BIAS + FLOAT24_EXPONENT_BIAS;
    let mantissa = (bits & 0x7f_ffff) >> 7;

    if exponent <= 0 { sign }
    else if exponent >= 0x7f { sign | (0x7f << 16) | 0xffff }
    else { sign | ((exponent as u32) << 16) | mantissa }
}

/// Widen a 24 bit float to single precision.
pub fn f32_from_float24(bits: u32) -> f32 {
    let bits = bits & 0xff_ffff;
    if bits == 0 { return 0.0; }

    let sign = (bits >> 23) << 31;
    let mut exponent = (bits >> 16) & 0x7f;
    if exponent != 0 {
        exponent = (exponent as i32 - FLOAT24_EXPONENT_BIAS + FLOAT32_EXPONENT_BIAS) as u32;
    }

    let mantissa = (bits & 0xffff) << 7;
    f32::from_bits(sign | (exponent << 23) | mantissa)
}
