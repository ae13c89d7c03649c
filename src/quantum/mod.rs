
//! Convert rows of normalized samples to packed bytes and back.
//!
//! A `QuantumInfo` describes the external layout of samples:
//! the bit depth, the numeric format, the byte order, padding and value range.
//! A `QuantumType` describes which samples each packed pixel contains.
//! Rows are independent, so whole images are packed in parallel,
//! each worker staging its row in a private scratch buffer.

pub mod types;
pub mod options;
pub mod scratch;

mod state;
mod sample;
mod export;
mod import;

pub use self::types::{QuantumType, quantum_type, set_quantum_image_type};
pub use self::options::QuantumOptions;
pub use self::scratch::ScratchPool;
pub use self::state::QuantumState;
pub use self::sample::{float24_from_f32, f32_from_float24};

use log::trace;
use crate::error::{Error, Result, UnitResult, checked_mul};
use crate::image::{Image, QUANTUM_RANGE};
use crate::io::Endianness;
use crate::math::{Vec2, bytes_per_sample};
use crate::resource::ResourceLimits;


/// The numeric domain of external samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumFormat {

    /// Unsigned integers.
    Undefined,

    /// Integers with the most significant bit flipped,
    /// such that the middle of the range is zero.
    Signed,

    /// Unsigned integers.
    Unsigned,

    /// Half, 24 bit, single or double precision floats, depending on the depth.
    FloatingPoint,
}

impl Default for QuantumFormat {
    fn default() -> Self { QuantumFormat::Undefined }
}

/// Whether color samples are stored premultiplied with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaType {
    Undefined,

    /// Exported color samples are multiplied with alpha,
    /// imported color samples are divided by alpha.
    Associated,
}

impl Default for AlphaType {
    fn default() -> Self { AlphaType::Undefined }
}


/// The largest supported number of bits per sample.
pub const MAX_DEPTH: usize = 64;


/// Describes how the samples of one image are packed.
/// Owns the scratch buffers that rows are staged in while streaming.
#[derive(Debug)]
pub struct QuantumInfo {
    filename: String,
    size: Vec2<usize>,
    image_channels: usize,
    limits: ResourceLimits,

    depth: usize,
    quantum: usize,
    format: QuantumFormat,
    endian: Endianness,
    pack: bool,
    pad: usize,
    minimum: f64,
    maximum: f64,
    scale: f64,
    min_is_white: bool,
    alpha_type: AlphaType,
    state: QuantumState,

    scratch: Option<ScratchPool>,
}


impl QuantumInfo {

    /// Configure packing for an image, using the image depth and byte order,
    /// and allocate scratch buffers for its geometry.
    pub fn acquire(image: &Image, options: &QuantumOptions, limits: ResourceLimits) -> Result<Self> {
        trace!("acquire quantum info for `{}`", image.filename);

        let mut info = QuantumInfo {
            filename: image.filename.clone(),
            size: image.size(),
            image_channels: image.channel_count(),
            limits,

            depth: 0,
            quantum: 8,
            format: options.format.unwrap_or_default(),
            endian: options.endian.unwrap_or_default(),
            pack: true,
            pad: 0,
            minimum: options.minimum.unwrap_or(0.0),
            maximum: options.maximum.unwrap_or(1.0),
            scale: f64::from(QUANTUM_RANGE),
            min_is_white: options.min_is_white.unwrap_or(false),
            alpha_type: AlphaType::default(),
            state: QuantumState::default(),

            scratch: None,
        };

        if info.minimum == 0.0 && info.maximum == 0.0 {
            info.scale = 0.0;
        }
        else if info.minimum == info.maximum {
            info.scale = f64::from(QUANTUM_RANGE) / info.minimum;
            info.minimum = 0.0;
        }
        else {
            info.scale = f64::from(QUANTUM_RANGE) / (info.maximum - info.minimum);
        }

        if let Some(scale) = options.scale {
            info.scale = scale;
        }

        if image.endian != Endianness::Undefined {
            info.endian = image.endian;
        }

        info.reset_state();
        info.set_depth(image.depth)?;
        Ok(info)
    }

    #[inline] pub fn depth(&self) -> usize { self.depth }
    #[inline] pub fn format(&self) -> QuantumFormat { self.format }
    #[inline] pub fn endian(&self) -> Endianness { self.endian }
    #[inline] pub fn pack(&self) -> bool { self.pack }
    #[inline] pub fn pad(&self) -> usize { self.pad }
    #[inline] pub fn minimum(&self) -> f64 { self.minimum }
    #[inline] pub fn maximum(&self) -> f64 { self.maximum }
    #[inline] pub fn scale(&self) -> f64 { self.scale }
    #[inline] pub fn min_is_white(&self) -> bool { self.min_is_white }
    #[inline] pub fn alpha_type(&self) -> AlphaType { self.alpha_type }
    #[inline] pub fn state(&self) -> &QuantumState { &self.state }
    #[inline] pub fn limits(&self) -> &ResourceLimits { &self.limits }

    /// The number of bytes reserved per sample in the speculative scratch extent.
    #[inline] pub fn quantum(&self) -> usize { self.quantum }

    /// The number of usable bytes in each scratch buffer.
    pub fn scratch_extent(&self) -> usize {
        self.scratch.as_ref().map_or(0, ScratchPool::extent)
    }

    /// Set the number of bits per sample, clamped to `1 ..= 64`.
    /// Floating point depths snap to 16, 24, 32 or 64 bits.
    /// Grows the scratch buffers if the worst case row no longer fits.
    pub fn set_depth(&mut self, depth: usize) -> UnitResult {
        trace!("set quantum depth of `{}`", self.filename);

        self.depth = depth.clamp(1, MAX_DEPTH);

        if self.format == QuantumFormat::FloatingPoint {
            self.depth = match self.depth {
                33 ..= MAX_DEPTH => 64,
                25 ..= 32 => 32,
                17 ..= 24 => 24,
                _ => 16,
            };
        }

        // the quantum type is not known yet, so assume the largest row
        let overflow = "quantum pixel extent overflows";
        let slots = self.image_channels.checked_add(self.pad)
            .and_then(|slots| slots.checked_add(3))
            .ok_or_else(|| Error::resource_limit(overflow))?;

        let sample_bytes = checked_mul(slots, bytes_per_sample(self.depth), overflow)?;
        let pixel_bytes = checked_mul(sample_bytes, self.quantum, overflow)?;
        let extent = checked_mul(pixel_bytes, self.size.max_dimension(), overflow)?;

        if self.scratch.as_ref().map_or(false, |scratch| extent <= scratch.extent()) {
            return Ok(());
        }

        self.scratch = None;
        self.scratch = Some(ScratchPool::acquire(extent, &self.limits, &self.filename)?);
        Ok(())
    }

    /// Set the numeric domain and validate the depth for it.
    pub fn set_format(&mut self, format: QuantumFormat) -> UnitResult {
        self.format = format;
        self.set_depth(self.depth)
    }

    /// Set the byte order of multi-byte samples.
    pub fn set_endian(&mut self, endian: Endianness) -> UnitResult {
        self.endian = endian;
        self.set_depth(self.depth)
    }

    /// Append `pad` zero bytes to every packed pixel.
    pub fn set_pad(&mut self, pad: usize) -> UnitResult {
        let limit = isize::MAX as usize / self.image_channels.max(1);

        if pad >= limit {
            return Err(Error::resource_limit(format!(
                "quantum pad of {} bytes is too large for `{}`", pad, self.filename
            )));
        }

        self.pad = pad;
        self.set_depth(self.depth)
    }

    /// Whether samples that are not a multiple of eight bits
    /// share bytes with the following sample.
    pub fn set_pack(&mut self, pack: bool) {
        self.pack = pack;
    }

    /// Whether a gray sample of zero means white.
    pub fn set_min_is_white(&mut self, min_is_white: bool) {
        self.min_is_white = min_is_white;
    }

    pub fn set_alpha_type(&mut self, alpha_type: AlphaType) {
        self.alpha_type = alpha_type;
    }

    /// Set the factor between external floating point samples and internal samples.
    /// A scale of zero reads floating point samples unchanged.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
        self.reset_state();
    }

    /// Set the bytes reserved per sample in the speculative scratch extent.
    pub fn set_quantum(&mut self, quantum: usize) -> UnitResult {
        self.quantum = quantum;
        self.set_depth(self.depth)
    }

    /// Recompute the inverse scale and clear the bit accumulator.
    pub fn reset_state(&mut self) {
        self.state.reset(self.scale);
    }

    /// The exact number of bytes one packed row of the image occupies.
    pub fn extent(&self, image: &Image, quantum_type: QuantumType) -> Result<usize> {
        let channels = quantum_type.channel_count(image.layout());
        self.row_extent(image.columns(), channels)
    }

    fn row_extent(&self, columns: usize, channels: usize) -> Result<usize> {
        let overflow = "quantum row extent overflows";
        let samples = checked_mul(channels, columns, overflow)?;
        let padding = checked_mul(self.pad, columns, overflow)?;

        let sample_bytes = if self.pack {
            checked_mul(samples, self.depth, overflow)?.checked_add(7)
                .ok_or_else(|| Error::resource_limit(overflow))? / 8
        }
        else {
            checked_mul(samples, bytes_per_sample(self.depth), overflow)?
        };

        sample_bytes.checked_add(padding).ok_or_else(|| Error::resource_limit(overflow))
    }
}
