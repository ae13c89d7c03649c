
//! Pack pixel samples into bytes at any depth and byte order, and back,
//! and compress the packed scanlines with the stream codecs of
//! classic raster and page description formats:
//! one dimensional Group 3 fax, LZW, Packbits, Ascii85 and zlib.
//!
//! Rows are packed in parallel into per-worker scratch buffers,
//! while the codecs consume them sequentially.
//!
//! Start with `quantum::QuantumInfo::acquire` for an `image::Image`,
//! or use `pipeline::encode_pixels` to pack, compress and frame an image in one call.

#![forbid(unsafe_code)]
#![forbid(
    clippy::all,
    clippy::restriction,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
)]

// TODO #![warn(missing_docs)]


pub mod io;
pub mod math;
pub mod error;
pub mod image;
pub mod progress;
pub mod resource;
pub mod compression;
pub mod quantum;
pub mod pipeline;


pub mod prelude {
    // main exports
    pub use crate::quantum::{QuantumInfo, QuantumType, QuantumFormat, QuantumOptions, AlphaType};
    pub use crate::pipeline::{encode_pixels, decode_pixels, Framing};

    // core data types
    pub use crate::image::{Image, Color, Colorspace, StorageClass, PixelChannel, Quantum, QUANTUM_RANGE};
    pub use crate::compression::Compression;
    pub use crate::compression::fax::FaxTarget;
    pub use crate::io::Endianness;
    pub use crate::resource::ResourceLimits;
    pub use crate::progress::OnProgress;

    // secondary data types
    pub use crate::error::{self, Error, Result, UnitResult};

    // re-export external stuff
    pub use half::f16;
}
