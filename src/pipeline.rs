
//! Chain the quantum packing stage with a compression codec
//! and an optional text framing, the way a format coder writes its pixel data.
//! Packing runs in parallel, the codecs run sequentially on the packed bytes.

use std::io::{Read, Write};
use log::{trace, warn};
use crate::compression::{Compression, ByteVec, ascii85, fax};
use crate::compression::ascii85::Ascii85Writer;
use crate::compression::fax::FaxTarget;
use crate::error::{Error, Result, UnitResult, checked_mul};
use crate::image::Image;
use crate::io::Tracking;
use crate::progress::OnProgress;
use crate::quantum::{QuantumInfo, QuantumType};


/// How the compressed bytes are stored in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Framing {

    /// Write the bytes unchanged.
    Binary,

    /// Encode the bytes as Ascii85 text, ending with `~>`.
    Ascii85,
}

impl Default for Framing {
    fn default() -> Self { Framing::Binary }
}


/// Pack all rows of an image, compress them and write them framed.
/// Returns the number of bytes written.
///
/// Fax compression encodes the brightness of the image directly
/// and ignores the quantum type. Uncompressed rows are streamed
/// through the scratch buffers without holding the whole packed image.
///
/// If the progress callback stops an uncompressed or fax encoding,
/// the output is still terminated and ends at a whole row.
pub fn encode_pixels(
    image: &Image, info: &mut QuantumInfo, quantum_type: QuantumType,
    compression: Compression, framing: Framing,
    write: impl Write, progress: &mut impl OnProgress,
) -> Result<usize>
{
    trace!("encode `{}` as {:?} with {}", image.filename, quantum_type, compression);
    let mut write = Tracking::new(write);

    match compression {
        Compression::Fax => {
            let target = match framing {
                Framing::Binary => FaxTarget::Raw,
                Framing::Ascii85 => FaxTarget::Ascii85,
            };

            fax::encode_image(image, target, &mut write, info.limits(), progress)?;
        },

        Compression::Undefined | Compression::Uncompressed => {
            write_framed(framing, &mut write, |write| {
                info.for_each_packed_row(image, quantum_type, progress, |_, row| {
                    write.write_all(row)?;
                    Ok(())
                })
            })?;
        },

        Compression::LZW | Compression::RLE | Compression::ZIP => {
            let packed = info.export_image(image, quantum_type, progress)?;
            let compressed = compression.compress_image_bytes(image, &packed)?;
            write_framed(framing, &mut write, |write| Ok(write.write_all(&compressed)?))?;
        },
    }

    write.flush()?;
    Ok(write.byte_position())
}

/// Run the body with a sink that applies the framing.
/// Ascii85 text is terminated even if the body fails.
fn write_framed(framing: Framing, write: impl Write, body: impl FnOnce(&mut dyn Write) -> UnitResult) -> UnitResult {
    match framing {
        Framing::Binary => {
            let mut write = write;
            body(&mut write)
        },

        Framing::Ascii85 => {
            let mut text = Ascii85Writer::new(write);
            let result = body(&mut text);

            if let Err(Error::Aborted) = result {
                warn!("terminating ascii85 text after cancellation");
            }

            text.finish()?;
            result
        },
    }
}


/// Read framed and compressed pixel data written by `encode_pixels`
/// and unpack it into the image.
///
/// Fax pages are decoded into the rows of the image, which must be a bilevel image
/// such as `fax::page_image`, and the quantum info is not used.
/// LZW data cannot be decoded.
pub fn decode_pixels(
    image: &mut Image, info: &QuantumInfo, quantum_type: QuantumType,
    compression: Compression, framing: Framing,
    mut read: impl Read, progress: &mut impl OnProgress,
) -> UnitResult
{
    trace!("decode `{}` as {:?} with {}", image.filename, quantum_type, compression);

    let mut data = ByteVec::new();
    read.read_to_end(&mut data)?;
    info.limits().check_memory(data.len(), &image.filename)?;

    if compression == Compression::Fax {
        return match framing {
            Framing::Binary => fax::decode_image(data.as_slice(), image, info.limits(), progress),
            Framing::Ascii85 => fax::decode_embedded_page(&data, image, info.limits(), progress),
        };
    }

    if !compression.supports_decompression() {
        return Err(Error::unsupported(format!("decoding {} of `{}`", compression, image.filename)));
    }

    let data = match framing {
        Framing::Binary => data,
        Framing::Ascii85 => ascii85::decode(&data)?,
    };

    let extent = info.extent(image, quantum_type)?;
    let expected = checked_mul(extent, image.rows(), "packed image too large")?;
    info.limits().check_memory(expected, &image.filename)?;

    let packed = compression.decompress_image_bytes(image, &data, expected)?;
    info.import_image(image, quantum_type, &packed, progress)
}
