
//! Zlib framed DEFLATE, for formats that embed zlib streams.
//! Compression uses `miniz_oxide` and decompression uses `zune-inflate`.
//! Without the `zlib` feature, every function reports a missing delegate.

use super::{ByteVec, Bytes};
use crate::error::{Error, Result};


/// The compression level for a requested quality:
/// `7` if the quality is undefined, else a tenth of the quality, at most `9`.
pub fn compression_level(quality: usize) -> u8 {
    if quality == 0 { 7 } else { (quality / 10).min(9) as u8 }
}

/// The output size zlib guarantees to be sufficient for incompressible input.
#[cfg(feature = "zlib")]
#[inline]
fn compressed_size_bound(byte_count: usize) -> usize {
    byte_count + byte_count / 1000 + 12
}


/// Compress the bytes into a zlib stream at the specified level.
#[cfg(feature = "zlib")]
pub fn compress_bytes(data: Bytes<'_>, level: u8) -> Result<ByteVec> {
    use miniz_oxide::deflate::core::{
        compress, create_comp_flags_from_zip_params,
        CompressorOxide, TDEFLFlush, TDEFLStatus
    };

    // positive window bits request the zlib header and checksum
    let flags = create_comp_flags_from_zip_params(i32::from(level), 15, 0);
    let mut compressor = CompressorOxide::new(flags);

    let mut compressed = vec![ 0_u8; compressed_size_bound(data.len()) ];
    let mut remaining = data;
    let mut written = 0;

    loop {
        let (status, consumed, produced) = compress(
            &mut compressor, remaining,
            &mut compressed[written ..], TDEFLFlush::Finish
        );

        remaining = &remaining[consumed ..];
        written += produced;

        match status {
            TDEFLStatus::Done => {
                compressed.truncate(written);
                return Ok(compressed);
            },

            TDEFLStatus::Okay => {
                let grown = compressed.len() + compressed.len() / 2 + 64;
                compressed.resize(grown, 0);
            },

            failure => return Err(Error::coder(format!("deflate failed with status {:?}", failure))),
        }
    }
}

/// Decompress a complete zlib stream.
#[cfg(feature = "zlib")]
pub fn decompress_bytes(compressed: Bytes<'_>, expected_byte_size: usize) -> Result<ByteVec> {
    let decompressed = zune_inflate::DeflateDecoder::new(compressed)
        .decode_zlib()
        .map_err(|error| Error::corrupt(format!("zlib data malformed ({:?})", error)))?;

    if decompressed.len() != expected_byte_size {
        return Err(Error::corrupt(format!(
            "zlib data size mismatch: expected {} bytes, found {}",
            expected_byte_size, decompressed.len()
        )));
    }

    Ok(decompressed)
}


#[cfg(not(feature = "zlib"))]
pub fn compress_bytes(_: Bytes<'_>, _: u8) -> Result<ByteVec> {
    Err(Error::missing_delegate("ZLIB"))
}

#[cfg(not(feature = "zlib"))]
pub fn decompress_bytes(_: Bytes<'_>, _: usize) -> Result<ByteVec> {
    Err(Error::missing_delegate("ZLIB"))
}
