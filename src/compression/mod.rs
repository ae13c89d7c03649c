
//! Contains the compression attribute definition
//! and the stream codecs that packed pixel bytes are passed through.


pub mod bits;
pub mod huffman_tables;
pub mod fax;
pub mod lzw;
pub mod packbits;
pub mod ascii85;
pub mod zlib;


use log::trace;
use crate::error::{Result, Error};
use crate::image::Image;


/// A byte vector.
pub type ByteVec = Vec<u8>;

/// A byte slice.
pub type Bytes<'s> = &'s [u8];

/// Specifies which compression an image was read with or should be written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {

    /// No compression was requested yet.
    Undefined,

    /// Store packed bytes unchanged.
    Uncompressed,

    /// One dimensional Group 3 fax run length codes.
    /// Only applicable to whole bilevel images, see the `fax` module.
    Fax,

    /// Variable width LZW as used by TIFF and PDF. Encoding only.
    LZW,

    /// Macintosh Packbits run length encoding.
    RLE,

    /// Zlib framed DEFLATE, with a level derived from the image quality.
    ZIP,
}

impl Default for Compression {
    fn default() -> Self { Compression::Undefined }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} compression", match self {
            Compression::Undefined => "undefined",
            Compression::Uncompressed => "no",
            Compression::Fax => "fax",
            Compression::LZW => "lzw",
            Compression::RLE => "packbits",
            Compression::ZIP => "zip",
        })
    }
}


impl Compression {

    /// Compress the packed pixel bytes of an image as a single stream.
    pub fn compress_image_bytes(self, image: &Image, packed: Bytes<'_>) -> Result<ByteVec> {
        trace!("{} with {}", image.filename, self);

        use self::Compression::*;
        match self {
            Undefined | Uncompressed => Ok(packed.to_vec()),
            LZW => lzw::compress_bytes(packed),
            RLE => Ok(packbits::compress_bytes(packed)),

            ZIP => zlib::compress_bytes(packed, zlib::compression_level(image.quality))
                .map_err(|error| match error {
                    Error::Coder(_) => Error::coder(format!("UnableToZipCompressImage `{}`", image.filename)),
                    Error::MissingDelegate(_) => Error::missing_delegate(format!("ZLIB (`{}`)", image.filename)),
                    other => other,
                }),

            Fax => Err(Error::unsupported("fax compression encodes whole images, not packed bytes")),
        }
    }

    /// Decompress a stream produced by `compress_image_bytes`,
    /// which must yield exactly the expected number of bytes.
    pub fn decompress_image_bytes(self, image: &Image, compressed: Bytes<'_>, expected_byte_size: usize) -> Result<ByteVec> {
        trace!("{} with {}", image.filename, self);

        use self::Compression::*;
        let bytes = match self {
            Undefined | Uncompressed => compressed.to_vec(),
            RLE => packbits::decompress_bytes(compressed, expected_byte_size)?,
            ZIP => zlib::decompress_bytes(compressed, expected_byte_size)?,
            LZW | Fax => return Err(Error::unsupported(format!("decoding {} from packed bytes", self))),
        };

        if bytes.len() != expected_byte_size {
            return Err(Error::corrupt(format!(
                "{} data of `{}` contains {} bytes instead of {}",
                self, image.filename, bytes.len(), expected_byte_size
            )));
        }

        Ok(bytes)
    }

    /// Whether `decompress_image_bytes` can restore the packed bytes.
    pub fn supports_decompression(self) -> bool {
        use self::Compression::*;
        match self {
            Undefined | Uncompressed | RLE => true,
            ZIP => cfg!(feature = "zlib"),
            LZW | Fax => false,
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::image::Colorspace;

    #[test]
    fn display(){
        assert_eq!(Compression::Fax.to_string(), "fax compression");
        assert_eq!(Compression::default(), Compression::Undefined);
    }

    #[test]
    fn dispatch_round_trip(){
        let image = Image::new("bytes.ps", (4, 4), Colorspace::Gray, false).unwrap();
        let packed: Vec<u8> = (0 .. 64_u8).map(|index| index / 5).collect();

        for &compression in &[ Compression::Uncompressed, Compression::RLE, Compression::ZIP ] {
            if !compression.supports_decompression() { continue; }

            let compressed = compression.compress_image_bytes(&image, &packed).unwrap();
            let decompressed = compression.decompress_image_bytes(&image, &compressed, packed.len()).unwrap();
            assert_eq!(decompressed, packed, "{}", compression);
        }

        let compressed = Compression::RLE.compress_image_bytes(&image, &packed).unwrap();
        assert!(matches!(
            Compression::RLE.decompress_image_bytes(&image, &compressed, packed.len() + 1),
            Err(Error::CorruptImage(_))
        ));
    }

    #[test]
    fn unsupported(){
        let image = Image::new("bytes.ps", (1, 1), Colorspace::Gray, false).unwrap();
        assert!(matches!(Compression::Fax.compress_image_bytes(&image, &[ 0 ]), Err(Error::NotSupported(_))));
        assert!(matches!(Compression::LZW.decompress_image_bytes(&image, &[ 0 ], 1), Err(Error::NotSupported(_))));
    }
}
