
//! Which samples a packed pixel consists of, and in which order.

use smallvec::SmallVec;
use crate::error::{Error, Result};
use crate::image::{Colorspace, Image, ImageType, PixelChannel, PixelLayout, StorageClass};


/// The declared channel layout of a packed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumType {
    Undefined,
    Alpha,
    Opacity,
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
    Black,
    Gray,
    GrayAlpha,
    Index,
    IndexAlpha,
    RGB,
    RGBA,
    RGBO,
    BGR,
    BGRA,
    BGRO,
    CMY,
    CMYK,
    CMYKA,
    CMYKO,
    CbYCr,
    CbYCrA,

    /// Two pixels share their chroma samples. Only the extent can be computed.
    CbYCrY,

    /// Every channel of the image, in storage order.
    Multispectral,
}

impl Default for QuantumType {
    fn default() -> Self { QuantumType::Undefined }
}


/// One sample of a packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {

    /// A channel of the image, scaled to the external range.
    Channel(PixelChannel),

    /// The perceived brightness on export, all color channels on import.
    Gray,

    /// The inverted alpha channel.
    Opacity,

    /// The colormap index, stored as an unscaled integer.
    Index,
}

/// The samples of one packed pixel.
pub type Samples = SmallVec<[Sample; 8]>;


impl QuantumType {

    /// The number of samples per packed pixel.
    /// Multispectral rows contain every channel of the image.
    pub fn channel_count(self, layout: &PixelLayout) -> usize {
        use self::QuantumType::*;
        match self {
            Undefined | Alpha | Opacity | Red | Green | Blue
                | Cyan | Magenta | Yellow | Black | Gray | Index => 1,

            GrayAlpha | IndexAlpha => 2,
            RGB | BGR | CMY | CbYCr => 3,
            RGBA | RGBO | BGRA | BGRO | CMYK | CbYCrA | CbYCrY => 4,
            CMYKA | CMYKO => 5,
            Multispectral => layout.channel_count(),
        }
    }

    /// The samples of each packed pixel, in packing order.
    /// Fails if the image lacks the channels this layout is defined by.
    pub fn samples(self, layout: &PixelLayout) -> Result<Samples> {
        use self::QuantumType::*;

        const RED: Sample = Sample::Channel(PixelChannel::Red);
        const GREEN: Sample = Sample::Channel(PixelChannel::Green);
        const BLUE: Sample = Sample::Channel(PixelChannel::Blue);
        const BLACK: Sample = Sample::Channel(PixelChannel::Black);
        const ALPHA: Sample = Sample::Channel(PixelChannel::Alpha);

        match self {
            Black | CMYK | CMYKA | CMYKO if layout.colorspace() != Colorspace::Cmyk =>
                return Err(Error::invalid("color separated image required")),

            Index | IndexAlpha if layout.storage_class() != StorageClass::Pseudo =>
                return Err(Error::invalid("colormapped image required")),

            _ => {}
        }

        let samples: &[Sample] = match self {
            Undefined => return Err(Error::invalid("quantum type undefined")),
            CbYCrY => return Err(Error::unsupported("packing pixels with shared chroma")),

            Multispectral => return Ok(layout.channels().iter()
                .map(|&channel| match channel {
                    PixelChannel::Index => Sample::Index,
                    other => Sample::Channel(other),
                })
                .collect()),

            Alpha => &[ ALPHA ],
            Opacity => &[ Sample::Opacity ],
            Red | Cyan => &[ RED ],
            Green | Magenta => &[ GREEN ],
            Blue | Yellow => &[ BLUE ],
            Black => &[ BLACK ],
            Gray => &[ Sample::Gray ],
            GrayAlpha => &[ Sample::Gray, ALPHA ],
            Index => &[ Sample::Index ],
            IndexAlpha => &[ Sample::Index, ALPHA ],
            RGB | CMY => &[ RED, GREEN, BLUE ],
            RGBA => &[ RED, GREEN, BLUE, ALPHA ],
            RGBO => &[ RED, GREEN, BLUE, Sample::Opacity ],
            BGR => &[ BLUE, GREEN, RED ],
            BGRA => &[ BLUE, GREEN, RED, ALPHA ],
            BGRO => &[ BLUE, GREEN, RED, Sample::Opacity ],
            CMYK => &[ RED, GREEN, BLUE, BLACK ],
            CMYKA => &[ RED, GREEN, BLUE, BLACK, ALPHA ],
            CMYKO => &[ RED, GREEN, BLUE, BLACK, Sample::Opacity ],
            CbYCr => &[ GREEN, RED, BLUE ],
            CbYCrA => &[ GREEN, RED, BLUE, ALPHA ],
        };

        debug_assert_eq!(samples.len(), self.channel_count(layout));
        Ok(samples.iter().copied().collect())
    }
}


/// The default quantum type of an image.
/// Meta channels take precedence over the colormap,
/// which takes precedence over the colorspace.
pub fn quantum_type(image: &Image) -> QuantumType {
    let alpha = image.has_alpha();

    let mut quantum_type = if alpha { QuantumType::RGBA } else { QuantumType::RGB };

    if image.colorspace() == Colorspace::Cmyk {
        quantum_type = if alpha { QuantumType::CMYKA } else { QuantumType::CMYK };
    }

    if image.colorspace() == Colorspace::Gray {
        quantum_type = if alpha { QuantumType::GrayAlpha } else { QuantumType::Gray };
    }

    if image.storage_class() == StorageClass::Pseudo {
        quantum_type = if alpha { QuantumType::IndexAlpha } else { QuantumType::Index };
    }

    if image.meta_channel_count() != 0 {
        quantum_type = QuantumType::Multispectral;
    }

    quantum_type
}

/// Declare the image type that pixels of the quantum type were read into.
pub fn set_quantum_image_type(image: &mut Image, quantum_type: QuantumType) {
    use self::QuantumType::*;

    image.image_type = match quantum_type {
        Index | IndexAlpha => ImageType::Palette,
        Gray | GrayAlpha if image.depth == 1 => ImageType::Bilevel,
        Gray | GrayAlpha => ImageType::Grayscale,
        Cyan | Magenta | Yellow | Black | CMYK | CMYKA | Multispectral => ImageType::ColorSeparation,
        _ => ImageType::TrueColor,
    };
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::image::Color;

    #[test]
    fn channel_counts_match_samples(){
        let image = Image::new("cmyk", (1, 1), Colorspace::Cmyk, true).unwrap();
        let layout = image.layout();

        use self::QuantumType::*;
        for &quantum_type in &[
            Alpha, Opacity, Red, Green, Blue, Cyan, Magenta, Yellow, Black, Gray, GrayAlpha,
            RGB, RGBA, RGBO, BGR, BGRA, BGRO, CMY, CMYK, CMYKA, CMYKO, CbYCr, CbYCrA, Multispectral
        ] {
            let samples = quantum_type.samples(layout).unwrap();
            assert_eq!(samples.len(), quantum_type.channel_count(layout), "{:?}", quantum_type);
        }

        assert_eq!(Multispectral.channel_count(layout), 5);
        assert_eq!(CbYCrY.channel_count(layout), 4);
        assert!(matches!(CbYCrY.samples(layout), Err(Error::NotSupported(_))));
    }

    #[test]
    fn required_channels(){
        let rgb = Image::new("rgb", (1, 1), Colorspace::Srgb, false).unwrap();
        assert!(matches!(QuantumType::CMYK.samples(rgb.layout()), Err(Error::Invalid(_))));
        assert!(matches!(QuantumType::Index.samples(rgb.layout()), Err(Error::Invalid(_))));
        assert!(QuantumType::CMY.samples(rgb.layout()).is_ok());
    }

    #[test]
    fn default_quantum_type(){
        let image = Image::new("a", (1, 1), Colorspace::Srgb, true).unwrap();
        assert_eq!(quantum_type(&image), QuantumType::RGBA);

        let image = Image::new("a", (1, 1), Colorspace::Cmyk, false).unwrap();
        assert_eq!(quantum_type(&image), QuantumType::CMYK);

        let image = Image::new("a", (1, 1), Colorspace::Gray, true).unwrap();
        assert_eq!(quantum_type(&image), QuantumType::GrayAlpha);

        let image = Image::new("a", (1, 1), Colorspace::Gray, false).unwrap()
            .with_colormap(vec![ Color::gray(0.0) ]).unwrap();
        assert_eq!(quantum_type(&image), QuantumType::Index);

        let image = image.with_meta_channels(3).unwrap();
        assert_eq!(quantum_type(&image), QuantumType::Multispectral);
    }

    #[test]
    fn image_type_from_quantum_type(){
        let mut image = Image::new("a", (1, 1), Colorspace::Gray, false).unwrap();

        set_quantum_image_type(&mut image, QuantumType::Gray);
        assert_eq!(image.image_type, ImageType::Grayscale);

        image.depth = 1;
        set_quantum_image_type(&mut image, QuantumType::GrayAlpha);
        assert_eq!(image.image_type, ImageType::Bilevel);

        set_quantum_image_type(&mut image, QuantumType::IndexAlpha);
        assert_eq!(image.image_type, ImageType::Palette);

        set_quantum_image_type(&mut image, QuantumType::Multispectral);
        assert_eq!(image.image_type, ImageType::ColorSeparation);

        set_quantum_image_type(&mut image, QuantumType::BGRO);
        assert_eq!(image.image_type, ImageType::TrueColor);

        // alpha does not change the image type
        set_quantum_image_type(&mut image, QuantumType::CMYKA);
        assert_eq!(image.image_type, ImageType::ColorSeparation);

        set_quantum_image_type(&mut image, QuantumType::RGBA);
        assert_eq!(image.image_type, ImageType::TrueColor);

        image.depth = 8;
        set_quantum_image_type(&mut image, QuantumType::GrayAlpha);
        assert_eq!(image.image_type, ImageType::Grayscale);
    }
}
