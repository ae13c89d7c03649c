
//! The in-memory image that quantum rows are packed from and unpacked into.
//! Holds interleaved normalized samples and the few properties
//! the codecs read or update, such as resolution and compression.

use smallvec::SmallVec;
use crate::compression::Compression;
use crate::error::{Error, Result, checked_mul};
use crate::io::Endianness;
use crate::math::Vec2;


/// A single normalized sample in the internal representation.
/// Samples usually range from `0.0` to `QUANTUM_RANGE`.
pub type Quantum = f32;

/// The internal sample value that represents full intensity.
pub const QUANTUM_RANGE: Quantum = 65535.0;

/// Multiply a sample with this to map it to `0.0 ..= 1.0`.
pub const QUANTUM_SCALE: f64 = 1.0 / QUANTUM_RANGE as f64;


/// The color model of the samples of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colorspace {

    /// Red, green and blue samples.
    Srgb,

    /// A single gray sample, stored in the red channel.
    Gray,

    /// Cyan, magenta, yellow and black samples,
    /// stored in the red, green, blue and black channels.
    Cmyk,
}

/// Whether pixels are stored as colors or as indices into a colormap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {

    /// Every pixel stores its color directly.
    Direct,

    /// Every pixel additionally stores an index into the colormap.
    Pseudo,
}

/// The declared kind of an image, as used by format coders to choose a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Undefined,
    Bilevel,
    Grayscale,
    Palette,
    TrueColor,
    ColorSeparation,
}

/// The unit of the image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionUnits {
    Undefined,
    PixelsPerInch,
}

/// Identifies one sample of a pixel.
/// Gray and cyan share the red channel, magenta shares green, yellow shares blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelChannel {
    Red,
    Green,
    Blue,
    Black,
    Alpha,
    Index,

    /// An additional channel without color semantics, such as a spectral band.
    Meta(usize),
}

impl PixelChannel {
    pub const GRAY: PixelChannel = PixelChannel::Red;
    pub const CYAN: PixelChannel = PixelChannel::Red;
    pub const MAGENTA: PixelChannel = PixelChannel::Green;
    pub const YELLOW: PixelChannel = PixelChannel::Blue;
}

/// A colormap entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: Quantum,
    pub green: Quantum,
    pub blue: Quantum,
    pub black: Quantum,
    pub alpha: Quantum,
}

impl Color {

    /// An opaque gray color.
    pub fn gray(value: Quantum) -> Self {
        Color { red: value, green: value, blue: value, black: 0.0, alpha: QUANTUM_RANGE }
    }

    /// An opaque color.
    pub fn rgb(red: Quantum, green: Quantum, blue: Quantum) -> Self {
        Color { red, green, blue, black: 0.0, alpha: QUANTUM_RANGE }
    }
}


/// Where each channel lives inside an interleaved pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ChannelOffsets {
    red: usize,
    green: Option<usize>,
    blue: Option<usize>,
    black: Option<usize>,
    alpha: Option<usize>,
    index: Option<usize>,
    meta: Option<usize>,
}

/// Describes the samples of each pixel of an image,
/// and reads and writes channels of interleaved pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelLayout {
    colorspace: Colorspace,
    storage_class: StorageClass,
    alpha: bool,
    meta_channels: usize,
    colormap: Vec<Color>,

    channels: SmallVec<[PixelChannel; 8]>,
    offsets: ChannelOffsets,
}

impl PixelLayout {

    fn new(colorspace: Colorspace, storage_class: StorageClass, alpha: bool, meta_channels: usize, colormap: Vec<Color>) -> Self {
        let mut channels: SmallVec<[PixelChannel; 8]> = SmallVec::new();
        let mut offsets = ChannelOffsets::default();

        fn add(channels: &mut SmallVec<[PixelChannel; 8]>, channel: PixelChannel) -> Option<usize> {
            channels.push(channel);
            Some(channels.len() - 1)
        }

        offsets.red = 0;
        channels.push(PixelChannel::Red);

        if colorspace != Colorspace::Gray {
            offsets.green = add(&mut channels, PixelChannel::Green);
            offsets.blue = add(&mut channels, PixelChannel::Blue);
        }

        if colorspace == Colorspace::Cmyk {
            offsets.black = add(&mut channels, PixelChannel::Black);
        }

        if alpha {
            offsets.alpha = add(&mut channels, PixelChannel::Alpha);
        }

        if storage_class == StorageClass::Pseudo {
            offsets.index = add(&mut channels, PixelChannel::Index);
        }

        if meta_channels != 0 {
            offsets.meta = Some(channels.len());
            channels.extend((0 .. meta_channels).map(PixelChannel::Meta));
        }

        PixelLayout { colorspace, storage_class, alpha, meta_channels, colormap, channels, offsets }
    }

    #[inline] pub fn colorspace(&self) -> Colorspace { self.colorspace }
    #[inline] pub fn storage_class(&self) -> StorageClass { self.storage_class }
    #[inline] pub fn has_alpha(&self) -> bool { self.alpha }
    #[inline] pub fn meta_channel_count(&self) -> usize { self.meta_channels }
    #[inline] pub fn colormap(&self) -> &[Color] { &self.colormap }

    /// The channels of each pixel, in storage order.
    #[inline] pub fn channels(&self) -> &[PixelChannel] { &self.channels }

    /// The number of samples of each pixel.
    #[inline] pub fn channel_count(&self) -> usize { self.channels.len() }

    /// Read a channel from a pixel.
    /// Channels the image does not have fall back to sensible values:
    /// green and blue read the red sample, alpha reads opaque, everything else zero.
    #[inline]
    pub fn channel(&self, pixel: &[Quantum], channel: PixelChannel) -> Quantum {
        let offsets = &self.offsets;
        match channel {
            PixelChannel::Red => pixel[offsets.red],
            PixelChannel::Green => pixel[offsets.green.unwrap_or(offsets.red)],
            PixelChannel::Blue => pixel[offsets.blue.unwrap_or(offsets.red)],
            PixelChannel::Black => offsets.black.map_or(0.0, |index| pixel[index]),
            PixelChannel::Alpha => offsets.alpha.map_or(QUANTUM_RANGE, |index| pixel[index]),
            PixelChannel::Index => offsets.index.map_or(0.0, |index| pixel[index]),
            PixelChannel::Meta(meta) => offsets.meta
                .filter(|_| meta < self.meta_channels)
                .map_or(0.0, |start| pixel[start + meta]),
        }
    }

    /// Write a channel of a pixel.
    /// Channels the image does not have are ignored.
    #[inline]
    pub fn set_channel(&self, pixel: &mut [Quantum], channel: PixelChannel, value: Quantum) {
        let offsets = &self.offsets;
        let index = match channel {
            PixelChannel::Red => Some(offsets.red),
            PixelChannel::Green => offsets.green,
            PixelChannel::Blue => offsets.blue,
            PixelChannel::Black => offsets.black,
            PixelChannel::Alpha => offsets.alpha,
            PixelChannel::Index => offsets.index,
            PixelChannel::Meta(meta) => offsets.meta.filter(|_| meta < self.meta_channels).map(|start| start + meta),
        };

        if let Some(index) = index {
            pixel[index] = value;
        }
    }

    /// Write a gray value into all color channels of a pixel.
    #[inline]
    pub fn set_gray(&self, pixel: &mut [Quantum], value: Quantum) {
        self.set_channel(pixel, PixelChannel::Red, value);
        self.set_channel(pixel, PixelChannel::Green, value);
        self.set_channel(pixel, PixelChannel::Blue, value);
    }

    /// Store a colormap index and the color it refers to.
    /// Returns false if the index is outside of the colormap,
    /// in which case index 0 is stored instead.
    #[inline]
    pub fn set_index(&self, pixel: &mut [Quantum], index: usize) -> bool {
        let (index, valid) = if index < self.colormap.len() { (index, true) } else { (0, false) };
        self.set_channel(pixel, PixelChannel::Index, index as Quantum);

        if let Some(color) = self.colormap.get(index) {
            self.set_channel(pixel, PixelChannel::Red, color.red);
            self.set_channel(pixel, PixelChannel::Green, color.green);
            self.set_channel(pixel, PixelChannel::Blue, color.blue);
            self.set_channel(pixel, PixelChannel::Black, color.black);
        }

        valid
    }

    /// The perceived brightness of a pixel, using Rec. 709 weights.
    /// Gray pixels return their gray sample unchanged.
    #[inline]
    pub fn luma(&self, pixel: &[Quantum]) -> Quantum {
        if self.colorspace == Colorspace::Gray {
            return self.channel(pixel, PixelChannel::GRAY);
        }

        0.212656 * self.channel(pixel, PixelChannel::Red)
            + 0.715158 * self.channel(pixel, PixelChannel::Green)
            + 0.072186 * self.channel(pixel, PixelChannel::Blue)
    }
}


/// An image with interleaved normalized samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {

    /// Included in error messages and log events.
    pub filename: String,

    /// The bit depth the image was read with or should be written with.
    pub depth: usize,

    /// The default byte order of multi-byte samples.
    pub endian: Endianness,

    /// The requested compression quality, where `0` means undefined.
    pub quality: usize,

    /// Pixels per unit in x and y direction.
    pub resolution: Vec2<f64>,

    /// The unit of `resolution`.
    pub units: ResolutionUnits,

    /// The compression the pixels were read with or should be written with.
    pub compression: Compression,

    /// The declared kind of image.
    pub image_type: ImageType,

    size: Vec2<usize>,
    layout: PixelLayout,
    samples: Vec<Quantum>,
}


impl Image {

    /// Create an image with all samples set to zero and opaque alpha.
    pub fn new(filename: impl Into<String>, size: impl Into<Vec2<usize>>, colorspace: Colorspace, alpha: bool) -> Result<Self> {
        let mut image = Image {
            filename: filename.into(),
            depth: 8,
            endian: Endianness::Undefined,
            quality: 0,
            resolution: Vec2(0.0, 0.0),
            units: ResolutionUnits::Undefined,
            compression: Compression::Undefined,
            image_type: ImageType::Undefined,
            size: size.into(),
            layout: PixelLayout::new(colorspace, StorageClass::Direct, alpha, 0, Vec::new()),
            samples: Vec::new(),
        };

        image.allocate()?;
        Ok(image)
    }

    /// A bilevel image with a two entry colormap,
    /// where index 0 is white and index 1 is black.
    /// Fax pages are decoded into images like this.
    pub fn bilevel(filename: impl Into<String>, size: impl Into<Vec2<usize>>) -> Result<Self> {
        let mut image = Image::new(filename, size, Colorspace::Gray, false)?
            .with_colormap(vec![ Color::gray(QUANTUM_RANGE), Color::gray(0.0) ])?;

        let channels = image.channel_count();
        let (layout, samples) = image.layout_and_samples_mut();
        for pixel in samples.chunks_exact_mut(channels) {
            layout.set_index(pixel, 0);
        }

        image.depth = 1;
        image.image_type = ImageType::Bilevel;
        Ok(image)
    }

    /// Add channels without color semantics. Resets all samples.
    pub fn with_meta_channels(mut self, count: usize) -> Result<Self> {
        let layout = &self.layout;
        self.layout = PixelLayout::new(layout.colorspace, layout.storage_class, layout.alpha, count, layout.colormap.clone());
        self.allocate()?;
        Ok(self)
    }

    /// Switch to pseudo class with the given colormap,
    /// adding an index channel. Resets all samples.
    pub fn with_colormap(mut self, colormap: Vec<Color>) -> Result<Self> {
        if colormap.is_empty() {
            return Err(Error::invalid("colormap must not be empty"));
        }

        let layout = &self.layout;
        self.layout = PixelLayout::new(layout.colorspace, StorageClass::Pseudo, layout.alpha, layout.meta_channels, colormap);
        self.allocate()?;
        Ok(self)
    }

    fn allocate(&mut self) -> Result<()> {
        let channel_count = self.layout.channel_count();
        let sample_count = checked_mul(self.size.area_checked()?, channel_count, "image too large")?;
        self.samples = vec![0.0; sample_count];

        if let Some(alpha) = self.layout.offsets.alpha {
            for pixel in self.samples.chunks_exact_mut(channel_count) {
                pixel[alpha] = QUANTUM_RANGE;
            }
        }

        Ok(())
    }

    /// Width and height in pixels.
    #[inline] pub fn size(&self) -> Vec2<usize> { self.size }

    /// The number of pixels per row.
    #[inline] pub fn columns(&self) -> usize { self.size.width() }

    /// The number of rows.
    #[inline] pub fn rows(&self) -> usize { self.size.height() }

    /// How the samples of each pixel are arranged.
    #[inline] pub fn layout(&self) -> &PixelLayout { &self.layout }

    #[inline] pub fn colorspace(&self) -> Colorspace { self.layout.colorspace }
    #[inline] pub fn storage_class(&self) -> StorageClass { self.layout.storage_class }
    #[inline] pub fn has_alpha(&self) -> bool { self.layout.alpha }
    #[inline] pub fn meta_channel_count(&self) -> usize { self.layout.meta_channels }
    #[inline] pub fn colormap(&self) -> &[Color] { &self.layout.colormap }

    /// The number of samples of each pixel.
    #[inline] pub fn channel_count(&self) -> usize { self.layout.channel_count() }

    /// The number of samples of each row.
    #[inline] pub fn row_width(&self) -> usize { self.columns() * self.channel_count() }

    /// All samples of one row.
    pub fn row(&self, y: usize) -> &[Quantum] {
        let width = self.row_width();
        &self.samples[y * width .. (y + 1) * width]
    }

    /// All samples of one row, mutably.
    pub fn row_mut(&mut self, y: usize) -> &mut [Quantum] {
        let width = self.row_width();
        &mut self.samples[y * width .. (y + 1) * width]
    }

    /// All samples of the image, row by row.
    #[inline] pub fn samples(&self) -> &[Quantum] { &self.samples }

    /// All samples of the image, mutably.
    #[inline] pub fn samples_mut(&mut self) -> &mut [Quantum] { &mut self.samples }

    /// Borrow the layout while writing samples.
    #[inline]
    pub fn layout_and_samples_mut(&mut self) -> (&PixelLayout, &mut [Quantum]) {
        (&self.layout, &mut self.samples)
    }

    /// Drop all rows after the first `rows` rows.
    /// Used by decoders that find fewer rows than announced.
    pub fn truncate_rows(&mut self, rows: usize) {
        if rows < self.rows() {
            self.samples.truncate(rows * self.row_width());
            self.size.1 = rows;
        }
    }
}
