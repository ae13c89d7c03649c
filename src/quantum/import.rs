
//! Unpack bytes into rows of normalized samples.

use std::convert::TryFrom;
use log::{trace, warn};
use crate::error::{Error, Result, UnitResult, checked_mul};
use crate::image::{Image, PixelChannel, PixelLayout, Quantum, QUANTUM_RANGE, QUANTUM_SCALE};
use crate::progress::{OnProgress, IMPORT_TAG};
use super::{AlphaType, QuantumInfo, QuantumType};
use super::export::is_associated;
use super::sample::SampleCodec;
use super::state::PackedReader;
use super::types::Sample;


/// Rows each worker unpacks between two progress reports of a whole image.
const ROWS_PER_WORKER: usize = 16;

/// Alpha values closer to zero than this are divided out as if they were this small.
const MIN_ALPHA: f64 = 1.0e-12;


/// The reciprocal of `value`, limiting the magnitude of the result.
#[inline]
fn perceptible_reciprocal(value: f64) -> f64 {
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    if sign * value >= MIN_ALPHA { 1.0 / value } else { sign / MIN_ALPHA }
}

fn invalid_index(filename: &str) -> Error {
    Error::corrupt(format!("invalid colormap index `{}`", filename))
}


impl QuantumInfo {

    /// Unpack consecutive pixels.
    /// Returns the number of bytes consumed, which is the extent of that many pixels.
    ///
    /// Colormap indices outside of the colormap are replaced by index zero.
    /// The remaining pixels are still unpacked before the error is returned.
    pub fn import_pixels(&self, layout: &PixelLayout, pixels: &mut [Quantum], quantum_type: QuantumType, bytes: &[u8]) -> Result<usize> {
        let samples = quantum_type.samples(layout)?;
        let channel_count = layout.channel_count();

        if pixels.len() % channel_count != 0 {
            return Err(Error::invalid("pixel samples do not form whole pixels"));
        }

        let extent = self.row_extent(pixels.len() / channel_count, samples.len())?;
        if bytes.len() < extent {
            return Err(Error::invalid(format!(
                "packed row of {} bytes is shorter than the extent of {} bytes",
                bytes.len(), extent
            )));
        }

        let codec = SampleCodec::new(self);
        let associate = self.alpha_type == AlphaType::Associated && layout.has_alpha();
        let mut reader = PackedReader::new(bytes, self.state);
        let mut indices_valid = true;

        for pixel in pixels.chunks_exact_mut(channel_count) {
            for &sample in &samples {
                match sample {
                    Sample::Channel(channel) => {
                        let value = codec.read_scaled(&mut reader)?;
                        layout.set_channel(pixel, channel, value);
                    },

                    Sample::Opacity => {
                        let value = codec.read_scaled(&mut reader)?;
                        layout.set_channel(pixel, PixelChannel::Alpha, QUANTUM_RANGE - value);
                    },

                    Sample::Index => {
                        let index = codec.read_raw(&mut reader)?;
                        let index = usize::try_from(index).unwrap_or(usize::MAX);
                        indices_valid &= layout.set_index(pixel, index);
                    },

                    Sample::Gray => {
                        let value = if codec.is_bilevel() {
                            let white = (codec.read_raw(&mut reader)? != 0) != self.min_is_white;
                            if white { QUANTUM_RANGE } else { 0.0 }
                        }
                        else {
                            let value = codec.read_scaled(&mut reader)?;
                            if self.min_is_white { QUANTUM_RANGE - value } else { value }
                        };

                        layout.set_gray(pixel, value);
                    },
                }
            }

            reader.skip_padding(self.pad)?;

            if associate {
                let alpha = QUANTUM_SCALE * f64::from(layout.channel(pixel, PixelChannel::Alpha));
                let gamma = perceptible_reciprocal(alpha);

                for (value, &channel) in pixel.iter_mut().zip(layout.channels()) {
                    if is_associated(channel) {
                        *value = (gamma * f64::from(*value)) as Quantum;
                    }
                }
            }
        }

        debug_assert_eq!(reader.position(), extent, "unpacked bytes differ from the extent");

        if indices_valid { Ok(extent) }
        else { Err(Error::corrupt("invalid colormap index")) }
    }

    /// Unpack one row of the image.
    /// Returns the number of bytes consumed, which is the extent of the row.
    pub fn import_row(&self, image: &mut Image, quantum_type: QuantumType, y: usize, bytes: &[u8]) -> Result<usize> {
        if y >= image.rows() {
            return Err(Error::invalid(format!("row {} is outside of `{}`", y, image.filename)));
        }

        let row_width = image.row_width();
        let (layout, samples) = image.layout_and_samples_mut();
        let row = &mut samples[y * row_width .. (y + 1) * row_width];

        match self.import_pixels(layout, row, quantum_type, bytes) {
            Err(Error::CorruptImage(_)) => Err(invalid_index(&image.filename)),
            result => result,
        }
    }

    /// Unpack all rows of the image from one buffer, rows in parallel.
    /// The buffer must contain exactly one extent per row.
    ///
    /// Invalid colormap indices do not stop the import,
    /// but are reported after all rows have been unpacked.
    pub fn import_image(&self, image: &mut Image, quantum_type: QuantumType, bytes: &[u8], progress: &mut impl OnProgress) -> UnitResult {
        trace!("import `{}` as {:?}", image.filename, quantum_type);
        quantum_type.samples(image.layout())?;

        let rows = image.rows();
        let extent = self.extent(image, quantum_type)?;
        let byte_count = checked_mul(extent, rows, "packed image too large")?;

        if bytes.len() != byte_count {
            return Err(Error::invalid(format!(
                "expected {} packed bytes for `{}`, found {}",
                byte_count, image.filename, bytes.len()
            )));
        }

        if byte_count == 0 {
            return Ok(());
        }

        let row_width = image.row_width();
        let band_rows = (self.limits.thread_limit() * ROWS_PER_WORKER).min(rows);
        let mut indices_valid = true;

        let filename = image.filename.clone();
        let (layout, samples) = image.layout_and_samples_mut();

        let bands = samples.chunks_mut(row_width * band_rows).zip(bytes.chunks(extent * band_rows));
        for (band_index, (band_samples, band_bytes)) in bands.enumerate() {
            let first_row = band_index * band_rows;
            let band_result = self.import_rows(layout, quantum_type, band_samples, row_width, band_bytes, extent);

            match band_result {
                Ok(()) => {},
                Err(Error::CorruptImage(_)) => indices_valid = false,
                Err(error) => return Err(error),
            }

            if let Err(error) = progress.on_progressed(IMPORT_TAG, first_row + band_bytes.len() / extent, rows) {
                warn!("unpacking `{}` was cancelled", filename);
                return Err(error);
            }
        }

        if indices_valid { Ok(()) }
        else { Err(invalid_index(&filename)) }
    }

    /// Unpack a band of rows. Reports a corrupt image error
    /// only after every row of the band has been unpacked.
    #[cfg(feature = "rayon")]
    fn import_rows(&self, layout: &PixelLayout, quantum_type: QuantumType, samples: &mut [Quantum], row_width: usize, bytes: &[u8], extent: usize) -> UnitResult {
        use rayon::prelude::*;

        if self.limits.thread_limit() < 2 {
            return collect_row_results(samples.chunks_mut(row_width).zip(bytes.chunks(extent))
                .map(|(row, row_bytes)| self.import_pixels(layout, row, quantum_type, row_bytes)));
        }

        let results: Vec<Result<usize>> = samples.par_chunks_mut(row_width)
            .zip(bytes.par_chunks(extent))
            .map(|(row, row_bytes)| self.import_pixels(layout, row, quantum_type, row_bytes))
            .collect();

        collect_row_results(results)
    }

    #[cfg(not(feature = "rayon"))]
    fn import_rows(&self, layout: &PixelLayout, quantum_type: QuantumType, samples: &mut [Quantum], row_width: usize, bytes: &[u8], extent: usize) -> UnitResult {
        collect_row_results(samples.chunks_mut(row_width).zip(bytes.chunks(extent))
            .map(|(row, row_bytes)| self.import_pixels(layout, row, quantum_type, row_bytes)))
    }
}

/// The first error that is not a corrupt image error,
/// else the first corrupt image error.
fn collect_row_results(results: impl IntoIterator<Item = Result<usize>>) -> UnitResult {
    let mut corrupt = None;

    for result in results {
        match result {
            Ok(_) => {},
            Err(error @ Error::CorruptImage(_)) => { corrupt.get_or_insert(error); },
            Err(error) => return Err(error),
        }
    }

    corrupt.map_or(Ok(()), Err)
}
