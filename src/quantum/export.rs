
//! Pack rows of normalized samples into bytes.

use log::{trace, warn};
use crate::compression::ByteVec;
use crate::error::{Error, Result, UnitResult, checked_mul};
use crate::image::{Image, PixelChannel, PixelLayout, Quantum, QUANTUM_RANGE, QUANTUM_SCALE};
use crate::progress::{OnProgress, EXPORT_TAG};
use super::{AlphaType, QuantumInfo, QuantumType};
use super::sample::SampleCodec;
use super::scratch::ScratchPool;
use super::state::PackedWriter;
use super::types::Sample;


/// Rows each worker packs between two progress reports of a whole image.
const ROWS_PER_WORKER: usize = 16;


/// Whether a channel is multiplied with alpha when alpha is associated.
#[inline]
pub(super) fn is_associated(channel: PixelChannel) -> bool {
    !matches!(channel, PixelChannel::Alpha | PixelChannel::Index)
}


impl QuantumInfo {

    /// Pack the samples of consecutive pixels.
    /// Returns the number of bytes written,
    /// which is the extent of that many pixels.
    pub fn export_pixels(&self, layout: &PixelLayout, pixels: &[Quantum], quantum_type: QuantumType, bytes: &mut [u8]) -> Result<usize> {
        let samples = quantum_type.samples(layout)?;
        let channel_count = layout.channel_count();

        if pixels.len() % channel_count != 0 {
            return Err(Error::invalid("pixel samples do not form whole pixels"));
        }

        let extent = self.row_extent(pixels.len() / channel_count, samples.len())?;
        if bytes.len() < extent {
            return Err(Error::invalid(format!(
                "packed row buffer of {} bytes is shorter than the extent of {} bytes",
                bytes.len(), extent
            )));
        }

        let codec = SampleCodec::new(self);
        let associate = self.alpha_type == AlphaType::Associated && layout.has_alpha();
        let threshold = QUANTUM_RANGE / 2.0;
        let mut writer = PackedWriter::new(bytes, self.state);

        for pixel in pixels.chunks_exact(channel_count) {
            let alpha = layout.channel(pixel, PixelChannel::Alpha);
            let alpha_factor = if associate { (QUANTUM_SCALE * f64::from(alpha)) as Quantum } else { 1.0 };

            for &sample in &samples {
                match sample {
                    Sample::Channel(channel) => {
                        let value = layout.channel(pixel, channel);
                        let value = if is_associated(channel) { alpha_factor * value } else { value };
                        codec.write_scaled(&mut writer, value)?;
                    },

                    Sample::Opacity => codec.write_scaled(&mut writer, QUANTUM_RANGE - alpha)?,

                    Sample::Index => {
                        let index = layout.channel(pixel, PixelChannel::Index);
                        codec.write_raw(&mut writer, index as u64)?;
                    },

                    Sample::Gray => {
                        let luma = alpha_factor * layout.luma(pixel);

                        if codec.is_bilevel() {
                            let white = luma >= threshold;
                            codec.write_raw(&mut writer, u64::from(white != self.min_is_white))?;
                        }
                        else if self.min_is_white {
                            codec.write_scaled(&mut writer, QUANTUM_RANGE - luma)?;
                        }
                        else {
                            codec.write_scaled(&mut writer, luma)?;
                        }
                    },
                }
            }

            writer.write_padding(self.pad)?;
        }

        debug_assert_eq!(writer.position(), extent, "packed bytes differ from the extent");
        Ok(extent)
    }

    /// Pack one row of the image.
    /// Returns the number of bytes written, which is the extent of the row.
    pub fn export_row(&self, image: &Image, quantum_type: QuantumType, y: usize, bytes: &mut [u8]) -> Result<usize> {
        if y >= image.rows() {
            return Err(Error::invalid(format!("row {} is outside of `{}`", y, image.filename)));
        }

        self.export_pixels(image.layout(), image.row(y), quantum_type, bytes)
    }

    /// Pack all rows of the image into one buffer, rows in parallel.
    /// Progress is reported after each band of rows.
    pub fn export_image(&self, image: &Image, quantum_type: QuantumType, progress: &mut impl OnProgress) -> Result<ByteVec> {
        trace!("export `{}` as {:?}", image.filename, quantum_type);
        quantum_type.samples(image.layout())?;

        let rows = image.rows();
        let extent = self.extent(image, quantum_type)?;
        let byte_count = checked_mul(extent, rows, "packed image too large")?;
        self.limits.check_memory(byte_count, &image.filename)?;

        let mut bytes = vec![ 0_u8; byte_count ];
        if byte_count == 0 {
            return Ok(bytes);
        }

        let band_rows = (self.limits.thread_limit() * ROWS_PER_WORKER).min(rows);

        for (band_index, band) in bytes.chunks_mut(extent * band_rows).enumerate() {
            let first_row = band_index * band_rows;
            self.export_rows(image, quantum_type, first_row, band, extent)?;

            if let Err(error) = progress.on_progressed(EXPORT_TAG, first_row + band.len() / extent, rows) {
                warn!("packing `{}` was cancelled", image.filename);
                return Err(error);
            }
        }

        Ok(bytes)
    }

    #[cfg(feature = "rayon")]
    fn export_rows(&self, image: &Image, quantum_type: QuantumType, first_row: usize, band: &mut [u8], extent: usize) -> UnitResult {
        use rayon::prelude::*;

        if self.limits.thread_limit() < 2 {
            return band.chunks_mut(extent).enumerate().try_for_each(|(index, bytes)| {
                self.export_row(image, quantum_type, first_row + index, bytes).map(drop)
            });
        }

        band.par_chunks_mut(extent).enumerate().try_for_each(|(index, bytes)| {
            self.export_row(image, quantum_type, first_row + index, bytes).map(drop)
        })
    }

    #[cfg(not(feature = "rayon"))]
    fn export_rows(&self, image: &Image, quantum_type: QuantumType, first_row: usize, band: &mut [u8], extent: usize) -> UnitResult {
        band.chunks_mut(extent).enumerate().try_for_each(|(index, bytes)| {
            self.export_row(image, quantum_type, first_row + index, bytes).map(drop)
        })
    }

    /// Pack every row into a scratch buffer and pass it to the sink, in row order.
    /// Each worker packs the next row into its own buffer,
    /// while the sink consumes the packed rows sequentially.
    /// Stops after the current row if the progress callback asks to.
    pub fn for_each_packed_row(
        &mut self, image: &Image, quantum_type: QuantumType,
        progress: &mut impl OnProgress, mut sink: impl FnMut(usize, &[u8]) -> UnitResult,
    ) -> UnitResult
    {
        trace!("stream `{}` as {:?}", image.filename, quantum_type);
        quantum_type.samples(image.layout())?;
        let extent = self.extent(image, quantum_type)?;

        let mut scratch = match self.scratch.take() {
            Some(scratch) if scratch.extent() >= extent => scratch,
            _ => ScratchPool::acquire(extent, &self.limits, &self.filename)?,
        };

        let result = self.stream_rows(&mut scratch, image, quantum_type, extent, progress, &mut sink);
        self.scratch = Some(scratch);
        result
    }

    fn stream_rows(
        &self, scratch: &mut ScratchPool, image: &Image, quantum_type: QuantumType, extent: usize,
        progress: &mut impl OnProgress, sink: &mut impl FnMut(usize, &[u8]) -> UnitResult,
    ) -> UnitResult
    {
        let rows = image.rows();
        let mut first_row = 0;

        while first_row < rows {
            let band_rows = scratch.buffer_count().min(rows - first_row);
            self.stage_rows(scratch, image, quantum_type, first_row, band_rows, extent)?;

            for (offset, buffer) in scratch.buffers_mut().take(band_rows).enumerate() {
                let y = first_row + offset;
                sink(y, &buffer[.. extent])?;

                if let Err(error) = progress.on_progressed(EXPORT_TAG, y + 1, rows) {
                    warn!("packing `{}` was cancelled after {} rows", image.filename, y + 1);
                    return Err(error);
                }
            }

            first_row += band_rows;
        }

        Ok(())
    }

    /// Pack consecutive rows into the first scratch buffers, one worker per row.
    #[cfg(feature = "rayon")]
    fn stage_rows(&self, scratch: &mut ScratchPool, image: &Image, quantum_type: QuantumType, first_row: usize, band_rows: usize, extent: usize) -> UnitResult {
        if band_rows < 2 {
            return self.stage_rows_sequentially(scratch, image, quantum_type, first_row, band_rows, extent);
        }

        let mut results: Vec<UnitResult> = (0 .. band_rows).map(|_| Ok(())).collect();

        rayon_core::scope(|scope| {
            let buffers = scratch.buffers_mut().take(band_rows);

            for ((offset, buffer), result) in buffers.enumerate().zip(results.iter_mut()) {
                scope.spawn(move |_| {
                    *result = self.export_row(image, quantum_type, first_row + offset, &mut buffer[.. extent]).map(drop);
                });
            }
        });

        results.into_iter().collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn stage_rows(&self, scratch: &mut ScratchPool, image: &Image, quantum_type: QuantumType, first_row: usize, band_rows: usize, extent: usize) -> UnitResult {
        self.stage_rows_sequentially(scratch, image, quantum_type, first_row, band_rows, extent)
    }

    fn stage_rows_sequentially(&self, scratch: &mut ScratchPool, image: &Image, quantum_type: QuantumType, first_row: usize, band_rows: usize, extent: usize) -> UnitResult {
        for (offset, buffer) in scratch.buffers_mut().take(band_rows).enumerate() {
            self.export_row(image, quantum_type, first_row + offset, &mut buffer[.. extent])?;
        }

        Ok(())
    }
}
