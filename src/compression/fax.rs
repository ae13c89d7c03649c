
//! One dimensional Group 3 fax (modified Huffman) page codec.
//! Every scanline is a sequence of alternating white and black run codes,
//! starting with a white run, and ends with an end of line code.
//! A page ends with six end of line codes.

use std::io::{Read, Write};
use log::{trace, warn};
use super::Compression;
use super::ascii85::{self, Ascii85Writer};
use super::bits::{BitReader, BitWriter};
use super::huffman_tables::{HuffmanEntry, HuffmanHash, HASH_SIZE, white_run_codes, black_run_codes};
use crate::error::{Error, Result, UnitResult};
use crate::image::{Image, QUANTUM_RANGE, ResolutionUnits};
use crate::math::Vec2;
use crate::progress::{OnProgress, LOAD_TAG, SAVE_TAG};
use crate::resource::ResourceLimits;


/// The size of a fax page image if the container does not specify one.
pub const DEFAULT_PAGE_SIZE: Vec2<usize> = Vec2(2592, 3508);

/// The resolution of decoded fax pages, in pixels per inch.
pub const RESOLUTION: Vec2<f64> = Vec2(204.0, 196.0);

/// Raw fax scanlines are padded with white to at least this width.
pub const MIN_RAW_WIDTH: usize = 1728;

const END_OF_LINE_CODE: u32 = 1;
const END_OF_LINE_LENGTH: u32 = 12;
const END_OF_PAGE_LINES: usize = 6;

/// The number of zero bits that precede the one bit of an end of line code.
const SYNC_ZERO_BITS: usize = 11;

/// Longer codes do not exist, and the decoder skips to the next line.
const MAX_CODE_LENGTH: usize = 13;

/// This many blank lines in a row end the page.
const BLANK_LINES_PER_PAGE_END: usize = 3;


/// Where the fax bytes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaxTarget {

    /// A raw fax file. Lines are padded to at least 1728 pixels
    /// and the page starts with an end of line code.
    Raw,

    /// Embedded in a text format such as PostScript.
    /// Bytes are framed as Ascii85 and lines keep the image width.
    Ascii85,
}


/// A bilevel image of the default fax page size,
/// ready to be passed to `decode_image`.
pub fn page_image(filename: impl Into<String>) -> Result<Image> {
    let mut image = Image::bilevel(filename, DEFAULT_PAGE_SIZE)?;
    image.compression = Compression::Fax;
    Ok(image)
}


/// Encode all rows of an image as a fax page.
/// Pixels with a brightness of at least half the range are white, all others are black.
///
/// If the progress callback stops early, the end of page is still written,
/// and `Error::Aborted` is returned.
pub fn encode_image(
    image: &Image, target: FaxTarget, write: impl Write,
    limits: &ResourceLimits, progress: &mut impl OnProgress,
) -> UnitResult
{
    trace!("{}", image.filename);

    let width = match target {
        FaxTarget::Raw => image.columns().max(MIN_RAW_WIDTH),
        FaxTarget::Ascii85 => image.columns(),
    };

    limits.check_memory(width + 1, &image.filename)?;

    match target {
        FaxTarget::Raw => {
            let mut bits = BitWriter::new(write);
            write_end_of_line(&mut bits)?;

            let result = encode_page(image, width, &mut bits, progress);
            bits.finish()?;
            result
        },

        FaxTarget::Ascii85 => {
            let mut bits = BitWriter::new(Ascii85Writer::new(write));
            let result = encode_page(image, width, &mut bits, progress);
            bits.finish()?.finish()?;
            result
        },
    }
}

fn encode_page<W: Write>(image: &Image, width: usize, bits: &mut BitWriter<W>, progress: &mut impl OnProgress) -> UnitResult {
    let rows_result = encode_rows(image, width, bits, progress);

    match rows_result {
        Ok(()) => {},
        Err(Error::Aborted) => warn!("fax encoding of `{}` was cancelled, ending the page early", image.filename),
        Err(error) => return Err(error),
    }

    for _ in 0 .. END_OF_PAGE_LINES {
        write_end_of_line(bits)?;
    }

    rows_result
}

fn encode_rows<W: Write>(image: &Image, width: usize, bits: &mut BitWriter<W>, progress: &mut impl OnProgress) -> UnitResult {
    let layout = image.layout();
    let channels = layout.channel_count();
    let threshold = QUANTUM_RANGE / 2.0;

    // pixels beyond the image width stay white
    let mut scanline = vec![ false; width ];

    for y in 0 .. image.rows() {
        for (is_black, pixel) in scanline.iter_mut().zip(image.row(y).chunks_exact(channels)) {
            *is_black = layout.luma(pixel) < threshold;
        }

        let mut remaining = scanline.as_slice();
        while !remaining.is_empty() {
            let white = remaining.iter().take_while(|&&is_black| !is_black).count();
            write_codes(bits, &white_run_codes(white))?;
            remaining = &remaining[white ..];

            if !remaining.is_empty() {
                let black = remaining.iter().take_while(|&&is_black| is_black).count();
                write_codes(bits, &black_run_codes(black))?;
                remaining = &remaining[black ..];
            }
        }

        write_end_of_line(bits)?;
        progress.on_progressed(SAVE_TAG, y + 1, image.rows())?;
    }

    Ok(())
}

#[inline]
fn write_codes<W: Write>(bits: &mut BitWriter<W>, codes: &[&HuffmanEntry]) -> UnitResult {
    for code in codes {
        bits.write_bits(u32::from(code.code), u32::from(code.length))?;
    }

    Ok(())
}

#[inline]
fn write_end_of_line<W: Write>(bits: &mut BitWriter<W>) -> UnitResult {
    bits.write_bits(END_OF_LINE_CODE, END_OF_LINE_LENGTH)
}


/// Decode a page written with `FaxTarget::Ascii85`.
/// Such pages start without an end of line code, so one is inserted before decoding.
pub fn decode_embedded_page(text: &[u8], image: &mut Image, limits: &ResourceLimits, progress: &mut impl OnProgress) -> UnitResult {
    let page = ascii85::decode(text)?;
    limits.check_memory(page.len() + 2, &image.filename)?;

    let mut bits = BitWriter::new(Vec::with_capacity(page.len() + 2));
    write_end_of_line(&mut bits)?;

    for byte in page {
        bits.write_bits(u32::from(byte), 8)?;
    }

    decode_image(bits.finish()?.as_slice(), image, limits, progress)
}


/// Decode a fax page into the rows of a bilevel image,
/// such as one created by `page_image`.
/// Colormap index 0 is used for white and index 1 for black.
///
/// Decoding stops after three blank lines in a row, at the end of the input,
/// or when all rows of the image are filled.
/// The image is then truncated to the decoded rows, without the trailing blank lines,
/// its resolution is set to 204 by 196 pixels per inch,
/// and its compression is set to fax.
///
/// If the data ends within a scanline, or the progress callback stops early,
/// the image keeps all rows decoded so far and an error is returned.
pub fn decode_image(read: impl Read, image: &mut Image, limits: &ResourceLimits, progress: &mut impl OnProgress) -> UnitResult {
    trace!("{}", image.filename);

    if image.colormap().len() < 2 {
        return Err(Error::invalid(format!("fax image `{}` needs a colormap with white and black", image.filename)));
    }

    let columns = image.columns();
    let rows = image.rows();

    limits.check_memory(columns + 2 * HASH_SIZE * std::mem::size_of::<usize>(), &image.filename)?;

    let white_codes = HuffmanHash::white();
    let black_codes = HuffmanHash::black();
    let mut scanline = vec![ false; columns ];

    let mut reader = FaxReader { bits: BitReader::new(read), zero_run: 0 };
    if !reader.skip_to_end_of_line()? {
        return Err(Error::corrupt(format!("no fax end of line code found in `{}`", image.filename)));
    }

    image.resolution = RESOLUTION;
    image.units = ResolutionUnits::PixelsPerInch;

    let mut y = 0;
    let mut outcome = Ok(());

    // only a line ended early by its end of line code resets the page end counter
    let mut blank_lines = 0;
    let mut trailing_blank_lines = 0;

    while y < rows && blank_lines < BLANK_LINES_PER_PAGE_END {
        match reader.decode_line(&white_codes, &black_codes, &mut scanline)? {
            LineEnd::EndOfLine { blank: true } => {
                blank_lines += 1;
                trailing_blank_lines += 1;
            },

            LineEnd::EndOfLine { blank: false } => {
                blank_lines = 0;
                trailing_blank_lines = 0;
            },

            LineEnd::Complete => trailing_blank_lines = 0,

            LineEnd::Resynchronized => {
                trace!("skipped invalid code in row {} of `{}`", y, image.filename);
                trailing_blank_lines = 0;
            },

            LineEnd::EndOfInput { within_line: false } => break,
            LineEnd::EndOfInput { within_line: true } => {
                outcome = Err(Error::corrupt(format!("fax data of `{}` ends within row {}", image.filename, y)));
                break;
            },
        }

        write_row(image, y, &scanline);
        y += 1;

        if let Err(error) = progress.on_progressed(LOAD_TAG, y, rows) {
            outcome = Err(error);
            break;
        }
    }

    if y == 0 {
        return outcome.and(Err(Error::corrupt(format!("fax data of `{}` contains no rows", image.filename))));
    }

    image.truncate_rows((y - trailing_blank_lines).max(1));
    image.compression = Compression::Fax;

    if let Err(error) = &outcome {
        warn!("fax decoding of `{}` stopped after {} rows: {}", image.filename, image.rows(), error);
    }

    outcome
}

fn write_row(image: &mut Image, y: usize, scanline: &[bool]) {
    let row_width = image.row_width();
    let (layout, samples) = image.layout_and_samples_mut();
    let row = &mut samples[y * row_width .. (y + 1) * row_width];

    for (pixel, &is_black) in row.chunks_exact_mut(layout.channel_count()).zip(scanline) {
        layout.set_index(pixel, usize::from(is_black));
    }
}


/// How the decoding of a scanline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {

    /// An end of line code was found before the line was complete.
    /// A line is blank if the end of line code came before any run.
    EndOfLine { blank: bool },

    /// The runs reached the image width,
    /// and the rest of the line was skipped up to its end of line code.
    Complete,

    /// A code was too long, and the decoder skipped to the next line.
    Resynchronized,

    /// No more bits are available.
    EndOfInput { within_line: bool },
}

/// Reads bits and counts the zero bits since the last one bit,
/// which is how end of line codes are recognized.
struct FaxReader<R> {
    bits: BitReader<R>,
    zero_run: usize,
}

impl<R: Read> FaxReader<R> {

    #[inline]
    fn next_bit(&mut self) -> Result<Option<bool>> {
        let bit = self.bits.next_bit()?;

        match bit {
            Some(true) => self.zero_run = 0,
            Some(false) => self.zero_run += 1,
            None => {},
        }

        Ok(bit)
    }

    /// Consume bits up to and including the next end of line code.
    /// Returns false if the input ends first.
    fn skip_to_end_of_line(&mut self) -> Result<bool> {
        while self.zero_run < SYNC_ZERO_BITS {
            if self.next_bit()?.is_none() {
                return Ok(false);
            }
        }

        loop {
            match self.next_bit()? {
                Some(true) => return Ok(true),
                Some(false) => {},
                None => return Ok(false),
            }
        }
    }

    fn decode_line(&mut self, white_codes: &HuffmanHash, black_codes: &HuffmanHash, scanline: &mut [bool]) -> Result<LineEnd> {
        for pixel in scanline.iter_mut() {
            *pixel = false;
        }

        let columns = scanline.len();
        let mut is_white = true;
        let mut code = 0_usize;
        let mut length = 0_usize;
        let mut count = 0_usize;
        let mut x = 0;

        loop {
            if x >= columns {
                // ignore the rest of lines wider than the image,
                // a missing end of line is detected when reading the next line
                self.skip_to_end_of_line()?;
                return Ok(LineEnd::Complete);
            }

            // leading zeros do not change the code, so read until it is not zero
            loop {
                let after_sync_zeros = self.zero_run >= SYNC_ZERO_BITS;

                let bit = match self.next_bit()? {
                    Some(bit) => bit,
                    None => return Ok(LineEnd::EndOfInput { within_line: x != 0 || code != 0 }),
                };

                if after_sync_zeros && bit {
                    return Ok(LineEnd::EndOfLine { blank: x == 0 });
                }

                code = (code << 1) | usize::from(bit);
                length += 1;

                if code != 0 { break; }
            }

            if length > MAX_CODE_LENGTH {
                return Ok(if self.skip_to_end_of_line()? { LineEnd::Resynchronized }
                    else { LineEnd::EndOfInput { within_line: true } });
            }

            let (codes, min_length) = if is_white { (white_codes, 4) } else { (black_codes, 2) };
            if length < min_length { continue; }

            let entry = match codes.lookup(length, code) {
                Some(entry) => entry,
                None => continue,
            };

            count += usize::from(entry.count);

            if entry.id.is_terminating() {
                let end = (x + count).min(columns);

                if !is_white {
                    for pixel in &mut scanline[x .. end] {
                        *pixel = true;
                    }
                }

                x = end;
                count = 0;
                is_white = !is_white;
            }

            code = 0;
            length = 0;
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::image::{Colorspace, PixelChannel, Quantum};

    fn bilevel_value(is_black: bool) -> Quantum {
        if is_black { 0.0 } else { QUANTUM_RANGE }
    }

    fn gray_image(size: (usize, usize), is_black: impl Fn(usize, usize) -> bool) -> Image {
        let mut image = Image::new("page.fax", size, Colorspace::Gray, false).unwrap();
        for y in 0 .. size.1 {
            for (x, sample) in image.row_mut(y).iter_mut().enumerate() {
                *sample = bilevel_value(is_black(x, y));
            }
        }

        image
    }

    fn black_pixels(image: &Image, y: usize) -> Vec<bool> {
        image.row(y).chunks_exact(image.channel_count())
            .map(|pixel| image.layout().channel(pixel, PixelChannel::Index) == 1.0)
            .collect()
    }

    fn encode(image: &Image, target: FaxTarget) -> Vec<u8> {
        let mut bytes = Vec::new();
        encode_image(image, target, &mut bytes, &ResourceLimits::default(), &mut ()).unwrap();
        bytes
    }

    #[test]
    fn raw_page_layout(){
        let image = gray_image((16, 1), |_, _| false);
        let bytes = encode(&image, FaxTarget::Raw);

        // leading end of line: eleven zeros and a one
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1] >> 4, 0b0001);

        // each end of line contributes a single one bit
        let ones: u32 = bytes.iter().map(|byte| byte.count_ones()).sum();
        let white_line_ones = white_run_codes(MIN_RAW_WIDTH).iter().map(|code| code.code.count_ones()).sum::<u32>();
        assert_eq!(ones, 1 + white_line_ones + 1 + END_OF_PAGE_LINES as u32);
    }

    #[test]
    fn alternating_pixels_decode_into_a_page(){
        let image = gray_image((16, 1), |x, _| x % 2 == 0);
        let bytes = encode(&image, FaxTarget::Raw);

        let mut page = page_image("page.fax").unwrap();
        decode_image(bytes.as_slice(), &mut page, &ResourceLimits::default(), &mut ()).unwrap();

        assert_eq!(page.rows(), 1);
        assert_eq!(page.compression, Compression::Fax);
        assert_eq!(page.resolution, Vec2(204.0, 196.0));
        assert_eq!(page.units, ResolutionUnits::PixelsPerInch);

        let decoded = black_pixels(&page, 0);
        for x in 0 .. 16 { assert_eq!(decoded[x], x % 2 == 0, "pixel {}", x); }
        assert!(decoded[16 ..].iter().all(|&is_black| !is_black));
    }

    #[test]
    fn pattern_round_trip(){
        let is_black = |x: usize, y: usize| (x / 8 + y) % 2 == 1;
        let image = gray_image((64, 10), is_black);

        for &target in &[ FaxTarget::Raw, FaxTarget::Ascii85 ] {
            let bytes = encode(&image, target);
            let mut decoded = Image::bilevel("page.fax", (64, 10)).unwrap();

            match target {
                FaxTarget::Raw => decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap(),
                FaxTarget::Ascii85 => {
                    assert!(bytes.ends_with(b"~>\n"));
                    decode_embedded_page(&bytes, &mut decoded, &ResourceLimits::default(), &mut ()).unwrap()
                },
            }

            assert_eq!(decoded.rows(), 10);

            for y in 0 .. 10 {
                let expected: Vec<bool> = (0 .. 64).map(|x| is_black(x, y)).collect();
                assert_eq!(black_pixels(&decoded, y), expected, "row {} of {:?}", y, target);
            }
        }
    }

    #[test]
    fn long_runs(){
        let image = gray_image((6000, 2), |x, y| y == 1 && x >= 100);
        let text = encode(&image, FaxTarget::Ascii85);

        let mut decoded = Image::bilevel("page.fax", (6000, 2)).unwrap();
        decode_embedded_page(&text, &mut decoded, &ResourceLimits::default(), &mut ()).unwrap();

        assert!(black_pixels(&decoded, 0).iter().all(|&is_black| !is_black));
        assert_eq!(black_pixels(&decoded, 1), (0 .. 6000).map(|x| x >= 100).collect::<Vec<_>>());
    }

    #[test]
    fn end_of_page_lines_are_dropped(){
        let image = gray_image((40, 6), |x, y| y < 2 && x < 10);
        let bytes = encode(&image, FaxTarget::Raw);

        // white rows contain run codes and are kept, only the empty lines are dropped
        let mut decoded = Image::bilevel("page.fax", (40, 100)).unwrap();
        decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap();
        assert_eq!(decoded.rows(), 6);
        assert!(black_pixels(&decoded, 1)[.. 10].iter().all(|&is_black| is_black));
        assert!(black_pixels(&decoded, 5).iter().all(|&is_black| !is_black));
    }

    #[test]
    fn pages_decode_into_exactly_their_rows(){
        for &rows in &[ 1, 5 ] {
            let is_black = |x: usize, y: usize| (x + y) % 7 == 0;
            let image = gray_image((48, rows), is_black);

            for &target in &[ FaxTarget::Raw, FaxTarget::Ascii85 ] {
                let bytes = encode(&image, target);
                let mut decoded = Image::bilevel("page.fax", (48, 100)).unwrap();

                match target {
                    FaxTarget::Raw => decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap(),
                    FaxTarget::Ascii85 => decode_embedded_page(&bytes, &mut decoded, &ResourceLimits::default(), &mut ()).unwrap(),
                }

                assert_eq!(decoded.rows(), rows, "{:?}", target);

                for y in 0 .. rows {
                    let expected: Vec<bool> = (0 .. 48).map(|x| is_black(x, y)).collect();
                    assert_eq!(black_pixels(&decoded, y), expected, "row {} of {:?}", y, target);
                }
            }
        }
    }

    #[test]
    fn complete_lines_do_not_reset_the_page_end(){
        let white_line = white_run_codes(8);
        let mut black_line = white_run_codes(0);
        black_line.extend(black_run_codes(8));

        let mut bits = BitWriter::new(Vec::new());
        write_end_of_line(&mut bits).unwrap();

        for line in &[ None, Some(&white_line), None, Some(&white_line), None, Some(&black_line) ] {
            if let Some(codes) = line {
                write_codes(&mut bits, codes).unwrap();
            }

            write_end_of_line(&mut bits).unwrap();
        }

        for _ in 0 .. END_OF_PAGE_LINES {
            write_end_of_line(&mut bits).unwrap();
        }

        let bytes = bits.finish().unwrap();
        let mut decoded = Image::bilevel("page.fax", (8, 100)).unwrap();
        decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap();

        // the third blank line ends the page before the black line is read
        assert_eq!(decoded.rows(), 4);
        for y in 0 .. 4 {
            assert!(black_pixels(&decoded, y).iter().all(|&is_black| !is_black), "row {}", y);
        }
    }

    #[test]
    fn truncated_data(){
        let image = gray_image((64, 4), |x, _| x % 3 == 0);
        let bytes = encode(&image, FaxTarget::Raw);

        let mut decoded = Image::bilevel("page.fax", (64, 4)).unwrap();
        let result = decode_image(&bytes[.. bytes.len() / 2], &mut decoded, &ResourceLimits::default(), &mut ());
        assert!(matches!(result, Err(Error::CorruptImage(_))));
        assert!(decoded.rows() >= 1 && decoded.rows() < 4);

        let mut decoded = Image::bilevel("page.fax", (64, 4)).unwrap();
        let result = decode_image(&[ 0xff_u8, 0xff ][..], &mut decoded, &ResourceLimits::default(), &mut ());
        assert!(matches!(result, Err(Error::CorruptImage(_))));
    }

    #[test]
    fn cancelled(){
        let image = gray_image((64, 8), |x, y| (x + y) % 5 == 0);

        let mut bytes = Vec::new();
        let mut stop_halfway = |progress: f64| progress < 0.5;
        let result = encode_image(&image, FaxTarget::Raw, &mut bytes, &ResourceLimits::default(), &mut stop_halfway);
        assert!(matches!(result, Err(Error::Aborted)));

        // the page is still terminated, so the rows written so far can be decoded
        let mut decoded = Image::bilevel("page.fax", (64, 100)).unwrap();
        decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap();
        assert_eq!(decoded.rows(), 4);

        let mut decoded = Image::bilevel("page.fax", (64, 8)).unwrap();
        let mut stop_after_first_row = |_: f64| false;
        let result = decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut stop_after_first_row);
        assert!(matches!(result, Err(Error::Aborted)));
        assert_eq!(decoded.rows(), 1);
    }

    #[test]
    fn limits(){
        let image = gray_image((16, 1), |_, _| false);
        let limits = ResourceLimits { max_memory_bytes: Some(100), .. Default::default() };

        let mut bytes = Vec::new();
        let result = encode_image(&image, FaxTarget::Raw, &mut bytes, &limits, &mut ());
        assert!(matches!(result, Err(Error::ResourceLimit(_))));
        assert!(bytes.is_empty());
    }
}
