
//! Binary to text framing. Four bytes become five printable characters,
//! so that compressed pixels can be embedded in PostScript and similar text formats.

use std::convert::TryFrom;
use std::io::Write;
use log::trace;
use super::{ByteVec, Bytes};
use crate::error::{Error, Result, UnitResult};


/// Half of the number of characters per output line.
pub const MAX_LINE_EXTENT: isize = 36;

const END_MARKER: &[u8] = b"~>\n";


/// Encodes every byte written to it and passes the characters on to the inner sink.
/// Call `finish` to write the trailing bytes and the end marker.
#[derive(Debug)]
pub struct Ascii85Writer<W: Write> {
    write: W,
    buffer: [u8; 4],
    offset: usize,
    line_break: isize,
}

impl<W: Write> Ascii85Writer<W> {

    /// Start a new text block.
    pub fn new(write: W) -> Self {
        Ascii85Writer { write, buffer: [0; 4], offset: 0, line_break: 2 * MAX_LINE_EXTENT }
    }

    /// Encode a single byte.
    #[inline]
    pub fn encode_byte(&mut self, byte: u8) -> UnitResult {
        self.buffer[self.offset] = byte;
        self.offset += 1;

        if self.offset == 4 {
            self.offset = 0;
            let (tuple, length) = encode_tuple(self.buffer);

            for &character in &tuple[.. length] {
                self.line_break -= 1;

                // never break a line right before a percent sign
                if self.line_break < 0 && character != b'%' {
                    self.write.write_all(b"\n")?;
                    self.line_break = 2 * MAX_LINE_EXTENT;
                }

                self.write.write_all(&[ character ])?;
            }
        }

        Ok(())
    }

    /// Encode the remaining one to three bytes, write the end marker, and return the sink.
    pub fn finish(mut self) -> Result<W> {
        if self.offset > 0 {
            for byte in &mut self.buffer[self.offset ..] {
                *byte = 0;
            }

            let (tuple, length) = encode_tuple(self.buffer);
            let tuple = if length == 1 { *b"!!!!!" } else { tuple };
            self.write.write_all(&tuple[.. self.offset + 1])?;
        }

        self.write.write_all(END_MARKER)?;
        Ok(self.write)
    }
}

impl<W: Write> Write for Ascii85Writer<W> {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        for &byte in buffer {
            self.encode_byte(byte).map_err(into_io_error)?;
        }

        Ok(buffer.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.write.flush()
    }
}

fn into_io_error(error: Error) -> std::io::Error {
    match error {
        Error::Io(error) => error,
        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    }
}

/// Convert four bytes to five base-85 digits, or to `z` if all bytes are zero.
/// Returns the digits and how many of them are used.
#[inline]
fn encode_tuple(bytes: [u8; 4]) -> ([u8; 5], usize) {
    let mut code = u32::from_be_bytes(bytes);
    if code == 0 {
        return (*b"z\0\0\0\0", 1);
    }

    let mut tuple = [0_u8; 5];
    for digit in tuple.iter_mut().rev() {
        *digit = (code % 85) as u8 + b'!';
        code /= 85;
    }

    (tuple, 5)
}


/// Encode a whole buffer, including the end marker.
pub fn encode(data: Bytes<'_>) -> Result<ByteVec> {
    trace!("ascii85 encoding {} bytes", data.len());

    let mut writer = Ascii85Writer::new(Vec::with_capacity(data.len() * 5 / 4 + 8));
    writer.write_all(data)?;
    writer.finish()
}

/// Decode text produced by `encode`. Whitespace is ignored,
/// and decoding stops at the end marker or at the end of the input.
pub fn decode(text: Bytes<'_>) -> Result<ByteVec> {
    let mut decoded = Vec::with_capacity(text.len() * 4 / 5 + 4);
    let mut group = [0_u8; 5];
    let mut count = 0;

    let mut characters = text.iter().copied();
    while let Some(character) = characters.next() {
        match character {
            b'~' => {
                if characters.next() != Some(b'>') {
                    return Err(Error::corrupt("ascii85 end marker is incomplete"));
                }

                break;
            },

            b'z' if count == 0 => decoded.extend_from_slice(&[0; 4]),
            b'!' ..= b'u' => {
                group[count] = character - b'!';
                count += 1;

                if count == 5 {
                    decoded.extend_from_slice(&decode_group(group)?);
                    count = 0;
                }
            },

            character if character.is_ascii_whitespace() => {},
            _ => return Err(Error::corrupt("ascii85 text contains an invalid character")),
        }
    }

    match count {
        0 => {},
        1 => return Err(Error::corrupt("ascii85 text ends with a single character")),
        _ => {
            // pad with the highest digit, which restores the truncated bytes
            for digit in &mut group[count ..] { *digit = 84; }
            decoded.extend_from_slice(&decode_group(group)?[.. count - 1]);
        },
    }

    Ok(decoded)
}

fn decode_group(digits: [u8; 5]) -> Result<[u8; 4]> {
    let value = digits.iter().fold(0_u64, |value, &digit| value * 85 + u64::from(digit));
    let value = u32::try_from(value).map_err(|_| Error::corrupt("ascii85 group overflows 32 bits"))?;
    Ok(value.to_be_bytes())
}
