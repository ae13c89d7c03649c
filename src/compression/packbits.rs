
//! Macintosh Packbits run length encoding.
//! Runs of three to 127 equal bytes become a two byte repeat,
//! everything else is copied in literal blocks of up to 127 bytes.

use super::{ByteVec, Bytes};
use crate::error::{Error, Result};

const MIN_RUN_LENGTH: usize = 3;
const MAX_RUN_LENGTH: usize = 127;

/// Terminates every encoded stream.
pub const END_OF_DATA: u8 = 0x80;


/// Encode all bytes, followed by the end of data marker.
pub fn compress_bytes(data: Bytes<'_>) -> ByteVec {
    let mut compressed = Vec::with_capacity(data.len() + data.len() / MAX_RUN_LENGTH + 2);
    let mut remaining = data;

    while !remaining.is_empty() {
        match remaining {
            &[ single ] => {
                compressed.extend_from_slice(&[ 0, single ]);
                remaining = &[];
            },

            &[ first, second ] => {
                compressed.extend_from_slice(&[ 1, first, second ]);
                remaining = &[];
            },

            &[ first, second, third ] => {
                if first == second && second == third {
                    compressed.extend_from_slice(&[ repeat_header(MIN_RUN_LENGTH), first ]);
                }
                else {
                    compressed.extend_from_slice(&[ 2, first, second, third ]);
                }

                remaining = &[];
            },

            _ => {
                let count = if starts_with_run(remaining) {
                    let mut count = MIN_RUN_LENGTH;
                    while count < remaining.len() && remaining[count] == remaining[0] {
                        count += 1;
                        if count >= MAX_RUN_LENGTH { break; }
                    }

                    compressed.extend_from_slice(&[ repeat_header(count), remaining[0] ]);
                    count
                }
                else {
                    // stop the literal block where a run begins, and leave at least three bytes
                    let mut count = 0;
                    while !starts_with_run(&remaining[count ..]) {
                        count += 1;
                        if count >= remaining.len() - MIN_RUN_LENGTH || count >= MAX_RUN_LENGTH { break; }
                    }

                    compressed.push((count - 1) as u8);
                    compressed.extend_from_slice(&remaining[.. count]);
                    count
                };

                remaining = &remaining[count ..];
            },
        }
    }

    compressed.push(END_OF_DATA);
    compressed
}

#[inline]
fn starts_with_run(bytes: Bytes<'_>) -> bool {
    bytes.len() >= MIN_RUN_LENGTH && bytes[0] == bytes[1] && bytes[1] == bytes[2]
}

#[inline]
fn repeat_header(count: usize) -> u8 {
    debug_assert!(count >= MIN_RUN_LENGTH && count <= MAX_RUN_LENGTH);
    (257 - count) as u8
}


/// Decode a stream up to the end of data marker or the end of the input.
pub fn decompress_bytes(mut remaining: Bytes<'_>, expected_byte_size: usize) -> Result<ByteVec> {
    let mut decompressed = Vec::with_capacity(expected_byte_size.min(8 * 2048));

    while !remaining.is_empty() {
        let header = take_1(&mut remaining)?;

        if header == END_OF_DATA {
            break;
        }
        else if header < END_OF_DATA {
            let values = take_n(&mut remaining, usize::from(header) + 1)?;
            decompressed.extend_from_slice(values);
        }
        else {
            let value = take_1(&mut remaining)?;
            let count = 257 - usize::from(header);
            decompressed.resize(decompressed.len() + count, value);
        }
    }

    Ok(decompressed)
}

fn take_1(slice: &mut &[u8]) -> Result<u8> {
    if let Some((&first, rest)) = slice.split_first() {
        *slice = rest;
        Ok(first)
    }
    else {
        Err(Error::corrupt("packbits data ends within a block"))
    }
}

fn take_n<'s>(slice: &mut &'s [u8], n: usize) -> Result<&'s [u8]> {
    if n <= slice.len() {
        let (front, back) = slice.split_at(n);
        *slice = back;
        Ok(front)
    }
    else {
        Err(Error::corrupt("packbits data ends within a block"))
    }
}
