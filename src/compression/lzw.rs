
//! Variable width LZW as used by TIFF and PDF:
//! 9 to 12 bit codes, most significant bit first,
//! with a clear code and an end of data code.

use log::trace;
use super::{ByteVec, Bytes};
use super::bits::BitWriter;
use crate::error::Result;


/// Resets the dictionary of the decoder.
pub const CLEAR_CODE: u32 = 256;

/// Terminates the stream.
pub const END_OF_DATA_CODE: u32 = 257;

const FIRST_FREE_CODE: u16 = 258;
const MIN_CODE_WIDTH: u32 = 9;
const MAX_CODE_WIDTH: u32 = 12;
const TABLE_SIZE: usize = 1 << MAX_CODE_WIDTH;
const NO_CODE: u16 = u16::MAX;


/// All byte strings seen so far, stored as a trie.
/// Every code is a prefix code extended by one byte,
/// and the extensions of a code are linked as siblings.
#[derive(Debug)]
struct Dictionary {
    suffix: Vec<u8>,
    first_child: Vec<u16>,
    next_sibling: Vec<u16>,
    next_code: u16,
}

impl Dictionary {
    fn new() -> Self {
        Dictionary {
            suffix: vec![ 0; TABLE_SIZE ],
            first_child: vec![ NO_CODE; TABLE_SIZE ],
            next_sibling: vec![ NO_CODE; TABLE_SIZE ],
            next_code: FIRST_FREE_CODE,
        }
    }

    /// Forget everything but the single bytes.
    fn reset(&mut self) {
        for child in &mut self.first_child[.. 256] {
            *child = NO_CODE;
        }

        self.next_code = FIRST_FREE_CODE;
    }

    #[inline]
    fn find(&self, prefix: u16, byte: u8) -> Option<u16> {
        let mut child = self.first_child[usize::from(prefix)];

        while child != NO_CODE {
            if self.suffix[usize::from(child)] == byte {
                return Some(child);
            }

            child = self.next_sibling[usize::from(child)];
        }

        None
    }

    #[inline]
    fn insert(&mut self, prefix: u16, byte: u8) {
        let code = self.next_code;
        let index = usize::from(code);

        self.suffix[index] = byte;
        self.first_child[index] = NO_CODE;
        self.next_sibling[index] = self.first_child[usize::from(prefix)];
        self.first_child[usize::from(prefix)] = code;
        self.next_code += 1;
    }
}


/// Compress all bytes, starting with a clear code and ending with the end of data code.
pub fn compress_bytes(data: Bytes<'_>) -> Result<ByteVec> {
    let mut bits = BitWriter::new(Vec::with_capacity(data.len() / 2 + 8));
    let mut width = MIN_CODE_WIDTH;
    bits.write_bits(CLEAR_CODE, width)?;

    let (&first, rest) = match data.split_first() {
        Some(split) => split,
        None => {
            bits.write_bits(END_OF_DATA_CODE, width)?;
            return bits.finish();
        }
    };

    let mut dictionary = Dictionary::new();
    let mut code = u16::from(first);

    for &byte in rest {
        if let Some(extended) = dictionary.find(code, byte) {
            code = extended;
            continue;
        }

        bits.write_bits(u32::from(code), width)?;
        dictionary.insert(code, byte);

        if u32::from(dictionary.next_code) >> width != 0 {
            if width < MAX_CODE_WIDTH {
                width += 1;
            }
            else {
                trace!("lzw dictionary full after {} codes, clearing", dictionary.next_code);
                bits.write_bits(CLEAR_CODE, width)?;
                dictionary.reset();
                width = MIN_CODE_WIDTH;
            }
        }

        code = u16::from(byte);
    }

    bits.write_bits(u32::from(code), width)?;

    // the decoder adds one more entry for the last code and may widen before reading the end code
    if (u32::from(dictionary.next_code) + 1) >> width != 0 && width < MAX_CODE_WIDTH {
        width += 1;
    }

    bits.write_bits(END_OF_DATA_CODE, width)?;
    bits.finish()
}
