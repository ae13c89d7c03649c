
//! The run length code tables of one dimensional Group 3 fax (ITU-T T.4)
//! and the hash lookup used while decoding.

use smallvec::SmallVec;


/// Which table an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HuffmanId {
    TerminatingWhite,
    MakeUpWhite,
    TerminatingBlack,
    MakeUpBlack,

    /// Make-up codes for very long runs, shared by both colors.
    Extension,
}

impl HuffmanId {

    /// Terminating codes end a run and switch the color.
    /// All other codes only extend the current run.
    pub fn is_terminating(self) -> bool {
        matches!(self, HuffmanId::TerminatingWhite | HuffmanId::TerminatingBlack)
    }
}

/// A static row of a code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HuffmanEntry {
    pub id: HuffmanId,
    pub code: u16,
    pub length: u8,

    /// The run length this code stands for.
    pub count: u16,
}

const fn entry(id: HuffmanId, code: u16, length: u8, count: u16) -> HuffmanEntry {
    HuffmanEntry { id, code, length, count }
}

const fn tw(code: u16, length: u8, count: u16) -> HuffmanEntry { entry(HuffmanId::TerminatingWhite, code, length, count) }
const fn tb(code: u16, length: u8, count: u16) -> HuffmanEntry { entry(HuffmanId::TerminatingBlack, code, length, count) }
const fn mw(code: u16, length: u8, count: u16) -> HuffmanEntry { entry(HuffmanId::MakeUpWhite, code, length, count) }
const fn mb(code: u16, length: u8, count: u16) -> HuffmanEntry { entry(HuffmanId::MakeUpBlack, code, length, count) }
const fn ex(code: u16, length: u8, count: u16) -> HuffmanEntry { entry(HuffmanId::Extension, code, length, count) }

/// Terminating codes of white runs from 0 to 63 pixels.
pub static TW_TABLE: [HuffmanEntry; 64] = [
    tw(0x35, 8, 0), tw(0x07, 6, 1), tw(0x07, 4, 2), tw(0x08, 4, 3),
    tw(0x0b, 4, 4), tw(0x0c, 4, 5), tw(0x0e, 4, 6), tw(0x0f, 4, 7),
    tw(0x13, 5, 8), tw(0x14, 5, 9), tw(0x07, 5, 10), tw(0x08, 5, 11),
    tw(0x08, 6, 12), tw(0x03, 6, 13), tw(0x34, 6, 14), tw(0x35, 6, 15),
    tw(0x2a, 6, 16), tw(0x2b, 6, 17), tw(0x27, 7, 18), tw(0x0c, 7, 19),
    tw(0x08, 7, 20), tw(0x17, 7, 21), tw(0x03, 7, 22), tw(0x04, 7, 23),
    tw(0x28, 7, 24), tw(0x2b, 7, 25), tw(0x13, 7, 26), tw(0x24, 7, 27),
    tw(0x18, 7, 28), tw(0x02, 8, 29), tw(0x03, 8, 30), tw(0x1a, 8, 31),
    tw(0x1b, 8, 32), tw(0x12, 8, 33), tw(0x13, 8, 34), tw(0x14, 8, 35),
    tw(0x15, 8, 36), tw(0x16, 8, 37), tw(0x17, 8, 38), tw(0x28, 8, 39),
    tw(0x29, 8, 40), tw(0x2a, 8, 41), tw(0x2b, 8, 42), tw(0x2c, 8, 43),
    tw(0x2d, 8, 44), tw(0x04, 8, 45), tw(0x05, 8, 46), tw(0x0a, 8, 47),
    tw(0x0b, 8, 48), tw(0x52, 8, 49), tw(0x53, 8, 50), tw(0x54, 8, 51),
    tw(0x55, 8, 52), tw(0x24, 8, 53), tw(0x25, 8, 54), tw(0x58, 8, 55),
    tw(0x59, 8, 56), tw(0x5a, 8, 57), tw(0x5b, 8, 58), tw(0x4a, 8, 59),
    tw(0x4b, 8, 60), tw(0x32, 8, 61), tw(0x33, 8, 62), tw(0x34, 8, 63),
];

/// Terminating codes of black runs from 0 to 63 pixels.
pub static TB_TABLE: [HuffmanEntry; 64] = [
    tb(0x37, 10, 0), tb(0x02, 3, 1), tb(0x03, 2, 2), tb(0x02, 2, 3),
    tb(0x03, 3, 4), tb(0x03, 4, 5), tb(0x02, 4, 6), tb(0x03, 5, 7),
    tb(0x05, 6, 8), tb(0x04, 6, 9), tb(0x04, 7, 10), tb(0x05, 7, 11),
    tb(0x07, 7, 12), tb(0x04, 8, 13), tb(0x07, 8, 14), tb(0x18, 9, 15),
    tb(0x17, 10, 16), tb(0x18, 10, 17), tb(0x08, 10, 18), tb(0x67, 11, 19),
    tb(0x68, 11, 20), tb(0x6c, 11, 21), tb(0x37, 11, 22), tb(0x28, 11, 23),
    tb(0x17, 11, 24), tb(0x18, 11, 25), tb(0xca, 12, 26), tb(0xcb, 12, 27),
    tb(0xcc, 12, 28), tb(0xcd, 12, 29), tb(0x68, 12, 30), tb(0x69, 12, 31),
    tb(0x6a, 12, 32), tb(0x6b, 12, 33), tb(0xd2, 12, 34), tb(0xd3, 12, 35),
    tb(0xd4, 12, 36), tb(0xd5, 12, 37), tb(0xd6, 12, 38), tb(0xd7, 12, 39),
    tb(0x6c, 12, 40), tb(0x6d, 12, 41), tb(0xda, 12, 42), tb(0xdb, 12, 43),
    tb(0x54, 12, 44), tb(0x55, 12, 45), tb(0x56, 12, 46), tb(0x57, 12, 47),
    tb(0x64, 12, 48), tb(0x65, 12, 49), tb(0x52, 12, 50), tb(0x53, 12, 51),
    tb(0x24, 12, 52), tb(0x37, 12, 53), tb(0x38, 12, 54), tb(0x27, 12, 55),
    tb(0x28, 12, 56), tb(0x58, 12, 57), tb(0x59, 12, 58), tb(0x2b, 12, 59),
    tb(0x2c, 12, 60), tb(0x5a, 12, 61), tb(0x66, 12, 62), tb(0x67, 12, 63),
];

/// Make-up codes of white runs from 64 to 1728 pixels.
pub static MW_TABLE: [HuffmanEntry; 27] = [
    mw(0x1b, 5, 64), mw(0x12, 5, 128), mw(0x17, 6, 192), mw(0x37, 7, 256),
    mw(0x36, 8, 320), mw(0x37, 8, 384), mw(0x64, 8, 448), mw(0x65, 8, 512),
    mw(0x68, 8, 576), mw(0x67, 8, 640), mw(0xcc, 9, 704), mw(0xcd, 9, 768),
    mw(0xd2, 9, 832), mw(0xd3, 9, 896), mw(0xd4, 9, 960), mw(0xd5, 9, 1024),
    mw(0xd6, 9, 1088), mw(0xd7, 9, 1152), mw(0xd8, 9, 1216), mw(0xd9, 9, 1280),
    mw(0xda, 9, 1344), mw(0xdb, 9, 1408), mw(0x98, 9, 1472), mw(0x99, 9, 1536),
    mw(0x9a, 9, 1600), mw(0x18, 6, 1664), mw(0x9b, 9, 1728),
];

/// Make-up codes of black runs from 64 to 1728 pixels.
pub static MB_TABLE: [HuffmanEntry; 27] = [
    mb(0x0f, 10, 64), mb(0xc8, 12, 128), mb(0xc9, 12, 192), mb(0x5b, 12, 256),
    mb(0x33, 12, 320), mb(0x34, 12, 384), mb(0x35, 12, 448), mb(0x6c, 13, 512),
    mb(0x6d, 13, 576), mb(0x4a, 13, 640), mb(0x4b, 13, 704), mb(0x4c, 13, 768),
    mb(0x4d, 13, 832), mb(0x72, 13, 896), mb(0x73, 13, 960), mb(0x74, 13, 1024),
    mb(0x75, 13, 1088), mb(0x76, 13, 1152), mb(0x77, 13, 1216), mb(0x52, 13, 1280),
    mb(0x53, 13, 1344), mb(0x54, 13, 1408), mb(0x55, 13, 1472), mb(0x5a, 13, 1536),
    mb(0x5b, 13, 1600), mb(0x64, 13, 1664), mb(0x65, 13, 1728),
];

/// Extended make-up codes from 1792 to 2560 pixels, shared by both colors.
pub static EX_TABLE: [HuffmanEntry; 13] = [
    ex(0x08, 11, 1792), ex(0x0c, 11, 1856), ex(0x0d, 11, 1920), ex(0x12, 12, 1984),
    ex(0x13, 12, 2048), ex(0x14, 12, 2112), ex(0x15, 12, 2176), ex(0x16, 12, 2240),
    ex(0x17, 12, 2304), ex(0x1c, 12, 2368), ex(0x1d, 12, 2432), ex(0x1e, 12, 2496),
    ex(0x1f, 12, 2560),
];

/// The longest run a single make-up code can represent.
pub const MAX_MAKE_UP_RUN: usize = 2560;

/// Number of slots in a decoding hash table.
pub const HASH_SIZE: usize = 1021;

const WHITE_HASH: (usize, usize) = (3510, 1178);
const BLACK_HASH: (usize, usize) = (293, 2695);


/// Finds a code table entry by its bit length and code.
/// Built fresh for each decoded page.
#[derive(Debug, Clone)]
pub struct HuffmanHash {
    slots: Vec<Option<&'static HuffmanEntry>>,
    constants: (usize, usize),
}

impl HuffmanHash {

    /// The terminating, make-up and extension codes of white runs.
    pub fn white() -> Self {
        Self::build(WHITE_HASH, &[ &TW_TABLE, &MW_TABLE, &EX_TABLE ])
    }

    /// The terminating, make-up and extension codes of black runs.
    pub fn black() -> Self {
        Self::build(BLACK_HASH, &[ &TB_TABLE, &MB_TABLE, &EX_TABLE ])
    }

    /// Later entries replace earlier entries in the same slot.
    /// The constants are chosen so that this never happens for the fax tables.
    fn build(constants: (usize, usize), tables: &[&'static [HuffmanEntry]]) -> Self {
        let mut hash = HuffmanHash { slots: vec![None; HASH_SIZE], constants };

        for entry in tables.iter().copied().flat_map(|table| table.iter()) {
            let slot = hash.slot(usize::from(entry.length), usize::from(entry.code));
            hash.slots[slot] = Some(entry);
        }

        hash
    }

    #[inline]
    fn slot(&self, length: usize, code: usize) -> usize {
        let (a, b) = self.constants;
        ((length + a) * (code + b)) % HASH_SIZE
    }

    /// Returns the entry with exactly this length and code.
    /// Hash hits of other entries are rejected.
    #[inline]
    pub fn lookup(&self, length: usize, code: usize) -> Option<&'static HuffmanEntry> {
        self.slots[self.slot(length, code)].filter(|entry| {
            usize::from(entry.length) == length && usize::from(entry.code) == code
        })
    }
}


/// Split a white run into the codes that represent it:
/// make-up codes while the run is 64 or longer, then one terminating code.
pub fn white_run_codes(run: usize) -> SmallVec<[&'static HuffmanEntry; 4]> {
    run_codes(run, &MW_TABLE, &TW_TABLE)
}

/// Split a black run into the codes that represent it.
pub fn black_run_codes(run: usize) -> SmallVec<[&'static HuffmanEntry; 4]> {
    run_codes(run, &MB_TABLE, &TB_TABLE)
}

fn run_codes(
    mut run: usize,
    make_up: &'static [HuffmanEntry; 27],
    terminating: &'static [HuffmanEntry; 64]
) -> SmallVec<[&'static HuffmanEntry; 4]>
{
    let mut codes = SmallVec::new();

    while run >= 64 {
        let entry = if run < 1792 { &make_up[run / 64 - 1] }
            else { &EX_TABLE[(run.min(MAX_MAKE_UP_RUN) - 1792) / 64] };

        run -= usize::from(entry.count);
        codes.push(entry);
    }

    codes.push(&terminating[run]);
    codes
}
