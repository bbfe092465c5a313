//! Sine waveform tables
//!
//! [`SINE_LUT_16`] is one period of a full-scale sine in 512 unsigned 16-bit
//! steps, centred on mid-scale (0x8000). The DMA path reads 32-bit words, two
//! samples per word with the earlier sample in the low half, so
//! [`SINE_LUT_WORDS`] is the same table packed as 256 words. Streaming it
//! alternates samples between channel 0 and channel 1.

/// One sine period, 512 unsigned 16-bit samples
pub const SINE_LUT_16: [u16; 512] = [
    0x8000, 0x8192, 0x8324, 0x84B6, 0x8648, 0x87D9, 0x896A, 0x8AFB,
    0x8C8C, 0x8E1C, 0x8FAB, 0x913A, 0x92C8, 0x9455, 0x95E2, 0x976E,
    0x98F9, 0x9A82, 0x9C0B, 0x9D93, 0x9F1A, 0xA09F, 0xA223, 0xA3A6,
    0xA528, 0xA6A8, 0xA826, 0xA9A3, 0xAB1F, 0xAC99, 0xAE11, 0xAF87,
    0xB0FB, 0xB26E, 0xB3DF, 0xB54D, 0xB6BA, 0xB824, 0xB98C, 0xBAF2,
    0xBC56, 0xBDB8, 0xBF17, 0xC073, 0xC1CE, 0xC325, 0xC47A, 0xC5CD,
    0xC71C, 0xC869, 0xC9B4, 0xCAFB, 0xCC3F, 0xCD81, 0xCEBF, 0xCFFB,
    0xD133, 0xD268, 0xD39B, 0xD4C9, 0xD5F5, 0xD71D, 0xD842, 0xD964,
    0xDA82, 0xDB9C, 0xDCB3, 0xDDC7, 0xDED7, 0xDFE3, 0xE0EB, 0xE1F0,
    0xE2F1, 0xE3EE, 0xE4E8, 0xE5DD, 0xE6CF, 0xE7BC, 0xE8A6, 0xE98B,
    0xEA6D, 0xEB4A, 0xEC23, 0xECF8, 0xEDC9, 0xEE96, 0xEF5E, 0xF022,
    0xF0E2, 0xF19D, 0xF254, 0xF307, 0xF3B5, 0xF45F, 0xF504, 0xF5A5,
    0xF641, 0xF6D8, 0xF76B, 0xF7FA, 0xF884, 0xF909, 0xF989, 0xFA05,
    0xFA7C, 0xFAEE, 0xFB5C, 0xFBC5, 0xFC29, 0xFC88, 0xFCE3, 0xFD39,
    0xFD89, 0xFDD5, 0xFE1D, 0xFE5F, 0xFE9C, 0xFED5, 0xFF09, 0xFF37,
    0xFF61, 0xFF86, 0xFFA6, 0xFFC1, 0xFFD8, 0xFFE9, 0xFFF5, 0xFFFD,
    0xFFFF, 0xFFFD, 0xFFF5, 0xFFE9, 0xFFD8, 0xFFC1, 0xFFA6, 0xFF86,
    0xFF61, 0xFF37, 0xFF09, 0xFED5, 0xFE9C, 0xFE5F, 0xFE1D, 0xFDD5,
    0xFD89, 0xFD39, 0xFCE3, 0xFC88, 0xFC29, 0xFBC5, 0xFB5C, 0xFAEE,
    0xFA7C, 0xFA05, 0xF989, 0xF909, 0xF884, 0xF7FA, 0xF76B, 0xF6D8,
    0xF641, 0xF5A5, 0xF504, 0xF45F, 0xF3B5, 0xF307, 0xF254, 0xF19D,
    0xF0E2, 0xF022, 0xEF5E, 0xEE96, 0xEDC9, 0xECF8, 0xEC23, 0xEB4A,
    0xEA6D, 0xE98B, 0xE8A6, 0xE7BC, 0xE6CF, 0xE5DD, 0xE4E8, 0xE3EE,
    0xE2F1, 0xE1F0, 0xE0EB, 0xDFE3, 0xDED7, 0xDDC7, 0xDCB3, 0xDB9C,
    0xDA82, 0xD964, 0xD842, 0xD71D, 0xD5F5, 0xD4C9, 0xD39B, 0xD268,
    0xD133, 0xCFFB, 0xCEBF, 0xCD81, 0xCC3F, 0xCAFB, 0xC9B4, 0xC869,
    0xC71C, 0xC5CD, 0xC47A, 0xC325, 0xC1CE, 0xC073, 0xBF17, 0xBDB8,
    0xBC56, 0xBAF2, 0xB98C, 0xB824, 0xB6BA, 0xB54D, 0xB3DF, 0xB26E,
    0xB0FB, 0xAF87, 0xAE11, 0xAC99, 0xAB1F, 0xA9A3, 0xA826, 0xA6A8,
    0xA528, 0xA3A6, 0xA223, 0xA09F, 0x9F1A, 0x9D93, 0x9C0B, 0x9A82,
    0x98F9, 0x976E, 0x95E2, 0x9455, 0x92C8, 0x913A, 0x8FAB, 0x8E1C,
    0x8C8C, 0x8AFB, 0x896A, 0x87D9, 0x8648, 0x84B6, 0x8324, 0x8192,
    0x8000, 0x7E6E, 0x7CDC, 0x7B4A, 0x79B8, 0x7827, 0x7696, 0x7505,
    0x7374, 0x71E4, 0x7055, 0x6EC6, 0x6D38, 0x6BAB, 0x6A1E, 0x6892,
    0x6707, 0x657E, 0x63F5, 0x626D, 0x60E6, 0x5F61, 0x5DDD, 0x5C5A,
    0x5AD8, 0x5958, 0x57DA, 0x565D, 0x54E1, 0x5367, 0x51EF, 0x5079,
    0x4F05, 0x4D92, 0x4C21, 0x4AB3, 0x4946, 0x47DC, 0x4674, 0x450E,
    0x43AA, 0x4248, 0x40E9, 0x3F8D, 0x3E32, 0x3CDB, 0x3B86, 0x3A33,
    0x38E4, 0x3797, 0x364C, 0x3505, 0x33C1, 0x327F, 0x3141, 0x3005,
    0x2ECD, 0x2D98, 0x2C65, 0x2B37, 0x2A0B, 0x28E3, 0x27BE, 0x269C,
    0x257E, 0x2464, 0x234D, 0x2239, 0x2129, 0x201D, 0x1F15, 0x1E10,
    0x1D0F, 0x1C12, 0x1B18, 0x1A23, 0x1931, 0x1844, 0x175A, 0x1675,
    0x1593, 0x14B6, 0x13DD, 0x1308, 0x1237, 0x116A, 0x10A2, 0x0FDE,
    0x0F1E, 0x0E63, 0x0DAC, 0x0CF9, 0x0C4B, 0x0BA1, 0x0AFC, 0x0A5B,
    0x09BF, 0x0928, 0x0895, 0x0806, 0x077C, 0x06F7, 0x0677, 0x05FB,
    0x0584, 0x0512, 0x04A4, 0x043B, 0x03D7, 0x0378, 0x031D, 0x02C7,
    0x0277, 0x022B, 0x01E3, 0x01A1, 0x0164, 0x012B, 0x00F7, 0x00C9,
    0x009F, 0x007A, 0x005A, 0x003F, 0x0028, 0x0017, 0x000B, 0x0003,
    0x0001, 0x0003, 0x000B, 0x0017, 0x0028, 0x003F, 0x005A, 0x007A,
    0x009F, 0x00C9, 0x00F7, 0x012B, 0x0164, 0x01A1, 0x01E3, 0x022B,
    0x0277, 0x02C7, 0x031D, 0x0378, 0x03D7, 0x043B, 0x04A4, 0x0512,
    0x0584, 0x05FB, 0x0677, 0x06F7, 0x077C, 0x0806, 0x0895, 0x0928,
    0x09BF, 0x0A5B, 0x0AFC, 0x0BA1, 0x0C4B, 0x0CF9, 0x0DAC, 0x0E63,
    0x0F1E, 0x0FDE, 0x10A2, 0x116A, 0x1237, 0x1308, 0x13DD, 0x14B6,
    0x1593, 0x1675, 0x175A, 0x1844, 0x1931, 0x1A23, 0x1B18, 0x1C12,
    0x1D0F, 0x1E10, 0x1F15, 0x201D, 0x2129, 0x2239, 0x234D, 0x2464,
    0x257E, 0x269C, 0x27BE, 0x28E3, 0x2A0B, 0x2B37, 0x2C65, 0x2D98,
    0x2ECD, 0x3005, 0x3141, 0x327F, 0x33C1, 0x3505, 0x364C, 0x3797,
    0x38E4, 0x3A33, 0x3B86, 0x3CDB, 0x3E32, 0x3F8D, 0x40E9, 0x4248,
    0x43AA, 0x450E, 0x4674, 0x47DC, 0x4946, 0x4AB3, 0x4C21, 0x4D92,
    0x4F05, 0x5079, 0x51EF, 0x5367, 0x54E1, 0x565D, 0x57DA, 0x5958,
    0x5AD8, 0x5C5A, 0x5DDD, 0x5F61, 0x60E6, 0x626D, 0x63F5, 0x657E,
    0x6707, 0x6892, 0x6A1E, 0x6BAB, 0x6D38, 0x6EC6, 0x7055, 0x71E4,
    0x7374, 0x7505, 0x7696, 0x7827, 0x79B8, 0x7B4A, 0x7CDC, 0x7E6E,
];

/// Words in [`SINE_LUT_WORDS`]
pub const SINE_LUT_WORD_COUNT: usize = SINE_LUT_16.len() / 2;

/// [`SINE_LUT_16`] packed two samples per little-endian word.
pub static SINE_LUT_WORDS: [u32; SINE_LUT_WORD_COUNT] = pack_pairs(&SINE_LUT_16);

/// Pack consecutive sample pairs into words: `lo = samples[2i]`,
/// `hi = samples[2i + 1]`.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // const loop, bounds fixed by N
pub const fn pack_pairs<const N: usize>(samples: &[u16]) -> [u32; N] {
    let mut words = [0u32; N];
    let mut i = 0;
    while i < N {
        words[i] = (samples[2 * i] as u32) | ((samples[2 * i + 1] as u32) << 16);
        i += 1;
    }
    words
}

/// Split a packed word back into its `[lo, hi]` samples.
pub const fn unpack_word(word: u32) -> [u16; 2] {
    [word as u16, (word >> 16) as u16]
}
