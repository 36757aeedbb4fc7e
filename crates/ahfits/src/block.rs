//! FITS 2880-byte block arithmetic.

/// FITS logical record size in bytes.
pub const BLOCK_SIZE: usize = 2880;

/// Header card size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards in one header block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Fill byte for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Fill byte for data blocks.
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Number of whole blocks needed to hold `num_bytes`.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Byte length of `num_bytes` rounded up to a whole number of blocks.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Append `src` to `out` followed by `pad_byte` up to the next block boundary.
pub fn append_padded(out: &mut Vec<u8>, src: &[u8], pad_byte: u8) {
    out.extend_from_slice(src);
    let padded = padded_byte_len(src.len());
    out.resize(out.len() + (padded - src.len()), pad_byte);
}
