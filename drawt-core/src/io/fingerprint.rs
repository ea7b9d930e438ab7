//! Fast, non-cryptographic content hash, recomputed every frame to detect unsaved changes.
//!
//! Bytes are folded in 8, 4, 2 and 1 byte chunks. Each chunk is shifted into a rotating lane of the 64-bit word
//! before mixing, so that equal values at different offsets don't cancel out.

use super::stream::{ByteStream, StreamError};

const SEED: u64 = 0x0123_4567_89AB_CDEF;

fn mix(value: u64, accumulator: u64) -> u64 {
    // Masked to 0..64, the cast can't truncate.
    #[allow(clippy::cast_possible_truncation)]
    let rotation = ((accumulator ^ 0x21) & 63) as u32;
    accumulator ^ (accumulator ^ 0xB0A8_2D45_578D_69D6).rotate_left(rotation) ^ value
}

#[derive(Clone, Debug)]
pub struct Fingerprint {
    accumulator: u64,
    lane: u32,
    consumed: usize,
}
impl Default for Fingerprint {
    fn default() -> Self {
        Self {
            accumulator: SEED,
            lane: 0,
            consumed: 0,
        }
    }
}
impl Fingerprint {
    #[must_use]
    pub fn finish(&self) -> u64 {
        self.accumulator
    }
    fn fold(&mut self, value: u64) {
        self.accumulator = mix(value.rotate_left(self.lane * 8), self.accumulator);
        self.lane = (self.lane + 1) % 8;
    }
}
impl ByteStream for Fingerprint {
    fn consume(&mut self, bytes: &mut [u8], _: &'static str) -> Result<(), StreamError> {
        self.consumed += bytes.len();
        let mut rest = &*bytes;
        while let Some((chunk, tail)) = rest.split_first_chunk::<8>() {
            self.fold(u64::from_le_bytes(*chunk));
            rest = tail;
        }
        if let Some((chunk, tail)) = rest.split_first_chunk::<4>() {
            let value = u32::from_le_bytes(*chunk);
            self.fold(u64::from(value) | (u64::from(value) << 32));
            rest = tail;
        }
        if let Some((chunk, tail)) = rest.split_first_chunk::<2>() {
            self.fold(u64::from(u16::from_le_bytes(*chunk)) * 0x0001_0001_0001_0001);
            rest = tail;
        }
        if let Some(&byte) = rest.first() {
            self.fold(u64::from(byte) * 0x0101_0101_0101_0101);
        }
        Ok(())
    }
    fn consumed(&self) -> usize {
        self.consumed
    }
}
