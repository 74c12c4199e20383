//! ABI encoding of revealed clear values.
//!
//! Each value occupies one 32-byte big-endian word (the `uint256` layout).
//! Only values that fit in a `u64` are accepted back.

use thiserror::Error;

/// Size of one encoded word.
pub const WORD_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("Clear value length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Clear value {0} does not fit in 64 bits")]
    ValueOverflow(usize),
}

/// Encode values as consecutive 32-byte words.
pub fn encode_clear_values(values: &[u64]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * WORD_SIZE];
    for (word, value) in out.chunks_exact_mut(WORD_SIZE).zip(values) {
        word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    }
    out
}

/// Decode exactly `expected` words.
pub fn decode_clear_values(bytes: &[u8], expected: usize) -> Result<Vec<u64>, AbiError> {
    if bytes.len() != expected * WORD_SIZE {
        return Err(AbiError::LengthMismatch {
            expected: expected * WORD_SIZE,
            got: bytes.len(),
        });
    }

    bytes
        .chunks_exact(WORD_SIZE)
        .enumerate()
        .map(|(i, word)| {
            let (high, low) = word.split_at(WORD_SIZE - 8);
            if high.iter().any(|b| *b != 0) {
                return Err(AbiError::ValueOverflow(i));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(low);
            Ok(u64::from_be_bytes(buf))
        })
        .collect()
}
