//! Sliding-window feedback bitmap.
//!
//! `ceil(S/8)` bytes; bit `i` (LSB first within each byte) is set when the
//! decoder holds a pivot for symbol `i`. Bits past `S` are ignored on read.

use crate::error::{CodingError, Result};

pub fn feedback_size(symbols: usize) -> usize {
    symbols.div_ceil(8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackBitmap {
    symbols: usize,
    bits: Vec<u8>,
}

impl FeedbackBitmap {
    pub fn new(symbols: usize) -> Self {
        Self {
            symbols,
            bits: vec![0u8; feedback_size(symbols)],
        }
    }

    pub fn from_pivots(symbols: usize, pivots: impl IntoIterator<Item = usize>) -> Self {
        let mut fb = Self::new(symbols);
        for i in pivots {
            fb.set(i);
        }
        fb
    }

    pub fn parse(symbols: usize, bytes: &[u8]) -> Result<Self> {
        let expected = feedback_size(symbols);
        if bytes.len() != expected {
            return Err(CodingError::MalformedFeedback {
                expected,
                got: bytes.len(),
            });
        }
        let mut bits = bytes.to_vec();
        let tail = symbols % 8;
        if tail != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }
        Ok(Self { symbols, bits })
    }

    pub fn set(&mut self, index: usize) {
        if index < self.symbols {
            self.bits[index / 8] |= 1 << (index % 8);
        }
    }

    pub fn is_set(&self, index: usize) -> bool {
        index < self.symbols && self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bits
    }
}
