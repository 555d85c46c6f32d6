//! Fulcrum outer code.
//!
//! The outer code expands `S` source symbols over the outer field into `S+E`
//! inner symbols with a systematic generator matrix `G`: the first `S` rows
//! are the identity, the last `E` rows are dense random non-zero elements.
//! Unless a seed is supplied, the rows are drawn from [`default_seed`], so
//! coders built by independent factories with the same generation agree on
//! `G`. Inner coding then happens over GF(2) on the expanded symbols.
//!
//! The decoder maps an inner GF(2) vector `c` (length `S+E`) to the outer
//! vector `c·G` (length `S`) and eliminates over the outer field.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::field::Field;
use crate::generator::random_nonzero;

pub const DEFAULT_EXPANSION: usize = 4;
pub const MAX_EXPANSION: usize = 10;

const SEED_BASE: u64 = 0x6675_6C63_7275_6D00;

/// Outer-code seed determined by the generation alone.
pub fn default_seed(field: Field, symbols: usize, expansion: usize) -> u64 {
    let mut h = SEED_BASE;
    for v in [field.bits() as u64, symbols as u64, expansion as u64] {
        h = (h ^ v).wrapping_mul(0x0000_0100_0000_01B3);
        h ^= h >> 29;
    }
    h
}

#[derive(Debug, Clone)]
pub struct OuterCode {
    field: Field,
    symbols: usize,
    expansion: usize,
    /// `expansion` packed rows of `symbols` outer elements.
    rows: Vec<u8>,
    row_size: usize,
}

impl OuterCode {
    pub fn new(field: Field, symbols: usize, expansion: usize, seed: u64) -> Self {
        let row_size = field.elements_size(symbols);
        let mut rows = vec![0u8; row_size * expansion];
        let mut rng = StdRng::seed_from_u64(seed);
        for row in rows.chunks_exact_mut(row_size) {
            for k in 0..symbols {
                field.set_value(row, k, random_nonzero(field, &mut rng));
            }
        }
        Self {
            field,
            symbols,
            expansion,
            rows,
            row_size,
        }
    }

    pub fn expansion(&self) -> usize {
        self.expansion
    }

    pub fn inner_symbols(&self) -> usize {
        self.symbols + self.expansion
    }

    /// Packed size of an inner GF(2) vector.
    pub fn inner_vector_size(&self) -> usize {
        Field::Binary.elements_size(self.inner_symbols())
    }

    /// Packed row `i` of `G`.
    pub fn row(&self, i: usize) -> Vec<u8> {
        if i < self.symbols {
            let mut unit = vec![0u8; self.row_size];
            self.field.set_value(&mut unit, i, 1);
            unit
        } else {
            let start = (i - self.symbols) * self.row_size;
            self.rows[start..start + self.row_size].to_vec()
        }
    }

    /// `c·G` for a packed inner GF(2) vector `c`.
    pub fn map_inner(&self, inner: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; self.row_size];
        for i in Field::Binary.nonzero_indices(inner, self.inner_symbols()) {
            if i < self.symbols {
                let v = self.field.get_value(&out, i) ^ 1;
                self.field.set_value(&mut out, i, v);
            } else {
                let start = (i - self.symbols) * self.row_size;
                self.field
                    .add_slice(&mut out, &self.rows[start..start + self.row_size]);
            }
        }
        out
    }
}
