//! Incremental Gaussian elimination.
//!
//! The decoding matrix keeps up to `S` rows indexed by pivot column, always
//! in fully reduced row-echelon form: every stored row has coefficient 1 at
//! its pivot and 0 at every other pivot column. A row whose only non-zero
//! coefficient is its pivot holds the decoded source symbol ("uncoded").

use crate::field::Field;

pub struct DecodingMatrix {
    field: Field,
    symbols: usize,
    symbol_size: usize,
    coefficient_size: usize,
    coefficients: Vec<u8>,
    data: Vec<u8>,
    pivot: Vec<bool>,
    uncoded: Vec<bool>,
    rank: usize,
    uncoded_count: usize,
}

impl DecodingMatrix {
    pub fn new(field: Field, symbols: usize, symbol_size: usize) -> Self {
        let coefficient_size = field.elements_size(symbols);
        Self {
            field,
            symbols,
            symbol_size,
            coefficient_size,
            coefficients: vec![0u8; symbols * coefficient_size],
            data: vec![0u8; symbols * symbol_size],
            pivot: vec![false; symbols],
            uncoded: vec![false; symbols],
            rank: 0,
            uncoded_count: 0,
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }

    pub fn coefficient_size(&self) -> usize {
        self.coefficient_size
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_complete(&self) -> bool {
        self.rank == self.symbols
    }

    pub fn is_pivot(&self, index: usize) -> bool {
        self.pivot.get(index).copied().unwrap_or(false)
    }

    pub fn is_uncoded(&self, index: usize) -> bool {
        self.uncoded.get(index).copied().unwrap_or(false)
    }

    pub fn uncoded_count(&self) -> usize {
        self.uncoded_count
    }

    pub fn pivots(&self) -> impl Iterator<Item = usize> + Clone + '_ {
        self.pivot
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
    }

    /// Packed coefficients of the row pivoted at `index`.
    pub fn row_coefficients(&self, index: usize) -> &[u8] {
        let cs = self.coefficient_size;
        &self.coefficients[index * cs..(index + 1) * cs]
    }

    /// Data of the row pivoted at `index`.
    pub fn row_data(&self, index: usize) -> &[u8] {
        let l = self.symbol_size;
        &self.data[index * l..(index + 1) * l]
    }

    /// Eliminate `(coefficients, data)` against the basis and store it.
    /// Returns the new pivot, or `None` when the row is linearly dependent.
    pub fn insert(&mut self, coefficients: &[u8], data: &[u8]) -> Option<usize> {
        debug_assert_eq!(coefficients.len(), self.coefficient_size);
        debug_assert_eq!(data.len(), self.symbol_size);
        let field = self.field;
        let cs = self.coefficient_size;
        let l = self.symbol_size;

        let mut v = coefficients.to_vec();
        let mut d = data.to_vec();

        // Forward: clear every existing pivot column from the new row.
        for j in 0..self.symbols {
            if !self.pivot[j] {
                continue;
            }
            let c = field.get_value(&v, j);
            if c == 0 {
                continue;
            }
            field.multiply_add_slice(&mut v, &self.coefficients[j * cs..(j + 1) * cs], c);
            field.multiply_add_slice(&mut d, &self.data[j * l..(j + 1) * l], c);
        }

        let Some(p) = field.first_nonzero(&v, self.symbols) else {
            tracing::trace!(rank = self.rank, "redundant row");
            return None;
        };

        let inv = field.invert(field.get_value(&v, p));
        field.multiply_slice(&mut v, inv);
        field.multiply_slice(&mut d, inv);

        // Backward: clear column p from every stored row.
        for j in 0..self.symbols {
            if !self.pivot[j] {
                continue;
            }
            let row = &mut self.coefficients[j * cs..(j + 1) * cs];
            let c = field.get_value(row, p);
            if c == 0 {
                continue;
            }
            field.multiply_add_slice(row, &v, c);
            field.multiply_add_slice(&mut self.data[j * l..(j + 1) * l], &d, c);
            if !self.uncoded[j] && self.single_nonzero(j) {
                self.uncoded[j] = true;
                self.uncoded_count += 1;
            }
        }

        self.coefficients[p * cs..(p + 1) * cs].copy_from_slice(&v);
        self.data[p * l..(p + 1) * l].copy_from_slice(&d);
        self.pivot[p] = true;
        self.rank += 1;
        if self.single_nonzero(p) {
            self.uncoded[p] = true;
            self.uncoded_count += 1;
        }
        tracing::trace!(pivot = p, rank = self.rank, "row accepted");
        Some(p)
    }

    fn single_nonzero(&self, index: usize) -> bool {
        self.field
            .nonzero_indices(self.row_coefficients(index), self.symbols)
            .nth(1)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit(field: Field, n: usize, i: usize) -> Vec<u8> {
        let mut v = vec![0u8; field.elements_size(n)];
        field.set_value(&mut v, i, 1);
        v
    }

    #[test]
    fn test_unit_rows_are_uncoded() {
        let mut m = DecodingMatrix::new(Field::Binary8, 3, 2);
        assert_eq!(m.insert(&unit(Field::Binary8, 3, 1), &[4, 5]), Some(1));
        assert!(m.is_uncoded(1));
        assert_eq!(m.row_data(1), &[4, 5]);
        assert_eq!(m.uncoded_count(), 1);
        assert_eq!(m.insert(&unit(Field::Binary8, 3, 1), &[4, 5]), None);
        assert_eq!(m.rank(), 1);
    }

    #[test]
    fn test_back_substitution_decodes() {
        // x0 + x1 = 3, x1 = 1 over GF(2^8)
        let f = Field::Binary8;
        let mut m = DecodingMatrix::new(f, 2, 1);
        assert_eq!(m.insert(&[1, 1], &[3]), Some(0));
        assert!(!m.is_uncoded(0));
        assert_eq!(m.insert(&[0, 1], &[1]), Some(1));
        assert!(m.is_complete());
        assert!(m.is_uncoded(0) && m.is_uncoded(1));
        assert_eq!(m.row_data(0), &[2]);
        assert_eq!(m.row_data(1), &[1]);
    }

    #[test]
    fn test_rows_stay_reduced() {
        let f = Field::Binary4;
        let n = 6;
        let mut rng = StdRng::seed_from_u64(11);
        let mut m = DecodingMatrix::new(f, n, 4);
        while !m.is_complete() {
            let mut v = vec![0u8; f.elements_size(n)];
            for i in 0..n {
                f.set_value(&mut v, i, rng.gen_range(0..=15));
            }
            if f.first_nonzero(&v, n).is_none() {
                continue;
            }
            let data: Vec<u8> = (0..4).map(|_| rng.gen()).collect();
            m.insert(&v, &data);
            for p in m.pivots().collect::<Vec<_>>() {
                for q in m.pivots() {
                    let expected = u16::from(p == q);
                    assert_eq!(f.get_value(m.row_coefficients(p), q), expected);
                }
            }
        }
        assert_eq!(m.uncoded_count(), n);
    }

    #[test]
    fn test_binary16_solves_scaled_row() {
        let f = Field::Binary16;
        let mut m = DecodingMatrix::new(f, 1, 2);
        let mut v = vec![0u8; 2];
        f.set_value(&mut v, 0, 0x1234);
        let x = 0xBEEFu16;
        let y = f.multiply(0x1234, x);
        m.insert(&v, &y.to_be_bytes());
        assert_eq!(m.row_data(0), &x.to_be_bytes());
    }
}
