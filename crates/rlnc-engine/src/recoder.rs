//! Pure recoder.
//!
//! Keeps the most recent received combinations in a bounded cache and emits
//! random combinations of them, without running elimination. Useful on relay
//! nodes that forward a generation but never need its content.

use std::collections::VecDeque;

use rand::rngs::StdRng;

use crate::error::{CodingError, Result};
use crate::factory::{CodingScheme, Generation};
use crate::field::Field;
use crate::generator::UniformGenerator;
use crate::observer::{CodingEvent, Observer, ObserverFn};
use crate::payload::{self, PayloadLayout};

struct CachedRow {
    coefficients: Vec<u8>,
    data: Vec<u8>,
}

pub struct Recoder {
    scheme: CodingScheme,
    field: Field,
    symbols: usize,
    layout: PayloadLayout,
    capacity: usize,
    cache: VecDeque<CachedRow>,
    rng: StdRng,
    observer: Observer,
}

impl Recoder {
    pub(crate) fn new(generation: Generation, capacity: usize, rng: StdRng) -> Self {
        Self {
            scheme: generation.scheme,
            field: generation.field,
            symbols: generation.symbols,
            layout: generation.layout(None),
            capacity,
            cache: VecDeque::with_capacity(capacity),
            rng,
            observer: Observer::default(),
        }
    }

    pub fn scheme(&self) -> CodingScheme {
        self.scheme
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached rows; an upper bound on the rank of what was received.
    pub fn rank(&self) -> usize {
        self.cache.len()
    }

    pub fn payload_size(&self) -> usize {
        self.layout.dense_size()
    }

    pub fn set_observer(&mut self, observer: Option<ObserverFn>) {
        self.observer.set(observer);
    }

    /// Store a payload. Returns `false` when it carried no information.
    /// The oldest row is evicted once the cache is full.
    pub fn read_payload(&mut self, bytes: &[u8]) -> Result<bool> {
        let parsed = payload::parse(&self.layout, bytes)?;
        let coefficients = parsed.dense_coefficients(&self.layout);
        if self.field.first_nonzero(&coefficients, self.symbols).is_none() {
            return Ok(false);
        }
        if self.cache.len() == self.capacity {
            self.cache.pop_front();
        }
        self.cache.push_back(CachedRow {
            coefficients,
            data: parsed.data().to_vec(),
        });
        Ok(true)
    }

    /// Random combination of the cached rows as a dense payload.
    pub fn recode(&mut self) -> Result<Vec<u8>> {
        if self.cache.is_empty() {
            return Err(CodingError::EmptyBasis);
        }
        let n = self.cache.len();
        let field = self.field;
        let weights_gen = UniformGenerator::new(field, n);
        let mut weights = vec![0u8; weights_gen.vector_size()];
        let mut coefficients = vec![0u8; field.elements_size(self.symbols)];
        let mut data = vec![0u8; self.layout.symbol_size];
        // Dependent cached rows can cancel out; draw again until they don't.
        loop {
            weights_gen.generate(&mut self.rng, &mut weights);
            coefficients.fill(0);
            data.fill(0);
            for (j, row) in self.cache.iter().enumerate() {
                let w = field.get_value(&weights, j);
                field.multiply_add_slice(&mut coefficients, &row.coefficients, w);
                field.multiply_add_slice(&mut data, &row.data, w);
            }
            if field.first_nonzero(&coefficients, self.symbols).is_some() {
                break;
            }
        }
        self.observer.emit(CodingEvent::Recoded { rank: n });
        Ok(payload::write_dense(&coefficients, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;

    fn factory(scheme: CodingScheme, field: Field) -> Factory {
        Factory::new(scheme, field, 6, 4).unwrap().with_seed(21)
    }

    #[test]
    fn test_empty_cache() {
        let mut r = factory(CodingScheme::FullVector, Field::Binary8)
            .build_recoder()
            .unwrap();
        assert_eq!(r.rank(), 0);
        assert_eq!(r.recode().unwrap_err(), CodingError::EmptyBasis);
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let mut f = factory(CodingScheme::FullVector, Field::Binary8);
        f.set_recoder_capacity(2).unwrap();
        let mut r = f.build_recoder().unwrap();
        for i in 0..3 {
            assert!(r.read_payload(&payload::write_systematic(i, &[i as u8; 4])).unwrap());
        }
        assert_eq!(r.rank(), 2);
        // Only symbols 1 and 2 remain: every recoded vector avoids symbol 0.
        for _ in 0..20 {
            let p = r.recode().unwrap();
            assert_eq!(p[1], 0);
        }
    }

    #[test]
    fn test_recoder_relays_whole_generation() {
        for field in Field::ALL {
            let f = factory(CodingScheme::SparseFullVector, field);
            let mut enc = f.build_encoder();
            let mut r = f.build_recoder().unwrap();
            let mut dec = f.build_decoder();
            let data: Vec<u8> = (0..enc.block_size() as u8).collect();
            enc.set_symbols(&data).unwrap();
            let mut steps = 0;
            while !dec.is_complete() && steps < 2_000 {
                r.read_payload(&enc.encode().unwrap()).unwrap();
                dec.decode(&r.recode().unwrap()).unwrap();
                steps += 1;
            }
            assert_eq!(dec.copy_symbols(), data, "{field}");
        }
    }

    #[test]
    fn test_banded_payloads_are_expanded() {
        let f = factory(CodingScheme::Perpetual, Field::Binary4);
        let mut r = f.build_recoder().unwrap();
        r.read_payload(&payload::write_banded(4, 2, &[0x03], &[1, 2, 3, 4]))
            .unwrap();
        let p = r.recode().unwrap();
        assert_eq!(p.len(), r.payload_size());
        let mut dec = f.build_decoder();
        dec.decode(&p).unwrap();
        assert!(dec.is_symbol_pivot(4));
    }
}
