//! Decoder.
//!
//! Parses payloads, maps their coefficients into the outer field and feeds
//! them to the [`DecodingMatrix`]. Decoded symbols become readable one by one
//! as soon as their rows reduce to unit vectors, before full rank.
//!
//! State machine: `Empty` (rank 0) → `Partial` (0 < rank < S) → `Complete`.
//! Payloads received in `Complete` are reported as redundant and dropped.

use rand::rngs::StdRng;

use crate::error::{CodingError, Result};
use crate::factory::{CodingScheme, Generation};
use crate::feedback::{self, FeedbackBitmap};
use crate::field::Field;
use crate::fulcrum::OuterCode;
use crate::generator::UniformGenerator;
use crate::matrix::DecodingMatrix;
use crate::observer::{CodingEvent, Observer, ObserverFn};
use crate::payload::{self, Payload, PayloadLayout};

/// Result of feeding one payload to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The payload increased the rank.
    Accepted { rank: usize },
    /// The payload was linearly dependent on what the decoder already holds.
    Redundant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Empty,
    Partial,
    Complete,
}

pub struct Decoder {
    scheme: CodingScheme,
    field: Field,
    symbol_size: usize,
    layout: PayloadLayout,
    outer: Option<OuterCode>,
    matrix: DecodingMatrix,
    rng: StdRng,
    observer: Observer,
}

impl Decoder {
    pub(crate) fn new(generation: Generation, outer: Option<OuterCode>, rng: StdRng) -> Self {
        let layout = generation.layout(outer.as_ref());
        Self {
            scheme: generation.scheme,
            field: generation.field,
            symbol_size: generation.symbol_size,
            layout,
            outer,
            matrix: DecodingMatrix::new(generation.field, generation.symbols, generation.symbol_size),
            rng,
            observer: Observer::default(),
        }
    }

    pub fn scheme(&self) -> CodingScheme {
        self.scheme
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn symbols(&self) -> usize {
        self.matrix.symbols()
    }

    pub fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    pub fn block_size(&self) -> usize {
        self.symbols() * self.symbol_size
    }

    /// Largest payload a matching encoder produces.
    pub fn payload_size(&self) -> usize {
        match self.scheme {
            CodingScheme::NoCode => self.layout.systematic_size(),
            CodingScheme::Fulcrum => self.layout.dense_size(),
            CodingScheme::Perpetual => self
                .layout
                .dense_size()
                .max(self.layout.banded_size(self.symbols())),
            _ => self.layout.systematic_size().max(self.layout.dense_size()),
        }
    }

    pub fn set_observer(&mut self, observer: Option<ObserverFn>) {
        self.observer.set(observer);
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn rank(&self) -> usize {
        self.matrix.rank()
    }

    pub fn state(&self) -> DecoderState {
        match self.matrix.rank() {
            0 => DecoderState::Empty,
            r if r == self.symbols() => DecoderState::Complete,
            _ => DecoderState::Partial,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.matrix.is_complete()
    }

    /// Every pivoted row is decoded, though the rank may be below `S`.
    pub fn is_partial_complete(&self) -> bool {
        self.matrix.rank() > 0 && self.matrix.uncoded_count() == self.matrix.rank()
    }

    pub fn symbols_uncoded(&self) -> usize {
        self.matrix.uncoded_count()
    }

    pub fn is_symbol_uncoded(&self, index: usize) -> bool {
        self.matrix.is_uncoded(index)
    }

    pub fn is_symbol_pivot(&self, index: usize) -> bool {
        self.matrix.is_pivot(index)
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    pub fn decode(&mut self, bytes: &[u8]) -> Result<DecodeOutcome> {
        let parsed = payload::parse(&self.layout, bytes)?;
        match (self.scheme, &parsed) {
            (CodingScheme::NoCode, Payload::Systematic { .. }) => {}
            (CodingScheme::NoCode, _) => {
                return Err(CodingError::MalformedPayload(
                    "no_code decoders only accept systematic payloads".into(),
                ))
            }
            (CodingScheme::Perpetual, _) => {}
            (_, Payload::Banded { .. }) => {
                return Err(CodingError::MalformedPayload(format!(
                    "banded payloads are not used by the {} scheme",
                    self.scheme
                )))
            }
            _ => {}
        }
        if self.is_complete() {
            self.observer.emit(CodingEvent::Redundant { rank: self.rank() });
            return Ok(DecodeOutcome::Redundant);
        }
        let dense = parsed.dense_coefficients(&self.layout);
        let coefficients = match &self.outer {
            Some(outer) => outer.map_inner(&dense),
            None => dense,
        };
        Ok(self.insert(&coefficients, parsed.data()))
    }

    /// Decode raw symbol data with its packed coefficient vector. Fulcrum
    /// decoders take the inner GF(2) vector.
    pub fn decode_symbol(&mut self, data: &[u8], coefficients: &[u8]) -> Result<DecodeOutcome> {
        if self.scheme == CodingScheme::NoCode {
            return Err(self.scheme.mismatch("decode_symbol"));
        }
        self.check_data(data)?;
        let expected = self
            .layout
            .coefficient_field
            .elements_size(self.layout.coefficients);
        if coefficients.len() != expected {
            return Err(CodingError::MalformedPayload(format!(
                "coefficient vector is {} bytes, expected {}",
                coefficients.len(),
                expected
            )));
        }
        if self.is_complete() {
            return Ok(DecodeOutcome::Redundant);
        }
        let mapped;
        let c = match &self.outer {
            Some(outer) => {
                mapped = outer.map_inner(coefficients);
                &mapped
            }
            None => coefficients,
        };
        Ok(self.insert(c, data))
    }

    /// Decode an uncoded source symbol.
    pub fn decode_systematic_symbol(&mut self, index: usize, data: &[u8]) -> Result<DecodeOutcome> {
        if index >= self.symbols() {
            return Err(CodingError::MalformedPayload(format!(
                "systematic index {} out of range for {} symbols",
                index,
                self.symbols()
            )));
        }
        self.check_data(data)?;
        if self.is_complete() || self.matrix.is_uncoded(index) {
            self.observer.emit(CodingEvent::Redundant { rank: self.rank() });
            return Ok(DecodeOutcome::Redundant);
        }
        let mut unit = vec![0u8; self.matrix.coefficient_size()];
        self.field.set_value(&mut unit, index, 1);
        Ok(self.insert(&unit, data))
    }

    fn check_data(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.symbol_size {
            return Err(CodingError::MalformedPayload(format!(
                "symbol data is {} bytes, expected {}",
                data.len(),
                self.symbol_size
            )));
        }
        Ok(())
    }

    fn insert(&mut self, coefficients: &[u8], data: &[u8]) -> DecodeOutcome {
        match self.matrix.insert(coefficients, data) {
            Some(pivot) => {
                let rank = self.matrix.rank();
                self.observer.emit(CodingEvent::RankChanged { pivot, rank });
                if self.matrix.is_complete() {
                    tracing::debug!(scheme = %self.scheme, rank, "generation decoded");
                    self.observer.emit(CodingEvent::Complete { rank });
                }
                DecodeOutcome::Accepted { rank }
            }
            None => {
                self.observer.emit(CodingEvent::Redundant { rank: self.rank() });
                DecodeOutcome::Redundant
            }
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// The block with every decoded symbol in place; undecoded symbols are
    /// zero-filled. Check [`Decoder::is_complete`] before trusting all of it.
    pub fn copy_symbols(&self) -> Vec<u8> {
        let l = self.symbol_size;
        let mut out = vec![0u8; self.block_size()];
        for i in 0..self.symbols() {
            if self.matrix.is_uncoded(i) {
                out[i * l..(i + 1) * l].copy_from_slice(self.matrix.row_data(i));
            }
        }
        out
    }

    pub fn copy_symbol(&self, index: usize) -> Option<&[u8]> {
        self.matrix
            .is_uncoded(index)
            .then(|| self.matrix.row_data(index))
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    pub fn feedback_size(&self) -> usize {
        feedback::feedback_size(self.symbols())
    }

    /// Bitmap of pivoted symbol ids for the sliding-window encoder.
    pub fn write_feedback(&self) -> Result<Vec<u8>> {
        if !self.scheme.uses_feedback() {
            return Err(self.scheme.mismatch("write_feedback"));
        }
        Ok(FeedbackBitmap::from_pivots(self.symbols(), self.matrix.pivots()).into_bytes())
    }

    // -----------------------------------------------------------------------
    // Recoding
    // -----------------------------------------------------------------------

    /// Emit a dense payload that is a random combination of the rows held so
    /// far.
    pub fn recode(&mut self) -> Result<Vec<u8>> {
        if !self.scheme.supports_recoding() {
            return Err(self.scheme.mismatch("recode"));
        }
        if self.matrix.rank() == 0 {
            return Err(CodingError::EmptyBasis);
        }
        let field = self.field;
        let symbols = self.symbols();
        let weights_gen = UniformGenerator::new(field, symbols);
        let mut weights = vec![0u8; weights_gen.vector_size()];
        weights_gen.generate_over(&mut self.rng, self.matrix.pivots(), &mut weights);

        let mut coefficients = vec![0u8; self.matrix.coefficient_size()];
        let mut data = vec![0u8; self.symbol_size];
        for j in field.nonzero_indices(&weights, symbols) {
            let w = field.get_value(&weights, j);
            field.multiply_add_slice(&mut coefficients, self.matrix.row_coefficients(j), w);
            field.multiply_add_slice(&mut data, self.matrix.row_data(j), w);
        }
        let rank = self.rank();
        self.observer.emit(CodingEvent::Recoded { rank });
        Ok(payload::write_dense(&coefficients, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn factory(scheme: CodingScheme, field: Field, s: usize, l: usize, seed: u64) -> Factory {
        Factory::new(scheme, field, s, l).unwrap().with_seed(seed)
    }

    fn block(n: usize, seed: u8) -> Vec<u8> {
        (0..n)
            .map(|i| (i as u8).wrapping_mul(37).wrapping_add(seed))
            .collect()
    }

    /// Feed the decoder until complete; returns payloads consumed.
    fn run(enc: &mut crate::Encoder, dec: &mut Decoder, limit: usize) -> usize {
        let mut n = 0;
        while !dec.is_complete() && n < limit {
            let p = enc.encode().unwrap();
            dec.decode(&p).unwrap();
            n += 1;
        }
        n
    }

    #[test]
    fn test_round_trip_every_scheme_and_field() {
        for scheme in CodingScheme::ALL {
            for field in Field::ALL {
                if scheme == CodingScheme::Fulcrum && field == Field::Binary {
                    continue;
                }
                let f = factory(scheme, field, 12, 8, 3);
                let mut enc = f.build_encoder();
                let mut dec = f.build_decoder();
                let data = block(enc.block_size(), 5);
                enc.set_symbols(&data).unwrap();
                run(&mut enc, &mut dec, 2_000);
                assert!(dec.is_complete(), "{scheme}/{field}");
                assert_eq!(dec.copy_symbols(), data, "{scheme}/{field}");
            }
        }
    }

    #[test]
    fn test_state_machine() {
        let f = factory(CodingScheme::FullVector, Field::Binary8, 3, 2, 1);
        let mut enc = f.build_encoder();
        let mut dec = f.build_decoder();
        enc.set_symbols(&block(6, 0)).unwrap();
        assert_eq!(dec.state(), DecoderState::Empty);
        assert_eq!(
            dec.decode(&enc.encode().unwrap()).unwrap(),
            DecodeOutcome::Accepted { rank: 1 }
        );
        assert_eq!(dec.state(), DecoderState::Partial);
        run(&mut enc, &mut dec, 100);
        assert_eq!(dec.state(), DecoderState::Complete);
        assert_eq!(
            dec.decode(&enc.encode().unwrap()).unwrap(),
            DecodeOutcome::Redundant
        );
        assert_eq!(dec.rank(), 3);
    }

    #[test]
    fn test_duplicate_systematic_is_redundant() {
        let f = factory(CodingScheme::FullVector, Field::Binary4, 4, 2, 1);
        let mut dec = f.build_decoder();
        let p = payload::write_systematic(2, &[0xAB, 0xCD]);
        assert_eq!(dec.decode(&p).unwrap(), DecodeOutcome::Accepted { rank: 1 });
        assert_eq!(dec.decode(&p).unwrap(), DecodeOutcome::Redundant);
        assert!(dec.is_symbol_uncoded(2));
        assert_eq!(dec.copy_symbol(2), Some(&[0xAB, 0xCD][..]));
        assert_eq!(dec.copy_symbol(1), None);
        assert!(dec.is_partial_complete());
    }

    #[test]
    fn test_partial_decoding_before_full_rank() {
        // x0 + x1 and x1 alone decode both, while x2, x3 stay missing.
        let f = factory(CodingScheme::FullVector, Field::Binary8, 4, 1, 1);
        let mut dec = f.build_decoder();
        dec.decode_symbol(&[3], &[1, 1, 0, 0]).unwrap();
        assert!(!dec.is_partial_complete());
        assert!(dec.is_symbol_pivot(0));
        assert!(!dec.is_symbol_uncoded(0));
        dec.decode_symbol(&[1], &[0, 1, 0, 0]).unwrap();
        assert!(dec.is_partial_complete());
        assert_eq!(dec.symbols_uncoded(), 2);
        assert_eq!(dec.copy_symbols(), vec![2, 1, 0, 0]);
        assert!(!dec.is_complete());
    }

    #[test]
    fn test_malformed_payloads() {
        let f = factory(CodingScheme::FullVector, Field::Binary8, 4, 2, 1);
        let mut dec = f.build_decoder();
        assert!(matches!(dec.decode(&[]), Err(CodingError::MalformedPayload(_))));
        let banded = payload::write_banded(0, 2, &[1], &[0, 0]);
        assert!(matches!(dec.decode(&banded), Err(CodingError::MalformedPayload(_))));
        let short = payload::write_dense(&[1, 2, 3, 4], &[0]);
        assert!(matches!(dec.decode(&short), Err(CodingError::MalformedPayload(_))));
        assert!(dec.decode_systematic_symbol(4, &[0, 0]).is_err());
        assert_eq!(dec.rank(), 0);
    }

    #[test]
    fn test_wrong_coefficient_length_same_error_both_sides() {
        let f = factory(CodingScheme::FullVector, Field::Binary8, 4, 2, 1);
        let mut enc = f.build_encoder();
        enc.set_symbols(&block(8, 1)).unwrap();
        let mut dec = f.build_decoder();
        assert!(matches!(
            enc.encode_symbol(&[1, 2, 3]),
            Err(CodingError::MalformedPayload(_))
        ));
        assert!(matches!(
            dec.decode_symbol(&[0, 0], &[1, 2, 3]),
            Err(CodingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_no_code_accepts_only_systematic() {
        let f = factory(CodingScheme::NoCode, Field::Binary8, 2, 1, 1);
        let mut dec = f.build_decoder();
        assert!(dec.decode(&payload::write_dense(&[1, 1], &[0])).is_err());
        assert!(dec.decode(&payload::write_systematic(1, &[7])).is_ok());
        assert!(matches!(
            dec.recode(),
            Err(CodingError::CapabilityMismatch { .. })
        ));
    }

    #[test]
    fn test_recode_empty_basis() {
        let f = factory(CodingScheme::OnTheFly, Field::Binary8, 4, 1, 1);
        let mut dec = f.build_decoder();
        assert_eq!(dec.recode().unwrap_err(), CodingError::EmptyBasis);
    }

    #[test]
    fn test_recoding_chain_decodes() {
        for field in Field::ALL {
            let f = factory(CodingScheme::FullVector, field, 10, 4, 9);
            let mut enc = f.build_encoder();
            enc.set_systematic_off().unwrap();
            let mut relay = f.build_decoder();
            let mut sink = f.build_decoder();
            let data = block(enc.block_size(), 1);
            enc.set_symbols(&data).unwrap();

            let mut steps = 0;
            while !sink.is_complete() && steps < 1_000 {
                relay.decode(&enc.encode().unwrap()).unwrap();
                let recoded = relay.recode().unwrap();
                sink.decode(&recoded).unwrap();
                assert!(sink.rank() <= relay.rank());
                steps += 1;
            }
            assert!(sink.is_complete(), "{field}");
            assert_eq!(sink.copy_symbols(), data);
        }
    }

    #[test]
    fn test_sliding_window_feedback_loop() {
        let f = factory(CodingScheme::SlidingWindow, Field::Binary8, 8, 2, 4);
        let mut enc = f.build_encoder();
        let mut dec = f.build_decoder();
        assert_eq!(dec.feedback_size(), 1);
        assert_eq!(dec.write_feedback().unwrap(), vec![0]);

        let data = block(16, 2);
        for i in 0..4 {
            enc.set_symbol(i, &data[i * 2..i * 2 + 2]).unwrap();
        }
        for _ in 0..4 {
            dec.decode(&enc.encode().unwrap()).unwrap();
        }
        assert_eq!(dec.write_feedback().unwrap(), vec![0b0000_1111]);
        enc.read_feedback(&dec.write_feedback().unwrap()).unwrap();

        for i in 4..8 {
            enc.set_symbol(i, &data[i * 2..i * 2 + 2]).unwrap();
        }
        run(&mut enc, &mut dec, 100);
        assert_eq!(dec.copy_symbols(), data);

        let other = factory(CodingScheme::FullVector, Field::Binary8, 8, 2, 4).build_decoder();
        assert!(matches!(
            other.write_feedback(),
            Err(CodingError::CapabilityMismatch { .. })
        ));
    }

    #[test]
    fn test_perpetual_boundary_band_decodes() {
        // Band width reaches past the last symbol for every pivot > S - W.
        let f = factory(CodingScheme::Perpetual, Field::Binary8, 6, 3, 12);
        let mut enc = f.build_encoder();
        enc.set_width(6).unwrap();
        let mut dec = f.build_decoder();
        let data = block(18, 3);
        enc.set_symbols(&data).unwrap();
        let last = payload::write_banded(5, 1, &[], &data[15..18]);
        assert_eq!(dec.decode(&last).unwrap(), DecodeOutcome::Accepted { rank: 1 });
        assert_eq!(dec.copy_symbol(5), Some(&data[15..18]));
        run(&mut enc, &mut dec, 500);
        assert_eq!(dec.copy_symbols(), data);
    }

    #[test]
    fn test_perpetual_pre_charging_round_trip() {
        let f = factory(CodingScheme::Perpetual, Field::Binary, 24, 16, 2);
        let mut enc = f.build_encoder();
        enc.set_pre_charging(true).unwrap();
        enc.set_width(4).unwrap();
        let mut dec = f.build_decoder();
        let data = block(enc.block_size(), 9);
        enc.set_symbols(&data).unwrap();
        run(&mut enc, &mut dec, 5_000);
        assert_eq!(dec.copy_symbols(), data);
    }

    #[test]
    fn test_fulcrum_decoder_needs_shared_outer_code() {
        let mut f = Factory::new(CodingScheme::Fulcrum, Field::Binary8, 16, 4).unwrap();
        f.set_expansion(2).unwrap();
        let f = f.with_seed(77);
        let mut enc = f.build_encoder();
        let mut dec = f.build_decoder();
        let data = block(64, 4);
        enc.set_symbols(&data).unwrap();
        let used = run(&mut enc, &mut dec, 1_000);
        assert!(used >= 16);
        assert_eq!(dec.copy_symbols(), data);
        assert_eq!(dec.payload_size(), enc.payload_size());
    }

    #[test]
    fn test_worked_example_decodes_from_three_combinations() {
        let f = factory(CodingScheme::FullVector, Field::Binary8, 3, 1, 1);
        let mut enc = f.build_encoder();
        enc.set_symbols(&[0xb7, 0x3a, 0x61]).unwrap();
        let mut dec = f.build_decoder();

        let rows: [[u8; 3]; 3] = [[2, 3, 5], [1, 1, 1], [7, 0, 9]];
        let coded: Vec<Vec<u8>> = rows.iter().map(|c| enc.encode_symbol(c).unwrap()).collect();
        assert_eq!(coded[0], vec![0xc5]);

        assert_eq!(
            dec.decode_symbol(&coded[0], &rows[0]).unwrap(),
            DecodeOutcome::Accepted { rank: 1 }
        );
        assert_eq!(
            dec.decode_symbol(&coded[1], &rows[1]).unwrap(),
            DecodeOutcome::Accepted { rank: 2 }
        );
        assert_eq!(dec.rank(), 2);
        assert!(!dec.is_complete());
        assert_eq!(dec.state(), DecoderState::Partial);

        assert_eq!(
            dec.decode_symbol(&coded[2], &rows[2]).unwrap(),
            DecodeOutcome::Accepted { rank: 3 }
        );
        assert!(dec.is_complete());
        assert_eq!(dec.copy_symbols(), vec![0xb7, 0x3a, 0x61]);
    }

    fn fulcrum_factory(expansion: usize) -> Factory {
        let mut f = Factory::new(CodingScheme::Fulcrum, Field::Binary8, 24, 16).unwrap();
        f.set_expansion(expansion).unwrap();
        f
    }

    #[test]
    fn test_fulcrum_across_independent_factories() {
        let mut enc = fulcrum_factory(4).build_encoder();
        let mut dec = fulcrum_factory(4).build_decoder();
        let data = block(24 * 16, 11);
        enc.set_symbols(&data).unwrap();
        run(&mut enc, &mut dec, 2_000);
        assert!(dec.is_complete());
        assert_eq!(dec.copy_symbols(), data);
    }

    #[test]
    fn test_fulcrum_cloned_and_rebuilt_factories_agree() {
        let f = fulcrum_factory(3);
        let cloned = f.clone();
        let rebuilt = fulcrum_factory(3);
        let data = block(24 * 16, 2);
        for g in [&cloned, &rebuilt] {
            let mut enc = f.build_encoder();
            let mut dec = g.build_decoder();
            enc.set_symbols(&data).unwrap();
            run(&mut enc, &mut dec, 2_000);
            assert_eq!(dec.copy_symbols(), data);
        }

        // A different expansion is a different generation.
        let other = fulcrum_factory(9);
        assert_ne!(
            other.build_encoder().payload_size(),
            f.build_encoder().payload_size()
        );
    }

    #[test]
    fn test_fulcrum_inner_basis_reaches_full_rank() {
        let mut f = Factory::new(CodingScheme::Fulcrum, Field::Binary8, 8, 4).unwrap();
        f.set_expansion(3).unwrap();
        let f = f.with_seed(5);
        let mut enc = f.build_encoder();
        let mut dec = f.build_decoder();
        let data = block(32, 9);
        enc.set_symbols(&data).unwrap();
        let inner = enc.inner_symbols().unwrap();
        assert_eq!(inner, 11);

        // Every inner unit vector, expansion rows first.
        let mut accepted = 0;
        for j in (0..inner).rev() {
            let mut c = vec![0u8; Field::Binary.elements_size(inner)];
            Field::Binary.set_value(&mut c, j, 1);
            let coded = enc.encode_symbol(&c).unwrap();
            if let DecodeOutcome::Accepted { .. } = dec.decode_symbol(&coded, &c).unwrap() {
                accepted += 1;
            }
            assert!(dec.rank() <= 8);
        }
        assert!(dec.is_complete());
        assert_eq!(accepted, 8);
        assert_eq!(dec.copy_symbols(), data);
    }

    #[test]
    fn test_observer_sees_rank_changes() {
        let f = factory(CodingScheme::FullVector, Field::Binary8, 2, 1, 1);
        let mut dec = f.build_decoder();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        dec.set_observer(Some(Box::new(move |e: &CodingEvent| {
            sink.lock().unwrap().push(e.clone())
        })));
        dec.decode(&payload::write_systematic(0, &[1])).unwrap();
        dec.decode(&payload::write_systematic(0, &[1])).unwrap();
        dec.decode(&payload::write_systematic(1, &[2])).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CodingEvent::RankChanged { pivot: 0, rank: 1 },
                CodingEvent::Redundant { rank: 1 },
                CodingEvent::RankChanged { pivot: 1, rank: 2 },
                CodingEvent::Complete { rank: 2 },
            ]
        );
    }

    fn field_strategy() -> impl Strategy<Value = Field> {
        prop::sample::select(Field::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_full_vector_round_trip(
            field in field_strategy(),
            symbols in 1usize..24,
            half_size in 1usize..12,
            seed in any::<u64>(),
            systematic in any::<bool>(),
        ) {
            let f = factory(CodingScheme::FullVector, field, symbols, half_size * 2, seed);
            let mut enc = f.build_encoder();
            if !systematic {
                enc.set_systematic_off().unwrap();
            }
            let mut dec = f.build_decoder();
            let data: Vec<u8> = (0..enc.block_size()).map(|i| (i as u64 ^ seed) as u8).collect();
            enc.set_symbols(&data).unwrap();
            run(&mut enc, &mut dec, 4_000);
            prop_assert!(dec.is_complete());
            prop_assert_eq!(dec.copy_symbols(), data);
        }

        #[test]
        fn prop_rank_never_exceeds_received(
            field in field_strategy(),
            symbols in 1usize..16,
            seed in any::<u64>(),
        ) {
            let f = factory(CodingScheme::SparseFullVector, field, symbols, 2, seed);
            let mut enc = f.build_encoder();
            enc.set_systematic_off().unwrap();
            let mut dec = f.build_decoder();
            enc.set_symbols(&vec![0x5A; enc.block_size()]).unwrap();
            let mut received = 0;
            while !dec.is_complete() && received < 4_000 {
                let before = dec.rank();
                let outcome = dec.decode(&enc.encode().unwrap()).unwrap();
                received += 1;
                match outcome {
                    DecodeOutcome::Accepted { rank } => prop_assert_eq!(rank, before + 1),
                    DecodeOutcome::Redundant => prop_assert_eq!(dec.rank(), before),
                }
                prop_assert!(dec.rank() <= received.min(symbols));
            }
            prop_assert!(dec.is_complete());
        }
    }
}
