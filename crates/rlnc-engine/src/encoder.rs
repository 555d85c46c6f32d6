//! Encoder.
//!
//! Produces payloads from a generation of source symbols. Systematic-capable
//! schemes first send each populated symbol uncoded (lowest id first), then
//! switch to coded payloads whose coefficients come from the scheme's
//! generator. NoCode cycles through the symbols uncoded forever.

use rand::rngs::StdRng;

use crate::error::{CodingError, Result};
use crate::factory::{CodingScheme, Generation};
use crate::feedback::FeedbackBitmap;
use crate::field::Field;
use crate::fulcrum::OuterCode;
use crate::generator::{PerpetualGenerator, SparseGenerator, UniformGenerator};
use crate::observer::{CodingEvent, Observer, ObserverFn};
use crate::payload::{self, PayloadLayout};
use crate::storage::SymbolStorage;

enum Generator {
    Uniform(UniformGenerator),
    Sparse(SparseGenerator),
    Perpetual(PerpetualGenerator),
    Fulcrum {
        outer: OuterCode,
        inner: UniformGenerator,
    },
    Carousel {
        next: usize,
    },
}

pub struct Encoder {
    scheme: CodingScheme,
    field: Field,
    storage: SymbolStorage,
    layout: PayloadLayout,
    generator: Generator,
    systematic: bool,
    sent: Vec<bool>,
    acknowledged: Option<FeedbackBitmap>,
    rng: StdRng,
    observer: Observer,
}

impl Encoder {
    pub(crate) fn new(generation: Generation, outer: Option<OuterCode>, rng: StdRng) -> Self {
        let Generation {
            scheme,
            field,
            symbols,
            symbol_size,
        } = generation.clone();
        let layout = generation.layout(outer.as_ref());
        let generator = match (scheme, outer) {
            (CodingScheme::Fulcrum, Some(outer)) => Generator::Fulcrum {
                inner: UniformGenerator::new(Field::Binary, outer.inner_symbols()),
                outer,
            },
            (CodingScheme::SparseFullVector, _) => {
                Generator::Sparse(SparseGenerator::new(field, symbols))
            }
            (CodingScheme::Perpetual, _) => {
                Generator::Perpetual(PerpetualGenerator::new(field, symbols))
            }
            (CodingScheme::NoCode, _) => Generator::Carousel { next: 0 },
            _ => Generator::Uniform(UniformGenerator::new(field, symbols)),
        };
        Self {
            scheme,
            field,
            storage: SymbolStorage::new(symbols, symbol_size),
            layout,
            generator,
            systematic: scheme.supports_systematic() || scheme == CodingScheme::NoCode,
            sent: vec![false; symbols],
            acknowledged: None,
            rng,
            observer: Observer::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    pub fn scheme(&self) -> CodingScheme {
        self.scheme
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn symbols(&self) -> usize {
        self.storage.symbols()
    }

    pub fn symbol_size(&self) -> usize {
        self.storage.symbol_size()
    }

    pub fn block_size(&self) -> usize {
        self.storage.block_size()
    }

    /// Largest payload `encode` can currently produce.
    pub fn payload_size(&self) -> usize {
        match &self.generator {
            Generator::Carousel { .. } => self.layout.systematic_size(),
            Generator::Perpetual(g) => self.layout.banded_size(g.width()),
            Generator::Fulcrum { .. } => self.layout.dense_size(),
            _ => self.layout.systematic_size().max(self.layout.dense_size()),
        }
    }

    /// Number of populated source symbols.
    pub fn rank(&self) -> usize {
        self.storage.populated_count()
    }

    pub fn is_symbol_pivot(&self, index: usize) -> bool {
        self.storage.is_populated(index)
    }

    pub fn set_observer(&mut self, observer: Option<ObserverFn>) {
        self.observer.set(observer);
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    pub fn set_symbols(&mut self, data: &[u8]) -> Result<()> {
        self.storage.set_symbols(data)
    }

    pub fn set_symbol(&mut self, index: usize, data: &[u8]) -> Result<()> {
        self.storage.set_symbol(index, data)
    }

    // -----------------------------------------------------------------------
    // Systematic
    // -----------------------------------------------------------------------

    pub fn is_systematic_on(&self) -> bool {
        self.systematic
    }

    pub fn set_systematic_on(&mut self) -> Result<()> {
        if !self.scheme.supports_systematic() {
            return Err(self.scheme.mismatch("set_systematic_on"));
        }
        self.systematic = true;
        Ok(())
    }

    pub fn set_systematic_off(&mut self) -> Result<()> {
        if !self.scheme.supports_systematic() {
            return Err(self.scheme.mismatch("set_systematic_off"));
        }
        self.systematic = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scheme settings
    // -----------------------------------------------------------------------

    pub fn density(&self) -> Result<f64> {
        match &self.generator {
            Generator::Sparse(g) => Ok(g.density()),
            _ => Err(self.scheme.mismatch("density")),
        }
    }

    pub fn set_density(&mut self, density: f64) -> Result<()> {
        match &mut self.generator {
            Generator::Sparse(g) => g.set_density(density),
            _ => Err(self.scheme.mismatch("set_density")),
        }
    }

    fn perpetual(&self, operation: &'static str) -> Result<&PerpetualGenerator> {
        match &self.generator {
            Generator::Perpetual(g) => Ok(g),
            _ => Err(self.scheme.mismatch(operation)),
        }
    }

    fn perpetual_mut(&mut self, operation: &'static str) -> Result<&mut PerpetualGenerator> {
        match &mut self.generator {
            Generator::Perpetual(g) => Ok(g),
            _ => Err(self.scheme.mismatch(operation)),
        }
    }

    pub fn width(&self) -> Result<usize> {
        Ok(self.perpetual("width")?.width())
    }

    pub fn set_width(&mut self, width: usize) -> Result<()> {
        self.perpetual_mut("set_width")?.set_width(width)
    }

    pub fn width_ratio(&self) -> Result<f64> {
        Ok(self.perpetual("width_ratio")?.width_ratio())
    }

    pub fn set_width_ratio(&mut self, ratio: f64) -> Result<()> {
        self.perpetual_mut("set_width_ratio")?.set_width_ratio(ratio)
    }

    pub fn pseudo_systematic(&self) -> Result<bool> {
        Ok(self.perpetual("pseudo_systematic")?.pseudo_systematic())
    }

    pub fn set_pseudo_systematic(&mut self, on: bool) -> Result<()> {
        self.perpetual_mut("set_pseudo_systematic")?
            .set_pseudo_systematic(on);
        Ok(())
    }

    pub fn pre_charging(&self) -> Result<bool> {
        Ok(self.perpetual("pre_charging")?.pre_charging())
    }

    pub fn set_pre_charging(&mut self, on: bool) -> Result<()> {
        self.perpetual_mut("set_pre_charging")?.set_pre_charging(on);
        Ok(())
    }

    pub fn expansion(&self) -> Result<usize> {
        match &self.generator {
            Generator::Fulcrum { outer, .. } => Ok(outer.expansion()),
            _ => Err(self.scheme.mismatch("expansion")),
        }
    }

    pub fn inner_symbols(&self) -> Result<usize> {
        match &self.generator {
            Generator::Fulcrum { outer, .. } => Ok(outer.inner_symbols()),
            _ => Err(self.scheme.mismatch("inner_symbols")),
        }
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    /// Apply decoder feedback. Acknowledged symbols are left out of coded
    /// payloads while any unacknowledged symbol remains.
    pub fn read_feedback(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.scheme.uses_feedback() {
            return Err(self.scheme.mismatch("read_feedback"));
        }
        let fb = FeedbackBitmap::parse(self.symbols(), bytes)?;
        let acknowledged = fb.count();
        self.acknowledged = Some(fb);
        self.observer
            .emit(CodingEvent::FeedbackRead { acknowledged });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    fn check_ready(&self) -> Result<()> {
        if self.scheme.is_incremental() {
            if self.storage.populated_count() == 0 {
                return Err(CodingError::UninitializedSymbol { index: 0 });
            }
        } else if let Some(index) = self.storage.first_missing() {
            return Err(CodingError::UninitializedSymbol { index });
        }
        Ok(())
    }

    /// Produce the next payload.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        self.check_ready()?;

        if let Generator::Carousel { next } = &mut self.generator {
            let index = *next;
            *next = (index + 1) % self.storage.symbols();
            return self.systematic_payload(index);
        }

        if self.systematic && self.scheme.supports_systematic() {
            let pending = self.storage.populated_ids().find(|&i| !self.sent[i]);
            if let Some(index) = pending {
                self.sent[index] = true;
                return self.systematic_payload(index);
            }
        }

        let out = match &mut self.generator {
            Generator::Perpetual(g) => {
                let band = g.generate(&mut self.rng);
                let mut data = self.storage.symbol(band.pivot)?.to_vec();
                for k in 1..band.width {
                    let c = self.field.get_value(&band.coefficients, k - 1);
                    self.field.multiply_add_slice(
                        &mut data,
                        self.storage.symbol(band.pivot + k)?,
                        c,
                    );
                }
                payload::write_banded(band.pivot, band.width, &band.coefficients, &data)
            }
            Generator::Fulcrum { outer, inner } => {
                let mut c = vec![0u8; inner.vector_size()];
                let mapped = loop {
                    inner.generate(&mut self.rng, &mut c);
                    let mapped = outer.map_inner(&c);
                    if self.field.first_nonzero(&mapped, self.storage.symbols()).is_some() {
                        break mapped;
                    }
                };
                let data = combine(self.field, &self.storage, &mapped);
                payload::write_dense(&c, &data)
            }
            Generator::Sparse(g) => {
                let mut c = vec![0u8; self.field.elements_size(self.storage.symbols())];
                g.generate(&mut self.rng, &mut c);
                let data = combine(self.field, &self.storage, &c);
                payload::write_dense(&c, &data)
            }
            Generator::Uniform(g) => {
                let mut c = vec![0u8; g.vector_size()];
                match self.scheme {
                    CodingScheme::OnTheFly => {
                        g.generate_over(&mut self.rng, self.storage.populated_ids(), &mut c)
                    }
                    CodingScheme::SlidingWindow => {
                        let storage = &self.storage;
                        let window: Vec<usize> = match &self.acknowledged {
                            Some(fb) => storage.populated_ids().filter(|&i| !fb.is_set(i)).collect(),
                            None => Vec::new(),
                        };
                        if window.is_empty() {
                            g.generate_over(&mut self.rng, storage.populated_ids(), &mut c)
                        } else {
                            g.generate_over(&mut self.rng, window.into_iter(), &mut c)
                        }
                    }
                    _ => g.generate(&mut self.rng, &mut c),
                }
                let data = combine(self.field, &self.storage, &c);
                payload::write_dense(&c, &data)
            }
            Generator::Carousel { .. } => unreachable!("handled above"),
        };
        self.observer.emit(CodingEvent::CodedSent);
        Ok(out)
    }

    /// Combine source symbols with caller-supplied packed coefficients and
    /// return the coded symbol data. Fulcrum takes an inner GF(2) vector.
    pub fn encode_symbol(&self, coefficients: &[u8]) -> Result<Vec<u8>> {
        if self.scheme == CodingScheme::NoCode {
            return Err(self.scheme.mismatch("encode_symbol"));
        }
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
        let outer_vector;
        let c = match &self.generator {
            Generator::Fulcrum { outer, .. } => {
                outer_vector = outer.map_inner(coefficients);
                &outer_vector
            }
            _ => coefficients,
        };
        let n = self.storage.symbols();
        if let Some(index) = self
            .field
            .nonzero_indices(c, n)
            .find(|&i| !self.storage.is_populated(i))
        {
            return Err(CodingError::UninitializedSymbol { index });
        }
        Ok(combine(self.field, &self.storage, c))
    }

    fn systematic_payload(&mut self, index: usize) -> Result<Vec<u8>> {
        let out = payload::write_systematic(index, self.storage.symbol(index)?);
        self.observer.emit(CodingEvent::SystematicSent { index });
        Ok(out)
    }
}

/// `Σ c_i · x_i` over the populated symbols.
fn combine(field: Field, storage: &SymbolStorage, coefficients: &[u8]) -> Vec<u8> {
    let l = storage.symbol_size();
    let block = storage.block();
    let mut out = vec![0u8; l];
    for i in field.nonzero_indices(coefficients, storage.symbols()) {
        let c = field.get_value(coefficients, i);
        field.multiply_add_slice(&mut out, &block[i * l..(i + 1) * l], c);
    }
    out
}
