//! Coding schemes and the factory that builds coders for them.
//!
//! A [`Factory`] validates a `(scheme, field, symbols, symbol_size)`
//! combination once and then builds any number of independent encoders,
//! decoders and recoders sharing those parameters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{CodingError, Result};
use crate::field::Field;
use crate::fulcrum::{self, OuterCode, DEFAULT_EXPANSION, MAX_EXPANSION};
use crate::payload::PayloadLayout;
use crate::recoder::Recoder;

/// Largest generation the wire format and feedback protocol address.
pub const MAX_SYMBOLS: usize = 65_535;

// ---------------------------------------------------------------------------
// CodingScheme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodingScheme {
    FullVector,
    SparseFullVector,
    OnTheFly,
    SlidingWindow,
    Perpetual,
    Fulcrum,
    /// Uncoded carousel.
    NoCode,
}

impl CodingScheme {
    pub const ALL: [CodingScheme; 7] = [
        CodingScheme::FullVector,
        CodingScheme::SparseFullVector,
        CodingScheme::OnTheFly,
        CodingScheme::SlidingWindow,
        CodingScheme::Perpetual,
        CodingScheme::Fulcrum,
        CodingScheme::NoCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CodingScheme::FullVector => "full_vector",
            CodingScheme::SparseFullVector => "sparse_full_vector",
            CodingScheme::OnTheFly => "on_the_fly",
            CodingScheme::SlidingWindow => "sliding_window",
            CodingScheme::Perpetual => "perpetual",
            CodingScheme::Fulcrum => "fulcrum",
            CodingScheme::NoCode => "no_code",
        }
    }

    /// Encoders of this scheme may emit symbols before the whole block is set.
    pub fn is_incremental(self) -> bool {
        matches!(self, CodingScheme::OnTheFly | CodingScheme::SlidingWindow)
    }

    pub fn supports_systematic(self) -> bool {
        matches!(
            self,
            CodingScheme::FullVector
                | CodingScheme::SparseFullVector
                | CodingScheme::OnTheFly
                | CodingScheme::SlidingWindow
        )
    }

    pub fn supports_recoding(self) -> bool {
        !matches!(self, CodingScheme::Fulcrum | CodingScheme::NoCode)
    }

    pub fn uses_feedback(self) -> bool {
        self == CodingScheme::SlidingWindow
    }

    pub(crate) fn mismatch(self, operation: &'static str) -> CodingError {
        CodingError::CapabilityMismatch {
            operation,
            scheme: self.name(),
        }
    }
}

impl fmt::Display for CodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Serializable factory parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub scheme: CodingScheme,
    pub field: Field,
    pub symbols: usize,
    pub symbol_size: usize,
    /// Fulcrum expansion `E`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion: Option<usize>,
    /// Pure recoder cache capacity; defaults to `symbols`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoder_capacity: Option<usize>,
    /// Seed for every random draw made by built coders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Parameters shared by every coder a factory builds.
#[derive(Debug, Clone)]
pub(crate) struct Generation {
    pub scheme: CodingScheme,
    pub field: Field,
    pub symbols: usize,
    pub symbol_size: usize,
}

impl Generation {
    /// Payload shape for this generation.
    pub fn layout(&self, outer: Option<&OuterCode>) -> PayloadLayout {
        match outer {
            Some(o) => PayloadLayout {
                coefficient_field: Field::Binary,
                coefficients: o.inner_symbols(),
                symbol_size: self.symbol_size,
            },
            None => PayloadLayout {
                coefficient_field: self.field,
                coefficients: self.symbols,
                symbol_size: self.symbol_size,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Factory {
    scheme: CodingScheme,
    field: Field,
    max_symbols: usize,
    max_symbol_size: usize,
    symbols: usize,
    symbol_size: usize,
    expansion: usize,
    recoder_capacity: Option<usize>,
    seed: Option<u64>,
    outer_seed: Option<u64>,
    built: Arc<AtomicU64>,
}

impl Factory {
    pub fn new(
        scheme: CodingScheme,
        field: Field,
        max_symbols: usize,
        max_symbol_size: usize,
    ) -> Result<Self> {
        if max_symbols == 0 || max_symbol_size == 0 {
            return Err(CodingError::InvalidParameters(format!(
                "symbols ({max_symbols}) and symbol size ({max_symbol_size}) must be non-zero"
            )));
        }
        if max_symbols > MAX_SYMBOLS {
            return Err(CodingError::InvalidParameters(format!(
                "{max_symbols} symbols exceeds the maximum of {MAX_SYMBOLS}"
            )));
        }
        if field == Field::Binary16 && max_symbol_size % 2 != 0 {
            return Err(CodingError::InvalidParameters(format!(
                "symbol size {max_symbol_size} must be even for binary16"
            )));
        }
        if scheme == CodingScheme::Fulcrum && field == Field::Binary {
            return Err(CodingError::InvalidParameters(
                "fulcrum requires an outer field larger than binary".into(),
            ));
        }
        Ok(Self {
            scheme,
            field,
            max_symbols,
            max_symbol_size,
            symbols: max_symbols,
            symbol_size: max_symbol_size,
            expansion: DEFAULT_EXPANSION,
            recoder_capacity: None,
            seed: None,
            outer_seed: None,
            built: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn from_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new(
            config.scheme,
            config.field,
            config.symbols,
            config.symbol_size,
        )?;
        if let Some(e) = config.expansion {
            factory.set_expansion(e)?;
        }
        if let Some(c) = config.recoder_capacity {
            factory.set_recoder_capacity(c)?;
        }
        if let Some(seed) = config.seed {
            factory = factory.with_seed(seed);
        }
        Ok(factory)
    }

    /// Make every coder built from now on deterministic. The seed also
    /// replaces the generation-derived Fulcrum outer code.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.outer_seed = Some(seed);
        self.built = Arc::new(AtomicU64::new(0));
        self
    }

    pub fn scheme(&self) -> CodingScheme {
        self.scheme
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn max_symbols(&self) -> usize {
        self.max_symbols
    }

    pub fn max_symbol_size(&self) -> usize {
        self.max_symbol_size
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }

    pub fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    pub fn set_symbols(&mut self, symbols: usize) -> Result<()> {
        if symbols == 0 || symbols > self.max_symbols {
            return Err(CodingError::InvalidParameters(format!(
                "symbols {} must be in 1..={}",
                symbols, self.max_symbols
            )));
        }
        self.symbols = symbols;
        Ok(())
    }

    pub fn set_symbol_size(&mut self, symbol_size: usize) -> Result<()> {
        if symbol_size == 0 || symbol_size > self.max_symbol_size {
            return Err(CodingError::InvalidParameters(format!(
                "symbol size {} must be in 1..={}",
                symbol_size, self.max_symbol_size
            )));
        }
        if self.field == Field::Binary16 && symbol_size % 2 != 0 {
            return Err(CodingError::InvalidParameters(format!(
                "symbol size {symbol_size} must be even for binary16"
            )));
        }
        self.symbol_size = symbol_size;
        Ok(())
    }

    pub fn expansion(&self) -> Result<usize> {
        if self.scheme != CodingScheme::Fulcrum {
            return Err(self.scheme.mismatch("expansion"));
        }
        Ok(self.expansion)
    }

    pub fn set_expansion(&mut self, expansion: usize) -> Result<()> {
        if self.scheme != CodingScheme::Fulcrum {
            return Err(self.scheme.mismatch("set_expansion"));
        }
        if expansion == 0 || expansion > MAX_EXPANSION {
            return Err(CodingError::InvalidParameters(format!(
                "expansion {expansion} must be in 1..={MAX_EXPANSION}"
            )));
        }
        self.expansion = expansion;
        Ok(())
    }

    pub fn recoder_capacity(&self) -> usize {
        self.recoder_capacity.unwrap_or(self.symbols)
    }

    pub fn set_recoder_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(CodingError::InvalidParameters(
                "recoder capacity must be non-zero".into(),
            ));
        }
        self.recoder_capacity = Some(capacity);
        Ok(())
    }

    pub fn build_encoder(&self) -> Encoder {
        let outer = self.outer_code();
        tracing::debug!(
            scheme = %self.scheme,
            field = %self.field,
            symbols = self.symbols,
            symbol_size = self.symbol_size,
            "encoder built"
        );
        Encoder::new(self.generation(), outer, self.next_rng())
    }

    pub fn build_decoder(&self) -> Decoder {
        let outer = self.outer_code();
        tracing::debug!(
            scheme = %self.scheme,
            field = %self.field,
            symbols = self.symbols,
            symbol_size = self.symbol_size,
            "decoder built"
        );
        Decoder::new(self.generation(), outer, self.next_rng())
    }

    /// Pure recoder: caches received combinations without decoding them.
    pub fn build_recoder(&self) -> Result<Recoder> {
        if !self.scheme.supports_recoding() {
            return Err(self.scheme.mismatch("build_recoder"));
        }
        tracing::debug!(
            scheme = %self.scheme,
            capacity = self.recoder_capacity(),
            "recoder built"
        );
        Ok(Recoder::new(
            self.generation(),
            self.recoder_capacity(),
            self.next_rng(),
        ))
    }

    fn generation(&self) -> Generation {
        Generation {
            scheme: self.scheme,
            field: self.field,
            symbols: self.symbols,
            symbol_size: self.symbol_size,
        }
    }

    fn outer_code(&self) -> Option<OuterCode> {
        (self.scheme == CodingScheme::Fulcrum).then(|| {
            let seed = self
                .outer_seed
                .unwrap_or_else(|| fulcrum::default_seed(self.field, self.symbols, self.expansion));
            OuterCode::new(self.field, self.symbols, self.expansion, seed)
        })
    }

    fn next_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                let n = self.built.fetch_add(1, Ordering::Relaxed);
                StdRng::seed_from_u64(seed ^ n.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
            None => StdRng::from_entropy(),
        }
    }
}
