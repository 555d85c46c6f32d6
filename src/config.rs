//! `bench.toml` configuration for rlnc-bench.

use anyhow::{Context, Result};
use rlnc_engine::{CodingScheme, Encoder, Factory, FactoryConfig, Field};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level bench configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// One coding configuration to exercise.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    /// Name shown in reports (e.g. "fv-gf256-64x1400")
    pub name: String,
    #[serde(flatten)]
    pub factory: FactoryConfig,
    /// Sparse full vector density in (0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    /// Perpetual band width, pivot included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    /// Turn the systematic phase on or off where the scheme allows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systematic: Option<bool>,
    /// Probability that a payload is lost on a link.
    #[serde(default)]
    pub loss: f64,
}

impl Scenario {
    pub fn build_factory(&self) -> Result<Factory> {
        Factory::from_config(&self.factory)
            .with_context(|| format!("scenario '{}' has invalid parameters", self.name))
    }

    /// Apply the encoder-side settings of this scenario.
    pub fn configure(&self, encoder: &mut Encoder) -> Result<()> {
        if let Some(d) = self.density {
            encoder
                .set_density(d)
                .with_context(|| format!("scenario '{}': density", self.name))?;
        }
        if let Some(w) = self.width {
            encoder
                .set_width(w)
                .with_context(|| format!("scenario '{}': width", self.name))?;
        }
        let toggled = match self.systematic {
            Some(true) => encoder.set_systematic_on(),
            Some(false) => encoder.set_systematic_off(),
            None => Ok(()),
        };
        toggled.with_context(|| format!("scenario '{}': systematic", self.name))?;
        Ok(())
    }
}

/// Reject probabilities outside `[0, 1)`.
pub fn check_loss(loss: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&loss) {
        anyhow::bail!("loss probability {} must be in [0, 1)", loss);
    }
    Ok(loss)
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(cfg)
    }

    pub fn scenario(&self, name: &str) -> Result<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .with_context(|| format!("no scenario named '{}' in config", name))
    }

    /// A spread of schemes and fields that covers every coder type.
    pub fn default_example() -> Self {
        let scenario = |name: &str,
                        scheme: CodingScheme,
                        field: Field,
                        symbols: usize,
                        symbol_size: usize| Scenario {
            name: name.into(),
            factory: FactoryConfig {
                scheme,
                field,
                symbols,
                symbol_size,
                expansion: None,
                recoder_capacity: None,
                seed: None,
            },
            density: None,
            width: None,
            systematic: None,
            loss: 0.0,
        };
        let mut sparse = scenario(
            "sparse-gf256-64x1400",
            CodingScheme::SparseFullVector,
            Field::Binary8,
            64,
            1400,
        );
        sparse.density = Some(0.2);
        sparse.systematic = Some(false);

        let mut perpetual = scenario(
            "perpetual-gf2-128x1400",
            CodingScheme::Perpetual,
            Field::Binary,
            128,
            1400,
        );
        perpetual.width = Some(12);

        let mut fulcrum = scenario(
            "fulcrum-gf256-64x1400",
            CodingScheme::Fulcrum,
            Field::Binary8,
            64,
            1400,
        );
        fulcrum.factory.expansion = Some(4);

        let mut lossy = scenario(
            "fv-gf16-32x1024-lossy",
            CodingScheme::FullVector,
            Field::Binary4,
            32,
            1024,
        );
        lossy.loss = 0.2;

        Self {
            scenarios: vec![
                scenario("fv-gf256-64x1400", CodingScheme::FullVector, Field::Binary8, 64, 1400),
                scenario("fv-gf2-64x1400", CodingScheme::FullVector, Field::Binary, 64, 1400),
                scenario("fv-gf65536-16x1400", CodingScheme::FullVector, Field::Binary16, 16, 1400),
                sparse,
                scenario("otf-gf256-32x1000", CodingScheme::OnTheFly, Field::Binary8, 32, 1000),
                scenario("sw-gf256-32x1000", CodingScheme::SlidingWindow, Field::Binary8, 32, 1000),
                perpetual,
                fulcrum,
                scenario("nocode-64x1400", CodingScheme::NoCode, Field::Binary8, 64, 1400),
                lossy,
            ],
        }
    }
}
